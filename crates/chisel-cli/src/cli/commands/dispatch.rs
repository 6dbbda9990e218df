use super::super::args::*;
use crate::exit_codes::SUCCESS;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config;
    match cli.cmd {
        Command::Switch(args) => super::switch::cmd_switch(&config, &args.version),
        Command::Refresh => super::switch::cmd_refresh(&config),
        Command::Reset => super::switch::cmd_reset(&config),
        Command::Active => super::versions::cmd_active(&config),
        Command::Versions(args) => super::versions::cmd_versions(&config, args),
        Command::Eval(args) => super::eval::run(&config, args),
        Command::Init(args) => super::init::run(&config, args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
