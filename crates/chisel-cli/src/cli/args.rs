use chisel_core::CONFIG_FILE_NAME;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chisel",
    version,
    about = "Switch the active version of a multi-version build and evaluate version predicates"
)]
pub struct Cli {
    /// Project configuration file
    #[arg(long, global = true, env = "CHISEL_CONFIG", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Declare a version active and resolve it
    Switch(SwitchArgs),
    /// Re-run the version currently declared active
    Refresh,
    /// Switch back to the VCS version
    Reset,
    /// Print the version declared in the controller file
    Active,
    /// List registered versions
    Versions(VersionsArgs),
    /// Evaluate predicates against a version without switching
    Eval(EvalArgs),
    /// Write a controller file declaring a version
    Init(InitArgs),
    Version,
}

#[derive(Parser, Debug)]
pub struct SwitchArgs {
    /// Registered version name
    pub version: String,
}

#[derive(Parser, Debug)]
pub struct VersionsArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
pub struct EvalArgs {
    /// Predicate expressions, e.g. ">=1.17 <1.19" or "1.18.x || >=1.20"
    #[arg(required = true)]
    pub predicates: Vec<String>,

    /// Version name or literal version (default: the declared active version)
    #[arg(long)]
    pub version: Option<String>,

    /// Evaluate against this dependency of the version instead
    #[arg(long)]
    pub dependency: Option<String>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Version to declare active
    pub version: String,
}
