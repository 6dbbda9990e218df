use std::path::Path;

use anyhow::Context;
use chisel_core::{ChiselError, ProjectRegistry};

use super::load_config;
use crate::cli::args::InitArgs;
use crate::exit_codes::SUCCESS;

pub fn run(config: &Path, args: InitArgs) -> anyhow::Result<i32> {
    let config = load_config(config)?;
    if !config.contains(&args.version) {
        return Err(ChiselError::UnresolvedVersion {
            identifier: args.version,
        }
        .into());
    }

    let switch = config.active_switch();
    if switch.path().exists() {
        println!("Skipped {} (exists)", switch.path().display());
        return Ok(SUCCESS);
    }

    switch
        .create(&args.version)
        .with_context(|| format!("failed to create {}", switch.path().display()))?;
    println!(
        "Created {} with active version '{}'",
        switch.path().display(),
        args.version
    );
    Ok(SUCCESS)
}
