//! `switch`, `refresh` and `reset`.

use std::path::Path;

use anyhow::Context;
use chisel_core::{AnyVersion, SwitchController, SwitchSession};

use super::load_config;
use crate::exit_codes::SUCCESS;

pub fn cmd_switch(config: &Path, version: &str) -> anyhow::Result<i32> {
    let mut controller = SwitchController::from_config(load_config(config)?);
    let session = controller
        .run(version)
        .with_context(|| format!("failed to switch to '{}'", version))?;
    print_session(session);
    Ok(SUCCESS)
}

pub fn cmd_refresh(config: &Path) -> anyhow::Result<i32> {
    let mut controller = SwitchController::from_config(load_config(config)?);
    let session = controller
        .refresh()
        .context("failed to refresh the active version")?;
    print_session(session);
    Ok(SUCCESS)
}

pub fn cmd_reset(config: &Path) -> anyhow::Result<i32> {
    let mut controller = SwitchController::from_config(load_config(config)?);
    let session = controller
        .reset()
        .context("failed to reset to the vcs version")?;
    print_session(session);
    Ok(SUCCESS)
}

fn print_session(session: &SwitchSession<AnyVersion>) {
    println!("Active version: {} ({})", session.identifier(), session.version());
    for (name, version) in session.dependencies() {
        println!("  {} {}", name, version);
    }
}
