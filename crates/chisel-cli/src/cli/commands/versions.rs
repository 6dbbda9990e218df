//! `active` and `versions`.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use super::load_config;
use crate::cli::args::{OutputFormat, VersionsArgs};
use crate::exit_codes::SUCCESS;

#[derive(Debug, Serialize)]
struct VersionRow<'a> {
    name: &'a str,
    version: &'a str,
    active: bool,
}

pub fn cmd_active(config: &Path) -> anyhow::Result<i32> {
    let config = load_config(config)?;
    let active = config
        .active_switch()
        .read_active()
        .context("failed to read the active version")?;
    println!("{}", active);
    Ok(SUCCESS)
}

pub fn cmd_versions(config: &Path, args: VersionsArgs) -> anyhow::Result<i32> {
    let config = load_config(config)?;

    // Listing works before the controller file exists
    let active = config.active_switch().read_active().ok();

    let rows: Vec<VersionRow<'_>> = config
        .versions
        .iter()
        .map(|entry| VersionRow {
            name: &entry.name,
            version: entry.platform_version(),
            active: active.as_deref() == Some(entry.name.as_str()),
        })
        .collect();

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            for row in &rows {
                let marker = if row.active { "*" } else { " " };
                if row.name == row.version {
                    println!("{} {}", marker, row.name);
                } else {
                    println!("{} {} ({})", marker, row.name, row.version);
                }
            }
        }
    }
    Ok(SUCCESS)
}
