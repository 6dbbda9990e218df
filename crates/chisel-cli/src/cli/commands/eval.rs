//! `eval`: answer predicates without touching the controller file.

use std::path::Path;

use anyhow::{anyhow, Context};
use chisel_core::{ChiselError, ProjectRegistry, VersionBackend, VersionResolver};

use super::load_config;
use crate::cli::args::EvalArgs;
use crate::exit_codes::{NOT_MATCHED, SUCCESS};

pub fn run(config: &Path, args: EvalArgs) -> anyhow::Result<i32> {
    let config = load_config(config)?;
    let backend = config.backend();

    let name = match args.version {
        Some(version) => version,
        None => config
            .active_switch()
            .read_active()
            .context("no --version given and the active version could not be read")?,
    };

    let version = if config.contains(&name) {
        let resolved = VersionResolver::new(backend).resolve(&name, &config)?;
        match &args.dependency {
            Some(dependency) => resolved
                .dependencies
                .get(dependency)
                .cloned()
                .ok_or_else(|| anyhow!("version '{}' declares no dependency '{}'", name, dependency))?,
            None => resolved.version,
        }
    } else if args.dependency.is_some() {
        return Err(ChiselError::UnresolvedVersion { identifier: name }.into());
    } else {
        // Not a registered name: evaluate against the literal version
        backend
            .parse_version(&name)
            .map_err(ChiselError::from)?
    };

    let predicates = args
        .predicates
        .iter()
        .map(|expression| {
            backend
                .parse_predicate(expression)
                .map(|predicate| (expression, predicate))
                .map_err(ChiselError::from)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut all = true;
    for (expression, predicate) in &predicates {
        let matched = backend.test(predicate, &version);
        println!("{}\t{}", matched, expression);
        all &= matched;
    }

    tracing::debug!(version = %version, predicates = predicates.len(), all, "evaluated predicates");
    Ok(if all { SUCCESS } else { NOT_MATCHED })
}
