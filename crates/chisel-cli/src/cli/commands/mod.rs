use anyhow::Context;
use chisel_core::ProjectConfig;
use std::path::Path;

pub mod dispatch;
pub mod eval;
pub mod init;
pub mod switch;
pub mod versions;

pub use dispatch::dispatch;

pub(crate) fn load_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    ProjectConfig::load(path)
        .with_context(|| format!("failed to load project configuration {}", path.display()))
}
