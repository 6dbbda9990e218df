//! Project configuration.
//!
//! The configuration (`chisel.yaml`) declares every buildable version and
//! where the active declaration lives.
//!
//! # Format
//!
//! ```yaml
//! controller: stonecutter.gradle
//! vcs: "1.20.1"
//! declaration:
//!   style: legacy
//!   line: 5
//! predicates: lenient
//! versions:
//!   - name: "1.18"
//!     version: "1.18.2"
//!     dependencies:
//!       fapi: "0.76.0"
//!   - name: "1.20.1"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::SemverBackend;
use crate::controller::PredicatePolicy;
use crate::descriptor::{is_valid_identifier, VersionDescriptor};
use crate::error::{ChiselError, ChiselResult};
use crate::resolver::ProjectRegistry;
use crate::switch::{ActiveVersionSwitch, Declaration, MAX_DECLARATION_LINE};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "chisel.yaml";

/// Default controller build file.
pub const DEFAULT_CONTROLLER: &str = "stonecutter.gradle";

fn default_controller() -> PathBuf {
    PathBuf::from(DEFAULT_CONTROLLER)
}

/// A declared version and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionEntry {
    /// Version name, used in the active declaration.
    pub name: String,

    /// Platform version this name builds against. Defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Dependency versions available to `test_dependency`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

impl VersionEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// Set the platform version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a dependency version.
    pub fn with_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), version.into());
        self
    }

    /// The platform version string to parse.
    pub fn platform_version(&self) -> &str {
        self.version.as_deref().unwrap_or(&self.name)
    }
}

/// Parsed `chisel.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Controller build file, relative to the configuration file.
    #[serde(default = "default_controller")]
    pub controller: PathBuf,

    /// Version restored by a reset. Defaults to the first declared version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,

    /// Where and how the active version is declared.
    #[serde(default)]
    pub declaration: Declaration,

    /// What to do with malformed predicates.
    #[serde(default)]
    pub predicates: PredicatePolicy,

    /// Accept non-semantic platform versions such as snapshots.
    #[serde(default)]
    pub lenient_versions: bool,

    /// Declared versions.
    #[serde(default)]
    pub versions: Vec<VersionEntry>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    root: PathBuf,
}

impl ProjectConfig {
    /// Create a configuration from versions, with defaults for everything else.
    pub fn new(versions: Vec<VersionEntry>) -> Self {
        Self {
            controller: default_controller(),
            vcs: None,
            declaration: Declaration::default(),
            predicates: PredicatePolicy::default(),
            lenient_versions: false,
            versions,
            root: PathBuf::from("."),
        }
    }

    /// Load, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> ChiselResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ChiselError::io(path, e))?;

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let config = Self::parse(&content)?.with_root(root).apply_env()?;
        debug!(
            path = %path.display(),
            versions = config.versions.len(),
            "loaded project configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> ChiselResult<Self> {
        let mut config: Self = serde_yaml::from_str(content)
            .map_err(|e| ChiselError::config(format!("failed to parse configuration: {}", e)))?;
        config.root = PathBuf::from(".");
        config.validate()?;
        Ok(config)
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Apply `CHISEL_PREDICATES`.
    pub fn apply_env(mut self) -> ChiselResult<Self> {
        if let Ok(value) = std::env::var("CHISEL_PREDICATES") {
            self.predicates = value.parse()?;
        }
        Ok(self)
    }

    /// Check names, uniqueness and the VCS version.
    pub fn validate(&self) -> ChiselResult<()> {
        if self.versions.is_empty() {
            return Err(ChiselError::config("no versions declared"));
        }

        let mut seen = HashSet::new();
        for entry in &self.versions {
            if !is_valid_identifier(&entry.name) {
                return Err(ChiselError::InvalidIdentifier {
                    identifier: entry.name.clone(),
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ChiselError::config(format!(
                    "version '{}' is declared more than once",
                    entry.name
                )));
            }
            if let Some(dep) = entry.dependencies.keys().find(|d| !is_valid_identifier(d)) {
                return Err(ChiselError::InvalidIdentifier {
                    identifier: dep.clone(),
                });
            }
        }

        if self.declaration.line > MAX_DECLARATION_LINE {
            return Err(ChiselError::config(format!(
                "declaration line {} is out of range (0..={})",
                self.declaration.line, MAX_DECLARATION_LINE
            )));
        }

        if let Some(vcs) = &self.vcs {
            if !seen.contains(vcs.as_str()) {
                return Err(ChiselError::config(format!(
                    "vcs version '{}' is not declared",
                    vcs
                )));
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute or root-relative path of the controller build file.
    pub fn controller_path(&self) -> PathBuf {
        self.root.join(&self.controller)
    }

    /// The version a reset switches to.
    pub fn vcs_version(&self) -> &str {
        self.vcs
            .as_deref()
            .or_else(|| self.versions.first().map(|v| v.name.as_str()))
            .unwrap_or_default()
    }

    /// Descriptors for all versions, with `active` marked.
    pub fn descriptors(&self, active: Option<&str>) -> Vec<VersionDescriptor> {
        self.versions
            .iter()
            .map(|v| VersionDescriptor::new(v.name.clone(), Some(v.name.as_str()) == active))
            .collect()
    }

    /// The switch for this project's controller file.
    pub fn active_switch(&self) -> ActiveVersionSwitch {
        ActiveVersionSwitch::new(self.controller_path(), self.declaration.clone())
    }

    /// The version backend matching `lenient_versions`.
    pub fn backend(&self) -> SemverBackend {
        if self.lenient_versions {
            SemverBackend::lenient()
        } else {
            SemverBackend::new()
        }
    }
}

impl ProjectRegistry for ProjectConfig {
    fn entry(&self, identifier: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.name == identifier)
    }
}
