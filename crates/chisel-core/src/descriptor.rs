//! Declared versions and identifier rules.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::error::{ChiselError, ChiselResult};

/// Whether `c` may appear in a version identifier.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Identifiers may only contain ASCII alphanumerics, `_`, `-` and `.`.
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.chars().all(is_identifier_char)
}

/// Return the identifier unchanged, or [`ChiselError::InvalidIdentifier`].
pub fn validate_identifier(identifier: &str) -> ChiselResult<&str> {
    if is_valid_identifier(identifier) {
        Ok(identifier)
    } else {
        Err(ChiselError::InvalidIdentifier {
            identifier: identifier.to_string(),
        })
    }
}

/// One declared version and whether it is the active one.
///
/// Identity is the identifier alone.
#[derive(Debug, Clone, Serialize)]
pub struct VersionDescriptor {
    identifier: String,
    is_active: bool,
}

impl VersionDescriptor {
    pub fn new(identifier: impl Into<String>, is_active: bool) -> Self {
        Self {
            identifier: identifier.into(),
            is_active,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Same version, marked active.
    pub fn as_active(&self) -> Self {
        Self::new(self.identifier.clone(), true)
    }
}

impl PartialEq for VersionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for VersionDescriptor {}

impl Hash for VersionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl fmt::Display for VersionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}
