//! Version backend capability.
//!
//! The resolver and controller never parse versions or predicates themselves;
//! they go through a [`VersionBackend`], so any versioning scheme with a parser
//! and a predicate language can be plugged in. [`SemverBackend`] is the
//! default, built on [`crate::version`] and [`crate::predicate`].

use std::fmt;

use crate::error::{PredicateError, VersionError};
use crate::predicate::Predicate;
use crate::version::{parse_version, parse_version_lenient, AnyVersion};

/// Parses versions and predicates and tests one against the other.
pub trait VersionBackend {
    type Version: Clone + fmt::Debug + fmt::Display;
    type Predicate;

    fn parse_version(&self, input: &str) -> Result<Self::Version, VersionError>;

    fn parse_predicate(&self, expression: &str) -> Result<Self::Predicate, PredicateError>;

    /// Must be total: no panics for any parsed predicate and version.
    fn test(&self, predicate: &Self::Predicate, version: &Self::Version) -> bool;
}

/// Semantic version backend.
///
/// In lenient mode, versions and predicate operands that are not semantic
/// but are valid identifiers (`23w13a`) are accepted as text versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SemverBackend {
    lenient: bool,
}

impl SemverBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self { lenient: true }
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }
}

impl VersionBackend for SemverBackend {
    type Version = AnyVersion;
    type Predicate = Predicate;

    fn parse_version(&self, input: &str) -> Result<AnyVersion, VersionError> {
        if self.lenient {
            parse_version_lenient(input)
        } else {
            parse_version(input).map(AnyVersion::Semantic)
        }
    }

    fn parse_predicate(&self, expression: &str) -> Result<Predicate, PredicateError> {
        if self.lenient {
            Predicate::parse_lenient(expression)
        } else {
            Predicate::parse(expression)
        }
    }

    fn test(&self, predicate: &Predicate, version: &AnyVersion) -> bool {
        predicate.evaluate_any(version)
    }
}
