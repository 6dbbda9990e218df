//! Error types for version switching and predicate evaluation.

use std::path::PathBuf;

/// A version identifier did not match the version grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Malformed version string.
    #[error("malformed version '{input}': {reason}")]
    Malformed { input: String, reason: String },
}

impl VersionError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// The rejected input.
    pub fn input(&self) -> &str {
        match self {
            Self::Malformed { input, .. } => input,
        }
    }
}

/// A predicate expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    /// Operator is not one of `= != > >= < <= ~ ^`.
    #[error("unknown operator '{operator}' in clause '{clause}'")]
    UnknownOperator { clause: String, operator: String },

    /// Operator without a version after it.
    #[error("missing operand after '{operator}'")]
    MissingOperand { operator: String },

    /// Operand is not a valid version.
    #[error("invalid operand in clause '{clause}': {source}")]
    InvalidOperand {
        clause: String,
        #[source]
        source: VersionError,
    },

    /// `||` with nothing on one side.
    #[error("empty alternative in predicate '{expression}'")]
    EmptyAlternative { expression: String },
}

/// Errors raised while switching or querying the active version.
#[derive(Debug, thiserror::Error)]
pub enum ChiselError {
    /// A version identifier could not be parsed.
    #[error(transparent)]
    MalformedVersion(#[from] VersionError),

    /// A predicate expression could not be parsed.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(#[from] PredicateError),

    /// The registry has no entry for the version.
    #[error("version '{identifier}' is not registered")]
    UnresolvedVersion { identifier: String },

    /// The registry entry exists but its declared version is unusable.
    #[error("failed to resolve version '{identifier}'")]
    ResolutionFailed {
        identifier: String,
        #[source]
        source: VersionError,
    },

    /// Reading or writing the build configuration failed.
    #[error("i/o failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build configuration does not have the expected shape.
    #[error("unexpected structure in {}: {reason}", path.display())]
    StructuralMismatch { path: PathBuf, reason: String },

    /// A predicate was queried before any switch succeeded.
    #[error("no active version: run a switch before testing predicates")]
    NotInitialized,

    /// Identifier contains characters outside `[A-Za-z0-9_.-]`.
    #[error("invalid identifier '{identifier}'")]
    InvalidIdentifier { identifier: String },

    /// Malformed predicates were seen while the strict policy was active.
    #[error("malformed predicates: {}", expressions.join(", "))]
    InvalidPredicates { expressions: Vec<String> },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ChiselError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Bad input
            Self::MalformedVersion(_) => 2,
            Self::InvalidPredicate(_) => 2,
            Self::InvalidIdentifier { .. } => 2,
            Self::InvalidPredicates { .. } => 2,
            Self::Config { .. } => 2,

            // Resolution
            Self::UnresolvedVersion { .. } => 3,
            Self::ResolutionFailed { .. } => 3,

            // Build file
            Self::Io { .. } => 4,
            Self::StructuralMismatch { .. } => 4,

            Self::NotInitialized => 5,
        }
    }
}

/// Result type for chisel operations.
pub type ChiselResult<T> = Result<T, ChiselError>;
