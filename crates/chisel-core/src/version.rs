//! Version parsing and ordering.
//!
//! Accepted grammar:
//!
//! ```text
//! version    = numeric ( "-" pre-release )? ( "+" build )?
//! numeric    = digits ( "." digits )*
//! pre-release, build = ident ( "." ident )*      ident = [0-9A-Za-z-]+
//! ```
//!
//! Numeric components compare numerically, missing trailing components count
//! as zero (`1.18 == 1.18.0`), a pre-release sorts below the same release and
//! build metadata never takes part in comparison.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::descriptor::is_valid_identifier;
use crate::error::VersionError;

/// A single dot-separated pre-release identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PreRelease {
    Numeric(u64),
    Alpha(String),
}

impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Alpha(a), Self::Alpha(b)) => a.cmp(b),
            // Numeric identifiers have lower precedence than alphanumeric ones
            (Self::Numeric(_), Self::Alpha(_)) => Ordering::Less,
            (Self::Alpha(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Alpha(s) => f.write_str(s),
        }
    }
}

/// A parsed semantic version such as `1.18.2`, `1.20-rc.1` or `0.15.7+build.3`.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    components: Vec<u64>,
    pre: Vec<PreRelease>,
    build: Option<String>,
}

impl SemanticVersion {
    /// Parse a version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use chisel_core::SemanticVersion;
    ///
    /// let v = SemanticVersion::parse("1.18.2").unwrap();
    /// assert_eq!(v.major(), 1);
    /// assert_eq!(v.minor(), 18);
    ///
    /// assert!(SemanticVersion::parse("1.2.0").unwrap() < SemanticVersion::parse("1.10.0").unwrap());
    /// assert!(SemanticVersion::parse("1.2.0-alpha").unwrap() < SemanticVersion::parse("1.2.0").unwrap());
    /// assert!(SemanticVersion::parse("1.x").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Err(VersionError::malformed(input, "empty version"));
        }

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => {
                validate_dotted(input, build, "build metadata")?;
                (rest, Some(build.to_string()))
            }
            None => (input, None),
        };

        let (numeric, pre) = match rest.split_once('-') {
            Some((numeric, pre)) => {
                validate_dotted(input, pre, "pre-release")?;
                if let Some(ident) = pre.split('.').find(|i| has_leading_zero(i)) {
                    return Err(VersionError::malformed(
                        input,
                        format!("numeric pre-release identifier '{}' has a leading zero", ident),
                    ));
                }
                let pre = pre.split('.').map(parse_pre_release).collect();
                (numeric, pre)
            }
            None => (rest, Vec::new()),
        };

        let components = parse_components(input, numeric)?;

        Ok(Self {
            components,
            pre,
            build,
        })
    }

    /// Build a release version from numeric components.
    pub fn from_components(components: impl Into<Vec<u64>>) -> Self {
        let mut components = components.into();
        if components.is_empty() {
            components.push(0);
        }
        Self {
            components,
            pre: Vec::new(),
            build: None,
        }
    }

    /// Numeric component at `index`, zero when absent.
    pub fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    /// Numeric components as written.
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub fn major(&self) -> u64 {
        self.component(0)
    }

    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    pub fn patch(&self) -> u64 {
        self.component(2)
    }

    /// Whether the version carries a pre-release suffix.
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Pre-release suffix without the leading `-`.
    pub fn pre_release(&self) -> Option<String> {
        if self.pre.is_empty() {
            return None;
        }
        Some(
            self.pre
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("."),
        )
    }

    /// Build metadata without the leading `+`.
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Compare only the first `len` numeric components.
    ///
    /// Used for wildcard operands: `1.18.x` covers every version whose first
    /// two components are `1.18`, pre-releases included.
    pub fn cmp_prefix(&self, prefix: &[u64]) -> Ordering {
        prefix
            .iter()
            .enumerate()
            .map(|(i, p)| self.component(i).cmp(p))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn cmp_numeric(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn significant_components(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..len]
    }
}

fn parse_components(input: &str, numeric: &str) -> Result<Vec<u64>, VersionError> {
    numeric
        .split('.')
        .map(|part| {
            if part.is_empty() {
                return Err(VersionError::malformed(input, "empty numeric component"));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::malformed(
                    input,
                    format!("component '{}' is not a number", part),
                ));
            }
            part.parse::<u64>().map_err(|_| {
                VersionError::malformed(input, format!("component '{}' is too large", part))
            })
        })
        .collect()
}

fn validate_dotted(input: &str, section: &str, what: &str) -> Result<(), VersionError> {
    for ident in section.split('.') {
        if ident.is_empty() {
            return Err(VersionError::malformed(
                input,
                format!("empty {} identifier", what),
            ));
        }
        if !ident.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(VersionError::malformed(
                input,
                format!("invalid {} identifier '{}'", what, ident),
            ));
        }
    }
    Ok(())
}

fn has_leading_zero(ident: &str) -> bool {
    ident.len() > 1 && ident.starts_with('0') && ident.bytes().all(|b| b.is_ascii_digit())
}

fn parse_pre_release(ident: &str) -> PreRelease {
    if ident.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = ident.parse::<u64>() {
            return PreRelease::Numeric(n);
        }
    }
    PreRelease::Alpha(ident.to_string())
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other)
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with Eq: trailing zeros and build metadata are ignored
        self.significant_components().hash(state);
        self.pre.hash(state);
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", c)?;
        }
        if let Some(pre) = self.pre_release() {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A version that is either semantic or an opaque identifier such as `23w13a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyVersion {
    Semantic(SemanticVersion),
    Text(String),
}

impl AnyVersion {
    pub fn as_semantic(&self) -> Option<&SemanticVersion> {
        match self {
            Self::Semantic(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for AnyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic(v) => v.fmt(f),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<SemanticVersion> for AnyVersion {
    fn from(v: SemanticVersion) -> Self {
        Self::Semantic(v)
    }
}

/// Parse a version string. See [`SemanticVersion::parse`].
pub fn parse_version(input: &str) -> Result<SemanticVersion, VersionError> {
    SemanticVersion::parse(input)
}

/// Parse a version string, falling back to an opaque text version when the
/// input is a valid identifier but not a semantic version.
pub fn parse_version_lenient(input: &str) -> Result<AnyVersion, VersionError> {
    match SemanticVersion::parse(input) {
        Ok(v) => Ok(AnyVersion::Semantic(v)),
        Err(_) if !input.is_empty() && is_valid_identifier(input) => {
            Ok(AnyVersion::Text(input.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Parse both versions and compare them.
pub fn compare(left: &str, right: &str) -> Result<Ordering, VersionError> {
    Ok(parse_version(left)?.cmp(&parse_version(right)?))
}
