//! Version resolution.
//!
//! Maps a version name to the platform version it builds against, parsed by
//! the configured [`VersionBackend`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::VersionBackend;
use crate::config::VersionEntry;
use crate::descriptor::VersionDescriptor;
use crate::error::{ChiselError, ChiselResult};

/// Read-only lookup of declared versions.
pub trait ProjectRegistry {
    fn entry(&self, identifier: &str) -> Option<&VersionEntry>;

    fn contains(&self, identifier: &str) -> bool {
        self.entry(identifier).is_some()
    }
}

impl ProjectRegistry for [VersionEntry] {
    fn entry(&self, identifier: &str) -> Option<&VersionEntry> {
        self.iter().find(|v| v.name == identifier)
    }
}

impl ProjectRegistry for Vec<VersionEntry> {
    fn entry(&self, identifier: &str) -> Option<&VersionEntry> {
        self.as_slice().entry(identifier)
    }
}

/// A version name resolved to parsed versions.
#[derive(Debug, Clone)]
pub struct ResolvedVersion<V> {
    /// The resolved version, marked active.
    pub descriptor: VersionDescriptor,

    /// Parsed platform version.
    pub version: V,

    /// Parsed dependency versions.
    pub dependencies: BTreeMap<String, V>,
}

/// Stateless resolver over a [`VersionBackend`].
#[derive(Debug, Clone, Default)]
pub struct VersionResolver<B> {
    backend: B,
}

impl<B: VersionBackend> VersionResolver<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve `identifier` against `registry`.
    ///
    /// Fails with [`ChiselError::UnresolvedVersion`] when the registry has no
    /// entry and [`ChiselError::ResolutionFailed`] when the declared platform
    /// or dependency version does not parse.
    pub fn resolve<R>(
        &self,
        identifier: &str,
        registry: &R,
    ) -> ChiselResult<ResolvedVersion<B::Version>>
    where
        R: ProjectRegistry + ?Sized,
    {
        let entry = registry
            .entry(identifier)
            .ok_or_else(|| ChiselError::UnresolvedVersion {
                identifier: identifier.to_string(),
            })?;

        let parse = |input: &str| {
            self.backend
                .parse_version(input)
                .map_err(|source| ChiselError::ResolutionFailed {
                    identifier: identifier.to_string(),
                    source,
                })
        };

        let version = parse(entry.platform_version())?;
        let dependencies = entry
            .dependencies
            .iter()
            .map(|(name, raw)| Ok((name.clone(), parse(raw)?)))
            .collect::<ChiselResult<BTreeMap<_, _>>>()?;

        debug!(
            identifier,
            version = %version,
            dependencies = dependencies.len(),
            "resolved version"
        );

        Ok(ResolvedVersion {
            descriptor: VersionDescriptor::new(identifier, true),
            version,
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SemverBackend;
    use crate::version::{AnyVersion, SemanticVersion};

    fn registry() -> Vec<VersionEntry> {
        vec![
            VersionEntry::new("1.18")
                .with_version("1.18.2")
                .with_dependency("fapi", "0.76.0+1.18.2"),
            VersionEntry::new("1.19"),
            VersionEntry::new("broken").with_version("1.x"),
            VersionEntry::new("bad-dep").with_dependency("fapi", "latest"),
            VersionEntry::new("snapshot").with_version("23w13a"),
        ]
    }

    #[test]
    fn test_resolves_declared_version() {
        let resolver = VersionResolver::new(SemverBackend::new());
        let resolved = resolver.resolve("1.18", &registry()).unwrap();
        assert_eq!(resolved.descriptor.identifier(), "1.18");
        assert!(resolved.descriptor.is_active());
        assert_eq!(
            resolved.version,
            AnyVersion::Semantic(SemanticVersion::parse("1.18.2").unwrap())
        );
        assert_eq!(resolved.dependencies["fapi"].to_string(), "0.76.0+1.18.2");
    }

    #[test]
    fn test_falls_back_to_name() {
        let resolver = VersionResolver::new(SemverBackend::new());
        let resolved = resolver.resolve("1.19", registry().as_slice()).unwrap();
        assert_eq!(resolved.version.to_string(), "1.19");
        assert!(resolved.dependencies.is_empty());
    }

    #[test]
    fn test_unregistered() {
        let resolver = VersionResolver::new(SemverBackend::new());
        assert!(matches!(
            resolver.resolve("1.21", &registry()),
            Err(ChiselError::UnresolvedVersion { identifier }) if identifier == "1.21"
        ));
    }

    #[test]
    fn test_malformed_platform_version() {
        let resolver = VersionResolver::new(SemverBackend::new());
        match resolver.resolve("broken", &registry()) {
            Err(ChiselError::ResolutionFailed { identifier, source }) => {
                assert_eq!(identifier, "broken");
                assert_eq!(source.input(), "1.x");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_dependency_version() {
        let resolver = VersionResolver::new(SemverBackend::new());
        assert!(matches!(
            resolver.resolve("bad-dep", &registry()),
            Err(ChiselError::ResolutionFailed { .. })
        ));
    }

    #[test]
    fn test_snapshot_needs_lenient_backend() {
        assert!(VersionResolver::new(SemverBackend::new())
            .resolve("snapshot", &registry())
            .is_err());
        let resolved = VersionResolver::new(SemverBackend::lenient())
            .resolve("snapshot", &registry())
            .unwrap();
        assert_eq!(resolved.version, AnyVersion::Text("23w13a".to_string()));
    }
}
