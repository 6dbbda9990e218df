//! Switch orchestration and predicate queries.
//!
//! [`SwitchController`] is `Uninitialized` until a [`run`](SwitchController::run)
//! succeeds, then `Ready` with a [`SwitchSession`] holding the resolved
//! version. A failed run drops the session, so no partial state is exposed.
//!
//! Predicate queries never fail the caller. [`SwitchController::check_version`]
//! reports what happened as a [`PredicateOutcome`]; [`SwitchController::test_version`]
//! collapses it to a `bool` and records malformed expressions. Under
//! [`PredicatePolicy::Strict`] the recorded expressions make
//! [`SwitchController::finish`] fail.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::backend::{SemverBackend, VersionBackend};
use crate::config::ProjectConfig;
use crate::descriptor::{validate_identifier, VersionDescriptor};
use crate::error::{ChiselError, ChiselResult, PredicateError};
use crate::resolver::{ProjectRegistry, ResolvedVersion, VersionResolver};
use crate::switch::ActiveVersionSwitch;

/// What to do with predicates that do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicatePolicy {
    /// Evaluate to `false` and log.
    #[default]
    Lenient,

    /// Evaluate to `false`, log, and fail [`SwitchController::finish`].
    Strict,
}

impl FromStr for PredicatePolicy {
    type Err = ChiselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(ChiselError::config(format!(
                "unknown predicate policy '{}' (expected 'lenient' or 'strict')",
                other
            ))),
        }
    }
}

impl fmt::Display for PredicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Result of one predicate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateOutcome {
    Matched,
    NotMatched,

    /// The expression did not parse.
    Invalid(PredicateError),

    /// The session has no version for this dependency.
    UnknownDependency(String),

    /// No switch has succeeded yet.
    NotInitialized,
}

impl PredicateOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched)
    }

    /// True when the query failed rather than evaluated.
    pub fn is_suppressed(&self) -> bool {
        !matches!(self, Self::Matched | Self::NotMatched)
    }
}

/// A malformed predicate seen during the session, deduplicated by expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateDiagnostic {
    pub expression: String,
    pub error: String,
    pub occurrences: usize,
}

/// State of a successful switch.
#[derive(Debug, Clone)]
pub struct SwitchSession<V> {
    descriptor: VersionDescriptor,
    version: V,
    dependencies: BTreeMap<String, V>,
}

impl<V> SwitchSession<V> {
    pub fn descriptor(&self) -> &VersionDescriptor {
        &self.descriptor
    }

    pub fn identifier(&self) -> &str {
        self.descriptor.identifier()
    }

    pub fn version(&self) -> &V {
        &self.version
    }

    pub fn dependency(&self, name: &str) -> Option<&V> {
        self.dependencies.get(name)
    }

    pub fn dependencies(&self) -> &BTreeMap<String, V> {
        &self.dependencies
    }
}

impl<V> From<ResolvedVersion<V>> for SwitchSession<V> {
    fn from(resolved: ResolvedVersion<V>) -> Self {
        Self {
            descriptor: resolved.descriptor,
            version: resolved.version,
            dependencies: resolved.dependencies,
        }
    }
}

/// Switches the active version and answers predicate queries against it.
pub struct SwitchController<R, B: VersionBackend = SemverBackend> {
    switch: ActiveVersionSwitch,
    registry: R,
    resolver: VersionResolver<B>,
    vcs: Option<String>,
    policy: PredicatePolicy,
    session: Option<SwitchSession<B::Version>>,
    diagnostics: BTreeMap<String, PredicateDiagnostic>,
}

impl SwitchController<ProjectConfig, SemverBackend> {
    /// Controller for a loaded project configuration.
    pub fn from_config(config: ProjectConfig) -> Self {
        let switch = config.active_switch();
        let backend = config.backend();
        let policy = config.predicates;
        let vcs = config.vcs_version().to_string();

        Self::new(switch, config, backend)
            .with_policy(policy)
            .with_vcs(vcs)
    }
}

impl<R, B> SwitchController<R, B>
where
    R: ProjectRegistry,
    B: VersionBackend,
{
    pub fn new(switch: ActiveVersionSwitch, registry: R, backend: B) -> Self {
        Self {
            switch,
            registry,
            resolver: VersionResolver::new(backend),
            vcs: None,
            policy: PredicatePolicy::default(),
            session: None,
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: PredicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Version restored by [`reset`](Self::reset).
    pub fn with_vcs(mut self, vcs: impl Into<String>) -> Self {
        self.vcs = Some(vcs.into());
        self
    }

    pub fn switch(&self) -> &ActiveVersionSwitch {
        &self.switch
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        self.resolver.backend()
    }

    pub fn policy(&self) -> PredicatePolicy {
        self.policy
    }

    pub fn session(&self) -> Option<&SwitchSession<B::Version>> {
        self.session.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    /// The session of the last successful switch, or [`ChiselError::NotInitialized`].
    pub fn active_session(&self) -> ChiselResult<&SwitchSession<B::Version>> {
        self.session.as_ref().ok_or(ChiselError::NotInitialized)
    }

    /// The resolved active version, or [`ChiselError::NotInitialized`].
    pub fn version(&self) -> ChiselResult<&B::Version> {
        self.active_session().map(SwitchSession::version)
    }

    /// Declare `target` active and resolve it.
    ///
    /// The target must be registered before the build file is touched. On
    /// failure the controller is left uninitialized.
    pub fn run(&mut self, target: &str) -> ChiselResult<&SwitchSession<B::Version>> {
        self.session = None;

        match self.switch_to(target) {
            Ok(session) => Ok(&*self.session.insert(session)),
            Err(err) => {
                error!(version = %target, error = %err, "failed to switch active version");
                Err(err)
            }
        }
    }

    /// Switch to the VCS version.
    pub fn reset(&mut self) -> ChiselResult<&SwitchSession<B::Version>> {
        self.session = None;
        let target = self
            .vcs
            .clone()
            .ok_or_else(|| ChiselError::config("no vcs version configured"))?;
        self.run(&target)
    }

    /// Re-run the version currently declared in the build file.
    pub fn refresh(&mut self) -> ChiselResult<&SwitchSession<B::Version>> {
        self.session = None;
        let current = self.switch.read_active().map_err(|err| {
            error!(error = %err, "failed to read the active version");
            err
        })?;
        self.run(&current)
    }

    fn switch_to(&self, target: &str) -> ChiselResult<SwitchSession<B::Version>> {
        validate_identifier(target)?;
        if !self.registry.contains(target) {
            return Err(ChiselError::UnresolvedVersion {
                identifier: target.to_string(),
            });
        }

        let current = self.switch.read_active().ok();
        if current.as_deref() == Some(target) {
            info!(version = %target, "reloading active version '{}'", target);
        } else {
            info!(
                version = %target,
                previous = current.as_deref().unwrap_or("none"),
                "switching active version to '{}'",
                target
            );
        }

        self.switch.apply(target)?;
        let resolved = self.resolver.resolve(target, &self.registry)?;
        Ok(SwitchSession::from(resolved))
    }

    /// Evaluate `expression` against the active version.
    pub fn check_version(&self, expression: &str) -> PredicateOutcome {
        match self.version() {
            Ok(version) => self.check(expression, version),
            Err(_) => PredicateOutcome::NotInitialized,
        }
    }

    /// Evaluate `expression` against the active version of dependency `name`.
    pub fn check_dependency(&self, name: &str, expression: &str) -> PredicateOutcome {
        let Some(session) = &self.session else {
            return PredicateOutcome::NotInitialized;
        };
        match session.dependency(name) {
            Some(version) => self.check(expression, version),
            None => PredicateOutcome::UnknownDependency(name.to_string()),
        }
    }

    /// Like [`check_version`](Self::check_version), `false` unless matched.
    ///
    /// Failures are logged and recorded in [`diagnostics`](Self::diagnostics).
    pub fn test_version(&mut self, expression: &str) -> bool {
        let outcome = self.check_version(expression);
        self.record(expression, &outcome);
        outcome.is_match()
    }

    /// Like [`check_dependency`](Self::check_dependency), `false` unless matched.
    pub fn test_dependency(&mut self, name: &str, expression: &str) -> bool {
        let outcome = self.check_dependency(name, expression);
        self.record(&format!("{}: {}", name, expression), &outcome);
        outcome.is_match()
    }

    /// Malformed predicates seen so far, ordered by expression.
    pub fn diagnostics(&self) -> impl Iterator<Item = &PredicateDiagnostic> {
        self.diagnostics.values()
    }

    /// End the predicate pass. Fails under the strict policy if any
    /// predicate was malformed.
    pub fn finish(&self) -> ChiselResult<()> {
        if self.policy == PredicatePolicy::Strict && !self.diagnostics.is_empty() {
            return Err(ChiselError::InvalidPredicates {
                expressions: self.diagnostics.keys().cloned().collect(),
            });
        }
        Ok(())
    }

    fn check(&self, expression: &str, version: &B::Version) -> PredicateOutcome {
        let backend = self.resolver.backend();
        match backend.parse_predicate(expression) {
            Ok(predicate) if backend.test(&predicate, version) => PredicateOutcome::Matched,
            Ok(_) => PredicateOutcome::NotMatched,
            Err(err) => PredicateOutcome::Invalid(err),
        }
    }

    fn record(&mut self, expression: &str, outcome: &PredicateOutcome) {
        let reason = match outcome {
            PredicateOutcome::Matched | PredicateOutcome::NotMatched => return,
            PredicateOutcome::NotInitialized => {
                warn!(expression, "predicate tested before a successful switch");
                return;
            }
            PredicateOutcome::Invalid(err) => err.to_string(),
            PredicateOutcome::UnknownDependency(name) => {
                format!("dependency '{}' is not declared for this version", name)
            }
        };

        let diagnostic = self
            .diagnostics
            .entry(expression.to_string())
            .or_insert_with(|| PredicateDiagnostic {
                expression: expression.to_string(),
                error: reason.clone(),
                occurrences: 0,
            });
        diagnostic.occurrences += 1;

        if diagnostic.occurrences == 1 {
            warn!(expression, error = %reason, policy = %self.policy, "ignoring malformed predicate");
        } else {
            debug!(
                expression,
                occurrences = diagnostic.occurrences,
                "ignoring malformed predicate"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VersionEntry;
    use crate::error::VersionError;
    use crate::switch::Declaration;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const CONTROLLER: &str = "plugins {\n    id 'io.shcm.shsupercm.fabric.stonecutter'\n}\n\n\nstonecutter.current('1.18')\n";

    fn registry() -> Vec<VersionEntry> {
        vec![
            VersionEntry::new("1.18")
                .with_version("1.18.2")
                .with_dependency("fapi", "0.76.0"),
            VersionEntry::new("1.19").with_version("1.19.4"),
            VersionEntry::new("broken").with_version("one.two"),
        ]
    }

    fn setup() -> (TempDir, SwitchController<Vec<VersionEntry>>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stonecutter.gradle");
        fs::write(&path, CONTROLLER).unwrap();
        let switch = ActiveVersionSwitch::new(path, Declaration::default());
        let controller = SwitchController::new(switch, registry(), SemverBackend::new());
        (dir, controller)
    }

    fn declared(dir: &Path) -> String {
        fs::read_to_string(dir.join("stonecutter.gradle")).unwrap()
    }

    #[test]
    fn test_uninitialized_queries() {
        let (_dir, mut controller) = setup();
        assert!(!controller.is_ready());
        assert_eq!(
            controller.check_version(">=1.0"),
            PredicateOutcome::NotInitialized
        );
        assert!(!controller.test_version(">=1.0"));
        assert!(!controller.test_dependency("fapi", ">=0.1"));
        assert_eq!(controller.diagnostics().count(), 0);
    }

    #[test]
    fn test_run_then_query() {
        let (dir, mut controller) = setup();
        let session = controller.run("1.19").unwrap();
        assert_eq!(session.identifier(), "1.19");
        assert!(session.descriptor().is_active());

        assert!(declared(dir.path()).contains("stonecutter.current('1.19')"));
        assert!(controller.test_version(">=1.19"));
        assert!(!controller.test_version("<1.19"));
        assert_eq!(controller.check_version("1.19.x"), PredicateOutcome::Matched);
    }

    #[test]
    fn test_unregistered_leaves_file_alone() {
        let (dir, mut controller) = setup();
        controller.run("1.18").unwrap();

        let err = controller.run("1.21").unwrap_err();
        assert!(matches!(err, ChiselError::UnresolvedVersion { .. }));
        assert!(!controller.is_ready());
        assert_eq!(declared(dir.path()), CONTROLLER);
    }

    #[test]
    fn test_invalid_identifier() {
        let (_dir, mut controller) = setup();
        assert!(matches!(
            controller.run("1.19'"),
            Err(ChiselError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_resolution_failure_uninitializes() {
        let (_dir, mut controller) = setup();
        controller.run("1.18").unwrap();
        assert!(matches!(
            controller.run("broken"),
            Err(ChiselError::ResolutionFailed { .. })
        ));
        assert!(!controller.is_ready());
        assert!(!controller.test_version(">=0"));
    }

    #[test]
    fn test_structural_failure_uninitializes() {
        let (dir, mut controller) = setup();
        controller.run("1.18").unwrap();
        fs::write(dir.path().join("stonecutter.gradle"), "short\n").unwrap();
        assert!(matches!(
            controller.run("1.19"),
            Err(ChiselError::StructuralMismatch { .. })
        ));
        assert!(controller.session().is_none());
    }

    #[test]
    fn test_malformed_predicate_is_isolated() {
        let (_dir, mut controller) = setup();
        controller.run("1.18").unwrap();

        assert!(matches!(
            controller.check_version("=>1.18"),
            PredicateOutcome::Invalid(PredicateError::UnknownOperator { .. })
        ));
        assert!(!controller.test_version("=>1.18"));
        assert!(controller.test_version(">=1.18"));
        assert!(!controller.test_version("=>1.18"));

        let diagnostics: Vec<_> = controller.diagnostics().collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].expression, "=>1.18");
        assert_eq!(diagnostics[0].occurrences, 2);
        assert!(controller.finish().is_ok());
    }

    #[test]
    fn test_strict_policy_fails_finish() {
        let (_dir, controller) = setup();
        let mut controller = controller.with_policy(PredicatePolicy::Strict);
        controller.run("1.18").unwrap();

        assert!(!controller.test_version(">=one"));
        assert!(!controller.test_version("<<1"));
        assert!(!controller.test_version(">=one"));
        assert!(controller.test_version("<1.19"));

        match controller.finish() {
            Err(ChiselError::InvalidPredicates { expressions }) => {
                assert_eq!(expressions, vec!["<<1".to_string(), ">=one".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_dependencies() {
        let (_dir, mut controller) = setup();
        controller.run("1.18").unwrap();

        assert_eq!(
            controller.check_dependency("fapi", ">=0.76"),
            PredicateOutcome::Matched
        );
        assert_eq!(
            controller.check_dependency("fapi", "<0.76"),
            PredicateOutcome::NotMatched
        );
        assert_eq!(
            controller.check_dependency("sodium", ">=1"),
            PredicateOutcome::UnknownDependency("sodium".to_string())
        );
        assert!(!controller.test_dependency("sodium", ">=1"));
        assert_eq!(
            controller.diagnostics().next().map(|d| d.expression.as_str()),
            Some("sodium: >=1")
        );

        controller.run("1.19").unwrap();
        assert!(!controller.test_dependency("fapi", ">=0.76"));
    }

    #[test]
    fn test_reset_and_refresh() {
        let (dir, controller) = setup();
        let mut controller = controller.with_vcs("1.18");

        controller.run("1.19").unwrap();
        assert_eq!(controller.refresh().unwrap().identifier(), "1.19");
        assert_eq!(controller.reset().unwrap().identifier(), "1.18");
        assert_eq!(declared(dir.path()), CONTROLLER);
    }

    #[test]
    fn test_reset_without_vcs() {
        let (_dir, mut controller) = setup();
        controller.run("1.19").unwrap();
        assert!(matches!(controller.reset(), Err(ChiselError::Config { .. })));
        assert!(!controller.is_ready());
        assert!(!controller.test_version(">=1.19"));
    }

    #[test]
    fn test_failed_refresh_uninitializes() {
        let (dir, mut controller) = setup();
        controller.run("1.18").unwrap();
        assert!(controller.is_ready());

        let path = dir.path().join("stonecutter.gradle");
        let corrupted = declared(dir.path()).replace("stonecutter.current('1.18')", "garbage");
        fs::write(&path, corrupted).unwrap();

        assert!(matches!(
            controller.refresh(),
            Err(ChiselError::StructuralMismatch { .. })
        ));
        assert!(!controller.is_ready());
        assert_eq!(
            controller.check_version(">=1.18"),
            PredicateOutcome::NotInitialized
        );
    }

    #[test]
    fn test_version_accessor() {
        let (_dir, mut controller) = setup();
        assert!(matches!(
            controller.version(),
            Err(ChiselError::NotInitialized)
        ));
        assert!(matches!(
            controller.active_session(),
            Err(ChiselError::NotInitialized)
        ));

        controller.run("1.19").unwrap();
        assert_eq!(controller.version().unwrap().to_string(), "1.19.4");
        assert_eq!(controller.active_session().unwrap().identifier(), "1.19");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "Strict".parse::<PredicatePolicy>().unwrap(),
            PredicatePolicy::Strict
        );
        assert_eq!(
            "lenient".parse::<PredicatePolicy>().unwrap(),
            PredicatePolicy::Lenient
        );
        assert!("maybe".parse::<PredicatePolicy>().is_err());
        assert_eq!(PredicatePolicy::Strict.to_string(), "strict");
    }

    /// Versions are plain integers and predicates are `>N` or `N`.
    struct BuildNumberBackend;

    impl VersionBackend for BuildNumberBackend {
        type Version = u32;
        type Predicate = (bool, u32);

        fn parse_version(&self, input: &str) -> Result<u32, VersionError> {
            input
                .parse()
                .map_err(|_| VersionError::malformed(input, "not a build number"))
        }

        fn parse_predicate(&self, expression: &str) -> Result<(bool, u32), PredicateError> {
            let (greater, number) = match expression.strip_prefix('>') {
                Some(rest) => (true, rest),
                None => (false, expression),
            };
            number
                .parse()
                .map(|n| (greater, n))
                .map_err(|_| PredicateError::MissingOperand {
                    operator: ">".to_string(),
                })
        }

        fn test(&self, predicate: &(bool, u32), version: &u32) -> bool {
            match predicate {
                (true, n) => version > n,
                (false, n) => version == n,
            }
        }
    }

    #[test]
    fn test_substitute_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stonecutter.gradle");
        fs::write(&path, CONTROLLER).unwrap();

        let registry = vec![VersionEntry::new("b120"), VersionEntry::new("b7").with_version("7")];
        let mut controller = SwitchController::new(
            ActiveVersionSwitch::new(&path, Declaration::default()),
            registry,
            BuildNumberBackend,
        );

        assert!(matches!(
            controller.run("b120"),
            Err(ChiselError::ResolutionFailed { .. })
        ));
        assert_eq!(*controller.run("b7").unwrap().version(), 7);
        assert!(controller.test_version(">6"));
        assert!(controller.test_version("7"));
        assert!(!controller.test_version(">7"));
        assert!(!controller.test_version(">"));
    }
}
