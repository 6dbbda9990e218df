//! Active version switching for multi-version builds.
//!
//! A project that builds against several versions of a platform keeps one
//! "active" version declared in its controller build file. This crate provides:
//!
//! - Semantic version parsing and ordering ([`SemanticVersion`])
//! - Version predicates such as `>=1.17 <1.19` or `1.18.x || >=1.20` ([`Predicate`])
//! - Resolution of a version name to its declared platform version ([`VersionResolver`])
//! - Rewriting the active declaration in the controller file ([`ActiveVersionSwitch`])
//! - A controller that ties the above together and answers predicate queries
//!   for the rest of the build ([`SwitchController`])
//!
//! # Quick Start
//!
//! ```no_run
//! use chisel_core::{ProjectConfig, SwitchController};
//!
//! # fn example() -> chisel_core::ChiselResult<()> {
//! let config = ProjectConfig::load("chisel.yaml")?;
//! let mut controller = SwitchController::from_config(config);
//!
//! controller.run("1.19")?;
//! if controller.test_version(">=1.19") {
//!     println!("building for 1.19 or newer");
//! }
//! controller.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CHISEL_CONFIG` | Project configuration path (CLI only, default: `chisel.yaml`) |
//! | `CHISEL_PREDICATES` | Malformed predicate policy: `lenient` (default) or `strict` |

pub mod backend;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod error;
pub mod predicate;
pub mod resolver;
pub mod switch;
pub mod version;

// Re-export main types
pub use backend::{SemverBackend, VersionBackend};
pub use config::{ProjectConfig, VersionEntry, CONFIG_FILE_NAME};
pub use controller::{
    PredicateDiagnostic, PredicateOutcome, PredicatePolicy, SwitchController, SwitchSession,
};
pub use descriptor::{is_valid_identifier, validate_identifier, VersionDescriptor};
pub use error::{ChiselError, ChiselResult, PredicateError, VersionError};
pub use predicate::{
    eval, evaluate, parse_predicate, parse_predicate_lenient, Clause, Operand, Operator, Predicate,
};
pub use resolver::{ProjectRegistry, ResolvedVersion, VersionResolver};
pub use switch::{ActiveVersionSwitch, Declaration, DeclarationStyle, HEADER_MARKER};
pub use version::{compare, parse_version, parse_version_lenient, AnyVersion, SemanticVersion};
