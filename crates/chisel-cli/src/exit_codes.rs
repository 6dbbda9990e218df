//! Exit codes for the `chisel` binary.
//! These codes are part of the public contract; scripts branch on them.
//!
//! Failed commands exit with `ChiselError::exit_code`: `2` bad input or config,
//! `3` unresolved version, `4` controller file, `5` no active version.

use chisel_core::ChiselError;

pub const SUCCESS: i32 = 0;
pub const NOT_MATCHED: i32 = 1; // `eval`: a predicate did not hold
pub const INVALID_INPUT: i32 = 2; // Bad version, predicate, identifier or config; also non-chisel errors

/// Exit code for a failed command.
pub fn from_error(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ChiselError>()
        .map_or(INVALID_INPUT, ChiselError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_codes_match_core() {
        let unresolved = ChiselError::UnresolvedVersion {
            identifier: "1.21".into(),
        };
        assert_eq!(unresolved.exit_code(), 3);
        assert_eq!(ChiselError::NotInitialized.exit_code(), 5);
    }

    #[test]
    fn test_from_error_sees_through_context() {
        let err = Err::<(), _>(ChiselError::StructuralMismatch {
            path: "stonecutter.gradle".into(),
            reason: "file is empty".into(),
        })
        .context("switch failed")
        .unwrap_err();
        assert_eq!(from_error(&err), 4);
        assert_eq!(from_error(&anyhow::anyhow!("other")), INVALID_INPUT);
    }
}
