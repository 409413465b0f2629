//! Isolation guard
//!
//! Some reports refuse to run unless a marker environment variable says the
//! process lives in an isolated environment. This is a guard against
//! accidental use from a shared setup, not a security boundary.

use crate::{Error, Result};

/// Marker checked when none is configured
pub const DEFAULT_MARKER: &str = "VIRTUAL_ENV";

/// Return the value of marker variable `var`.
///
/// # Errors
///
/// Returns `EnvironmentPrecondition` if `var` is unset or empty
pub fn require_marker(var: &str) -> Result<String> {
    check_marker(var, std::env::var(var).ok())
}

fn check_marker(var: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => {
            tracing::info!(marker = var, value = %value, "running inside isolated environment");
            Ok(value)
        }
        _ => Err(Error::EnvironmentPrecondition(format!(
            "{var} is not set. Run this from an isolated environment to avoid polluting your system, \
             or pass --skip-isolation-check"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_marker_passes() {
        let value = check_marker("VIRTUAL_ENV", Some("/home/me/.venv".into())).unwrap();
        assert_eq!(value, "/home/me/.venv");
    }

    #[test]
    fn test_missing_marker_fails() {
        let err = check_marker("VIRTUAL_ENV", None).unwrap_err();
        assert!(matches!(err, Error::EnvironmentPrecondition(_)));
        assert!(err.to_string().contains("VIRTUAL_ENV"));
    }

    #[test]
    fn test_empty_marker_fails() {
        assert!(check_marker("VIRTUAL_ENV", Some(String::new())).is_err());
    }

    #[test]
    fn test_unset_variable_fails() {
        let err = require_marker("ABCD_PLOT_MARKER_THAT_IS_NEVER_SET").unwrap_err();
        assert!(err.to_string().contains("ABCD_PLOT_MARKER_THAT_IS_NEVER_SET"));
    }
}
