//! Application-wide error types.
//!
//! Every bootstrap operation reports one of these kinds. `main` prints the
//! message to stderr and exits non-zero.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed numeric literal or genesis content.
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing file or missing chain-info record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed address or a record that fails a structural check.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unwritable paths, logger or debug session setup failure.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unknown or malformed subcommand invocation.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Short kind label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Parse(_) => "parse",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Configuration(_) => "configuration",
            AppError::Usage(_) => "usage",
            AppError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn parse_error_display() {
        let e = AppError::Parse("invalid amount 'abc'".into());
        assert!(e.to_string().starts_with("parse error"));
        assert!(e.to_string().contains("invalid amount 'abc'"));
    }

    #[test]
    fn not_found_error_display() {
        let e = AppError::NotFound("chain info for child_1".into());
        assert!(e.to_string().contains("child_1"));
        assert_eq!(e.kind(), "not_found");
    }

    #[test]
    fn configuration_error_display() {
        let e = AppError::Configuration("cannot create log dir".into());
        assert!(e.to_string().contains("cannot create log dir"));
        assert_eq!(e.kind(), "configuration");
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        assert_eq!(e.kind(), "io");
        let _: &dyn Error = &e;
    }
}
