//! Error types for the step sensing engine.
//!
//! The detection core is infallible once it holds a validated configuration.
//! Errors only arise at the edges: rejecting a bad configuration, and the
//! optional CSV / JSON adapters.

/// Errors produced by the step sensing engine.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A configuration field holds a value the pipeline cannot run with.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// A CSV row could not be turned into a sample.
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StepError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = StepError::invalid("window_length", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `window_length`: must be at least 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: StepError = io.into();
        assert!(matches!(err, StepError::Io(_)));
        assert!(err.to_string().contains("missing.csv"));
    }
}
