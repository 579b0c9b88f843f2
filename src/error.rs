//! Error types for the analysis core.
//!
//! The taxonomy distinguishes data that is merely absent (which degrades to
//! "no value" and must never become a false positive) from lookups that
//! failed and inputs that would poison the arithmetic. A failed single flare
//! or timestamp never aborts a batch; callers collect these per item.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error type covering all failure modes of the analysis core.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// A channel/timestamp cell that an operation required is absent.
    #[error("missing data for channel {channel} at bin {bin}")]
    MissingData { channel: usize, bin: usize },

    /// Connectivity data could not be obtained for a quantized timestamp.
    #[error("connectivity lookup for {timestamp} failed: {reason}")]
    LookupFailure {
        timestamp: String,
        reason: String,
        /// Transient failures (I/O, network) are worth retrying once.
        retryable: bool,
    },

    /// Input that would make the arithmetic meaningless (empty sample sets,
    /// zero-length windows, zero divisors). Checked before computing, so
    /// NaN/inf never propagate silently into a boolean verdict.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A connectivity sample file line that does not match the fixed format.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Build a lookup failure for a quantized timestamp.
    pub fn lookup(
        timestamp: impl Into<String>,
        reason: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::LookupFailure {
            timestamp: timestamp.into(),
            reason: reason.into(),
            retryable,
        }
    }

    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LookupFailure { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_failure_retryable() {
        let transient = AnalysisError::lookup("2023-01-09T06:00:00", "timed out", true);
        let permanent = AnalysisError::lookup("2023-01-09T06:00:00", "not found", false);

        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_missing_data_is_not_retryable() {
        let err = AnalysisError::MissingData { channel: 3, bin: 17 };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "missing data for channel 3 at bin 17");
    }
}
