//! Error types for FishGrowth

use thiserror::Error;

/// FishGrowth error type
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error (model or simulation configuration)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input: malformed data rows, bad configuration, empty datasets.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Numerical failure inside the engine (e.g. a NaN log density).
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let e = Error::Validation("n_sites must be > 0".into());
        assert_eq!(e.to_string(), "Validation error: n_sites must be > 0");
        let e = Error::Computation("NaN".into());
        assert!(e.to_string().starts_with("Computation error"));
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let e: Error = err.into();
        assert!(matches!(e, Error::Json(_)));
    }
}
