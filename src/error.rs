use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

/// Crate-level error type.
///
/// Malformed CNL text is never an error: the compile path degrades gracefully
/// via [`ParseDiagnostic`](crate::codec::ParseDiagnostic)s and validation
/// [`ErrorRecord`](crate::validate::ErrorRecord)s. `CnlError` covers the
/// integration surface instead: schema ingestion, serialization helpers, and
/// genuine programming errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum CnlError {
    #[error("CNL codec software error: {0}")]
    Codec(String),
    #[error("Schema registry error: {0}")]
    Schema(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl From<JsonError> for CnlError {
    fn from(src: JsonError) -> CnlError {
        CnlError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<RegexError> for CnlError {
    fn from(src: RegexError) -> CnlError {
        CnlError::Codec(format!("Regex parse failed: {src}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let regex_err: CnlError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(regex_err, CnlError::Codec(_)));

        let json_err: CnlError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(json_err, CnlError::Serialization(_)));
    }
}
