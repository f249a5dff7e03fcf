use thiserror::Error;

/// Top-level error type for the Ontime client.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for OntimeError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OntimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for OntimeError {
    fn from(err: toml::de::Error) -> Self {
        OntimeError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for OntimeError {
    fn from(err: toml::ser::Error) -> Self {
        OntimeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for OntimeError {
    fn from(err: serde_json::Error) -> Self {
        OntimeError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Ontime operations.
pub type Result<T> = std::result::Result<T, OntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OntimeError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = OntimeError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OntimeError = io_err.into();
        assert!(matches!(err, OntimeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: OntimeError = toml_err.into();
        assert!(matches!(err, OntimeError::Config(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: OntimeError = json_err.into();
        assert!(matches!(err, OntimeError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
