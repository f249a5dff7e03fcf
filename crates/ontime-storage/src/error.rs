//! Error types for history persistence.

use ontime_core::error::OntimeError;

/// Errors from the history store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("stored history under '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<StorageError> for OntimeError {
    fn from(err: StorageError) -> Self {
        OntimeError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Database("disk I/O error".to_string());
        assert_eq!(err.to_string(), "database error: disk I/O error");

        let err = StorageError::Corrupt {
            key: "history".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stored history under 'history' is corrupt: expected value"
        );
    }

    #[test]
    fn test_storage_error_into_ontime_error() {
        let err: OntimeError = StorageError::LockPoisoned("kv".to_string()).into();
        assert!(matches!(err, OntimeError::Storage(_)));
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn test_rusqlite_error_conversion() {
        let err: StorageError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StorageError::Database(_)));
    }
}
