//! Transport error taxonomy.

use ontime_core::error::OntimeError;

/// Errors from a call to the host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (DNS, refused, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// The host answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// A 2xx body that could not be interpreted.
    #[error("invalid response: {0}")]
    Decode(String),
    /// A 2xx body carrying an error or failure field.
    #[error("server reported an error: {0}")]
    Server(String),
    /// The client could not be built from its configuration.
    #[error("client configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// True for failures where no usable response reached the client.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_) | TransportError::Http { .. } | TransportError::Decode(_)
        )
    }
}

impl From<TransportError> for OntimeError {
    fn from(err: TransportError) -> Self {
        OntimeError::Transport(err.to_string())
    }
}
