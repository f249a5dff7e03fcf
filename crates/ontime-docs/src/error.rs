//! Error types for document upload and analysis.

use ontime_core::error::OntimeError;
use ontime_transport::TransportError;

/// Errors from the upload/poll workflow.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("upload failed: {0}")]
    Upload(TransportError),
    #[error("could not start analysis: {0}")]
    AnalysisStart(TransportError),
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("analysis did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },
}

impl From<DocumentError> for OntimeError {
    fn from(err: DocumentError) -> Self {
        OntimeError::Document(err.to_string())
    }
}
