//! Error types for capture workflows

use thiserror::Error;

use crate::host::HostError;
use crate::messaging::MessengerError;
use crate::utils::NO_CONTENT_MESSAGE;

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The source is a restricted surface the host refuses to script
    #[error("Cannot extract content from this page type")]
    UnsupportedPage,

    /// The agent ran but returned nothing usable
    #[error("{0}")]
    Extraction(String),

    #[error("Failed to create rendering context: {0}")]
    RenderContextUnavailable(String),

    /// Attaching the capture session or printing failed
    #[error("Capture failed: {0}")]
    Capture(#[source] HostError),

    #[error("Download failed: {0}")]
    Delivery(String),

    #[error("Shared state error: {0}")]
    State(String),

    #[error(transparent)]
    Messaging(#[from] MessengerError),
}

impl WorkflowError {
    /// Whether a user-initiated retry can succeed.
    ///
    /// Restricted pages and pages without an article fail the same way every
    /// time; everything else may be transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnsupportedPage => false,
            Self::Extraction(reason) => reason != NO_CONTENT_MESSAGE,
            _ => true,
        }
    }
}
