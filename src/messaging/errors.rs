//! Error types for cross-context messaging

use thiserror::Error;

use super::types::{ContextId, MessageKind};

/// Result type alias for messaging operations
pub type MessengerResult<T> = Result<T, MessengerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    /// Nothing is listening in the target context
    #[error("Could not establish connection. Receiving end does not exist: {0}")]
    NoReceiver(ContextId),

    /// The context handled the message without answering
    #[error("Context {0} did not respond")]
    NoResponse(ContextId),

    /// A signal wait ran out of time
    #[error("Timeout waiting for message: {0}")]
    Timeout(MessageKind),

    /// Runtime message sent while no coordinator is listening
    #[error("No runtime listener attached")]
    NoListener,

    /// The messenger was torn down while a wait was pending
    #[error("Messenger closed while waiting for {0}")]
    Closed(MessageKind),
}
