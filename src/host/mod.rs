//! Host capabilities consumed by the orchestrator
//!
//! Each capability the browser offers (scripting, context lifecycle, shared
//! state, capture sessions, downloads, notifications) is a trait so the
//! workflow runs unchanged against Chromium or in-memory fakes.

pub mod chrome;
pub mod filesystem;
pub mod memory;

pub use chrome::ChromeHost;
pub use filesystem::{ConsoleNotifier, FileDeliverySink};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::PrintOptions;
use crate::messaging::ContextId;

/// Result type alias for host operations
pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("No context with id {0}")]
    ContextNotFound(ContextId),

    /// The page is a browser-internal surface that cannot be scripted
    #[error("Cannot access a restricted page: {0}")]
    RestrictedSurface(String),

    #[error("Extraction agent already present in context {0}")]
    AgentAlreadyPresent(ContextId),

    #[error("Capture capability error: {0}")]
    Capability(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Shared state error: {0}")]
    Storage(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Injects the page-attached extraction agent.
#[async_trait]
pub trait ScriptingHost: Send + Sync {
    /// # Errors
    /// `RestrictedSurface` for pages the host refuses to script,
    /// `AgentAlreadyPresent` when an agent is already bound.
    async fn inject_agent(&self, context: &ContextId) -> HostResult<()>;
}

/// Creates, queries and closes browsing contexts.
#[async_trait]
pub trait ContextHost: Send + Sync {
    /// Open a context at `url`; `active` brings it to the foreground.
    ///
    /// `Ok(None)` means the host created nothing it can name.
    async fn create(&self, url: &str, active: bool) -> HostResult<Option<ContextId>>;

    /// Start the agent of a context returned by `create`.
    ///
    /// Nothing inside a new rendering context runs before this is called, so
    /// signal subscriptions made in between cannot miss its first message.
    /// A no-op for contexts without an agent.
    async fn start(&self, context: &ContextId) -> HostResult<()>;

    async fn exists(&self, context: &ContextId) -> bool;

    /// # Errors
    /// `ContextNotFound` when the context is already gone.
    async fn close(&self, context: &ContextId) -> HostResult<()>;
}

/// Process-wide key-value state shared by all contexts.
#[async_trait]
pub trait SharedState: Send + Sync {
    async fn get(&self, key: &str) -> HostResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> HostResult<()>;

    async fn remove(&self, key: &str) -> HostResult<()>;
}

/// Remote capture sessions against a context.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn attach(&self, context: &ContextId, protocol_version: &str) -> HostResult<()>;

    async fn detach(&self, context: &ContextId) -> HostResult<()>;

    /// Print the context and return the PDF as base64.
    async fn print_to_pdf(&self, context: &ContextId, options: &PrintOptions) -> HostResult<String>;
}

/// User-visible save of an artifact.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn download(&self, data_url: &str, filename: &str) -> HostResult<()>;
}

/// User-visible notification for unrecoverable failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str);
}

/// The set of host capabilities one orchestrator works against.
#[derive(Clone)]
pub struct HostServices {
    pub scripting: Arc<dyn ScriptingHost>,
    pub contexts: Arc<dyn ContextHost>,
    pub state: Arc<dyn SharedState>,
    pub capture: Arc<dyn CaptureBackend>,
    pub delivery: Arc<dyn DeliverySink>,
    pub notifier: Arc<dyn Notifier>,
}
