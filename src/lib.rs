//! Clip the readable content of a web page and save it as a PDF.
//!
//! A page is read by an [`agents::ExtractionAgent`], the resulting
//! [`extractor::Article`] is rendered by a [`agents::ReaderSurface`] and the
//! [`orchestrator::CaptureOrchestrator`] prints that rendering through a
//! capture session on the host browser.

pub mod agents;
pub mod browser_setup;
pub mod config;
pub mod coordinator;
pub mod extractor;
pub mod filename;
pub mod host;
pub mod messaging;
pub mod orchestrator;
pub mod utils;

pub use browser_setup::{LaunchedBrowser, download_managed_browser, find_browser_executable, launch_browser};
pub use config::{CaptureConfig, CaptureConfigBuilder, PrintOptions};
pub use coordinator::Coordinator;
pub use extractor::{Article, ContentExtractor, ExtractError};
pub use host::{HostError, HostServices};
pub use messaging::{ContextId, Message, Messenger, MessengerError, Reply};
pub use orchestrator::{CaptureOrchestrator, WorkflowError, WorkflowResult};
