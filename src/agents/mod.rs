//! Agents bound to browsing contexts
//!
//! The `ExtractionAgent` lives in a source page and answers
//! `EXTRACT_CONTENT`; the `ReaderSurface` lives in a rendering context,
//! renders the current article and signals when it is ready to print.

pub mod extraction;
pub mod reader;

pub use extraction::ExtractionAgent;
pub use reader::{ReaderSurface, render_reader_page};

use async_trait::async_trait;

use crate::host::HostResult;
use crate::messaging::PdfDownload;

/// Markup and location of a live page at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub html: String,
    /// `document.baseURI`
    pub base_uri: Option<String>,
    /// `location.href`
    pub url: Option<String>,
}

/// A page the extraction agent can read.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn snapshot(&self) -> HostResult<DocumentSnapshot>;
}

/// A fixed snapshot is its own source.
#[async_trait]
impl DocumentSource for DocumentSnapshot {
    async fn snapshot(&self) -> HostResult<DocumentSnapshot> {
        Ok(self.clone())
    }
}

/// The visible page of a rendering context.
#[async_trait]
pub trait RenderTarget: Send + Sync {
    /// Replace the page with `html`.
    async fn render(&self, html: &str) -> HostResult<()>;

    /// Offer `download` to the user from inside the page.
    async fn offer_download(&self, download: &PdfDownload) -> HostResult<()>;
}
