//! Capture orchestration
//!
//! Sequences extraction → handoff to a rendering context → print capture →
//! delivery → cleanup. The capture session is released before the
//! rendering context is torn down, on every exit path.

pub mod errors;
pub mod render;
pub mod session;

pub use errors::{WorkflowError, WorkflowResult};
pub use render::{RenderLease, Teardown};
pub use session::CaptureSession;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::extractor::Article;
use crate::filename;
use crate::host::{HostError, HostServices};
use crate::messaging::{ContextId, Message, MessageKind, Messenger, PdfDownload, Reply};
use crate::utils::{CURRENT_ARTICLE_KEY, EXTRACTION_FAILED_MESSAGE, pdf_data_url};

/// Which workflow a capture run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Context-menu "Save as PDF": visible reader, artifact also handed to it
    Immediate,
    /// Side-panel generation: background reader, closed afterwards
    Deferred,
}

impl CaptureMode {
    fn active(self) -> bool {
        matches!(self, Self::Immediate)
    }

    fn teardown(self) -> Teardown {
        match self {
            Self::Immediate => Teardown::LeaveOpen,
            Self::Deferred => Teardown::CloseThenClear,
        }
    }
}

/// Drives extraction and capture runs against a set of host capabilities.
#[derive(Clone)]
pub struct CaptureOrchestrator {
    host: HostServices,
    messenger: Messenger,
    config: CaptureConfig,
}

impl CaptureOrchestrator {
    pub fn new(host: HostServices, messenger: Messenger, config: CaptureConfig) -> Self {
        Self {
            host,
            messenger,
            config,
        }
    }

    #[must_use]
    pub fn host(&self) -> &HostServices {
        &self.host
    }

    #[must_use]
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Extract the article of `source` without touching shared state.
    ///
    /// # Errors
    /// `UnsupportedPage` for restricted sources, `Extraction` when the agent
    /// found nothing, `Messaging` when the agent could not be reached.
    pub async fn extract_only(&self, source: &ContextId) -> WorkflowResult<Article> {
        let span = tracing::info_span!("extract", run = %Uuid::new_v4(), source = %source);
        self.extract_inner(source).instrument(span).await
    }

    /// Render `article` in a background context, print it and deliver the PDF.
    ///
    /// Returns the artifact's file name.
    pub async fn capture_to_document(&self, article: &Article) -> WorkflowResult<String> {
        let span = tracing::info_span!("capture", run = %Uuid::new_v4(), mode = "deferred");
        self.run_capture(article, CaptureMode::Deferred).instrument(span).await
    }

    /// Extract `source` and immediately print it through a visible reader.
    ///
    /// Returns the artifact's file name.
    pub async fn extract_and_print(&self, source: &ContextId) -> WorkflowResult<String> {
        let span = tracing::info_span!("save", run = %Uuid::new_v4(), source = %source);
        async {
            let article = self.extract_inner(source).await?;
            self.run_capture(&article, CaptureMode::Immediate).await
        }
        .instrument(span)
        .await
    }

    async fn extract_inner(&self, source: &ContextId) -> WorkflowResult<Article> {
        match self.host.scripting.inject_agent(source).await {
            Ok(()) => tracing::debug!("Extraction agent injected"),
            Err(HostError::AgentAlreadyPresent(_)) => tracing::debug!("Extraction agent already present"),
            Err(HostError::RestrictedSurface(url)) => {
                tracing::warn!(url = %url, "Source page cannot be scripted");
                return Err(WorkflowError::UnsupportedPage);
            }
            // The request below reports a missing agent
            Err(e) => tracing::warn!(error = %e, "Agent injection failed, continuing"),
        }

        let response = self
            .messenger
            .send_request(source, Message::ExtractContent)
            .await?;

        let reply: Reply<Article> = serde_json::from_value(response).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Malformed extraction reply");
            Reply::err(EXTRACTION_FAILED_MESSAGE)
        });

        match reply {
            Reply {
                success: true,
                data: Some(article),
                ..
            } => {
                tracing::info!(title = %article.title, length = article.length, "Article extracted");
                Ok(article)
            }
            Reply { error, .. } => Err(WorkflowError::Extraction(
                error
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| EXTRACTION_FAILED_MESSAGE.to_string()),
            )),
        }
    }

    /// Shared capture procedure; teardown runs whatever happened before it.
    async fn run_capture(&self, article: &Article, mode: CaptureMode) -> WorkflowResult<String> {
        let mut lease = RenderLease::new(
            self.host.contexts.clone(),
            self.host.state.clone(),
            mode.teardown(),
        );

        let outcome = self.capture_in(&mut lease, article, mode).await;
        let cleared = lease.finish().await;

        match &outcome {
            Ok(filename) => tracing::info!(filename = %filename, cleared, "Capture complete"),
            Err(e) => tracing::error!(error = %e, cleared, "Capture failed"),
        }
        outcome
    }

    async fn capture_in(
        &self,
        lease: &mut RenderLease,
        article: &Article,
        mode: CaptureMode,
    ) -> WorkflowResult<String> {
        let stored = serde_json::to_value(article).map_err(|e| WorkflowError::State(e.to_string()))?;
        self.host
            .state
            .set(CURRENT_ARTICLE_KEY, stored)
            .await
            .map_err(|e| WorkflowError::State(e.to_string()))?;

        let context = lease
            .open(self.config.reader_surface_uri(), mode.active())
            .await?;

        // Subscribed before the reader runs, so its READY cannot slip past
        let ready = self.messenger.subscribe(MessageKind::ReaderReady, &context);
        lease.start().await?;
        ready.wait(self.config.reader_ready_timeout()).await?;

        let mut session = CaptureSession::new(self.host.capture.clone(), context.clone());
        let outcome = self.print_and_deliver(&mut session, &context, article, mode).await;
        session.release().await;
        outcome
    }

    async fn print_and_deliver(
        &self,
        session: &mut CaptureSession,
        context: &ContextId,
        article: &Article,
        mode: CaptureMode,
    ) -> WorkflowResult<String> {
        session
            .attach(self.config.protocol_version())
            .await
            .map_err(WorkflowError::Capture)?;

        let data_base64 = session
            .print_to_pdf(self.config.print_options())
            .await
            .map_err(WorkflowError::Capture)?;

        let filename = filename::synthesize(article);
        tracing::debug!(filename = %filename, bytes_base64 = data_base64.len(), "PDF captured");

        let delivered = match self
            .host
            .delivery
            .download(&pdf_data_url(&data_base64), &filename)
            .await
        {
            Ok(()) => true,
            Err(e) if mode == CaptureMode::Immediate => {
                tracing::warn!(error = %e, "Download failed, relying on the reader copy");
                false
            }
            Err(e) => return Err(WorkflowError::Delivery(e.to_string())),
        };

        if mode == CaptureMode::Immediate {
            let download = Message::DownloadPdf(PdfDownload {
                data_base64,
                filename: filename.clone(),
            });
            if let Err(e) = self.messenger.deliver(context, download).await {
                if !delivered {
                    return Err(WorkflowError::Delivery(e.to_string()));
                }
                tracing::warn!(error = %e, "Could not hand the PDF to the reader");
            }
        }

        Ok(filename)
    }
}
