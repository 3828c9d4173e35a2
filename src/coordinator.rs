//! Background coordinator
//!
//! Routes runtime messages from contexts (side panel requests, reader
//! startup) to the orchestrator, and hosts the top-level "Save as PDF"
//! trigger that turns any failure into a notification.

use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::extractor::Article;
use crate::messaging::{ContextId, Message, Reply};
use crate::orchestrator::CaptureOrchestrator;
use crate::utils::{CURRENT_ARTICLE_KEY, SAVE_FAILED_TITLE};

pub struct Coordinator {
    orchestrator: CaptureOrchestrator,
}

impl Coordinator {
    pub fn new(orchestrator: CaptureOrchestrator) -> Arc<Self> {
        Arc::new(Self { orchestrator })
    }

    #[must_use]
    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    /// Start serving runtime messages.
    ///
    /// Every message is handled on its own task so a long capture never
    /// holds up the reader handshake it depends on.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let mut envelopes = self.orchestrator.messenger().runtime_listener();
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(mut envelope) = envelopes.recv().await {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    let answer = coordinator
                        .handle(&envelope.sender, envelope.message.clone())
                        .await;
                    if let Some(answer) = answer {
                        envelope.respond(answer);
                    }
                });
            }
            tracing::debug!("Runtime message stream closed, coordinator stopping");
        })
    }

    /// Handle one runtime message from `sender`.
    ///
    /// Returns the reply for request-style messages.
    pub async fn handle(&self, sender: &ContextId, message: Message) -> Option<Value> {
        match message {
            Message::ReaderOpened => {
                self.send_stored_article(sender).await;
                None
            }
            Message::ExtractForSidepanel { tab_id } => {
                let reply = match self.orchestrator.extract_only(&tab_id).await {
                    Ok(article) => Reply::ok(article),
                    Err(e) => Reply::err(e.to_string()),
                };
                Some(reply.to_value())
            }
            Message::GeneratePdfFromSidepanel { article } => {
                let reply = match self.orchestrator.capture_to_document(&article).await {
                    Ok(filename) => Reply::ok(filename),
                    Err(e) => Reply::err(e.to_string()),
                };
                Some(reply.to_value())
            }
            other => {
                tracing::trace!(sender = %sender, kind = %other.kind(), "Runtime message ignored");
                None
            }
        }
    }

    /// Push the stored article to a reader that just opened.
    async fn send_stored_article(&self, reader: &ContextId) {
        let stored = match self.orchestrator.host().state.get(CURRENT_ARTICLE_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Storage error");
                return;
            }
        };

        let article: Article = match serde_json::from_value(stored) {
            Ok(article) => article,
            Err(e) => {
                tracing::warn!(error = %e, "Stored article is malformed");
                return;
            }
        };

        if let Err(e) = self
            .orchestrator
            .messenger()
            .deliver(reader, Message::RenderArticle(article))
            .await
        {
            tracing::warn!(reader = %reader, error = %e, "Could not send article to reader");
        }
    }

    /// "Save as PDF" on `source`. Never fails: errors become a notification.
    ///
    /// Returns the artifact's file name on success.
    pub async fn save_as_pdf(&self, source: &ContextId) -> Option<String> {
        match self.orchestrator.extract_and_print(source).await {
            Ok(filename) => Some(filename),
            Err(e) => {
                tracing::error!(source = %source, error = %e, "Save as PDF failed");
                self.orchestrator
                    .host()
                    .notifier
                    .notify(SAVE_FAILED_TITLE, &e.to_string())
                    .await;
                None
            }
        }
    }
}
