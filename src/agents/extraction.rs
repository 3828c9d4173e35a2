//! Page-attached extraction agent

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentSnapshot, DocumentSource};
use crate::extractor::{Article, ContentExtractor, ExtractError};
use crate::messaging::{ContextHandler, Message, Reply};
use crate::utils::{NO_CONTENT_MESSAGE, is_absolute_url};

/// Answers `EXTRACT_CONTENT` for the page behind `S`.
///
/// Replies `{success: true, data: Article}` on success,
/// `{success: false, error}` when nothing was found or extraction failed.
pub struct ExtractionAgent<S> {
    source: S,
}

impl<S: DocumentSource> ExtractionAgent<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Snapshot the page and extract its article.
    pub async fn extract(&self) -> Reply<Article> {
        let DocumentSnapshot { html, base_uri, url } = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read page for extraction");
                return Reply::err(e.to_string());
            }
        };

        // Parsing and scoring are CPU-bound; keep them off the async workers
        let outcome = tokio::task::spawn_blocking(move || {
            let mut extractor = ContentExtractor::new(html);
            if let Some(base) = base_uri.as_deref() {
                extractor = extractor.with_base_uri(base);
            }
            extractor.extract()
        })
        .await
        .map_err(|e| ExtractError::Aborted(e.to_string()))
        .and_then(|result| result);

        match outcome {
            Ok(Some(mut article)) => {
                // Attached here, not by the extractor: only a live page has a real location
                article.url = url.filter(|href| is_absolute_url(href));
                Reply::ok(article)
            }
            Ok(None) => Reply::err(NO_CONTENT_MESSAGE),
            Err(e) => {
                tracing::warn!(error = %e, "Extraction failed");
                Reply::err(e.to_string())
            }
        }
    }
}

#[async_trait]
impl<S: DocumentSource + 'static> ContextHandler for ExtractionAgent<S> {
    async fn on_message(&self, message: Message) -> Option<Value> {
        match message {
            Message::ExtractContent => Some(self.extract().await.to_value()),
            _ => None,
        }
    }
}
