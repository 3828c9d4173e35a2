//! Message shapes exchanged between contexts

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::extractor::Article;

/// Opaque id of a browsing context (a page target)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContextId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ContextId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Artifact handed to the reader surface for a manual download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfDownload {
    pub data_base64: String,
    pub filename: String,
}

/// `{type, payload?}` message crossing a context boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    ExtractContent,
    ReaderOpened,
    ReaderReady,
    RenderArticle(Article),
    DownloadPdf(PdfDownload),
    ExtractForSidepanel {
        #[serde(rename = "tabId")]
        tab_id: ContextId,
    },
    GeneratePdfFromSidepanel {
        article: Article,
    },
}

impl Message {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ExtractContent => MessageKind::ExtractContent,
            Self::ReaderOpened => MessageKind::ReaderOpened,
            Self::ReaderReady => MessageKind::ReaderReady,
            Self::RenderArticle(_) => MessageKind::RenderArticle,
            Self::DownloadPdf(_) => MessageKind::DownloadPdf,
            Self::ExtractForSidepanel { .. } => MessageKind::ExtractForSidepanel,
            Self::GeneratePdfFromSidepanel { .. } => MessageKind::GeneratePdfFromSidepanel,
        }
    }

    /// The `payload` member as JSON, `Null` for payload-less messages.
    #[must_use]
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("payload").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// Message type names, used to correlate signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    ExtractContent,
    ReaderOpened,
    ReaderReady,
    RenderArticle,
    DownloadPdf,
    ExtractForSidepanel,
    GeneratePdfFromSidepanel,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtractContent => "EXTRACT_CONTENT",
            Self::ReaderOpened => "READER_OPENED",
            Self::ReaderReady => "READER_READY",
            Self::RenderArticle => "RENDER_ARTICLE",
            Self::DownloadPdf => "DOWNLOAD_PDF",
            Self::ExtractForSidepanel => "EXTRACT_FOR_SIDEPANEL",
            Self::GeneratePdfFromSidepanel => "GENERATE_PDF_FROM_SIDEPANEL",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{success, data?, error?}` reply envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Serialize> Reply<T> {
    /// Serialize into the JSON value sent over the wire.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": format!("Unserializable reply: {e}") })
        })
    }
}
