//! Readable-content extraction.
//!
//! Turns an HTML document into a sanitized [`Article`]: links are made
//! absolute, boilerplate is dropped, the main content is located by scoring
//! and the result is filtered through a fixed allow-list.

mod article;
mod link_resolver;
mod metadata;
mod readability;
mod sanitizer;
mod serialize;

pub use article::Article;
pub use sanitizer::sanitize_html;

use scraper::{Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

use metadata::{element_text, normalize_whitespace};

/// Maximum document size accepted for extraction (10 MiB)
///
/// Pages above this size are almost always generated dumps, and parsing them
/// would stall the agent far beyond any signal timeout.
pub const MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;

static PARAGRAPH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p").expect("BUG: hardcoded CSS selector 'p' is invalid")
});

/// Hard extraction failures, distinct from "no article found".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Document too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Link rewriting failed: {0}")]
    Rewrite(String),

    #[error("Extraction task failed: {0}")]
    Aborted(String),
}

/// Extracts an [`Article`] from an owned copy of a document.
///
/// # Example
///
/// ```
/// use readclip::extractor::ContentExtractor;
///
/// let html = "<html><head><title>Main Title</title></head>\
///             <body><p>Only paragraph of the story.</p></body></html>";
/// let article = ContentExtractor::new(html)
///     .with_base_uri("https://example.com/story")
///     .extract()
///     .unwrap()
///     .unwrap();
/// assert_eq!(article.title, "Main Title");
/// ```
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    html: String,
    base_uri: Option<Url>,
}

impl ContentExtractor {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            base_uri: None,
        }
    }

    /// Resolve relative links against `uri`.
    ///
    /// An unparsable URI is ignored and links stay as they are.
    #[must_use]
    pub fn with_base_uri(mut self, uri: &str) -> Self {
        match Url::parse(uri) {
            Ok(url) => self.base_uri = Some(url),
            Err(e) => tracing::debug!(uri, error = %e, "Ignoring unparsable base URI"),
        }
        self
    }

    /// Run the extraction.
    ///
    /// Returns `Ok(None)` when the document has no readable body.
    pub fn extract(&self) -> Result<Option<Article>, ExtractError> {
        if self.html.len() > MAX_DOCUMENT_SIZE {
            return Err(ExtractError::TooLarge {
                size: self.html.len(),
                max: MAX_DOCUMENT_SIZE,
            });
        }

        let base = {
            let probe = Html::parse_document(&self.html);
            link_resolver::effective_base(&probe, self.base_uri.as_ref())
        };

        let markup = match &base {
            Some(base) => link_resolver::absolutize_links(&self.html, base)?,
            None => self.html.clone(),
        };

        let document = Html::parse_document(&markup);
        let meta = metadata::harvest(&document);

        let Some(readable) = readability::extract_main_content(&document, &meta.title) else {
            tracing::debug!(title = %meta.title, "No readable content found");
            return Ok(None);
        };

        let content = sanitize_html(&readable.html);
        let fragment = Html::parse_fragment(&content);
        let text_content = normalize_whitespace(&fragment.root_element().text().collect::<String>());

        if text_content.is_empty() {
            tracing::debug!(title = %meta.title, "Readable content empty after sanitizing");
            return Ok(None);
        }

        let excerpt = if meta.excerpt.is_empty() {
            fragment
                .select(&PARAGRAPH_SELECTOR)
                .map(|p| element_text(&p))
                .find(|text| !text.is_empty())
                .unwrap_or_default()
        } else {
            meta.excerpt
        };

        let dir = readable
            .dir
            .filter(|dir| !dir.is_empty())
            .unwrap_or(meta.dir);

        let article = Article {
            title: meta.title,
            length: text_content.chars().count(),
            content,
            text_content,
            excerpt,
            byline: meta.byline,
            dir,
            site_name: meta.site_name,
            lang: meta.lang,
            published_time: meta.published_time,
            url: None,
        };

        tracing::debug!(
            title = %article.title,
            length = article.length,
            "Extracted article"
        );

        Ok(Some(article))
    }
}
