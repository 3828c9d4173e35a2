//! Reader surface bound to a rendering context

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use super::RenderTarget;
use crate::extractor::{Article, sanitize_html};
use crate::host::{HostError, HostResult, SharedState};
use crate::messaging::{ContextHandler, ContextId, Message, Messenger, PdfDownload};
use crate::utils::CURRENT_ARTICLE_KEY;

const READER_STYLE: &str = "\
body{margin:0;background:#fff;color:#111;font:18px/1.6 Georgia,'Times New Roman',serif}\
main{max-width:42rem;margin:0 auto;padding:2rem}\
h1.title{font-size:2.2rem;line-height:1.2;margin:0 0 1rem}\
p.byline{color:#555;font-style:italic;margin:0 0 2rem}\
img{max-width:100%;height:auto}\
pre{white-space:pre-wrap}\
footer.source{margin-top:3rem;padding-top:1rem;border-top:1px solid #ddd;font-size:.85rem;color:#666;word-break:break-all}\
@media print{main{padding:0}}";

/// Full HTML page showing `article`.
///
/// The content is sanitized again; text fields are escaped. The source link
/// is only shown for `http`/`https` URLs.
#[must_use]
pub fn render_reader_page(article: &Article) -> String {
    let title = html_escape::encode_text(&article.title);
    let lang = html_escape::encode_double_quoted_attribute(&article.lang);
    let dir = match article.dir.as_str() {
        "rtl" => "rtl",
        _ => "ltr",
    };

    let byline = if article.byline.is_empty() {
        String::new()
    } else {
        format!(
            "<p class=\"byline\">By {}</p>",
            html_escape::encode_text(&article.byline)
        )
    };

    let source = article
        .url
        .as_deref()
        .and_then(|url| Url::parse(url).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|url| {
            let href = html_escape::encode_double_quoted_attribute(url.as_str());
            let text = html_escape::encode_text(url.as_str());
            format!("<footer class=\"source\"><p><strong>Source: </strong><a href=\"{href}\">{text}</a></p></footer>")
        })
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\" dir=\"{dir}\"><head><meta charset=\"utf-8\"><title>{title}</title><style>{READER_STYLE}</style></head>\
         <body><main><h1 class=\"title\">{title}</h1>{byline}<article>{content}</article>{source}</main></body></html>",
        content = sanitize_html(&article.content),
    )
}

/// Agent of a rendering context.
///
/// On launch it reads `currentArticle` and, when present, renders it and
/// posts `READER_READY`; it always posts `READER_OPENED`. Afterwards it
/// handles `RENDER_ARTICLE` and `DOWNLOAD_PDF`.
pub struct ReaderSurface<T> {
    context: ContextId,
    target: T,
    messenger: Messenger,
    last_download: Mutex<Option<PdfDownload>>,
    rendered: Mutex<Option<Article>>,
}

impl<T: RenderTarget + 'static> ReaderSurface<T> {
    /// Bind a reader to `context` and run its startup sequence.
    pub async fn launch(
        context: ContextId,
        target: T,
        messenger: Messenger,
        state: Arc<dyn SharedState>,
    ) -> Arc<Self> {
        let surface = Arc::new(Self {
            context: context.clone(),
            target,
            messenger: messenger.clone(),
            last_download: Mutex::new(None),
            rendered: Mutex::new(None),
        });
        messenger.register(context.clone(), surface.clone());

        match state.get(CURRENT_ARTICLE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Article>(value) {
                Ok(article) => surface.show(&article).await,
                Err(e) => tracing::warn!(context = %context, error = %e, "Stored article is malformed"),
            },
            Ok(None) => tracing::debug!(context = %context, "No stored article yet"),
            Err(e) => tracing::error!(context = %context, error = %e, "Storage error"),
        }

        messenger.post(&context, Message::ReaderOpened);
        surface
    }

    #[must_use]
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    /// Title of the article currently shown, if any.
    #[must_use]
    pub fn rendered_title(&self) -> Option<String> {
        self.rendered.lock().as_ref().map(|article| article.title.clone())
    }

    /// The last artifact offered for manual download.
    #[must_use]
    pub fn last_download(&self) -> Option<PdfDownload> {
        self.last_download.lock().clone()
    }

    /// Render `article` unless it is already on screen, then post READY.
    ///
    /// Re-rendering would replace the document a capture may be printing.
    async fn show(&self, article: &Article) {
        if self.rendered.lock().as_ref() == Some(article) {
            tracing::debug!(context = %self.context, title = %article.title, "Article already shown");
            self.messenger.post(&self.context, Message::ReaderReady);
            return;
        }

        let page = render_reader_page(article);
        match self.target.render(&page).await {
            Ok(()) => {
                *self.rendered.lock() = Some(article.clone());
                tracing::debug!(context = %self.context, title = %article.title, "Reader rendered article");
                self.messenger.post(&self.context, Message::ReaderReady);
            }
            Err(e) => tracing::error!(context = %self.context, error = %e, "Reader failed to render article"),
        }
    }

    async fn accept_download(&self, download: PdfDownload) -> HostResult<()> {
        STANDARD
            .decode(download.data_base64.trim())
            .map_err(|e| HostError::Delivery(format!("invalid PDF payload: {e}")))?;

        self.target.offer_download(&download).await?;
        tracing::info!(context = %self.context, filename = %download.filename, "Manual download offered");
        *self.last_download.lock() = Some(download);
        Ok(())
    }
}

#[async_trait]
impl<T: RenderTarget + 'static> ContextHandler for ReaderSurface<T> {
    async fn on_message(&self, message: Message) -> Option<Value> {
        match message {
            Message::RenderArticle(article) => self.show(&article).await,
            Message::DownloadPdf(download) => {
                if let Err(e) = self.accept_download(download).await {
                    tracing::error!(context = %self.context, error = %e, "Download preparation failed");
                }
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            title: "Tom & Jerry <live>".into(),
            content: r#"<p onclick="x()">Body</p><script>bad()</script>"#.into(),
            byline: "Ann".into(),
            url: Some("https://example.com/a?b=1&c=2".into()),
            ..Article::default()
        }
    }

    #[test]
    fn escapes_fields_and_resanitizes_content() {
        let page = render_reader_page(&article());
        assert!(page.contains("<title>Tom &amp; Jerry &lt;live&gt;</title>"));
        assert!(page.contains("<p>Body</p>"));
        assert!(!page.contains("bad()"));
        assert!(page.contains("By Ann"));
        assert!(page.contains(r#"href="https://example.com/a?b=1&amp;c=2""#));
    }

    #[test]
    fn non_web_sources_are_not_linked() {
        let mut article = article();
        article.url = Some("javascript:alert(1)".into());
        assert!(!render_reader_page(&article).contains("Source:"));
    }
}
