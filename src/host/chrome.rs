//! Chromium host over the DevTools protocol
//!
//! Every page opened through [`ChromeHost`] is a browsing context. Agents run
//! host-side and reach into their page with `evaluate`, so the page itself
//! never needs extension privileges.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::Page;
use dashmap::{DashMap, DashSet};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{CaptureBackend, ContextHost, HostError, HostResult, ScriptingHost, SharedState};
use crate::agents::{DocumentSnapshot, DocumentSource, ExtractionAgent, ReaderSurface, RenderTarget};
use crate::config::PrintOptions;
use crate::messaging::{ContextId, Messenger, PdfDownload};
use crate::utils::{is_restricted_surface, pdf_data_url};

const SNAPSHOT_SCRIPT: &str = r"
    (function() {
        return {
            html: document.documentElement ? document.documentElement.outerHTML : '',
            baseUri: document.baseURI || null,
            url: location.href || null
        };
    })()
";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    html: String,
    base_uri: Option<String>,
    url: Option<String>,
}

fn browser_error(e: impl std::fmt::Display) -> HostError {
    HostError::Browser(e.to_string())
}

/// Reads the live DOM of a page.
pub struct ChromeDocument {
    page: Page,
}

#[async_trait]
impl DocumentSource for ChromeDocument {
    async fn snapshot(&self) -> HostResult<DocumentSnapshot> {
        let raw: RawSnapshot = self
            .page
            .evaluate(SNAPSHOT_SCRIPT)
            .await
            .map_err(browser_error)?
            .into_value()
            .map_err(browser_error)?;

        Ok(DocumentSnapshot {
            html: raw.html,
            base_uri: raw.base_uri,
            url: raw.url,
        })
    }
}

/// The reader page of a rendering context.
pub struct ChromeRenderTarget {
    page: Page,
}

#[async_trait]
impl RenderTarget for ChromeRenderTarget {
    async fn render(&self, html: &str) -> HostResult<()> {
        self.page.set_content(html).await.map_err(browser_error)?;
        Ok(())
    }

    async fn offer_download(&self, download: &PdfDownload) -> HostResult<()> {
        let href = serde_json::to_string(&pdf_data_url(&download.data_base64))
            .map_err(|e| HostError::Delivery(e.to_string()))?;
        let filename = serde_json::to_string(&download.filename)
            .map_err(|e| HostError::Delivery(e.to_string()))?;

        let script = format!(
            r"(function() {{
                const link = document.createElement('a');
                link.href = {href};
                link.download = {filename};
                link.textContent = 'Download ' + {filename};
                link.className = 'manual-download';
                document.body.appendChild(link);
                return true;
            }})()"
        );
        self.page.evaluate(script.as_str()).await.map_err(browser_error)?;
        Ok(())
    }
}

/// Pages a host opened, with the per-context capture and startup flags.
///
/// A context stays tracked until its page is confirmed closed.
struct PageRegistry<P> {
    pages: DashMap<ContextId, P>,
    attached: DashSet<ContextId>,
    unstarted_readers: DashSet<ContextId>,
}

impl<P: Clone> PageRegistry<P> {
    fn new() -> Self {
        Self {
            pages: DashMap::new(),
            attached: DashSet::new(),
            unstarted_readers: DashSet::new(),
        }
    }

    fn get(&self, context: &ContextId) -> HostResult<P> {
        self.pages
            .get(context)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| HostError::ContextNotFound(context.clone()))
    }

    fn contains(&self, context: &ContextId) -> bool {
        self.pages.contains_key(context)
    }

    /// Track `page` and run `setup`; a page whose setup fails is closed and
    /// forgotten again.
    async fn admit<S, C, F>(&self, context: &ContextId, page: P, setup: S, close: C) -> HostResult<()>
    where
        S: Future<Output = HostResult<()>>,
        C: FnOnce(P) -> F,
        F: Future<Output = HostResult<()>>,
    {
        self.pages.insert(context.clone(), page.clone());

        if let Err(e) = setup.await {
            self.forget(context);
            if let Err(close_err) = close(page).await {
                tracing::warn!(context = %context, error = %close_err, "Failed to close page after setup error");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Close the page of `context`, ending its tracking only on success.
    async fn close_with<C, F>(&self, context: &ContextId, close: C) -> HostResult<()>
    where
        C: FnOnce(P) -> F,
        F: Future<Output = HostResult<()>>,
    {
        let page = self.get(context)?;
        close(page).await?;
        self.forget(context);
        Ok(())
    }

    fn forget(&self, context: &ContextId) {
        self.pages.remove(context);
        self.attached.remove(context);
        self.unstarted_readers.remove(context);
    }
}

async fn close_page(page: Page) -> HostResult<()> {
    page.close().await.map_err(browser_error)
}

/// Host capabilities backed by a running Chromium.
pub struct ChromeHost {
    browser: Arc<Browser>,
    messenger: Messenger,
    state: Arc<dyn SharedState>,
    reader_surface_uri: String,
    page_load_timeout: Duration,
    registry: PageRegistry<Page>,
}

impl ChromeHost {
    pub fn new(
        browser: Arc<Browser>,
        messenger: Messenger,
        state: Arc<dyn SharedState>,
        reader_surface_uri: impl Into<String>,
        page_load_timeout: Duration,
    ) -> Self {
        Self {
            browser,
            messenger,
            state,
            reader_surface_uri: reader_surface_uri.into(),
            page_load_timeout,
            registry: PageRegistry::new(),
        }
    }

    async fn navigate(&self, page: &Page, url: &str) -> HostResult<()> {
        let load = async {
            page.goto(url).await.map_err(browser_error)?;
            page.wait_for_navigation().await.map_err(browser_error)?;
            Ok::<_, HostError>(())
        };

        match tokio::time::timeout(self.page_load_timeout, load).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    url,
                    timeout_secs = self.page_load_timeout.as_secs(),
                    "Page load timed out, continuing with partial document"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ScriptingHost for ChromeHost {
    async fn inject_agent(&self, context: &ContextId) -> HostResult<()> {
        let page = self.registry.get(context)?;
        let url = page.url().await.map_err(browser_error)?.unwrap_or_default();

        if is_restricted_surface(&url) {
            return Err(HostError::RestrictedSurface(url));
        }
        if self.messenger.has_handler(context) {
            return Err(HostError::AgentAlreadyPresent(context.clone()));
        }

        self.messenger
            .register(context.clone(), Arc::new(ExtractionAgent::new(ChromeDocument { page })));
        tracing::debug!(context = %context, url, "Extraction agent injected");
        Ok(())
    }
}

#[async_trait]
impl ContextHost for ChromeHost {
    async fn create(&self, url: &str, active: bool) -> HostResult<Option<ContextId>> {
        let page = self.browser.new_page("about:blank").await.map_err(browser_error)?;
        let context = ContextId::new(page.target_id().inner().clone());
        let is_reader = url == self.reader_surface_uri;

        let setup = async {
            if active {
                page.bring_to_front().await.map_err(browser_error)?;
            }
            if !is_reader {
                self.navigate(&page, url).await?;
            }
            Ok::<_, HostError>(())
        };
        self.registry.admit(&context, page.clone(), setup, close_page).await?;

        if is_reader {
            self.registry.unstarted_readers.insert(context.clone());
        }
        tracing::debug!(context = %context, url, active, "Context created");
        Ok(Some(context))
    }

    async fn start(&self, context: &ContextId) -> HostResult<()> {
        let page = self.registry.get(context)?;
        if self.registry.unstarted_readers.remove(context).is_none() {
            return Ok(());
        }

        let target = ChromeRenderTarget { page };
        let messenger = self.messenger.clone();
        let state = Arc::clone(&self.state);
        let reader = context.clone();
        tokio::spawn(async move {
            ReaderSurface::launch(reader, target, messenger, state).await;
        });
        tracing::debug!(context = %context, "Reader surface started");
        Ok(())
    }

    async fn exists(&self, context: &ContextId) -> bool {
        self.registry.contains(context)
    }

    async fn close(&self, context: &ContextId) -> HostResult<()> {
        self.registry.close_with(context, close_page).await?;
        self.messenger.unregister(context);
        tracing::debug!(context = %context, "Context closed");
        Ok(())
    }
}

#[async_trait]
impl CaptureBackend for ChromeHost {
    async fn attach(&self, context: &ContextId, protocol_version: &str) -> HostResult<()> {
        self.registry.get(context)?;
        if !self.registry.attached.insert(context.clone()) {
            return Err(HostError::Capability(format!(
                "capture session already attached to {context}"
            )));
        }
        tracing::debug!(context = %context, protocol_version, "Capture session attached");
        Ok(())
    }

    async fn detach(&self, context: &ContextId) -> HostResult<()> {
        if self.registry.attached.remove(context).is_some() {
            tracing::debug!(context = %context, "Capture session detached");
        }
        Ok(())
    }

    async fn print_to_pdf(&self, context: &ContextId, options: &PrintOptions) -> HostResult<String> {
        if !self.registry.attached.contains(context) {
            return Err(HostError::Capability(format!("no capture session for {context}")));
        }
        let page = self.registry.get(context)?;

        let params = PrintToPdfParams {
            print_background: Some(options.print_background),
            margin_top: Some(options.margin_top),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            margin_right: Some(options.margin_right),
            ..Default::default()
        };

        let bytes = page
            .pdf(params)
            .await
            .map_err(|e| HostError::Capability(e.to_string()))?;
        tracing::info!(context = %context, bytes = bytes.len(), "Printed context to PDF");
        Ok(STANDARD.encode(bytes))
    }
}
