//! Recording fakes for the host capabilities, shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use readclip::agents::{DocumentSnapshot, ExtractionAgent, ReaderSurface, RenderTarget};
use readclip::config::PrintOptions;
use readclip::host::{
    CaptureBackend, ContextHost, DeliverySink, HostError, HostResult, HostServices, MemoryStore, Notifier,
    ScriptingHost, SharedState,
};
use readclip::messaging::{ContextId, Messenger, PdfDownload};
use readclip::{CaptureConfig, CaptureOrchestrator};

pub const FAKE_PDF: &[u8] = b"%PDF-1.4 fake";

/// Creates a test HTML document with specified content
pub fn create_test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{}</title>
</head>
<body>
    {}
</body>
</html>"#,
        html_escape::encode_text(title),
        body
    )
}

/// A page with one clear article and some boilerplate around it.
pub fn create_article_html() -> String {
    create_test_html(
        "Main Title",
        r#"<nav><a href="/">Home</a> <a href="/about">About</a></nav>
        <article class="post-content">
            <h1>Main Title</h1>
            <p>The first paragraph of the story has enough words in it, with commas, to count as content.</p>
            <p>A second paragraph keeps going, adding detail, context and another <a href="/ref">reference</a>.</p>
            <p>The final paragraph closes the story with a sentence or two more of real prose.</p>
        </article>
        <footer>Copyright notice</footer>"#,
    )
}

/// Render target that records what the reader did.
#[derive(Clone, Default)]
pub struct RecordingTarget {
    pub pages: Arc<Mutex<Vec<String>>>,
    pub downloads: Arc<Mutex<Vec<PdfDownload>>>,
    pub fail_render: Arc<AtomicBool>,
}

#[async_trait]
impl RenderTarget for RecordingTarget {
    async fn render(&self, html: &str) -> HostResult<()> {
        if self.fail_render.load(Ordering::SeqCst) {
            return Err(HostError::Browser("render refused".into()));
        }
        self.pages.lock().push(html.to_string());
        Ok(())
    }

    async fn offer_download(&self, download: &PdfDownload) -> HostResult<()> {
        self.downloads.lock().push(download.clone());
        Ok(())
    }
}

/// Context host that starts a reader surface for the reader URI.
pub struct FakeContexts {
    messenger: Messenger,
    state: Arc<dyn SharedState>,
    reader_uri: String,
    next_id: AtomicUsize,
    open: Mutex<HashSet<ContextId>>,
    unstarted: Mutex<HashSet<ContextId>>,
    pub target: RecordingTarget,
    pub created: Mutex<Vec<(String, bool)>>,
    pub closed: AtomicUsize,
    pub fail_create: AtomicBool,
    pub create_nothing: AtomicBool,
    pub fail_close: AtomicBool,
    pub fail_start: AtomicBool,
}

impl FakeContexts {
    pub fn new(messenger: Messenger, state: Arc<dyn SharedState>, reader_uri: &str) -> Self {
        Self {
            messenger,
            state,
            reader_uri: reader_uri.to_string(),
            next_id: AtomicUsize::new(1),
            open: Mutex::new(HashSet::new()),
            unstarted: Mutex::new(HashSet::new()),
            target: RecordingTarget::default(),
            created: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            create_nothing: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.lock().len()
    }
}

#[async_trait]
impl ContextHost for FakeContexts {
    async fn create(&self, url: &str, active: bool) -> HostResult<Option<ContextId>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(HostError::Browser("window limit reached".into()));
        }
        self.created.lock().push((url.to_string(), active));
        if self.create_nothing.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let context = ContextId::new(format!("ctx-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.open.lock().insert(context.clone());

        if url == self.reader_uri {
            self.unstarted.lock().insert(context.clone());
        }
        Ok(Some(context))
    }

    async fn start(&self, context: &ContextId) -> HostResult<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(HostError::Browser("reader page crashed".into()));
        }
        if !self.open.lock().contains(context) {
            return Err(HostError::ContextNotFound(context.clone()));
        }
        if self.unstarted.lock().remove(context) {
            let target = self.target.clone();
            let messenger = self.messenger.clone();
            let state = Arc::clone(&self.state);
            let reader = context.clone();
            tokio::spawn(async move {
                ReaderSurface::launch(reader, target, messenger, state).await;
            });
        }
        Ok(())
    }

    async fn exists(&self, context: &ContextId) -> bool {
        self.open.lock().contains(context)
    }

    async fn close(&self, context: &ContextId) -> HostResult<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(HostError::Browser("close rejected".into()));
        }
        if !self.open.lock().remove(context) {
            return Err(HostError::ContextNotFound(context.clone()));
        }
        self.messenger.unregister(context);
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Capture backend counting attach and detach calls.
#[derive(Default)]
pub struct RecordingCapture {
    pub attached: AtomicUsize,
    pub detached: AtomicUsize,
    pub printed: Mutex<Vec<PrintOptions>>,
    pub fail_attach: AtomicBool,
    pub fail_print: AtomicBool,
    /// Printing never completes
    pub stall_print: AtomicBool,
}

impl RecordingCapture {
    pub fn attach_count(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureBackend for RecordingCapture {
    async fn attach(&self, _context: &ContextId, _protocol_version: &str) -> HostResult<()> {
        self.attached.fetch_add(1, Ordering::SeqCst);
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(HostError::Capability("debugger attach denied".into()));
        }
        Ok(())
    }

    async fn detach(&self, _context: &ContextId) -> HostResult<()> {
        self.detached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn print_to_pdf(&self, _context: &ContextId, options: &PrintOptions) -> HostResult<String> {
        if self.stall_print.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_print.load(Ordering::SeqCst) {
            return Err(HostError::Capability("Page.printToPDF failed".into()));
        }
        self.printed.lock().push(options.clone());
        Ok(STANDARD.encode(FAKE_PDF))
    }
}

#[derive(Default)]
pub struct RecordingDelivery {
    pub downloads: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl DeliverySink for RecordingDelivery {
    async fn download(&self, data_url: &str, filename: &str) -> HostResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HostError::Delivery("downloads blocked".into()));
        }
        self.downloads
            .lock()
            .push((data_url.to_string(), filename.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, message: &str) {
        self.notifications
            .lock()
            .push((title.to_string(), message.to_string()));
    }
}

/// Scripting host over a fixed set of page snapshots.
pub struct FakeScripting {
    messenger: Messenger,
    pages: Mutex<HashMap<ContextId, DocumentSnapshot>>,
    restricted: Mutex<HashSet<ContextId>>,
    pub injections: AtomicUsize,
}

impl FakeScripting {
    pub fn new(messenger: Messenger) -> Self {
        Self {
            messenger,
            pages: Mutex::new(HashMap::new()),
            restricted: Mutex::new(HashSet::new()),
            injections: AtomicUsize::new(0),
        }
    }

    pub fn add_page(&self, id: &str, html: &str, url: &str) -> ContextId {
        let context = ContextId::new(id);
        self.pages.lock().insert(
            context.clone(),
            DocumentSnapshot {
                html: html.to_string(),
                base_uri: Some(url.to_string()),
                url: Some(url.to_string()),
            },
        );
        context
    }

    pub fn add_restricted(&self, id: &str) -> ContextId {
        let context = ContextId::new(id);
        self.restricted.lock().insert(context.clone());
        context
    }
}

#[async_trait]
impl ScriptingHost for FakeScripting {
    async fn inject_agent(&self, context: &ContextId) -> HostResult<()> {
        if self.restricted.lock().contains(context) {
            return Err(HostError::RestrictedSurface("chrome://settings".into()));
        }
        if self.messenger.has_handler(context) {
            return Err(HostError::AgentAlreadyPresent(context.clone()));
        }
        let snapshot = self
            .pages
            .lock()
            .get(context)
            .cloned()
            .ok_or_else(|| HostError::ContextNotFound(context.clone()))?;

        self.injections.fetch_add(1, Ordering::SeqCst);
        self.messenger
            .register(context.clone(), Arc::new(ExtractionAgent::new(snapshot)));
        Ok(())
    }
}

/// All fakes wired to one messenger.
pub struct TestHost {
    pub messenger: Messenger,
    pub state: Arc<MemoryStore>,
    pub scripting: Arc<FakeScripting>,
    pub contexts: Arc<FakeContexts>,
    pub capture: Arc<RecordingCapture>,
    pub delivery: Arc<RecordingDelivery>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHost {
    pub fn new(config: &CaptureConfig) -> Self {
        let messenger = Messenger::new();
        let state = Arc::new(MemoryStore::new());
        let contexts = Arc::new(FakeContexts::new(
            messenger.clone(),
            state.clone(),
            config.reader_surface_uri(),
        ));

        Self {
            scripting: Arc::new(FakeScripting::new(messenger.clone())),
            messenger,
            state,
            contexts,
            capture: Arc::new(RecordingCapture::default()),
            delivery: Arc::new(RecordingDelivery::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn services(&self) -> HostServices {
        HostServices {
            scripting: self.scripting.clone(),
            contexts: self.contexts.clone(),
            state: self.state.clone(),
            capture: self.capture.clone(),
            delivery: self.delivery.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn orchestrator(&self, config: CaptureConfig) -> CaptureOrchestrator {
        CaptureOrchestrator::new(self.services(), self.messenger.clone(), config)
    }

    pub async fn stored_article(&self) -> Option<Value> {
        self.state
            .get(readclip::utils::CURRENT_ARTICLE_KEY)
            .await
            .ok()
            .flatten()
    }
}

pub fn test_config() -> CaptureConfig {
    CaptureConfig::builder()
        .reader_ready_timeout_ms(2_000)
        .build()
        .expect("test config is valid")
}
