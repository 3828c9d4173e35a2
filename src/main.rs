//! `readclip` command line: open a page in Chromium, clip its article and
//! save it as a PDF.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use readclip::host::{ChromeHost, ConsoleNotifier, ContextHost, FileDeliverySink, MemoryStore, SharedState};
use readclip::{
    CaptureConfig, CaptureConfigBuilder, CaptureOrchestrator, ContextId, Coordinator, HostServices,
    Messenger, launch_browser,
};

#[derive(Parser, Debug)]
#[command(name = "readclip", version, about = "Save the readable part of a web page as a PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory PDFs are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// How long to wait for the reader to render, in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// JSON file with configuration overrides
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and print through a visible reader
    Save { url: String },
    /// Print the extracted article as JSON
    Extract { url: String },
    /// Extract, then print through a background reader
    Capture { url: String },
}

impl Command {
    fn url(&self) -> &str {
        match self {
            Self::Save { url } | Self::Extract { url } | Self::Capture { url } => url,
        }
    }
}

fn load_config(cli: &Cli) -> Result<CaptureConfig> {
    let base = match &cli.config {
        Some(path) => CaptureConfig::from_json_file(path)?,
        None => CaptureConfig::default(),
    };

    let mut builder = CaptureConfigBuilder::from(base);
    if let Some(dir) = &cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.reader_ready_timeout_ms(timeout_ms);
    }
    if cli.headed {
        builder = builder.headless(false);
    }
    builder.build()
}

async fn run(cli: Cli, config: CaptureConfig, host: Arc<ChromeHost>, coordinator: Arc<Coordinator>) -> Result<()> {
    let source: ContextId = host
        .create(cli.command.url(), true)
        .await
        .with_context(|| format!("Failed to open {}", cli.command.url()))?
        .context("Browser did not report a context for the page")?;

    let orchestrator = coordinator.orchestrator();
    let outcome: Result<()> = async {
        match &cli.command {
            Command::Extract { .. } => {
                let article = orchestrator.extract_only(&source).await?;
                println!("{}", serde_json::to_string_pretty(&article)?);
            }
            Command::Save { .. } => {
                let filename = coordinator
                    .save_as_pdf(&source)
                    .await
                    .context("Save as PDF failed")?;
                println!("{}", config.output_dir().join(filename).display());
            }
            Command::Capture { .. } => {
                let article = orchestrator.extract_only(&source).await?;
                let filename = orchestrator.capture_to_document(&article).await?;
                println!("{}", config.output_dir().join(filename).display());
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = host.close(&source).await {
        tracing::debug!(error = %e, "Source page already closed");
    }
    outcome
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("readclip=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).context("Invalid configuration")?;

    let launched = launch_browser(config.headless(), config.chrome_data_dir().cloned()).await?;

    let messenger = Messenger::new();
    let state: Arc<dyn SharedState> = Arc::new(MemoryStore::new());
    let chrome = Arc::new(ChromeHost::new(
        launched.browser()?,
        messenger.clone(),
        Arc::clone(&state),
        config.reader_surface_uri(),
        config.page_load_timeout(),
    ));

    let services = HostServices {
        scripting: chrome.clone(),
        contexts: chrome.clone(),
        state,
        capture: chrome.clone(),
        delivery: Arc::new(FileDeliverySink::new(config.output_dir())),
        notifier: Arc::new(ConsoleNotifier),
    };

    let coordinator = Coordinator::new(CaptureOrchestrator::new(services, messenger, config.clone()));
    let listener = coordinator.listen();

    let result = run(cli, config, chrome, coordinator).await;

    listener.abort();
    let _ = listener.await;
    launched.shutdown().await;
    result
}
