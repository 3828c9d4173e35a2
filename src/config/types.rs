//! Core configuration types for capture runs
//!
//! `CaptureConfig` holds everything the orchestrator and the browser host
//! need: signal timeouts, print settings, the reader surface location and
//! where artifacts end up.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::utils::{
    CAPTURE_PROTOCOL_VERSION, DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_SIGNAL_TIMEOUT_MS,
    READER_SURFACE_URI,
};

/// Upper bound accepted for any single wait, in milliseconds
const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Options for the print-to-PDF capture command
///
/// Margins are in inches, matching `Page.printToPDF`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    pub print_background: bool,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl Default for PrintOptions {
    /// Background graphics on, zero margins on every side.
    fn default() -> Self {
        Self {
            print_background: true,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            margin_right: 0.0,
        }
    }
}

/// Main configuration struct for extraction and capture runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// How long to wait for `READER_READY` from a fresh rendering context
    ///
    /// Default: 10 000 ms
    pub(crate) reader_ready_timeout_ms: u64,

    pub(crate) print: PrintOptions,

    /// DevTools protocol version requested when attaching a capture session
    pub(crate) protocol_version: String,

    /// Location rendering contexts are opened at
    pub(crate) reader_surface_uri: String,

    /// Directory the file delivery sink writes PDFs into
    pub(crate) output_dir: PathBuf,

    pub(crate) headless: bool,

    /// Chrome user data directory; a temporary profile is used when unset
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Timeout in seconds for loading the source page
    ///
    /// Default: 30 seconds
    pub(crate) page_load_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            reader_ready_timeout_ms: DEFAULT_SIGNAL_TIMEOUT_MS,
            print: PrintOptions::default(),
            protocol_version: CAPTURE_PROTOCOL_VERSION.to_string(),
            reader_surface_uri: READER_SURFACE_URI.to_string(),
            output_dir: PathBuf::from("."),
            headless: true,
            chrome_data_dir: None,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
        }
    }
}

impl CaptureConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing keys keep their defaults.
    ///
    /// # Errors
    /// Fails when the file cannot be read, is not valid JSON or holds
    /// values rejected by [`CaptureConfig::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Describes the first invalid value found.
    pub fn validate(&self) -> Result<()> {
        if self.reader_ready_timeout_ms == 0 || self.reader_ready_timeout_ms > MAX_TIMEOUT_MS {
            bail!(
                "reader_ready_timeout_ms must be between 1 and {MAX_TIMEOUT_MS}, got {}",
                self.reader_ready_timeout_ms
            );
        }

        if self.page_load_timeout_secs == 0 || self.page_load_timeout_secs.saturating_mul(1000) > MAX_TIMEOUT_MS {
            bail!(
                "page_load_timeout_secs must be between 1 and {}, got {}",
                MAX_TIMEOUT_MS / 1000,
                self.page_load_timeout_secs
            );
        }

        let margins = [
            ("margin_top", self.print.margin_top),
            ("margin_bottom", self.print.margin_bottom),
            ("margin_left", self.print.margin_left),
            ("margin_right", self.print.margin_right),
        ];
        for (name, value) in margins {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative number, got {value}");
            }
        }

        if self.protocol_version.trim().is_empty() {
            bail!("protocol_version must not be empty");
        }

        Url::parse(&self.reader_surface_uri).with_context(|| {
            format!("reader_surface_uri is not an absolute URI: {}", self.reader_surface_uri)
        })?;

        Ok(())
    }
}
