//! Fluent builder for `CaptureConfig`
//!
//! Every setter is optional; `build()` validates the combined result.

use anyhow::Result;
use std::path::PathBuf;

use super::types::{CaptureConfig, PrintOptions};

#[derive(Debug, Clone, Default)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfig {
    /// Create a builder for configuring a `CaptureConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }
}

/// Start from an existing configuration, e.g. one loaded from a file.
impl From<CaptureConfig> for CaptureConfigBuilder {
    fn from(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl CaptureConfigBuilder {
    #[must_use]
    pub fn reader_ready_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.reader_ready_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn print_options(mut self, print: PrintOptions) -> Self {
        self.config.print = print;
        self
    }

    #[must_use]
    pub fn print_background(mut self, enabled: bool) -> Self {
        self.config.print.print_background = enabled;
        self
    }

    /// Set all four page margins (inches) at once
    #[must_use]
    pub fn margins(mut self, inches: f64) -> Self {
        self.config.print.margin_top = inches;
        self.config.print.margin_bottom = inches;
        self.config.print.margin_left = inches;
        self.config.print.margin_right = inches;
        self
    }

    #[must_use]
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.config.protocol_version = version.into();
        self
    }

    #[must_use]
    pub fn reader_surface_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.reader_surface_uri = uri.into();
        self
    }

    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.chrome_data_dir = dir;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_load_timeout_secs = secs;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Example
    /// ```rust
    /// # use readclip::config::CaptureConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = CaptureConfig::builder()
    ///     .output_dir("./pdfs")
    ///     .reader_ready_timeout_ms(5_000)
    ///     .build()?;
    /// assert_eq!(config.reader_ready_timeout().as_millis(), 5_000);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns the validation failure, see [`CaptureConfig::validate`].
    pub fn build(self) -> Result<CaptureConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
