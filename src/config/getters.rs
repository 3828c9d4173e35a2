//! Accessors for `CaptureConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{CaptureConfig, PrintOptions};

impl CaptureConfig {
    #[must_use]
    pub fn reader_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.reader_ready_timeout_ms)
    }

    #[must_use]
    pub fn print_options(&self) -> &PrintOptions {
        &self.print
    }

    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    #[must_use]
    pub fn reader_surface_uri(&self) -> &str {
        &self.reader_surface_uri
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}
