//! Delivery to the local filesystem and console notifications

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};

use super::{DeliverySink, HostError, HostResult, Notifier};
use crate::utils::split_base64_data_url;

/// Writes delivered artifacts into a directory.
///
/// File names are sanitized again before use; an existing file with the
/// same name is replaced.
#[derive(Debug, Clone)]
pub struct FileDeliverySink {
    output_dir: PathBuf,
}

impl FileDeliverySink {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn target_path(&self, filename: &str) -> HostResult<PathBuf> {
        let safe = sanitize_filename::sanitize(filename);
        if safe.trim().is_empty() {
            return Err(HostError::Delivery(format!("unusable file name: {filename:?}")));
        }
        Ok(self.output_dir.join(safe))
    }
}

#[async_trait]
impl DeliverySink for FileDeliverySink {
    async fn download(&self, data_url: &str, filename: &str) -> HostResult<()> {
        let (media_type, payload) = split_base64_data_url(data_url)
            .ok_or_else(|| HostError::Delivery("expected a base64 data URL".to_string()))?;

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| HostError::Delivery(format!("invalid base64 payload: {e}")))?;

        let path = self.target_path(filename)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(
            path = %path.display(),
            media_type,
            bytes = bytes.len(),
            "Saved artifact"
        );
        Ok(())
    }
}

/// Surfaces notifications on stderr and in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, message: &str) {
        tracing::error!(title, message, "Notification");
        eprintln!("{title}: {message}");
    }
}
