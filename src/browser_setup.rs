//! Locating, launching and shutting down the Chromium that backs the host.

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use crate::utils::CHROME_USER_AGENT;

/// Installation paths probed before falling back to `which`.
fn candidate_paths() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let mut roots: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|var| std::env::var_os(var).map(PathBuf::from))
            .collect();
        roots.push(PathBuf::from(r"C:\Program Files"));

        roots
            .into_iter()
            .flat_map(|root| {
                [
                    root.join(r"Google\Chrome\Application\chrome.exe"),
                    root.join(r"Chromium\Application\chrome.exe"),
                ]
            })
            .collect()
    } else if cfg!(target_os = "macos") {
        let mut paths: Vec<PathBuf> = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
            paths.push(home.join("Applications/Chromium.app/Contents/MacOS/Chromium"));
        }
        paths
    } else {
        [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

/// Find a Chrome/Chromium executable.
///
/// `CHROMIUM_PATH` wins when it points at an existing file.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("CHROMIUM_PATH").map(PathBuf::from) {
        if path.exists() {
            info!(path = %path.display(), "Using browser from CHROMIUM_PATH");
            return Ok(path);
        }
        warn!(path = %path.display(), "CHROMIUM_PATH points to a missing file");
    }

    if let Some(path) = candidate_paths().into_iter().find(|path| path.exists()) {
        info!(path = %path.display(), "Found browser");
        return Ok(path);
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!(path = %found, "Found browser on PATH");
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a Chromium build into the user cache and return its executable.
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir();
            warn!(fallback = %fallback.display(), "No user cache directory, using temp dir");
            fallback
        })
        .join("readclip")
        .join("chromium");

    tokio::fs::create_dir_all(&cache_dir)
        .await
        .context("Failed to create browser cache directory")?;

    info!(dir = %cache_dir.display(), "Downloading managed Chromium");
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch browser")?;

    info!(dir = %revision.folder_path.display(), "Downloaded Chromium");
    Ok(revision.executable_path)
}

/// A launched browser with its CDP event loop and profile directory.
pub struct LaunchedBrowser {
    browser: Option<Arc<Browser>>,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl LaunchedBrowser {
    /// Shared handle to the browser.
    ///
    /// # Errors
    /// Fails once the browser has been shut down.
    pub fn browser(&self) -> Result<Arc<Browser>> {
        self.browser
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| anyhow::anyhow!("Browser already shut down"))
    }

    /// Close the browser, stop its event loop and remove the profile.
    ///
    /// Every handle returned by [`Self::browser`] must be dropped first;
    /// a browser still shared is left to be killed on drop.
    pub async fn shutdown(mut self) {
        if let Some(browser) = self.browser.take() {
            match Arc::try_unwrap(browser) {
                Ok(mut browser) => {
                    if let Err(e) = browser.close().await {
                        warn!(error = %e, "Browser close failed");
                    }
                    if let Err(e) = browser.wait().await {
                        warn!(error = %e, "Waiting for browser exit failed");
                    }
                }
                Err(_) => warn!("Browser still shared at shutdown, relying on drop"),
            }
        }
        self.handler.abort();
        self.cleanup_profile();
        info!("Browser shut down");
    }

    fn cleanup_profile(&mut self) {
        if let Some(path) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&path)
        {
            warn!(path = %path.display(), error = %e, "Failed to remove browser profile");
        }
    }
}

impl Drop for LaunchedBrowser {
    fn drop(&mut self) {
        self.handler.abort();
        self.cleanup_profile();
    }
}

/// CDP errors chromiumoxide raises for events it cannot decode.
fn is_benign_handler_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

/// Find or download Chromium and launch it.
///
/// `chrome_data_dir` overrides the per-process profile directory under the
/// system temp dir and is left in place on shutdown.
pub async fn launch_browser(headless: bool, chrome_data_dir: Option<PathBuf>) -> Result<LaunchedBrowser> {
    let chrome_path = match find_browser_executable() {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "No local browser, downloading one");
            download_managed_browser().await?
        }
    };

    // A caller-supplied profile is kept; the per-process one is removed on shutdown
    let owns_profile = chrome_data_dir.is_none();
    let user_data_dir = chrome_data_dir
        .unwrap_or_else(|| std::env::temp_dir().join(format!("readclip_chrome_{}", std::process::id())));
    tokio::fs::create_dir_all(&user_data_dir)
        .await
        .context("Failed to create user data directory")?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1280, 1024)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path)
        .arg(format!("--user-agent={CHROME_USER_AGENT}"))
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut events) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;
    info!(headless, profile = %user_data_dir.display(), "Browser launched");

    let handler = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                if is_benign_handler_error(&message) {
                    trace!(error = %message, "Suppressed undecodable CDP event");
                } else {
                    error!(error = ?e, "Browser handler error");
                }
            }
        }
        info!("Browser handler task completed");
    });

    Ok(LaunchedBrowser {
        browser: Some(Arc::new(browser)),
        handler,
        user_data_dir: owns_profile.then_some(user_data_dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_decode_noise_is_benign() {
        assert!(is_benign_handler_error(
            "data did not match any variant of untagged enum Message"
        ));
        assert!(!is_benign_handler_error("connection reset"));
    }

    #[test]
    fn candidates_are_absolute() {
        assert!(candidate_paths().iter().all(|path| path.is_absolute()));
    }
}
