//! Shared constants for readclip
//!
//! Default values and wire-level names used throughout the codebase to keep
//! the coordinator, the agents and the CLI in agreement.

/// Shared-state key holding the article of the run in flight.
///
/// A single well-known slot: the run that wrote it owns it until the run
/// clears it. Concurrent runs overwrite each other (last writer wins).
pub const CURRENT_ARTICLE_KEY: &str = "currentArticle";

/// URI of the static reader surface a rendering context is opened at.
///
/// The host recognizes this URI and binds a `ReaderSurface` agent to the
/// new context instead of navigating anywhere.
pub const READER_SURFACE_URI: &str = "readclip://reader/index.html";

/// Default bound for a signal wait: 10 seconds
pub const DEFAULT_SIGNAL_TIMEOUT_MS: u64 = 10_000;

/// Default timeout for loading the source page opened by the CLI
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Protocol version requested when attaching a capture session
pub const CAPTURE_PROTOCOL_VERSION: &str = "1.3";

/// Maximum characters of the sanitized title in a file name
pub const FILENAME_TITLE_MAX_CHARS: usize = 80;

/// Maximum characters of the sanitized site name in a file name
pub const FILENAME_SITE_MAX_CHARS: usize = 30;

/// Title of the notification raised when the immediate workflow fails
pub const SAVE_FAILED_TITLE: &str = "Save as PDF Failed";

/// Reply text when the agent ran but found nothing to extract
pub const NO_CONTENT_MESSAGE: &str = "Could not extract content";

/// Fallback reason when an extraction reply carries no error text
pub const EXTRACTION_FAILED_MESSAGE: &str = "Failed to extract content";

/// MIME type of the produced artifact
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// URL schemes the host forbids scripting into
///
/// Pages under these schemes are browser-internal or other extensions'
/// surfaces; injecting the extraction agent there is refused.
pub const RESTRICTED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "chrome-untrusted",
    "devtools",
    "edge",
    "brave",
    "view-source",
    "readclip",
];

/// Chrome user agent string used when launching the browser
///
/// Kept in step with Chrome stable; sites serve their regular article markup
/// to it instead of a degraded "unsupported browser" page.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
