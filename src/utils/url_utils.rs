//! URL helpers shared by the extractor, the agents and the host.

use url::Url;

use super::constants::RESTRICTED_SCHEMES;

/// Resolve `value` against `base`, returning `None` when it cannot be resolved.
///
/// Values that are not navigable references (`javascript:`, `mailto:`,
/// `tel:`, `data:` and fragment-only links) are never rewritten.
#[must_use]
pub fn resolve_against(base: &Url, value: &str) -> Option<Url> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let lowered = trimmed.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    base.join(trimmed).ok()
}

/// Check whether `url` parses as an absolute URL
#[must_use]
pub fn is_absolute_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Check whether a page at `url` is a surface the host refuses to script.
///
/// `about:blank` is scriptable; every other `about:` page is not.
#[must_use]
pub fn is_restricted_surface(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    match parsed.scheme() {
        "about" => parsed.path() != "blank",
        scheme => RESTRICTED_SCHEMES.contains(&scheme),
    }
}

/// Build the data URL handed to a delivery sink.
#[must_use]
pub fn pdf_data_url(data_base64: &str) -> String {
    format!("data:{};base64,{data_base64}", super::constants::PDF_MIME_TYPE)
}

/// Split a `data:` URL into its media type and base64 payload.
///
/// Returns `None` for anything that is not a base64 data URL.
#[must_use]
pub fn split_base64_data_url(data_url: &str) -> Option<(&str, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some((media_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths() {
        let base = Url::parse("https://example.com/blog/post.html").unwrap();
        let resolved = resolve_against(&base, "../img/a.png").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/img/a.png");
    }

    #[test]
    fn leaves_special_schemes_alone() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_against(&base, "javascript:alert(1)").is_none());
        assert!(resolve_against(&base, "#section").is_none());
        assert!(resolve_against(&base, "mailto:a@b.c").is_none());
    }

    #[test]
    fn restricted_surfaces() {
        assert!(is_restricted_surface("chrome://settings"));
        assert!(is_restricted_surface("chrome-extension://abc/index.html"));
        assert!(is_restricted_surface("about:newtab"));
        assert!(!is_restricted_surface("about:blank"));
        assert!(!is_restricted_surface("https://example.com"));
    }

    #[test]
    fn data_url_round_trip() {
        let url = pdf_data_url("JVBERi0=");
        assert_eq!(
            split_base64_data_url(&url),
            Some(("application/pdf", "JVBERi0="))
        );
        assert_eq!(split_base64_data_url("https://example.com"), None);
    }
}
