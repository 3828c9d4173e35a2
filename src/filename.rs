//! Deterministic PDF file names from article metadata.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::extractor::Article;
use crate::utils::{FILENAME_SITE_MAX_CHARS, FILENAME_TITLE_MAX_CHARS};

/// Anything outside ASCII alphanumerics, CJK unified ideographs, Hiragana and Katakana
static DISALLOWED_CHAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9\x{4e00}-\x{9fff}\x{3040}-\x{309f}\x{30a0}-\x{30ff}]")
        .expect("DISALLOWED_CHAR_RE: hardcoded regex is valid")
});

static UNDERSCORE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("UNDERSCORE_RUN_RE: hardcoded regex is valid"));

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Sanitize one name component and cap it at `max_chars` characters.
fn sanitize_part(value: &str, max_chars: usize) -> String {
    let replaced = DISALLOWED_CHAR_RE.replace_all(value, "_");
    let collapsed = UNDERSCORE_RUN_RE.replace_all(&replaced, "_");
    let truncated: String = collapsed.trim_matches('_').chars().take(max_chars).collect();
    truncated.trim_matches('_').to_string()
}

/// Filename for `article` stamped with the current time.
#[must_use]
pub fn synthesize(article: &Article) -> String {
    synthesize_at(article, Utc::now())
}

/// Filename for `article` stamped with `instant`.
///
/// `<title>_<site>_<YYYY-MM-DDTHH-MM-SS>.pdf`, leaving out empty parts.
#[must_use]
pub fn synthesize_at(article: &Article, instant: DateTime<Utc>) -> String {
    let title = sanitize_part(&article.title, FILENAME_TITLE_MAX_CHARS);
    let site = sanitize_part(&article.site_name, FILENAME_SITE_MAX_CHARS);
    let timestamp = instant.format(TIMESTAMP_FORMAT).to_string();

    let stem = [title.as_str(), site.as_str(), timestamp.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    format!("{stem}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation() {
        assert_eq!(sanitize_part("Hello, World!", 80), "Hello_World");
        assert_eq!(sanitize_part("  --a--b--  ", 80), "a_b");
    }

    #[test]
    fn keeps_cjk_and_kana() {
        assert_eq!(sanitize_part("東京 ニュース、ひらがな", 80), "東京_ニュース_ひらがな");
    }

    #[test]
    fn trims_after_truncation() {
        assert_eq!(sanitize_part("abcd efgh", 5), "abcd");
        assert_eq!(sanitize_part(&"x".repeat(100), 80).chars().count(), 80);
    }

    #[test]
    fn drops_accented_letters() {
        assert_eq!(sanitize_part("Café Noël", 80), "Caf_No_l");
    }
}
