//! Absolute URL rewriting for images and anchors.
//!
//! Runs over the document copy before any parsing so that every later stage
//! (scoring, sanitizing, rendering in a different origin) sees absolute
//! references.

use lol_html::{HtmlRewriter, Settings, element};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use super::ExtractError;
use crate::utils::resolve_against;

static BASE_HREF_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("base[href]").expect("BUG: hardcoded CSS selector 'base[href]' is invalid")
});

/// Determine the effective base URI of a document.
///
/// A `<base href>` wins when it resolves (against `fallback` when relative);
/// otherwise `fallback` is used as is.
pub(crate) fn effective_base(document: &Html, fallback: Option<&Url>) -> Option<Url> {
    let declared = document
        .select(&BASE_HREF_SELECTOR)
        .next()
        .and_then(|base| base.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());

    match (declared, fallback) {
        (Some(href), Some(fallback)) => fallback.join(href).ok().or_else(|| Some(fallback.clone())),
        (Some(href), None) => Url::parse(href).ok(),
        (None, fallback) => fallback.cloned(),
    }
}

/// Rewrite `img[src]` and `a[href]` in `html` to absolute URLs against `base`.
///
/// Unresolvable values are left untouched; this never fails because of a
/// bad URL. It only fails when the rewriter itself cannot process the input.
pub(crate) fn absolutize_links(html: &str, base: &Url) -> Result<String, ExtractError> {
    let mut output = Vec::with_capacity(html.len());

    let image_base = base.clone();
    let anchor_base = base.clone();

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("img[src]", move |el| {
                    if let Some(src) = el.get_attribute("src")
                        && let Some(absolute) = resolve_against(&image_base, &src)
                    {
                        el.set_attribute("src", absolute.as_str())?;
                    }
                    Ok(())
                }),
                element!("a[href]", move |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Some(absolute) = resolve_against(&anchor_base, &href)
                    {
                        el.set_attribute("href", absolute.as_str())?;
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ExtractError::Rewrite(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| ExtractError::Rewrite(e.to_string()))?;

    String::from_utf8(output).map_err(|e| ExtractError::Rewrite(format!("invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_images_and_anchors() {
        let base = Url::parse("https://example.com/posts/1/").unwrap();
        let html = r#"<p><a href="../2/">next</a><img src="pic.png"></p>"#;
        let out = absolutize_links(html, &base).unwrap();
        assert!(out.contains(r#"href="https://example.com/posts/2/""#));
        assert!(out.contains(r#"src="https://example.com/posts/1/pic.png""#));
    }

    #[test]
    fn keeps_unresolvable_values() {
        let base = Url::parse("https://example.com/").unwrap();
        let html = r#"<a href="http://[bad">x</a><a href="javascript:void(0)">y</a>"#;
        let out = absolutize_links(html, &base).unwrap();
        assert!(out.contains(r#"href="http://[bad""#));
        assert!(out.contains(r#"href="javascript:void(0)""#));
    }

    #[test]
    fn base_element_overrides_document_url() {
        let doc = Html::parse_document(
            r#"<html><head><base href="/static/"></head><body></body></html>"#,
        );
        let fallback = Url::parse("https://example.com/a/b").unwrap();
        let base = effective_base(&doc, Some(&fallback)).unwrap();
        assert_eq!(base.as_str(), "https://example.com/static/");
    }
}
