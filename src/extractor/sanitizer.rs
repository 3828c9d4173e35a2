//! Allow-list sanitization of extracted article markup.
//!
//! The policy is fixed: a standard safe-document tag and attribute list plus
//! `img`, `figure`, `figcaption` and the `src`, `alt`, `title`, `width`,
//! `height` attributes. Nothing about it is configurable per call.

use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::serialize::{ElementAction, MarkupPolicy, write_children};

/// Tags kept with their (filtered) attributes.
const SAFE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "article", "aside", "b", "bdi", "bdo", "big",
    "blockquote", "br", "caption", "center", "cite", "code", "col", "colgroup", "data", "dd",
    "del", "details", "dfn", "div", "dl", "dt", "em", "font", "footer", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hgroup", "hr", "i", "ins", "kbd", "li", "main", "mark", "nav", "ol",
    "p", "pre", "q", "rp", "rt", "ruby", "s", "samp", "section", "small", "span", "strike",
    "strong", "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time",
    "tr", "tt", "u", "ul", "var", "wbr",
];

/// Tags added on top of the safe-document list for article images.
const ADDED_TAGS: &[&str] = &["img", "figure", "figcaption"];

/// Tags removed together with everything inside them.
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "frame", "frameset", "object", "embed",
    "applet", "param", "svg", "math", "canvas", "audio", "video", "textarea", "select", "option",
    "button", "input", "title", "head", "meta", "link", "base", "noembed", "noframes", "xmp",
    "plaintext", "dialog",
];

const SAFE_ATTRIBUTES: &[&str] = &[
    "abbr", "align", "cite", "class", "colspan", "datetime", "dir", "headers", "href",
    "hreflang", "id", "lang", "rel", "reversed", "rowspan", "scope", "span", "start", "summary",
    "valign",
];

/// Attributes added on top of the safe-document list for article images.
const ADDED_ATTRIBUTES: &[&str] = &["src", "alt", "title", "width", "height"];

/// Attributes holding a URL that must be checked for a safe scheme.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const SAFE_URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps", "mailto", "tel", "callto", "sms", "cid", "xmpp"];

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.\-]*):").expect("SCHEME_RE: hardcoded regex is valid")
});

static SAFE_IMAGE_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/(?:png|gif|jpe?g|webp|avif|bmp);")
        .expect("SAFE_IMAGE_DATA_RE: hardcoded regex is valid")
});

/// Fixed safe-document policy with the image additions.
pub(crate) struct ArticlePolicy;

impl MarkupPolicy for ArticlePolicy {
    fn element_action(&self, name: &str) -> ElementAction {
        if SAFE_TAGS.contains(&name) || ADDED_TAGS.contains(&name) {
            ElementAction::Keep
        } else if DROP_WITH_CONTENT.contains(&name) {
            ElementAction::Drop
        } else {
            ElementAction::Unwrap
        }
    }

    fn keep_attribute(&self, element: &str, name: &str, value: &str) -> bool {
        let name = name.to_ascii_lowercase();

        let listed = SAFE_ATTRIBUTES.contains(&name.as_str())
            || ADDED_ATTRIBUTES.contains(&name.as_str())
            || name.starts_with("aria-");
        if !listed {
            return false;
        }

        if URL_ATTRIBUTES.contains(&name.as_str()) {
            return is_safe_url(element, &name, value);
        }

        true
    }

    fn keep_comments(&self) -> bool {
        false
    }
}

/// Check a URL attribute value against the allowed schemes.
///
/// Relative references carry no scheme and are allowed. `data:` is only
/// accepted for raster images in `img[src]`.
fn is_safe_url(element: &str, attribute: &str, value: &str) -> bool {
    // Browsers ignore embedded whitespace and control characters in schemes
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    let Some(captures) = SCHEME_RE.captures(&compact) else {
        return true;
    };
    let scheme = captures[1].to_ascii_lowercase();

    if scheme == "data" {
        return element == "img" && attribute == "src" && SAFE_IMAGE_DATA_RE.is_match(&compact.to_ascii_lowercase());
    }

    SAFE_URL_SCHEMES.contains(&scheme.as_str())
}

/// Sanitize an HTML fragment against the article policy.
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut output = String::with_capacity(html.len());
    write_children(&fragment.root_element(), &HashSet::new(), &ArticlePolicy, &mut output);
    output
}
