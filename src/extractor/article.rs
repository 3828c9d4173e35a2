use serde::{Deserialize, Serialize};

/// Normalized, sanitized representation of a page's readable content.
///
/// Serialized with camelCase keys; this is the shape stored under
/// `currentArticle` and carried by `RENDER_ARTICLE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    /// Sanitized markup, restricted to the fixed allow-list
    pub content: String,
    pub text_content: String,
    /// Length of `text_content` in characters
    pub length: usize,
    pub excerpt: String,
    pub byline: String,
    /// Text direction (`ltr`, `rtl` or empty)
    pub dir: String,
    pub site_name: String,
    pub lang: String,
    #[serde(default)]
    pub published_time: Option<String>,
    /// Source page, always absolute when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
