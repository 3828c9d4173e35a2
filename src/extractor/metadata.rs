//! Document-level metadata: title, byline, excerpt, site name, language,
//! direction and publication time.
//!
//! Structured data (JSON-LD) wins over `<meta>` tags, which win over
//! heuristics on the visible markup.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta").expect("BUG: hardcoded CSS selector 'meta' is invalid")
});

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2").expect("BUG: hardcoded CSS selector 'h1, h2' is invalid")
});

static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1").expect("BUG: hardcoded CSS selector 'h1' is invalid")
});

static JSON_LD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("BUG: hardcoded CSS selector for JSON-LD scripts is invalid")
});

static BYLINE_CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[rel="author"], [itemprop*="author"], [class], [id]"#)
        .expect("BUG: hardcoded CSS selector for byline candidates is invalid")
});

static TIME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("time[datetime]").expect("BUG: hardcoded CSS selector 'time[datetime]' is invalid")
});

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body").expect("BUG: hardcoded CSS selector 'body' is invalid")
});

static BYLINE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)byline|author|dateline|writtenby|p-author")
        .expect("BYLINE_HINT_RE: hardcoded regex is valid")
});

/// Title separators used by sites to append their name: `Story | Site`
static TITLE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s[|\-–—\\/>»]\s").expect("TITLE_SEPARATOR_RE: hardcoded regex is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "AdvertiserContentArticle",
    "NewsArticle",
    "AnalysisNewsArticle",
    "AskPublicNewsArticle",
    "BackgroundNewsArticle",
    "OpinionNewsArticle",
    "ReportageNewsArticle",
    "ReviewNewsArticle",
    "Report",
    "SatiricalArticle",
    "ScholarlyArticle",
    "MedicalScholarlyArticle",
    "SocialMediaPosting",
    "BlogPosting",
    "LiveBlogPosting",
    "DiscussionForumPosting",
    "TechArticle",
    "APIReference",
];

/// Longest text still accepted as a byline
const MAX_BYLINE_CHARS: usize = 100;

/// Metadata gathered from the whole document before content scoring.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageMetadata {
    pub title: String,
    pub byline: String,
    pub excerpt: String,
    pub site_name: String,
    pub published_time: Option<String>,
    pub lang: String,
    pub dir: String,
}

/// Collapse runs of whitespace and trim.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

pub(crate) fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Harvest metadata from a parsed document.
pub(crate) fn harvest(document: &Html) -> PageMetadata {
    let metas = collect_meta_values(document);
    let json_ld = JsonLdArticle::find(document);

    let pick = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|key| metas.get(*key))
            .map(|value| normalize_whitespace(value))
            .find(|value| !value.is_empty())
    };

    let title = json_ld
        .title
        .clone()
        .or_else(|| pick(&["dc:title", "dcterm:title", "og:title", "weibo:article:title", "weibo:webpage:title", "title", "twitter:title"]))
        .unwrap_or_else(|| document_title(document));

    let byline = json_ld
        .byline
        .clone()
        .or_else(|| pick(&["dc:creator", "dcterm:creator", "author", "article:author"]))
        .filter(|byline| !byline.starts_with("http"))
        .or_else(|| byline_from_markup(document))
        .unwrap_or_default();

    let excerpt = json_ld
        .excerpt
        .clone()
        .or_else(|| pick(&["dc:description", "dcterm:description", "og:description", "weibo:article:description", "weibo:webpage:description", "description", "twitter:description"]))
        .unwrap_or_default();

    let site_name = json_ld
        .site_name
        .clone()
        .or_else(|| pick(&["og:site_name", "application-name"]))
        .unwrap_or_default();

    let published_time = json_ld
        .date_published
        .clone()
        .or_else(|| pick(&["article:published_time", "parsely-pub-date", "date"]))
        .or_else(|| {
            document
                .select(&TIME_SELECTOR)
                .next()
                .and_then(|time| time.value().attr("datetime"))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        });

    let root = document.root_element();
    let lang = root.value().attr("lang").map(str::trim).unwrap_or_default().to_string();
    let dir = root
        .value()
        .attr("dir")
        .or_else(|| {
            document
                .select(&BODY_SELECTOR)
                .next()
                .and_then(|body| body.value().attr("dir"))
        })
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    PageMetadata {
        title,
        byline,
        excerpt,
        site_name,
        published_time,
        lang,
        dir,
    }
}

/// Map every `<meta>` name/property (lowercased) to its content.
///
/// The first occurrence of a key wins.
fn collect_meta_values(document: &Html) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for meta in document.select(&META_SELECTOR) {
        let Some(content) = meta.value().attr("content") else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }

        // property may hold several space-separated names ("og:title twitter:title")
        if let Some(property) = meta.value().attr("property") {
            for name in property.split_whitespace() {
                values
                    .entry(name.to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }

        if let Some(name) = meta.value().attr("name").or_else(|| meta.value().attr("itemprop")) {
            let key = name.trim().to_ascii_lowercase().replace('.', ":");
            values.entry(key).or_insert_with(|| content.to_string());
        }
    }

    values
}

/// Title from `<title>`, stripped of the site name suffix where that is safe.
fn document_title(document: &Html) -> String {
    let original = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| element_text(&title))
        .unwrap_or_default();

    let mut title = original.clone();
    let mut had_separator = false;

    if let Some(last) = TITLE_SEPARATOR_RE.find_iter(&original).last() {
        had_separator = true;
        title = original[..last.start()].trim().to_string();

        // "Site | Story" layout: the leading part was the site name
        if word_count(&title) < 3
            && let Some(first) = TITLE_SEPARATOR_RE.find(&original)
        {
            title = original[first.end()..].trim().to_string();
        }
    } else if original.contains(": ") {
        let matches_heading = document
            .select(&HEADING_SELECTOR)
            .any(|heading| element_text(&heading) == original);

        if !matches_heading
            && let Some((_, tail)) = original.rsplit_once(':')
        {
            title = tail.trim().to_string();
            if word_count(&title) < 3
                && let Some((_, rest)) = original.split_once(':')
            {
                title = rest.trim().to_string();
            }
        }
    } else if original.chars().count() > 150 || original.chars().count() < 15 {
        let mut headings = document.select(&H1_SELECTOR);
        if let (Some(only), None) = (headings.next(), headings.next()) {
            let heading = element_text(&only);
            if !heading.is_empty() {
                title = heading;
            }
        }
    }

    // A very short result is only trusted when it is the separator split
    let title_words = word_count(&title);
    let original_words = word_count(&TITLE_SEPARATOR_RE.replace_all(&original, " "));
    if title_words <= 4 && (!had_separator || title_words != original_words.saturating_sub(1)) {
        title = original;
    }

    title
}

/// Byline from markup hints such as `rel="author"` or a `.byline` element.
fn byline_from_markup(document: &Html) -> Option<String> {
    document
        .select(&BYLINE_CANDIDATE_SELECTOR)
        .filter(|element| {
            let value = element.value();
            value.attr("rel") == Some("author")
                || value.attr("itemprop").is_some_and(|prop| prop.contains("author"))
                || BYLINE_HINT_RE.is_match(&format!(
                    "{} {}",
                    value.attr("class").unwrap_or_default(),
                    value.attr("id").unwrap_or_default()
                ))
        })
        .map(|element| element_text(&element))
        .find(|text| !text.is_empty() && text.chars().count() < MAX_BYLINE_CHARS)
}

/// Article fields found in JSON-LD structured data.
#[derive(Debug, Default)]
struct JsonLdArticle {
    title: Option<String>,
    byline: Option<String>,
    excerpt: Option<String>,
    site_name: Option<String>,
    date_published: Option<String>,
}

impl JsonLdArticle {
    fn find(document: &Html) -> Self {
        document
            .select(&JSON_LD_SELECTOR)
            .filter_map(|script| {
                let raw = script.text().collect::<String>();
                // Some sites wrap the payload in CDATA markers
                let cleaned = raw
                    .trim()
                    .trim_start_matches("<![CDATA[")
                    .trim_end_matches("]]>")
                    .trim()
                    .to_string();
                serde_json::from_str::<Value>(&cleaned).ok()
            })
            .find_map(|value| article_node(&value).map(Self::from_node))
            .unwrap_or_default()
    }

    fn from_node(node: &Value) -> Self {
        let text = |key: &str| {
            node.get(key)
                .and_then(Value::as_str)
                .map(normalize_whitespace)
                .filter(|value| !value.is_empty())
        };

        let title = text("headline").or_else(|| text("name"));

        let byline = node.get("author").and_then(|author| match author {
            Value::String(name) => Some(normalize_whitespace(name)),
            Value::Object(_) => author.get("name").and_then(Value::as_str).map(normalize_whitespace),
            Value::Array(authors) => {
                let names: Vec<String> = authors
                    .iter()
                    .filter_map(|a| a.get("name").and_then(Value::as_str).or_else(|| a.as_str()))
                    .map(normalize_whitespace)
                    .filter(|name| !name.is_empty())
                    .collect();
                (!names.is_empty()).then(|| names.join(", "))
            }
            _ => None,
        });

        let site_name = node
            .get("publisher")
            .and_then(|publisher| publisher.get("name"))
            .and_then(Value::as_str)
            .map(normalize_whitespace)
            .filter(|name| !name.is_empty());

        Self {
            title,
            byline: byline.filter(|b| !b.is_empty()),
            excerpt: text("description"),
            site_name,
            date_published: text("datePublished"),
        }
    }
}

/// Find the first node typed as an article in a JSON-LD value.
fn article_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(article_node),
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph")
                && let Some(node) = article_node(graph)
            {
                return Some(node);
            }
            let is_article = match map.get("@type") {
                Some(Value::String(kind)) => ARTICLE_TYPES.contains(&kind.as_str()),
                Some(Value::Array(kinds)) => kinds
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|kind| ARTICLE_TYPES.contains(&kind)),
                _ => false,
            };
            is_article.then_some(value)
        }
        _ => None,
    }
}
