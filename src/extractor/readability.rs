//! Main-content detection.
//!
//! Boilerplate is excluded by node id (the parsed tree stays untouched),
//! paragraph-like nodes are scored and the scores flow to their parent and
//! grandparent. The best-scoring container plus its qualifying siblings
//! becomes the article body.

use ego_tree::NodeId;
use regex::Regex;
use scraper::node::{Element, Node};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::metadata::normalize_whitespace;
use super::serialize::{Passthrough, write_children, write_element};

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body").expect("BUG: hardcoded CSS selector 'body' is invalid")
});

static UNLIKELY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|\bads?\b|advert|ai2html|banner|breadcrumbs|combx|comment|community|cookie|cover-wrap|disqus|extra|gdpr|legends|menu|newsletter|pager|pagination|popup|promo|related|remark|replies|rss|share|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|yom-remote",
    )
    .expect("UNLIKELY_RE: hardcoded regex is valid")
});

static MAYBE_CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)and|article|body|column|content|main|shadow")
        .expect("MAYBE_CANDIDATE_RE: hardcoded regex is valid")
});

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story")
        .expect("POSITIVE_RE: hardcoded regex is valid")
});

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget",
    )
    .expect("NEGATIVE_RE: hardcoded regex is valid")
});

static HIDDEN_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden")
        .expect("HIDDEN_STYLE_RE: hardcoded regex is valid")
});

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.( |$)").expect("SENTENCE_END_RE: hardcoded regex is valid")
});

/// Elements that never carry article content.
const ALWAYS_EXCLUDED: &[&str] = &[
    "script", "style", "noscript", "template", "link", "meta", "form", "input", "button",
    "select", "textarea", "iframe", "frame", "object", "embed", "nav", "header", "footer",
    "aside", "dialog",
];

const UNLIKELY_ROLES: &[&str] = &[
    "menu", "menubar", "complementary", "navigation", "alert", "alertdialog", "dialog",
];

/// Tags scored as paragraphs on their own.
const SCORED_TAGS: &[&str] = &["p", "pre", "td", "section", "h2", "h3", "h4", "h5", "h6"];

/// Children that stop a `div` from counting as a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul", "select",
];

/// Containers removed from the chosen content when they are mostly links.
const LINK_LIST_TAGS: &[&str] = &["div", "section", "ul", "ol", "table"];

/// Paragraphs shorter than this are ignored while scoring
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Floor for the sibling inclusion threshold
const MIN_SIBLING_SCORE: f64 = 10.0;

/// Link-list containers longer than this are kept regardless of link density
const LINK_LIST_MAX_CHARS: usize = 200;

/// The chosen article body, serialized with boilerplate removed.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReadableContent {
    /// Unsanitized markup of the selected nodes
    pub html: String,
    /// First `dir` attribute found on the top candidate or its ancestors
    pub dir: Option<String>,
}

/// Visible text of a subtree plus the part of it that sits inside links.
struct TextStats {
    text: String,
    link_text: String,
}

impl TextStats {
    fn collect(element: ElementRef<'_>, excluded: &HashSet<NodeId>) -> Self {
        let mut text = String::new();
        let mut link_text = String::new();

        let mut stack: Vec<_> = element
            .children()
            .rev()
            .map(|child| (child, element.value().name() == "a"))
            .collect();

        while let Some((node, in_link)) = stack.pop() {
            if excluded.contains(&node.id()) {
                continue;
            }
            match node.value() {
                Node::Text(chunk) => {
                    text.push_str(chunk);
                    if in_link {
                        link_text.push_str(chunk);
                    }
                }
                Node::Element(child) => {
                    let in_link = in_link || child.name() == "a";
                    stack.extend(node.children().rev().map(|grandchild| (grandchild, in_link)));
                }
                _ => {}
            }
        }

        Self {
            text: normalize_whitespace(&text),
            link_text: normalize_whitespace(&link_text),
        }
    }

    fn chars(&self) -> usize {
        self.text.chars().count()
    }

    fn commas(&self) -> usize {
        self.text.chars().filter(|c| matches!(c, ',' | '，' | '、')).count()
    }

    fn link_density(&self) -> f64 {
        let total = self.chars();
        if total == 0 {
            return 0.0;
        }
        self.link_text.chars().count() as f64 / total as f64
    }
}

fn child_elements(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap).collect()
}

fn class_and_id(element: &Element) -> String {
    format!(
        "{} {}",
        element.attr("class").unwrap_or_default(),
        element.attr("id").unwrap_or_default()
    )
}

fn is_unlikely(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    let name = value.name();

    if ALWAYS_EXCLUDED.contains(&name) {
        return true;
    }

    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }

    if let Some(style) = value.attr("style")
        && HIDDEN_STYLE_RE.is_match(style)
    {
        return true;
    }

    if value
        .attr("role")
        .is_some_and(|role| UNLIKELY_ROLES.contains(&role.trim()))
    {
        return true;
    }

    if matches!(name, "body" | "a" | "article" | "main") {
        return false;
    }

    let hints = class_and_id(value);
    UNLIKELY_RE.is_match(&hints) && !MAYBE_CANDIDATE_RE.is_match(&hints)
}

/// Ids of every boilerplate subtree root below `body`.
fn collect_unlikely(body: ElementRef<'_>) -> HashSet<NodeId> {
    let mut excluded = HashSet::new();
    let mut stack = child_elements(body);

    while let Some(element) = stack.pop() {
        if is_unlikely(&element) {
            excluded.insert(element.id());
            continue;
        }
        stack.extend(child_elements(element));
    }

    excluded
}

fn class_weight(element: &Element) -> f64 {
    let mut weight = 0.0;
    for hint in [element.attr("class"), element.attr("id")].into_iter().flatten() {
        if NEGATIVE_RE.is_match(hint) {
            weight -= 25.0;
        }
        if POSITIVE_RE.is_match(hint) {
            weight += 25.0;
        }
    }
    weight
}

fn initial_score(element: &ElementRef<'_>) -> f64 {
    let base = match element.value().name() {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(element.value())
}

/// Whether `element` is scored as a paragraph.
///
/// A `div` without block-level children reads as a paragraph too.
fn is_scorable(element: &ElementRef<'_>) -> bool {
    let name = element.value().name();
    if SCORED_TAGS.contains(&name) {
        return true;
    }
    name == "div"
        && element
            .children()
            .filter_map(ElementRef::wrap)
            .all(|child| !BLOCK_TAGS.contains(&child.value().name()))
}

/// Candidate scores in document order of first appearance.
fn score_candidates<'a>(
    body: ElementRef<'a>,
    excluded: &HashSet<NodeId>,
) -> (HashMap<NodeId, f64>, Vec<ElementRef<'a>>) {
    let mut scores: HashMap<NodeId, f64> = HashMap::new();
    let mut order: Vec<ElementRef<'a>> = Vec::new();
    let mut stack = vec![body];

    while let Some(element) = stack.pop() {
        stack.extend(
            child_elements(element)
                .into_iter()
                .rev()
                .filter(|child| !excluded.contains(&child.id())),
        );

        if !is_scorable(&element) {
            continue;
        }

        let stats = TextStats::collect(element, excluded);
        let length = stats.chars();
        if length < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let score = 1.0 + stats.commas() as f64 + (length / 100).min(3) as f64;

        let ancestors = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|ancestor| ancestor.value().name() != "html")
            .take(2);

        for (level, ancestor) in ancestors.enumerate() {
            let entry = scores.entry(ancestor.id()).or_insert_with(|| {
                order.push(ancestor);
                initial_score(&ancestor)
            });
            let divider = if level == 0 { 1.0 } else { 2.0 };
            *entry += score / divider;
        }
    }

    for candidate in &order {
        if let Some(score) = scores.get_mut(&candidate.id()) {
            *score *= 1.0 - TextStats::collect(*candidate, excluded).link_density();
        }
    }

    (scores, order)
}

/// Whether a sibling of the top candidate belongs to the article.
fn sibling_qualifies(
    sibling: ElementRef<'_>,
    top: ElementRef<'_>,
    top_score: f64,
    scores: &HashMap<NodeId, f64>,
    excluded: &HashSet<NodeId>,
) -> bool {
    let threshold = (top_score * 0.2).max(MIN_SIBLING_SCORE);

    let mut bonus = 0.0;
    if let Some(class) = top.value().attr("class")
        && !class.trim().is_empty()
        && sibling.value().attr("class") == Some(class)
    {
        bonus = top_score * 0.2;
    }

    if let Some(score) = scores.get(&sibling.id())
        && score + bonus >= threshold
    {
        return true;
    }

    if sibling.value().name() != "p" {
        return false;
    }

    let stats = TextStats::collect(sibling, excluded);
    let length = stats.chars();
    let density = stats.link_density();

    if length > 80 {
        density < 0.25
    } else {
        length > 0 && density == 0.0 && SENTENCE_END_RE.is_match(&stats.text)
    }
}

/// Link lists and title-duplicating headings inside the chosen nodes.
fn collect_clutter(
    selected: &[ElementRef<'_>],
    excluded: &HashSet<NodeId>,
    title: &str,
) -> HashSet<NodeId> {
    let title = normalize_whitespace(title).to_lowercase();
    let mut clutter = HashSet::new();

    for root in selected {
        for element in root.descendants().filter_map(ElementRef::wrap) {
            if element.id() == root.id() || excluded.contains(&element.id()) {
                continue;
            }
            let name = element.value().name();

            if matches!(name, "h1" | "h2") && !title.is_empty() {
                let heading = TextStats::collect(element, excluded).text.to_lowercase();
                if heading == title {
                    clutter.insert(element.id());
                }
                continue;
            }

            if LINK_LIST_TAGS.contains(&name) {
                let stats = TextStats::collect(element, excluded);
                if stats.chars() < LINK_LIST_MAX_CHARS && stats.link_density() > 0.5 {
                    clutter.insert(element.id());
                }
            }
        }
    }

    clutter
}

fn direction_of(element: ElementRef<'_>) -> Option<String> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .filter_map(|node| node.value().attr("dir"))
        .map(str::trim)
        .find(|dir| !dir.is_empty())
        .map(str::to_string)
}

/// Locate and serialize the main content of `document`.
///
/// Returns `None` when the document has no `body` with any visible text.
pub(crate) fn extract_main_content(document: &Html, title: &str) -> Option<ReadableContent> {
    let body = document.select(&BODY_SELECTOR).next()?;
    let excluded = collect_unlikely(body);

    let (scores, order) = score_candidates(body, &excluded);

    let top = order
        .iter()
        .copied()
        .fold(None::<(ElementRef, f64)>, |best, candidate| {
            let score = scores.get(&candidate.id()).copied().unwrap_or_default();
            match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((candidate, score)),
            }
        });

    let (top, selected) = match top {
        Some((top, top_score)) => {
            let parent = top
                .parent()
                .and_then(ElementRef::wrap)
                .filter(|parent| parent.value().name() != "html");

            let selected = match parent {
                Some(parent) => child_elements(parent)
                    .into_iter()
                    .filter(|sibling| !excluded.contains(&sibling.id()))
                    .filter(|sibling| {
                        sibling.id() == top.id()
                            || sibling_qualifies(*sibling, top, top_score, &scores, &excluded)
                    })
                    .collect(),
                None => vec![top],
            };

            tracing::debug!(
                candidate = top.value().name(),
                score = top_score,
                selected = selected.len(),
                "Selected main content candidate"
            );
            (top, selected)
        }
        None => {
            tracing::debug!("No scored candidates, falling back to body");
            (body, vec![body])
        }
    };

    let mut removed = collect_clutter(&selected, &excluded, title);
    removed.extend(excluded.iter().copied());

    let visible: usize = selected
        .iter()
        .map(|element| TextStats::collect(*element, &removed).chars())
        .sum();
    if visible == 0 {
        return None;
    }

    let mut html = String::new();
    for element in &selected {
        if element.value().name() == "body" {
            write_children(element, &removed, &Passthrough, &mut html);
        } else {
            write_element(element, &removed, &Passthrough, &mut html);
        }
    }

    Some(ReadableContent {
        html,
        dir: direction_of(top),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_PARAGRAPH: &str = "The committee met on Tuesday, reviewed the proposal, and agreed to fund the new library wing after a long debate.";

    #[test]
    fn picks_article_over_boilerplate() {
        let html = format!(
            r#"<html><body>
                <nav><a href="/">Home</a><a href="/news">News</a></nav>
                <div class="ad-banner">Buy now, limited offer, act fast, great deals here!</div>
                <div id="story"><p>{LONG_PARAGRAPH}</p><p>{LONG_PARAGRAPH}</p></div>
                <footer>Copyright notice, all rights reserved, contact us today.</footer>
            </body></html>"#
        );
        let doc = Html::parse_document(&html);
        let content = extract_main_content(&doc, "Title").expect("content");
        assert!(content.html.contains("committee met"));
        assert!(!content.html.contains("Buy now"));
        assert!(!content.html.contains("Copyright"));
        assert!(!content.html.contains("Home"));
    }

    #[test]
    fn hidden_and_script_nodes_are_excluded() {
        let html = format!(
            r#"<html><body><article>
                <p>{LONG_PARAGRAPH}</p>
                <p style="display: none">Secret hidden text that should not appear anywhere.</p>
                <script>var tracking = "do not include this script body";</script>
            </article></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let content = extract_main_content(&doc, "").expect("content");
        assert!(!content.html.contains("Secret hidden"));
        assert!(!content.html.contains("tracking"));
    }

    #[test]
    fn drops_heading_repeating_title() {
        let html = format!(
            r#"<html><body><div class="post"><h1>Library Wing Approved</h1><p>{LONG_PARAGRAPH}</p></div></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let content = extract_main_content(&doc, "Library wing approved").expect("content");
        assert!(!content.html.contains("<h1>"));
        assert!(content.html.contains("committee met"));
    }

    #[test]
    fn short_documents_fall_back_to_body() {
        let doc = Html::parse_document(
            r#"<html><body><div class="ad">Ad</div><p>Short body text.</p></body></html>"#,
        );
        let content = extract_main_content(&doc, "").expect("content");
        assert!(content.html.contains("Short body text."));
        assert!(!content.html.contains("Ad<"));
    }

    #[test]
    fn empty_body_has_no_content() {
        let doc = Html::parse_document("<html><body><script>1</script>   </body></html>");
        assert!(extract_main_content(&doc, "").is_none());
    }

    #[test]
    fn direction_comes_from_ancestors() {
        let html = format!(
            r#"<html><body><div dir="rtl"><div class="content"><p>{LONG_PARAGRAPH}</p></div></div></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let content = extract_main_content(&doc, "").expect("content");
        assert_eq!(content.dir.as_deref(), Some("rtl"));
    }
}
