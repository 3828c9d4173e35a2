//! Policy-driven HTML serialization over a `scraper` tree.
//!
//! `scraper` trees are immutable, so "removing" nodes means serializing the
//! tree while skipping them. The same walker serves the raw content dump
//! (everything kept except excluded node ids) and the sanitizer (allow-list
//! policy).

use ego_tree::NodeId;
use scraper::node::Node;
use scraper::ElementRef;
use std::collections::HashSet;

/// Maximum element nesting followed while serializing
///
/// Deeper branches are truncated with a warning instead of recursing
/// further; real article markup stays far below this.
const MAX_NESTING_DEPTH: usize = 256;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// What to do with an element during serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementAction {
    /// Emit the element, its kept attributes and its children
    Keep,
    /// Drop the tags but keep serializing the children
    Unwrap,
    /// Drop the element and everything below it
    Drop,
}

pub(crate) trait MarkupPolicy {
    fn element_action(&self, name: &str) -> ElementAction;

    fn keep_attribute(&self, element: &str, name: &str, value: &str) -> bool;

    fn keep_comments(&self) -> bool;
}

/// Keeps everything; used for the raw content dump.
pub(crate) struct Passthrough;

impl MarkupPolicy for Passthrough {
    fn element_action(&self, _name: &str) -> ElementAction {
        ElementAction::Keep
    }

    fn keep_attribute(&self, _element: &str, _name: &str, _value: &str) -> bool {
        true
    }

    fn keep_comments(&self) -> bool {
        false
    }
}

/// Serialize `element` itself (tags included) under `policy`.
pub(crate) fn write_element<P: MarkupPolicy>(
    element: &ElementRef,
    excluded: &HashSet<NodeId>,
    policy: &P,
    output: &mut String,
) {
    write_element_depth(element, excluded, policy, output, 0);
}

/// Serialize only the children of `element` under `policy`.
pub(crate) fn write_children<P: MarkupPolicy>(
    element: &ElementRef,
    excluded: &HashSet<NodeId>,
    policy: &P,
    output: &mut String,
) {
    write_children_depth(element, excluded, policy, output, 0);
}

fn write_element_depth<P: MarkupPolicy>(
    element: &ElementRef,
    excluded: &HashSet<NodeId>,
    policy: &P,
    output: &mut String,
    depth: usize,
) {
    if excluded.contains(&element.id()) {
        return;
    }

    if depth > MAX_NESTING_DEPTH {
        tracing::warn!(
            element = element.value().name(),
            depth,
            limit = MAX_NESTING_DEPTH,
            "Maximum HTML nesting depth exceeded, truncating branch"
        );
        return;
    }

    let name = element.value().name();
    match policy.element_action(name) {
        ElementAction::Drop => {}
        ElementAction::Unwrap => write_children_depth(element, excluded, policy, output, depth + 1),
        ElementAction::Keep => {
            output.push('<');
            output.push_str(name);
            for (attr, value) in element.value().attrs() {
                if !policy.keep_attribute(name, attr, value) {
                    continue;
                }
                output.push(' ');
                output.push_str(attr);
                output.push_str("=\"");
                escape_attribute(value, output);
                output.push('"');
            }
            output.push('>');

            if VOID_ELEMENTS.contains(&name) {
                return;
            }

            write_children_depth(element, excluded, policy, output, depth + 1);

            output.push_str("</");
            output.push_str(name);
            output.push('>');
        }
    }
}

fn write_children_depth<P: MarkupPolicy>(
    element: &ElementRef,
    excluded: &HashSet<NodeId>,
    policy: &P,
    output: &mut String,
    depth: usize,
) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, output),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    write_element_depth(&child_element, excluded, policy, output, depth);
                }
            }
            Node::Comment(comment) if policy.keep_comments() => {
                output.push_str("<!--");
                output.push_str(comment);
                output.push_str("-->");
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            c => output.push(c),
        }
    }
}

fn escape_attribute(value: &str, output: &mut String) {
    for ch in value.chars() {
        match ch {
            '"' => output.push_str("&quot;"),
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            c => output.push(c),
        }
    }
}
