#![forbid(unsafe_code)]

//! Allow-list HTML cleaning for rich-text fields (descriptions).

use regex::{Captures, Regex};
use std::sync::LazyLock;

const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "img", "li", "ol", "p", "pre", "s", "span", "strong", "table", "tbody", "td", "th",
    "thead", "tr", "u", "ul",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "title"];

const DROPPED_BLOCKS: &[&str] = &["script", "style", "iframe", "embed", "object"];

static DROPPED_BLOCK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DROPPED_BLOCKS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>|<{tag}\b[^>]*/?>"))
                .expect("dropped block pattern is a valid regex")
        })
        .collect()
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is a valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("tag pattern is a valid regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*("[^"]*"|'[^']*'|[^\s"'>]+)"#)
        .expect("attribute pattern is a valid regex")
});

fn tag_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "target", "rel"],
        "img" => &["src", "alt", "width", "height"],
        "td" | "th" => &["colspan", "rowspan"],
        _ => &[],
    }
}

fn safe_url(attr: &str, value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    match attr {
        "href" => {
            lower.starts_with("http://")
                || lower.starts_with("https://")
                || lower.starts_with("mailto:")
                || lower.starts_with('#')
        }
        "src" => lower.starts_with("http://") || lower.starts_with("https://"),
        _ => true,
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn clean_attributes(tag: &str, raw: &str) -> String {
    let mut out = String::new();
    for caps in ATTRIBUTE.captures_iter(raw) {
        let name = caps[1].to_ascii_lowercase();
        if name.starts_with("on") {
            continue;
        }
        if !GLOBAL_ATTRIBUTES.contains(&name.as_str()) && !tag_attributes(tag).contains(&name.as_str()) {
            continue;
        }
        let value = caps[2].trim_matches(|c| c == '"' || c == '\'');
        if !safe_url(&name, value) {
            continue;
        }
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    out
}

/// Strips markup outside the allow-list. Text inside removed tags is kept, except for
/// script-like blocks, which are dropped whole.
pub fn sanitize_html(input: &str) -> String {
    let mut text = input.to_string();
    for pattern in DROPPED_BLOCK_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    text = COMMENT.replace_all(&text, "").into_owned();
    TAG.replace_all(&text, |caps: &Captures<'_>| {
        let name = caps[2].to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            return String::new();
        }
        if !caps[1].is_empty() {
            return format!("</{name}>");
        }
        format!("<{name}{}>", clean_attributes(&name, &caps[3]))
    })
    .into_owned()
}
