pub mod columns;
pub mod details;
pub mod price;
pub mod shapes;

pub use columns::*;
pub use details::*;
pub use price::*;
pub use shapes::*;

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static FOOTNOTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\^\{?\d+\}?|\*+$")
        .expect("Invalid footnote regex")
});

static FOOTNOTE_ONLY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,2}$")
        .expect("Invalid footnote-only regex")
});

/// Clean and normalize text: decode HTML entities, collapse whitespace, strip footnote markers.
///
/// Fragments that are only a footnote number ("1", "12") come back empty.
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    let collapsed = decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('—', "-");

    let stripped = FOOTNOTE_REGEX.replace_all(&collapsed, "");
    let stripped = stripped.trim();

    if FOOTNOTE_ONLY_REGEX.is_match(stripped) {
        String::new()
    } else {
        stripped.to_string()
    }
}

/// Lowercase a row label and fold unicode dashes and whitespace runs.
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(['\u{2011}', '\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of an HTML document, script and style content excluded.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .map(|element| matches!(element.name(), "script" | "style" | "noscript" | "template"))
            .unwrap_or(false);
        if !hidden {
            parts.push(text);
        }
    }

    clean_text(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_text_strips_footnotes_and_entities() {
        assert_eq!(clean_text("  Up to 10&nbsp;hours^{3}  "), "Up to 10 hours");
        assert_eq!(clean_text("Liquid Retina***"), "Liquid Retina");
        assert_eq!(clean_text("A17 Pro — chip"), "A17 Pro - chip");
    }

    #[test]
    fn footnote_only_fragments_are_dropped() {
        assert_eq!(clean_text(" 2 "), "");
        assert_eq!(clean_text("128"), "128");
    }

    #[test]
    fn labels_fold_case_and_dashes() {
        assert_eq!(normalize_label("  Wi\u{2011}Fi   Weight "), "wi-fi weight");
        assert_eq!(normalize_label("Display \u{2013} Size"), "display - size");
    }

    #[test]
    fn page_text_skips_scripts() {
        let html = r#"<html><head><style>.x{}</style></head>
            <body><h1>iPad Air</h1><script>var price = "₹1";</script>
            <p>From&nbsp;₹59,900</p></body></html>"#;
        assert_eq!(page_text(html), "iPad Air From ₹59,900");
    }
}
