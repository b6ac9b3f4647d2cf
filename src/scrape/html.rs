// src/scrape/html.rs
//! Article text extraction from rendered HTML.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Containers whose paragraphs are never article content.
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe",
];

static P_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static A_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="http"]"#).unwrap());

fn inside_non_content(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| NON_CONTENT_TAGS.contains(&a.value().name()))
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of one `<p>`, skipping script/style text nested inside it.
fn paragraph_text(p: ElementRef) -> String {
    let mut buf = String::new();
    for node in p.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let nested_code = node
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(|parent| matches!(parent.value().name(), "script" | "style"));
        if !nested_code {
            buf.push_str(text);
        }
    }
    collapse_ws(&buf)
}

/// Join every content paragraph longer than `min_chars` with single spaces.
/// Returns an empty string when nothing qualifies.
pub fn extract_paragraph_text(html: &str, min_chars: usize) -> String {
    let doc = Html::parse_document(html);
    doc.select(&P_SEL)
        .filter(|p| !inside_non_content(p))
        .map(paragraph_text)
        .filter(|t| t.chars().count() > min_chars)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First absolute link that leaves the redirector: not on any of
/// `excluded_hosts` and not a google.com property.
pub fn first_external_link(html: &str, excluded_hosts: &[String]) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&A_SEL)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.contains("google.com"))
        .filter(|href| match host_of(href) {
            Some(host) => !host_matches(&host, excluded_hosts),
            None => false,
        })
        .next()
        .map(str::to_string)
}

pub fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// `host` equals one of `hosts` or is a subdomain of it.
pub fn host_matches(host: &str, hosts: &[String]) -> bool {
    hosts
        .iter()
        .any(|h| host == h || host.ends_with(&format!(".{h}")))
}

/// Host without a leading `www.`; empty when the URL does not parse.
pub fn domain_of(url: &str) -> String {
    host_of(url)
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_default()
}
