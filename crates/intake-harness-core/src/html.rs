//! HTML signal extraction.
//!
//! This is a pattern-based scanner, not a DOM parser. It pulls the handful
//! of elements that describe a small business site (title, meta
//! description, headings, substantial paragraphs) and labels them for the
//! prompt builder. Malformed markup degrades to fewer sections, never to an
//! error.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::{collapse_whitespace, decode_entities};

/// Paragraphs at or under this many characters are layout filler.
pub const MIN_PARAGRAPH_CHARS: usize = 20;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static html regex")
}

static NOISE_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?s)<!--.*?-->"),
        re(r"(?is)<script\b[^>]*>.*?</script\s*>"),
        re(r"(?is)<style\b[^>]*>.*?</style\s*>"),
        re(r"(?is)<nav\b[^>]*>.*?</nav\s*>"),
        re(r"(?is)<footer\b[^>]*>.*?</footer\s*>"),
    ]
});

static TITLE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<title\b[^>]*>(.*?)</title\s*>"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)<h[1-3]\b[^>]*>(.*?)</h[1-3]\s*>"));
static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<p\b[^>]*>(.*?)</p\s*>"));
static META: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<meta\b[^>]*>"));
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
});
static TAG: LazyLock<Regex> = LazyLock::new(|| re(r"<[^>]*>"));

/// `og:title` / `og:description` from a social profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraph {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl OpenGraph {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// `Titre: …` and `Description: …` lines for whichever tags exist.
    pub fn render(&self) -> Option<String> {
        let mut lines = Vec::new();
        if let Some(t) = &self.title {
            lines.push(format!("Titre: {t}"));
        }
        if let Some(d) = &self.description {
            lines.push(format!("Description: {d}"));
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

/// Extract the labeled signal sections of a page.
///
/// Returns an empty string when none of the sections has content.
pub fn extract_text(html: &str) -> String {
    let cleaned = strip_noise(html);

    let title = TITLE
        .captures(&cleaned)
        .map(|c| inner_text(&c[1]))
        .filter(|t| !t.is_empty());
    let description = meta_content(&cleaned, "name", "description");
    let headings: Vec<String> = HEADING
        .captures_iter(&cleaned)
        .map(|c| inner_text(&c[1]))
        .filter(|t| !t.is_empty())
        .collect();
    let paragraphs: Vec<String> = PARAGRAPH
        .captures_iter(&cleaned)
        .map(|c| inner_text(&c[1]))
        .filter(|t| t.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect();

    let mut sections = Vec::new();
    if let Some(t) = title {
        sections.push(format!("Titre: {t}"));
    }
    if let Some(d) = description {
        sections.push(format!("Description: {d}"));
    }
    if !headings.is_empty() {
        sections.push(format!("Titres:\n{}", headings.join("\n")));
    }
    if !paragraphs.is_empty() {
        sections.push(format!("Contenu:\n{}", paragraphs.join("\n")));
    }
    sections.join("\n\n")
}

/// Open Graph title and description, whatever the attribute order or quoting.
pub fn open_graph(html: &str) -> OpenGraph {
    OpenGraph {
        title: meta_content(html, "property", "og:title")
            .or_else(|| meta_content(html, "name", "og:title")),
        description: meta_content(html, "property", "og:description")
            .or_else(|| meta_content(html, "name", "og:description")),
    }
}

fn strip_noise(html: &str) -> String {
    let mut out = html.to_string();
    for block in NOISE_BLOCKS.iter() {
        out = block.replace_all(&out, " ").into_owned();
    }
    out
}

fn inner_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

/// `content` of the first `<meta>` whose `key` attribute equals `value`
/// (case-insensitive), decoded and collapsed. Blank content counts as absent.
fn meta_content(html: &str, key: &str, value: &str) -> Option<String> {
    META.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let matches = attrs
            .get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(value));
        if !matches {
            return None;
        }
        let content = collapse_whitespace(&decode_entities(attrs.get("content")?));
        (!content.is_empty()).then_some(content)
    })
}

fn attributes(tag: &str) -> HashMap<String, String> {
    ATTR.captures_iter(tag)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (c[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}
