//! Markup field extraction
//!
//! Pulls a single value out of an HTML document by marker name. The fetcher
//! only depends on [`MarkupExtractor`], so tests can swap in a fake.

use regex::Regex;

/// Extract one field from a markup document.
///
/// Contract: scan the document front to back and return the first match,
/// or `None` when the marker is absent or its value is blank.
pub trait MarkupExtractor: Send + Sync {
    fn extract(&self, document: &str, marker: &str) -> Option<String>;
}

/// `<meta property="og:title" content="...">` extractor.
///
/// Accepts `property=` or `name=`, single or double quotes, any case. The
/// `content` attribute must come after the marker attribute. HTML entities in
/// the value are decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaTagExtractor;

impl MetaTagExtractor {
    fn pattern_for(marker: &str) -> Option<Regex> {
        let pattern = format!(
            r#"(?i)<meta[^>]+(?:property|name)=["']{}["'][^>]+content=["']([^"']+)["']"#,
            regex::escape(marker)
        );
        Regex::new(&pattern).ok()
    }
}

impl MarkupExtractor for MetaTagExtractor {
    fn extract(&self, document: &str, marker: &str) -> Option<String> {
        let pattern = Self::pattern_for(marker)?;
        let raw = pattern.captures(document)?.get(1)?.as_str();
        let decoded = html_escape::decode_html_entities(raw);
        let value = decoded.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}
