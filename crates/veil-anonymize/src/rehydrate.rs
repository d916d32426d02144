//! Tag-to-value restoration.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use veil_core::{map_key, PiiCategory, PlaintextMap};

/// How strictly tags are recognized during restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSyntax {
    /// Only the canonical form `<PII type="EMAIL" id="1"/>`.
    Strict,
    /// Tolerates the drift LLM processing introduces: case changes,
    /// attribute reordering, extra whitespace, typographic quotes, and a
    /// dropped self-closing slash.
    Lenient,
}

pub(crate) static STRICT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<PII type="([A-Z_]+)" id="([1-9][0-9]*)"/>"#)
        .expect("strict tag pattern is valid")
});

static LENIENT_TAG: Lazy<Regex> = Lazy::new(|| {
    // Quote pairs are matched independently, so “EMAIL' parses too.
    const QUOTE: &str = r#"["'“”‘’«»‹›„‚]"#;
    let pattern = format!(
        r"(?i)<\s*pii\s+(?:type\s*=\s*{q}([a-z_]+){q}\s+id\s*=\s*{q}([0-9]+){q}|id\s*=\s*{q}([0-9]+){q}\s+type\s*=\s*{q}([a-z_]+){q})\s*/?\s*>",
        q = QUOTE
    );
    Regex::new(&pattern).expect("lenient tag pattern is valid")
});

/// Restores original values into a tagged text using lenient tag matching.
///
/// Tags whose key is absent from the map, or whose attributes fail to
/// parse, are left in place unchanged.
#[must_use]
pub fn rehydrate(tagged: &str, map: &PlaintextMap) -> String {
    rehydrate_with(tagged, map, TagSyntax::Lenient)
}

/// Restores original values with an explicit tag syntax.
#[must_use]
pub fn rehydrate_with(tagged: &str, map: &PlaintextMap, syntax: TagSyntax) -> String {
    let pattern: &Regex = match syntax {
        TagSyntax::Strict => &STRICT_TAG,
        TagSyntax::Lenient => &LENIENT_TAG,
    };

    let mut replacements: Vec<(Range<usize>, &str)> = Vec::new();
    for caps in pattern.captures_iter(tagged) {
        let Some(full) = caps.get(0) else {
            continue;
        };
        let Some(key) = captured_key(&caps, syntax) else {
            continue;
        };
        let Some(value) = map.get(&key) else {
            continue;
        };
        replacements.push((full.range(), value));
    }

    let mut restored = tagged.to_string();
    for (range, value) in replacements.into_iter().rev() {
        restored.replace_range(range, value);
    }
    restored
}

/// Extracts the `"{CATEGORY}_{id}"` key from a tag match.
fn captured_key(caps: &Captures<'_>, syntax: TagSyntax) -> Option<String> {
    let (type_text, id_text) = match syntax {
        TagSyntax::Strict => (caps.get(1)?.as_str(), caps.get(2)?.as_str()),
        // Lenient has two attribute orders, each with its own group pair.
        TagSyntax::Lenient => match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(t), Some(i), _, _) | (_, _, Some(i), Some(t)) => (t.as_str(), i.as_str()),
            _ => return None,
        },
    };
    let category = type_text.parse::<PiiCategory>().ok()?;
    let id = id_text.parse::<u32>().ok()?;
    Some(map_key(category, id))
}
