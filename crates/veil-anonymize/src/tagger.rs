//! Tag substitution and plaintext map assembly.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use veil_core::{CandidateSpan, PiiCategory, PlaintextMap, Policy, ResolvedEntity};

/// Output of the tagging stage.
#[derive(Debug)]
pub struct TagOutput {
    /// Text with every resolved span replaced by its tag.
    pub tagged_text: String,
    /// Entities in document order, offsets into the original text.
    pub entities: Vec<ResolvedEntity>,
    /// Original values keyed by `"{CATEGORY}_{id}"`.
    pub plaintext_map: PlaintextMap,
}

/// Renders the canonical tag for a category and identifier.
#[must_use]
pub fn canonical_tag(category: PiiCategory, id: u32) -> String {
    format!("<PII type=\"{}\" id=\"{}\"/>", category.as_str(), id)
}

/// Replaces resolved spans with canonical tags.
///
/// Identifiers are assigned in document order starting at 1. With
/// [`Policy::reuse_ids_for_repeated_text`] set, repeated occurrences of the
/// same `(category, text)` pair share one identifier and one map entry.
/// Span text is re-sliced from `text` so the map always holds exactly what
/// the tag replaced; spans whose offsets do not land on character
/// boundaries are dropped.
#[must_use]
pub fn tag(text: &str, spans: Vec<CandidateSpan>, policy: &Policy) -> TagOutput {
    let mut usable: Vec<CandidateSpan> = Vec::with_capacity(spans.len());
    for mut span in spans {
        let Some(slice) = text.get(span.start..span.end) else {
            continue;
        };
        span.text = slice.to_string();
        usable.push(span);
    }
    usable.sort_by_key(|span| span.start);

    let mut entities: Vec<ResolvedEntity> = Vec::with_capacity(usable.len());
    let mut plaintext_map = PlaintextMap::new();
    let mut seen: HashMap<(PiiCategory, String), u32> = HashMap::new();
    let mut next_id: u32 = 1;

    for span in usable {
        let id = if policy.reuse_ids_for_repeated_text {
            match seen.entry((span.category, span.text.clone())) {
                Entry::Occupied(slot) => *slot.get(),
                Entry::Vacant(slot) => {
                    let id = next_id;
                    next_id += 1;
                    slot.insert(id);
                    plaintext_map.insert(span.category, id, span.text.clone());
                    id
                }
            }
        } else {
            let id = next_id;
            next_id += 1;
            plaintext_map.insert(span.category, id, span.text.clone());
            id
        };
        entities.push(ResolvedEntity::from_span(id, span));
    }

    let mut tagged_text = text.to_string();
    for entity in entities.iter().rev() {
        let tag = canonical_tag(entity.category, entity.id);
        tagged_text.replace_range(entity.start..entity.end, &tag);
    }

    TagOutput {
        tagged_text,
        entities,
        plaintext_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::SpanSource;

    fn span(category: PiiCategory, start: usize, end: usize, text: &str) -> CandidateSpan {
        CandidateSpan::new(category, start, end, 0.95, SpanSource::Pattern, text)
    }

    #[test]
    fn test_canonical_tag_format() {
        assert_eq!(
            canonical_tag(PiiCategory::Email, 1),
            "<PII type=\"EMAIL\" id=\"1\"/>"
        );
        assert_eq!(
            canonical_tag(PiiCategory::CreditCard, 12),
            "<PII type=\"CREDIT_CARD\" id=\"12\"/>"
        );
    }

    #[test]
    fn test_single_span_is_replaced() {
        let text = "Contact max@example.org today";
        let spans = vec![span(PiiCategory::Email, 8, 23, "max@example.org")];

        let output = tag(text, spans, &Policy::default());

        assert_eq!(
            output.tagged_text,
            "Contact <PII type=\"EMAIL\" id=\"1\"/> today"
        );
        assert_eq!(output.entities.len(), 1);
        assert_eq!(output.entities[0].id, 1);
        assert_eq!(
            output.plaintext_map.get("EMAIL_1"),
            Some("max@example.org")
        );
    }

    #[test]
    fn test_ids_follow_document_order() {
        let text = "a@b.co then +49 170 1234567";
        // Input order is deliberately reversed.
        let spans = vec![
            span(PiiCategory::Phone, 12, 27, "+49 170 1234567"),
            span(PiiCategory::Email, 0, 6, "a@b.co"),
        ];

        let output = tag(text, spans, &Policy::default());

        assert_eq!(output.entities[0].id, 1);
        assert_eq!(output.entities[0].category, PiiCategory::Email);
        assert_eq!(output.entities[1].id, 2);
        assert_eq!(output.entities[1].category, PiiCategory::Phone);
        assert_eq!(
            output.tagged_text,
            "<PII type=\"EMAIL\" id=\"1\"/> then <PII type=\"PHONE\" id=\"2\"/>"
        );
    }

    #[test]
    fn test_distinct_ids_without_reuse() {
        let text = "a@b.co and a@b.co";
        let spans = vec![
            span(PiiCategory::Email, 0, 6, "a@b.co"),
            span(PiiCategory::Email, 11, 17, "a@b.co"),
        ];

        let output = tag(text, spans, &Policy::default());

        assert_eq!(output.entities[0].id, 1);
        assert_eq!(output.entities[1].id, 2);
        assert_eq!(output.plaintext_map.len(), 2);
        assert_eq!(output.plaintext_map.get("EMAIL_2"), Some("a@b.co"));
    }

    #[test]
    fn test_repeated_text_shares_id_when_enabled() {
        let text = "a@b.co and a@b.co plus c@d.eu";
        let spans = vec![
            span(PiiCategory::Email, 0, 6, "a@b.co"),
            span(PiiCategory::Email, 11, 17, "a@b.co"),
            span(PiiCategory::Email, 23, 29, "c@d.eu"),
        ];
        let policy = Policy::default().with_id_reuse(true);

        let output = tag(text, spans, &policy);

        assert_eq!(output.entities[0].id, 1);
        assert_eq!(output.entities[1].id, 1);
        assert_eq!(output.entities[2].id, 2);
        assert_eq!(output.plaintext_map.len(), 2);
        assert_eq!(
            output.tagged_text,
            "<PII type=\"EMAIL\" id=\"1\"/> and <PII type=\"EMAIL\" id=\"1\"/> plus <PII type=\"EMAIL\" id=\"2\"/>"
        );
    }

    #[test]
    fn test_reuse_is_scoped_to_category() {
        let text = "1234567890 and 1234567890";
        let spans = vec![
            span(PiiCategory::Phone, 0, 10, "1234567890"),
            span(PiiCategory::AccountNumber, 15, 25, "1234567890"),
        ];
        let policy = Policy::default().with_id_reuse(true);

        let output = tag(text, spans, &policy);

        assert_eq!(output.entities[0].id, 1);
        assert_eq!(output.entities[1].id, 2);
        assert_eq!(output.plaintext_map.len(), 2);
    }

    #[test]
    fn test_map_holds_resliced_text() {
        let text = "Contact max@example.org today";
        // The span carries stale text; the slice wins.
        let spans = vec![span(PiiCategory::Email, 8, 23, "stale")];

        let output = tag(text, spans, &Policy::default());

        assert_eq!(output.entities[0].text, "max@example.org");
        assert_eq!(
            output.plaintext_map.get("EMAIL_1"),
            Some("max@example.org")
        );
    }

    #[test]
    fn test_invalid_offsets_are_dropped() {
        let text = "héllo";
        let spans = vec![
            span(PiiCategory::Email, 0, 99, "beyond"),
            span(PiiCategory::Email, 2, 4, "mid-char"),
            span(PiiCategory::Email, 4, 2, "reversed"),
        ];

        let output = tag(text, spans, &Policy::default());

        assert_eq!(output.tagged_text, text);
        assert!(output.entities.is_empty());
        assert!(output.plaintext_map.is_empty());
    }

    #[test]
    fn test_no_spans_leaves_text_untouched() {
        let text = "nothing personal here";
        let output = tag(text, Vec::new(), &Policy::default());

        assert_eq!(output.tagged_text, text);
        assert!(output.entities.is_empty());
        assert!(output.plaintext_map.is_empty());
    }
}
