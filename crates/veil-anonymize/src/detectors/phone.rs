//! Phone number detection.

use once_cell::sync::Lazy;
use regex::Regex;

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::checksum::{all_same_digits, digits, sequential_digits};
use crate::detector::{dedupe_spans, Detector};

/// Region-aware phone patterns with the confidence attached to each.
static PATTERNS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    vec![
        // International: +CC followed by separated digit groups.
        (
            Regex::new(r"\+[1-9][0-9]{0,2}[-. /]?\(?[0-9]{1,5}\)?(?:[-. /]?[0-9]{2,8}){1,4}")
                .expect("international phone pattern is valid"),
            0.90,
        ),
        // German national: leading 0, area code, subscriber number.
        (
            Regex::new(r"\b0[1-9][0-9]{1,4}[ \-/]?[0-9]{3,10}(?:[ \-/]?[0-9]{1,6})?")
                .expect("german phone pattern is valid"),
            0.85,
        ),
        // US/UK style: three separated groups, optional parentheses.
        (
            Regex::new(r"\(?[0-9]{3,4}\)?[-. ][0-9]{3,4}[-. ][0-9]{3,4}")
                .expect("us/uk phone pattern is valid"),
            0.85,
        ),
        // French national: 0X followed by four separated digit pairs.
        (
            Regex::new(r"\b0[1-9](?:[-. ][0-9]{2}){4}")
                .expect("french phone pattern is valid"),
            0.85,
        ),
    ]
});

/// Detects phone numbers in international, German, US/UK, and French forms.
///
/// A match is dropped when its digit count falls outside 7 to 15, when all
/// digits are identical, or when the digits form a strict ascending or
/// descending run. Both guards exist for placeholder numbers like 1234567.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneDetector;

impl Detector for PhoneDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::Phone
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        let mut spans = Vec::new();
        for (pattern, confidence) in PATTERNS.iter() {
            for m in pattern.find_iter(text) {
                if !plausible_phone(m.as_str()) {
                    continue;
                }
                spans.push(CandidateSpan::new(
                    PiiCategory::Phone,
                    m.start(),
                    m.end(),
                    *confidence,
                    SpanSource::Pattern,
                    m.as_str(),
                ));
            }
        }
        dedupe_spans(&mut spans);
        spans
    }
}

fn plausible_phone(candidate: &str) -> bool {
    let count = digits(candidate).len();
    if !(7..=15).contains(&count) {
        return false;
    }
    !all_same_digits(candidate) && !sequential_digits(candidate)
}
