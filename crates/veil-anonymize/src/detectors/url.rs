//! URL detection.

use once_cell::sync::Lazy;
use regex::Regex;

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::detector::Detector;

const CONFIDENCE: f64 = 0.90;

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:https?://|www\.|mailto:)[^\s<>"]+"#).expect("url pattern is valid")
});

/// Punctuation trimmed off the end of a match, since prose regularly ends a
/// sentence right after a link.
const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']'];

/// Detects protocol-prefixed, `www.`-prefixed, and `mailto:` URLs.
///
/// The host must contain a dot and end in a top-level label of at least two
/// letters. Trailing sentence punctuation is excluded from the span.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlDetector;

impl Detector for UrlDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::Url
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        let mut spans = Vec::new();
        for m in URL.find_iter(text) {
            let trimmed = m.as_str().trim_end_matches(TRAILING);
            if !plausible_url(trimmed) {
                continue;
            }
            let end = m.start() + trimmed.len();
            spans.push(CandidateSpan::new(
                PiiCategory::Url,
                m.start(),
                end,
                CONFIDENCE,
                SpanSource::Pattern,
                trimmed,
            ));
        }
        spans
    }
}

fn plausible_url(candidate: &str) -> bool {
    let rest = if let Some(r) = candidate.strip_prefix("https://") {
        r
    } else if let Some(r) = candidate.strip_prefix("http://") {
        r
    } else if let Some(r) = candidate.strip_prefix("mailto:") {
        // For mail links the relevant host is the part after the @.
        r.rsplit_once('@').map_or(r, |(_, domain)| domain)
    } else {
        candidate
    };

    let Some(host) = rest.split(['/', '?', '#', ':']).next() else {
        return false;
    };
    let Some((_, tld)) = host.rsplit_once('.') else {
        return false;
    };
    tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic)
}
