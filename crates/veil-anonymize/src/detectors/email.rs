//! Email address detection.

use once_cell::sync::Lazy;
use regex::Regex;

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::detector::Detector;

const CONFIDENCE: f64 = 0.95;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Detects email addresses.
///
/// Structural match plus RFC-influenced checks: total length at most 254,
/// no consecutive dots anywhere, local part 1 to 64 characters and not
/// starting or ending with a dot. The top-level label must be at least two
/// letters, which the pattern itself enforces.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailDetector;

impl Detector for EmailDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::Email
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        EMAIL
            .find_iter(text)
            .filter(|m| plausible_email(m.as_str()))
            .map(|m| {
                CandidateSpan::new(
                    PiiCategory::Email,
                    m.start(),
                    m.end(),
                    CONFIDENCE,
                    SpanSource::Pattern,
                    m.as_str(),
                )
            })
            .collect()
    }
}

fn plausible_email(candidate: &str) -> bool {
    if candidate.len() > 254 || candidate.contains("..") {
        return false;
    }
    let Some((local, _domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    !(local.starts_with('.') || local.ends_with('.'))
}
