//! IBAN detection with country length table and mod-97 checksum.

use once_cell::sync::Lazy;
use regex::Regex;

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::checksum::iban_mod97;
use crate::detector::Detector;

const CONFIDENCE: f64 = 0.97;

/// Expected IBAN length per ISO 3166-1 country prefix, sorted by code.
const IBAN_LENGTHS: [(&str, usize); 70] = [
    ("AD", 24),
    ("AE", 23),
    ("AL", 28),
    ("AT", 20),
    ("AZ", 28),
    ("BA", 20),
    ("BE", 16),
    ("BG", 22),
    ("BH", 22),
    ("BR", 29),
    ("BY", 28),
    ("CH", 21),
    ("CR", 22),
    ("CY", 28),
    ("CZ", 24),
    ("DE", 22),
    ("DK", 18),
    ("DO", 28),
    ("EE", 20),
    ("EG", 29),
    ("ES", 24),
    ("FI", 18),
    ("FO", 18),
    ("FR", 27),
    ("GB", 22),
    ("GE", 22),
    ("GI", 23),
    ("GL", 18),
    ("GR", 27),
    ("GT", 28),
    ("HR", 21),
    ("HU", 28),
    ("IE", 22),
    ("IL", 23),
    ("IS", 26),
    ("IT", 27),
    ("JO", 30),
    ("KW", 30),
    ("KZ", 20),
    ("LB", 28),
    ("LC", 32),
    ("LI", 21),
    ("LT", 20),
    ("LU", 20),
    ("LV", 21),
    ("MC", 27),
    ("MD", 24),
    ("ME", 22),
    ("MK", 19),
    ("MR", 27),
    ("MT", 31),
    ("MU", 30),
    ("NL", 18),
    ("NO", 15),
    ("PK", 24),
    ("PL", 28),
    ("PT", 25),
    ("QA", 29),
    ("RO", 24),
    ("RS", 22),
    ("SA", 24),
    ("SE", 24),
    ("SI", 19),
    ("SK", 24),
    ("SM", 27),
    ("TN", 24),
    ("TR", 26),
    ("UA", 29),
    ("VG", 24),
    ("XK", 20),
];

static IBAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z]{2}[0-9]{2}(?:[ ]?[A-Z0-9]{4}){2,7}(?:[ ]?[A-Z0-9]{1,4})?\b")
        .expect("iban pattern is valid")
});

/// Detects IBANs in compact and space-grouped form.
///
/// A candidate survives only when its country prefix is known, its
/// normalized length matches that country's expected length, and the mod-97
/// checksum holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct IbanDetector;

impl Detector for IbanDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::Iban
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        IBAN.find_iter(text)
            .filter(|m| valid_iban(&normalize_iban(m.as_str())))
            .map(|m| {
                CandidateSpan::new(
                    PiiCategory::Iban,
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

/// Strips whitespace and uppercases an IBAN candidate.
#[must_use]
pub fn normalize_iban(candidate: &str) -> String {
    candidate
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn valid_iban(normalized: &str) -> bool {
    let Some(country) = normalized.get(..2) else {
        return false;
    };
    let Ok(index) = IBAN_LENGTHS.binary_search_by_key(&country, |(code, _)| *code) else {
        return false;
    };
    if normalized.len() != IBAN_LENGTHS[index].1 {
        return false;
    }
    iban_mod97(normalized)
}
