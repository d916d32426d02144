//! Payment card number detection.

use once_cell::sync::Lazy;
use regex::{Match, Regex};

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::checksum::{all_same_digits, luhn};
use crate::detector::{dedupe_spans, Detector};

const BRAND_CONFIDENCE: f64 = 0.95;
const GENERIC_CONFIDENCE: f64 = 0.80;

/// Brand-specific unseparated number patterns.
static BRAND_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Visa: 13 or 16 digits.
        r"\b4[0-9]{12}(?:[0-9]{3})?\b",
        // Mastercard: 51-55 and the 2221-2720 range.
        r"\b(?:5[1-5][0-9]{2}|222[1-9]|22[3-9][0-9]|2[3-6][0-9]{2}|27[01][0-9]|2720)[0-9]{12}\b",
        // American Express: 15 digits.
        r"\b3[47][0-9]{13}\b",
        // Discover: 6011 and 65.
        r"\b6(?:011|5[0-9]{2})[0-9]{12}\b",
        // Diners Club: 14 digits.
        r"\b3(?:0[0-5]|[68][0-9])[0-9]{11}\b",
        // JCB: 15 digits for the 2131/1800 ranges, 16 for 35xx.
        r"\b(?:(?:2131|1800)[0-9]{11}|35[0-9]{14})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("card brand pattern is valid"))
    .collect()
});

/// Four separated groups of four digits.
static SEPARATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[0-9]{4}[ -]){3}[0-9]{4}\b").expect("separated card pattern is valid")
});

/// Bare 16-digit fallback.
static GENERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{16}\b").expect("generic card pattern is valid"));

/// Detects payment card numbers.
///
/// Brand-prefixed numbers and 4x4 separated groups are accepted when the
/// Luhn checksum holds and the digits are not all identical. The bare
/// 16-digit fallback additionally requires a recognized brand prefix so
/// arbitrary digit runs stay out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardDetector;

impl Detector for CardDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::CreditCard
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        let mut spans = Vec::new();

        for pattern in BRAND_PATTERNS.iter() {
            for m in pattern.find_iter(text) {
                if valid_card(m.as_str()) {
                    spans.push(span_for(&m, BRAND_CONFIDENCE));
                }
            }
        }

        for m in SEPARATED.find_iter(text) {
            if valid_card(m.as_str()) {
                let confidence = if brand_prefixed(m.as_str()) {
                    BRAND_CONFIDENCE
                } else {
                    GENERIC_CONFIDENCE
                };
                spans.push(span_for(&m, confidence));
            }
        }

        for m in GENERIC.find_iter(text) {
            if brand_prefixed(m.as_str()) && valid_card(m.as_str()) {
                spans.push(span_for(&m, GENERIC_CONFIDENCE));
            }
        }

        dedupe_spans(&mut spans);
        spans
    }
}

fn span_for(m: &Match<'_>, confidence: f64) -> CandidateSpan {
    CandidateSpan::new(
        PiiCategory::CreditCard,
        m.start(),
        m.end(),
        confidence,
        SpanSource::Pattern,
        m.as_str(),
    )
}

fn valid_card(candidate: &str) -> bool {
    !all_same_digits(candidate) && luhn(candidate)
}

/// True when the digit prefix belongs to a known card brand.
fn brand_prefixed(candidate: &str) -> bool {
    let digits: String = candidate.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with('4')
        || digits.starts_with("34")
        || digits.starts_with("37")
        || digits.starts_with("36")
        || digits.starts_with("38")
        || digits.starts_with("35")
        || digits.starts_with("2131")
        || digits.starts_with("1800")
        || digits.starts_with("6011")
        || digits.starts_with("65")
    {
        return true;
    }
    if let Some(two) = digits.get(..2).and_then(|p| p.parse::<u32>().ok()) {
        if (51..=55).contains(&two) {
            return true;
        }
    }
    if let Some(four) = digits.get(..4).and_then(|p| p.parse::<u32>().ok()) {
        if (2221..=2720).contains(&four) {
            return true;
        }
    }
    if let Some(three) = digits.get(..3).and_then(|p| p.parse::<u32>().ok()) {
        if (300..=305).contains(&three) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visa_bare() {
        let spans = CardDetector.find("Karte 4111111111111111 belastet");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "4111111111111111");
        assert_eq!(spans[0].confidence, BRAND_CONFIDENCE);
    }

    #[test]
    fn test_visa_separated_keeps_brand_confidence() {
        let spans = CardDetector.find("4111-1111-1111-1111");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].confidence, BRAND_CONFIDENCE);
    }

    #[test]
    fn test_known_brands() {
        assert_eq!(CardDetector.find("5500000000000004").len(), 1);
        assert_eq!(CardDetector.find("2221000000000009").len(), 1);
        assert_eq!(CardDetector.find("371449635398431").len(), 1);
        assert_eq!(CardDetector.find("6011111111111117").len(), 1);
        assert_eq!(CardDetector.find("30569309025904").len(), 1);
        assert_eq!(CardDetector.find("3530111333300000").len(), 1);
    }

    #[test]
    fn test_rejects_luhn_failure() {
        assert!(CardDetector.find("4111111111111112").is_empty());
    }

    #[test]
    fn test_rejects_repeated_digits_even_when_luhn_passes() {
        // Sixteen zeros pass Luhn; the repeated-digit guard drops them.
        assert!(CardDetector.find("0000 0000 0000 0000").is_empty());
    }

    #[test]
    fn test_separated_unknown_brand_gets_lower_confidence() {
        let spans = CardDetector.find("6200 0000 0000 0005");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].confidence, GENERIC_CONFIDENCE);
    }

    #[test]
    fn test_bare_unknown_brand_is_rejected() {
        assert!(CardDetector.find("6200000000000005").is_empty());
    }

    #[test]
    fn test_ignores_plain_digit_runs() {
        assert!(CardDetector.find("Referenz 1234567890123456").is_empty());
    }
}
