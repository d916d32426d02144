//! BIC/SWIFT code detection.

use once_cell::sync::Lazy;
use regex::Regex;

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::detector::Detector;

const CONFIDENCE: f64 = 0.80;

/// ISO 3166-1 alpha-2 codes, sorted, plus the user-assigned XK.
const COUNTRY_CODES: [&str; 250] = [
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX",
    "AZ", "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ",
    "BR", "BS", "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK",
    "CL", "CM", "CN", "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM",
    "DO", "DZ", "EC", "EE", "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR",
    "GA", "GB", "GD", "GE", "GF", "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS",
    "GT", "GU", "GW", "GY", "HK", "HM", "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN",
    "IO", "IQ", "IR", "IS", "IT", "JE", "JM", "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN",
    "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC", "LI", "LK", "LR", "LS", "LT", "LU", "LV",
    "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK", "ML", "MM", "MN", "MO", "MP", "MQ",
    "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA", "NC", "NE", "NF", "NG", "NI",
    "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG", "PH", "PK", "PL", "PM",
    "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW", "SA", "SB", "SC",
    "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS", "ST", "SV",
    "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO", "TR",
    "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "XK", "YE", "YT", "ZA", "ZM", "ZW",
];

static BIC: Lazy<Regex> = Lazy::new(|| {
    // bank code (4 letters), country (2 letters), location (2), branch (3)?
    Regex::new(r"\b[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b")
        .expect("bic pattern is valid")
});

/// Detects BIC/SWIFT codes.
///
/// A candidate must be exactly 8 or 11 characters with a recognized ISO
/// country code in positions 5 and 6. Confidence stays moderate because
/// 8-letter uppercase words can collide with the structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct BicDetector;

impl Detector for BicDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::Bic
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        BIC.find_iter(text)
            .filter(|m| known_country(m.as_str()))
            .map(|m| {
                CandidateSpan::new(
                    PiiCategory::Bic,
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

fn known_country(candidate: &str) -> bool {
    let Some(country) = candidate.get(4..6) else {
        return false;
    };
    COUNTRY_CODES
        .binary_search_by_key(&country, |code| *code)
        .is_ok()
}
