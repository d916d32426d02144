//! IP address detection.

use once_cell::sync::Lazy;
use regex::Regex;

use veil_core::{CandidateSpan, PiiCategory, SpanSource};

use crate::detector::{dedupe_spans, Detector};

const V4_CONFIDENCE: f64 = 0.95;
const V6_CONFIDENCE: f64 = 0.90;

static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ipv4 pattern is valid")
});

/// Permissive shape; the validator is authoritative.
static IPV6: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9A-Fa-f]{0,4}(?::[0-9A-Fa-f]{0,4}){2,7}").expect("ipv6 pattern is valid")
});

/// Detects IPv4 and IPv6 addresses.
///
/// IPv4 needs four octets 0-255 without non-zero leading zeros, and at least
/// one octet above 9 so dotted version strings like 1.2.3.4 stay out. IPv6
/// candidates come from a permissive colon-hex shape and pass through a
/// group-count validator that handles `::` collapse.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpDetector;

impl Detector for IpDetector {
    fn category(&self) -> PiiCategory {
        PiiCategory::IpAddress
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        let mut spans = Vec::new();

        for m in IPV4.find_iter(text) {
            if valid_ipv4(m.as_str()) {
                spans.push(CandidateSpan::new(
                    PiiCategory::IpAddress,
                    m.start(),
                    m.end(),
                    V4_CONFIDENCE,
                    SpanSource::Pattern,
                    m.as_str(),
                ));
            }
        }

        for m in IPV6.find_iter(text) {
            if valid_ipv6(m.as_str()) {
                spans.push(CandidateSpan::new(
                    PiiCategory::IpAddress,
                    m.start(),
                    m.end(),
                    V6_CONFIDENCE,
                    SpanSource::Pattern,
                    m.as_str(),
                ));
            }
        }

        dedupe_spans(&mut spans);
        spans
    }
}

fn valid_ipv4(candidate: &str) -> bool {
    let mut octets = 0;
    let mut any_above_nine = false;
    for part in candidate.split('.') {
        if part.is_empty() || part.len() > 3 {
            return false;
        }
        if part.len() > 1 && part.starts_with('0') {
            return false;
        }
        let Ok(value) = part.parse::<u16>() else {
            return false;
        };
        if value > 255 {
            return false;
        }
        if value > 9 {
            any_above_nine = true;
        }
        octets += 1;
    }
    octets == 4 && any_above_nine
}

fn valid_ipv6(candidate: &str) -> bool {
    let halves: Vec<&str> = candidate.split("::").collect();

    // Each half must be colon-separated groups of 1-4 hex digits.
    let count_groups = |half: &str| -> Option<usize> {
        if half.is_empty() {
            return Some(0);
        }
        let mut count = 0;
        for group in half.split(':') {
            if group.is_empty()
                || group.len() > 4
                || !group.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return None;
            }
            count += 1;
        }
        Some(count)
    };

    match halves.as_slice() {
        [whole] => count_groups(whole) == Some(8),
        [left, right] => {
            matches!((count_groups(left), count_groups(right)), (Some(l), Some(r)) if l + r < 8)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4() {
        let text = "Login von 192.168.1.10 um 14:00";
        let spans = IpDetector.find(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "192.168.1.10");
        assert_eq!(spans[0].confidence, V4_CONFIDENCE);
    }

    #[test]
    fn test_version_string_is_not_an_address() {
        assert!(IpDetector.find("Version 1.2.3.4 released").is_empty());
    }

    #[test]
    fn test_rejects_leading_zero_octet() {
        assert!(IpDetector.find("10.01.20.30").is_empty());
    }

    #[test]
    fn test_rejects_octet_above_255() {
        assert!(IpDetector.find("300.168.1.10").is_empty());
    }

    #[test]
    fn test_full_ipv6() {
        let spans = IpDetector.find("Host 2001:0db8:85a3:0000:0000:8a2e:0370:7334 antwortet");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "2001:0db8:85a3:0000:0000:8a2e:0370:7334");
        assert_eq!(spans[0].confidence, V6_CONFIDENCE);
    }

    #[test]
    fn test_collapsed_ipv6() {
        let spans = IpDetector.find("Ping 2001:db8::1 fehlgeschlagen");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "2001:db8::1");
    }

    #[test]
    fn test_loopback_ipv6() {
        let spans = IpDetector.find("listen on ::1");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "::1");
    }

    #[test]
    fn test_timestamp_is_not_ipv6() {
        assert!(IpDetector.find("um 12:34:56 Uhr").is_empty());
    }

    #[test]
    fn test_mac_address_is_not_ipv6() {
        assert!(IpDetector.find("MAC 00:1A:2B:3C:4D:5E").is_empty());
    }

    #[test]
    fn test_double_collapse_is_invalid() {
        assert!(IpDetector.find("wert 1::2::3 ist kaputt").is_empty());
    }
}
