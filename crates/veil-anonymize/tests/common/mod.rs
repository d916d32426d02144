//! Shared fixtures and helpers for the pipeline tests.

use veil_anonymize::{
    AnonymizeResult, Anonymizer, EntityRecognizer, Policy, Prediction, StaticKeyProvider,
};

/// Sample texts paired with the PII value each one contains.
pub mod samples {
    /// Texts containing one email address.
    pub const EMAILS: &[(&str, &str)] = &[
        (
            "Kontakt: max.mustermann@example.org",
            "max.mustermann@example.org",
        ),
        ("Send feedback to support+tag@firma.de", "support+tag@firma.de"),
        ("Mail an info@sub.domain.co.uk bitte", "info@sub.domain.co.uk"),
    ];

    /// Texts containing one phone number.
    pub const PHONES: &[(&str, &str)] = &[
        ("Rufen Sie +49 170 1234567 an", "+49 170 1234567"),
        ("Tel: 030/4567890", "030/4567890"),
        ("Phone: (555) 123-4567", "(555) 123-4567"),
        ("Mobile: 555.123.4567", "555.123.4567"),
    ];

    /// Texts containing one IBAN.
    pub const IBANS: &[(&str, &str)] = &[
        (
            "IBAN: DE89 3704 0044 0532 0130 00",
            "DE89 3704 0044 0532 0130 00",
        ),
        (
            "Konto GB82 WEST 1234 5698 7654 32",
            "GB82 WEST 1234 5698 7654 32",
        ),
        (
            "FR14 2004 1010 0505 0001 3M02 606 belasten",
            "FR14 2004 1010 0505 0001 3M02 606",
        ),
    ];

    /// Texts containing one BIC.
    pub const BICS: &[(&str, &str)] = &[
        ("BIC: DEUTDEFF", "DEUTDEFF"),
        ("SWIFT INGDDEFFXXX angeben", "INGDDEFFXXX"),
    ];

    /// Texts containing one payment card number.
    pub const CARDS: &[(&str, &str)] = &[
        ("Karte: 4111 1111 1111 1111", "4111 1111 1111 1111"),
        ("Card 4111111111111111 charged", "4111111111111111"),
        ("MC 5500 0055 5555 5559 ok", "5500 0055 5555 5559"),
    ];

    /// Texts containing one IP address.
    pub const IPS: &[(&str, &str)] = &[
        ("Server IP: 192.168.1.100", "192.168.1.100"),
        ("Connect via 2001:db8::1 today", "2001:db8::1"),
    ];

    /// Texts containing one URL.
    pub const URLS: &[(&str, &str)] = &[
        (
            "Besuchen Sie https://example.org/pfad",
            "https://example.org/pfad",
        ),
        ("Docs at www.firma.de/hilfe.", "www.firma.de/hilfe"),
    ];

    /// Texts containing no PII at all.
    pub const CLEAN: &[&str] = &[
        "Das Wetter ist heute schön.",
        "The quarterly report is due Friday.",
        "Bitte um Rückmeldung bis morgen.",
    ];
}

/// Creates an engine over the given policy with a fresh random key.
pub fn engine_with(policy: Policy) -> Anonymizer {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Anonymizer::new(policy, Box::new(StaticKeyProvider::generate()))
        .expect("test policy is valid")
}

/// Creates an engine over the default policy.
pub fn default_engine() -> Anonymizer {
    engine_with(Policy::default())
}

/// A recognizer that returns the same spans for every input.
pub struct CannedRecognizer {
    pub prediction: Prediction,
}

impl EntityRecognizer for CannedRecognizer {
    fn predict(&self, _text: &str, _policy: &Policy) -> AnonymizeResult<Prediction> {
        Ok(self.prediction.clone())
    }
}
