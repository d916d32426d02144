//! Detectors compiled from policy-supplied patterns.

use regex::Regex;

use veil_core::{
    CandidateSpan, CustomPattern, DenyPattern, PatternValidator, PiiCategory, SpanSource,
};

use crate::checksum::{iban_mod97, luhn};
use crate::detector::Detector;
use crate::error::AnonymizeResult;

use super::iban::normalize_iban;

/// A single policy pattern compiled into a detector.
///
/// Serves both custom patterns (subject to policy filtering) and deny
/// patterns (registered as forced, confidence 1.0).
#[derive(Debug)]
pub struct PatternDetector {
    name: String,
    category: PiiCategory,
    regex: Regex,
    confidence: f64,
    validator: Option<PatternValidator>,
}

impl PatternDetector {
    /// Compiles a custom pattern.
    ///
    /// # Errors
    /// Returns `PatternCompilation` when the regular expression is invalid.
    pub fn compile(pattern: &CustomPattern) -> AnonymizeResult<Self> {
        Ok(Self {
            name: pattern.name.clone(),
            category: pattern.category,
            regex: Regex::new(&pattern.pattern)?,
            confidence: pattern.confidence,
            validator: pattern.validator,
        })
    }

    /// Compiles a force-include pattern.
    ///
    /// # Errors
    /// Returns `PatternCompilation` when the regular expression is invalid.
    pub fn compile_deny(pattern: &DenyPattern) -> AnonymizeResult<Self> {
        Ok(Self {
            name: pattern.name.clone(),
            category: pattern.category,
            regex: Regex::new(&pattern.pattern)?,
            confidence: 1.0,
            validator: None,
        })
    }

    /// Pattern name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn passes(&self, matched: &str) -> bool {
        match self.validator {
            None => true,
            Some(PatternValidator::Luhn) => luhn(matched),
            Some(PatternValidator::IbanMod97) => iban_mod97(&normalize_iban(matched)),
            Some(PatternValidator::Digits) => matched.chars().any(|c| c.is_ascii_digit()),
        }
    }
}

impl Detector for PatternDetector {
    fn category(&self) -> PiiCategory {
        self.category
    }

    fn find(&self, text: &str) -> Vec<CandidateSpan> {
        self.regex
            .find_iter(text)
            .filter(|m| self.passes(m.as_str()))
            .map(|m| {
                CandidateSpan::new(
                    self.category,
                    m.start(),
                    m.end(),
                    self.confidence,
                    SpanSource::Pattern,
                    m.as_str(),
                )
            })
            .collect()
    }
}
