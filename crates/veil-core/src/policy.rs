//! Detection and tagging policy.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::category::PiiCategory;
use crate::error::PolicyError;
use crate::span::{CandidateSpan, SpanSource};

/// Default category priority, lowest first.
///
/// Later entries outrank earlier ones when the resolver breaks ties between
/// same-length, same-confidence spans. Checksummed categories sit at the end
/// so they win against fuzzier ones.
pub const DEFAULT_CATEGORY_PRIORITY: [PiiCategory; 17] = [
    PiiCategory::Person,
    PiiCategory::Organization,
    PiiCategory::Location,
    PiiCategory::DateOfBirth,
    PiiCategory::Address,
    PiiCategory::Url,
    PiiCategory::Phone,
    PiiCategory::IpAddress,
    PiiCategory::AccountNumber,
    PiiCategory::CaseId,
    PiiCategory::CustomerId,
    PiiCategory::TaxId,
    PiiCategory::NationalId,
    PiiCategory::Bic,
    PiiCategory::Email,
    PiiCategory::Iban,
    PiiCategory::CreditCard,
];

/// Named checksum validators available to custom patterns.
///
/// Custom patterns reference validators by name so policies stay
/// serializable; the detector layer resolves the name to the actual check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternValidator {
    /// Luhn mod-10 check over the digits of the match.
    Luhn,
    /// ISO 13616 mod-97 check over the match.
    IbanMod97,
    /// Requires at least one ASCII digit in the match.
    Digits,
}

/// A policy-supplied detection pattern for domain-specific identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPattern {
    /// Pattern name, used in diagnostics.
    pub name: String,
    /// Category assigned to matches.
    pub category: PiiCategory,
    /// Regular expression source.
    pub pattern: String,
    /// Confidence attached to matches.
    pub confidence: f64,
    /// Optional named structural check applied to each match.
    pub validator: Option<PatternValidator>,
}

impl CustomPattern {
    /// Creates a pattern with confidence 0.85 and no validator.
    pub fn new(
        name: impl Into<String>,
        category: PiiCategory,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            pattern: pattern.into(),
            confidence: 0.85,
            validator: None,
        }
    }

    /// Sets the confidence attached to matches.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sets a named structural check.
    #[must_use]
    pub fn with_validator(mut self, validator: PatternValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// A force-include pattern.
///
/// Matches bypass threshold and allowlist filtering and are reported with
/// confidence 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenyPattern {
    /// Pattern name, used in diagnostics.
    pub name: String,
    /// Category assigned to matches.
    pub category: PiiCategory,
    /// Regular expression source.
    pub pattern: String,
}

impl DenyPattern {
    /// Creates a force-include pattern.
    pub fn new(
        name: impl Into<String>,
        category: PiiCategory,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            pattern: pattern.into(),
        }
    }
}

/// Immutable per-run configuration for detection, resolution, and tagging.
///
/// Built once via the `with_*` methods (or deserialized from JSON) and read
/// only during processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Policy version string, echoed into result stats.
    pub version: String,
    /// Categories eligible for tagging at all.
    pub enabled_categories: HashSet<PiiCategory>,
    /// Categories accepted from pattern detectors.
    pub pattern_enabled_categories: HashSet<PiiCategory>,
    /// Categories accepted from the external recognizer.
    pub model_enabled_categories: HashSet<PiiCategory>,
    /// Priority order for resolver tie-breaks; later entries outrank earlier.
    pub category_priority: Vec<PiiCategory>,
    /// Per-category confidence thresholds; absent categories use defaults.
    pub confidence_thresholds: HashMap<PiiCategory, f64>,
    /// Additional detection patterns.
    pub custom_patterns: Vec<CustomPattern>,
    /// Case-insensitive exact-text suppression list.
    pub allowlist_terms: HashSet<String>,
    /// Force-include patterns.
    pub denylist_patterns: Vec<DenyPattern>,
    /// Reuse the earlier ID when the same (category, text) pair repeats.
    pub reuse_ids_for_repeated_text: bool,
    /// Run the post-tagging leak scan.
    pub enable_leak_scan: bool,
}

impl Default for Policy {
    fn default() -> Self {
        let all: HashSet<PiiCategory> = PiiCategory::ALL.into_iter().collect();
        Self {
            version: "default".to_string(),
            enabled_categories: all.clone(),
            pattern_enabled_categories: all.clone(),
            model_enabled_categories: all,
            category_priority: DEFAULT_CATEGORY_PRIORITY.to_vec(),
            confidence_thresholds: HashMap::new(),
            custom_patterns: Vec::new(),
            allowlist_terms: HashSet::new(),
            denylist_patterns: Vec::new(),
            reuse_ids_for_repeated_text: false,
            enable_leak_scan: true,
        }
    }
}

impl Policy {
    /// Creates the default policy: all categories enabled, default
    /// thresholds, leak scan on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// High-precision preset: thresholds raised to 0.8 (0.9 for person and
    /// organization), leak scan on.
    #[must_use]
    pub fn strict() -> Self {
        let mut policy = Self::default();
        for category in PiiCategory::ALL {
            let threshold = match category {
                PiiCategory::Person | PiiCategory::Organization => 0.9,
                _ => 0.8,
            };
            policy.confidence_thresholds.insert(category, threshold);
        }
        policy.version = "strict".to_string();
        policy
    }

    /// High-recall preset: thresholds lowered to 0.3, leak scan off.
    #[must_use]
    pub fn permissive() -> Self {
        let mut policy = Self::default();
        for category in PiiCategory::ALL {
            policy.confidence_thresholds.insert(category, 0.3);
        }
        policy.enable_leak_scan = false;
        policy.version = "permissive".to_string();
        policy
    }

    /// Sets the policy version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replaces the enabled category set.
    #[must_use]
    pub fn with_enabled_categories(
        mut self,
        categories: impl IntoIterator<Item = PiiCategory>,
    ) -> Self {
        self.enabled_categories = categories.into_iter().collect();
        self
    }

    /// Replaces the set of categories accepted from pattern detectors.
    #[must_use]
    pub fn with_pattern_categories(
        mut self,
        categories: impl IntoIterator<Item = PiiCategory>,
    ) -> Self {
        self.pattern_enabled_categories = categories.into_iter().collect();
        self
    }

    /// Replaces the set of categories accepted from the recognizer.
    #[must_use]
    pub fn with_model_categories(
        mut self,
        categories: impl IntoIterator<Item = PiiCategory>,
    ) -> Self {
        self.model_enabled_categories = categories.into_iter().collect();
        self
    }

    /// Replaces the category priority order (later = higher priority).
    #[must_use]
    pub fn with_category_priority(mut self, priority: Vec<PiiCategory>) -> Self {
        self.category_priority = priority;
        self
    }

    /// Sets the confidence threshold for one category.
    #[must_use]
    pub fn with_threshold(mut self, category: PiiCategory, threshold: f64) -> Self {
        self.confidence_thresholds.insert(category, threshold);
        self
    }

    /// Adds a custom detection pattern.
    #[must_use]
    pub fn with_custom_pattern(mut self, pattern: CustomPattern) -> Self {
        self.custom_patterns.push(pattern);
        self
    }

    /// Adds a case-insensitive allowlist term.
    #[must_use]
    pub fn with_allowlist_term(mut self, term: impl Into<String>) -> Self {
        self.allowlist_terms.insert(term.into().to_lowercase());
        self
    }

    /// Adds a force-include pattern.
    #[must_use]
    pub fn with_deny_pattern(mut self, pattern: DenyPattern) -> Self {
        self.denylist_patterns.push(pattern);
        self
    }

    /// Enables or disables ID reuse for repeated (category, text) pairs.
    #[must_use]
    pub fn with_id_reuse(mut self, reuse: bool) -> Self {
        self.reuse_ids_for_repeated_text = reuse;
        self
    }

    /// Enables or disables the post-tagging leak scan.
    #[must_use]
    pub fn with_leak_scan(mut self, enabled: bool) -> Self {
        self.enable_leak_scan = enabled;
        self
    }

    /// Returns the effective confidence threshold for a category.
    #[must_use]
    pub fn threshold(&self, category: PiiCategory) -> f64 {
        self.confidence_thresholds
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_threshold())
    }

    /// Returns the priority rank of a category.
    ///
    /// Higher rank wins resolver tie-breaks; categories absent from the
    /// priority list rank below every listed one.
    #[must_use]
    pub fn priority_rank(&self, category: PiiCategory) -> i64 {
        self.category_priority
            .iter()
            .position(|entry| *entry == category)
            .map_or(-1, |index| i64::try_from(index).unwrap_or(i64::MAX))
    }

    /// Returns true if the exact text is allowlisted (case-insensitive).
    #[must_use]
    pub fn is_allowlisted(&self, text: &str) -> bool {
        if self.allowlist_terms.is_empty() {
            return false;
        }
        let needle = text.to_lowercase();
        self.allowlist_terms
            .iter()
            .any(|term| term.to_lowercase() == needle)
    }

    /// Returns true if a candidate passes category, source, threshold, and
    /// allowlist filtering.
    ///
    /// Applied uniformly to pattern candidates (by the registry) and model
    /// candidates (by the engine). Force-include matches skip this check.
    #[must_use]
    pub fn accepts(&self, span: &CandidateSpan) -> bool {
        if !self.enabled_categories.contains(&span.category) {
            return false;
        }
        let source_enabled = match span.source {
            SpanSource::Pattern => self.pattern_enabled_categories.contains(&span.category),
            SpanSource::Model => self.model_enabled_categories.contains(&span.category),
        };
        if !source_enabled {
            return false;
        }
        if span.confidence < self.threshold(span.category) {
            return false;
        }
        !self.is_allowlisted(&span.text)
    }

    /// Returns true if a span found during the leak scan is worth flagging.
    ///
    /// The leak scan ignores the pattern/model source gates: a category that
    /// is enabled but routed exclusively through the recognizer still counts
    /// as leaked when its shape survives in the tagged text.
    #[must_use]
    pub fn flags_leak(&self, span: &CandidateSpan) -> bool {
        self.enabled_categories.contains(&span.category)
            && span.confidence >= self.threshold(span.category)
            && !self.is_allowlisted(&span.text)
    }

    /// Validates threshold and pattern fields.
    ///
    /// # Errors
    /// Returns the first structural problem found. Pattern compilation is
    /// checked later, at detector registration.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (category, value) in &self.confidence_thresholds {
            if !(0.0..=1.0).contains(value) {
                return Err(PolicyError::InvalidThreshold {
                    category: category.as_str().to_string(),
                    value: *value,
                });
            }
        }
        for pattern in &self.custom_patterns {
            if pattern.pattern.is_empty() {
                return Err(PolicyError::EmptyPattern {
                    name: pattern.name.clone(),
                });
            }
            if !(0.0..=1.0).contains(&pattern.confidence) {
                return Err(PolicyError::InvalidConfidence {
                    name: pattern.name.clone(),
                    value: pattern.confidence,
                });
            }
        }
        for pattern in &self.denylist_patterns {
            if pattern.pattern.is_empty() {
                return Err(PolicyError::EmptyPattern {
                    name: pattern.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_span(category: PiiCategory, confidence: f64, text: &str) -> CandidateSpan {
        CandidateSpan::new(category, 0, text.len(), confidence, SpanSource::Pattern, text)
    }

    #[test]
    fn test_default_thresholds_apply() {
        let policy = Policy::default();
        assert_eq!(policy.threshold(PiiCategory::Email), 0.5);
        assert_eq!(policy.threshold(PiiCategory::Person), 0.7);
    }

    #[test]
    fn test_explicit_threshold_overrides_default() {
        let policy = Policy::default().with_threshold(PiiCategory::Email, 0.9);
        assert_eq!(policy.threshold(PiiCategory::Email), 0.9);
    }

    #[test]
    fn test_accepts_applies_threshold_and_source() {
        let policy = Policy::default();
        assert!(policy.accepts(&pattern_span(PiiCategory::Email, 0.95, "a@b.co")));
        assert!(!policy.accepts(&pattern_span(PiiCategory::Email, 0.4, "a@b.co")));

        let no_pattern_email = Policy::default().with_pattern_categories([PiiCategory::Phone]);
        assert!(!no_pattern_email.accepts(&pattern_span(PiiCategory::Email, 0.95, "a@b.co")));
    }

    #[test]
    fn test_allowlist_suppression_is_case_insensitive() {
        let policy = Policy::default().with_allowlist_term("Test@Example.COM");
        assert!(policy.is_allowlisted("test@example.com"));
        assert!(!policy.accepts(&pattern_span(
            PiiCategory::Email,
            0.95,
            "test@example.com"
        )));
    }

    #[test]
    fn test_priority_rank_orders_later_higher() {
        let policy = Policy::default()
            .with_category_priority(vec![PiiCategory::Phone, PiiCategory::Email]);
        assert!(policy.priority_rank(PiiCategory::Email) > policy.priority_rank(PiiCategory::Phone));
        assert_eq!(policy.priority_rank(PiiCategory::Iban), -1);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let policy = Policy::default().with_threshold(PiiCategory::Email, 1.5);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_pattern() {
        let policy = Policy::default()
            .with_custom_pattern(CustomPattern::new("empty", PiiCategory::CaseId, ""));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_policy_round_trips_through_json() {
        let policy = Policy::default()
            .with_threshold(PiiCategory::Email, 0.6)
            .with_allowlist_term("support@example.com")
            .with_custom_pattern(
                CustomPattern::new("case-ref", PiiCategory::CaseId, r"CASE-\d{6}")
                    .with_validator(PatternValidator::Digits),
            )
            .with_id_reuse(true);

        let json = serde_json::to_string(&policy).unwrap();
        let back: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.threshold(PiiCategory::Email), 0.6);
        assert!(back.reuse_ids_for_repeated_text);
        assert_eq!(back.custom_patterns.len(), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let policy: Policy = serde_json::from_str(r#"{"version": "v2"}"#).unwrap();
        assert_eq!(policy.version, "v2");
        assert!(policy.enable_leak_scan);
        assert!(!policy.reuse_ids_for_repeated_text);
        assert_eq!(policy.enabled_categories.len(), PiiCategory::ALL.len());
    }

    #[test]
    fn test_presets() {
        let strict = Policy::strict();
        assert_eq!(strict.threshold(PiiCategory::Person), 0.9);
        assert_eq!(strict.threshold(PiiCategory::Email), 0.8);
        assert!(strict.enable_leak_scan);

        let permissive = Policy::permissive();
        assert_eq!(permissive.threshold(PiiCategory::Person), 0.3);
        assert!(!permissive.enable_leak_scan);
    }
}
