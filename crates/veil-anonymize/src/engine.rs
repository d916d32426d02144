//! The anonymization engine.
//!
//! Glues the pipeline together under one policy: detectors and the
//! optional recognizer produce candidates, the resolver picks a
//! non-overlapping cover, the tagger substitutes placeholder tags, the
//! vault seals the original values, and the validator checks the output.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use veil_core::{EntityRecord, PiiCategory, Policy, ResolvedEntity, SpanSource};
use veil_crypto::{EncryptedMap, KeyProvider, PiiVault};

use crate::detector::DetectorRegistry;
use crate::error::AnonymizeResult;
use crate::recognizer::EntityRecognizer;
use crate::rehydrate::{rehydrate_with, TagSyntax};
use crate::resolver::resolve;
use crate::tagger::{tag, TagOutput};
use crate::validator::{validate, ValidationOutcome};

/// Aggregate counters for one anonymization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationStats {
    /// Entity count per category.
    pub counts_by_category: BTreeMap<PiiCategory, usize>,
    /// Total number of tagged entities.
    pub total_entities: usize,
    /// Version reported by the recognizer, when one ran.
    pub model_version: Option<String>,
    /// Version string of the policy in force.
    pub policy_version: String,
    /// End-to-end wall clock time of the run.
    pub processing_time_ms: u64,
    /// Mirror of the validation outcome's leak flag.
    pub leak_scan_passed: Option<bool>,
}

/// Everything a caller gets back from one run.
///
/// The original values travel only inside `encrypted_map`; neither the
/// entity records nor the stats reproduce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationResult {
    /// Text with PII replaced by canonical tags.
    pub anonymized_text: String,
    /// Tagged entities, original values withheld.
    pub entities: Vec<EntityRecord>,
    /// The sealed plaintext map.
    pub encrypted_map: EncryptedMap,
    /// Structural validation and leak scan results.
    pub validation: ValidationOutcome,
    /// Run counters.
    pub stats: AnonymizationStats,
}

/// The anonymization pipeline under one policy and key source.
pub struct Anonymizer {
    policy: Policy,
    registry: DetectorRegistry,
    vault: PiiVault,
    keys: Box<dyn KeyProvider>,
    recognizer: Option<Box<dyn EntityRecognizer>>,
}

impl std::fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anonymizer")
            .field("policy", &self.policy)
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

impl Anonymizer {
    /// Creates an engine with the built-in detectors plus any custom and
    /// deny patterns the policy carries.
    ///
    /// # Errors
    ///
    /// Fails when the policy is inconsistent or a policy pattern does not
    /// compile.
    pub fn new(policy: Policy, keys: Box<dyn KeyProvider>) -> AnonymizeResult<Self> {
        Self::with_registry(policy, DetectorRegistry::with_builtins(), keys)
    }

    /// Creates an engine over an explicit detector registry.
    ///
    /// There is no process-wide registry; every engine owns its own, so
    /// documents can be processed on independent engines without shared
    /// state.
    pub fn with_registry(
        policy: Policy,
        mut registry: DetectorRegistry,
        keys: Box<dyn KeyProvider>,
    ) -> AnonymizeResult<Self> {
        policy.validate()?;
        registry.apply_policy_patterns(&policy)?;
        Ok(Self {
            policy,
            registry,
            vault: PiiVault::default(),
            keys,
            recognizer: None,
        })
    }

    /// Attaches an external recognizer for model-sourced categories.
    #[must_use]
    pub fn with_recognizer(mut self, recognizer: Box<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Returns the policy in force.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Runs the full pipeline over one text.
    ///
    /// # Errors
    ///
    /// Fails when the recognizer fails or the vault cannot seal the map.
    /// Validation findings are not errors; they are reported in the
    /// returned outcome.
    pub fn anonymize(&self, text: &str) -> AnonymizeResult<AnonymizationResult> {
        let started = Instant::now();

        let mut candidates = self.registry.find_all(text, &self.policy);
        let pattern_candidates = candidates.len();

        let mut model_version = None;
        if let Some(recognizer) = &self.recognizer {
            let prediction = recognizer.predict(text, &self.policy)?;
            model_version = Some(prediction.model_version);
            candidates.extend(prediction.spans.into_iter().filter(|span| {
                span.source == SpanSource::Model
                    && text.get(span.start..span.end).is_some()
                    && self.policy.accepts(span)
            }));
        }
        debug!(
            pattern_candidates,
            total_candidates = candidates.len(),
            "collected candidates"
        );

        let resolved = resolve(text, candidates, &self.policy);
        let TagOutput {
            tagged_text,
            entities,
            plaintext_map,
        } = tag(text, resolved, &self.policy);

        let key = self.keys.key()?;
        let encrypted_map = self.vault.encrypt(&plaintext_map, &key)?;
        let map_keys: BTreeSet<String> = plaintext_map.keys().map(str::to_owned).collect();
        drop(plaintext_map);

        let validation = validate(
            &tagged_text,
            &entities,
            &map_keys,
            &self.policy,
            &self.registry,
        );
        if !validation.valid {
            warn!(
                findings = validation.findings.len(),
                "validation found structural problems"
            );
        }
        if validation.leak_scan_passed == Some(false) {
            warn!(
                leaks = validation.leaks.len(),
                "leak scan flagged surviving text"
            );
        }

        let stats = AnonymizationStats {
            counts_by_category: count_by_category(&entities),
            total_entities: entities.len(),
            model_version,
            policy_version: self.policy.version.clone(),
            processing_time_ms: elapsed_ms(started),
            leak_scan_passed: validation.leak_scan_passed,
        };
        debug!(
            entities = stats.total_entities,
            elapsed_ms = stats.processing_time_ms,
            "anonymization complete"
        );

        Ok(AnonymizationResult {
            anonymized_text: tagged_text,
            entities: entities.iter().map(EntityRecord::from).collect(),
            encrypted_map,
            validation,
            stats,
        })
    }

    /// Anonymizes several documents sequentially, stopping on the first
    /// hard failure.
    ///
    /// # Errors
    ///
    /// Fails on the first document whose run fails.
    pub fn anonymize_batch(&self, texts: &[String]) -> AnonymizeResult<Vec<AnonymizationResult>> {
        texts.iter().map(|text| self.anonymize(text)).collect()
    }

    /// Anonymizes several documents in parallel. Documents share no
    /// mutable state, so this is a plain data-parallel map.
    ///
    /// # Errors
    ///
    /// Fails if any document's run fails.
    #[cfg(feature = "rayon")]
    pub fn anonymize_batch_parallel(
        &self,
        texts: &[String],
    ) -> AnonymizeResult<Vec<AnonymizationResult>> {
        use rayon::prelude::*;

        texts.par_iter().map(|text| self.anonymize(text)).collect()
    }

    /// Decrypts the map and restores original values into a tagged text
    /// using lenient tag matching.
    ///
    /// # Errors
    ///
    /// Fails when the key is wrong or the payload was tampered with.
    pub fn restore(&self, tagged: &str, encrypted: &EncryptedMap) -> AnonymizeResult<String> {
        self.restore_with(tagged, encrypted, TagSyntax::Lenient)
    }

    /// Restores with an explicit tag syntax.
    ///
    /// # Errors
    ///
    /// Fails when the key is wrong or the payload was tampered with.
    pub fn restore_with(
        &self,
        tagged: &str,
        encrypted: &EncryptedMap,
        syntax: TagSyntax,
    ) -> AnonymizeResult<String> {
        let key = self.keys.key()?;
        let map = self.vault.decrypt(encrypted, &key)?;
        Ok(rehydrate_with(tagged, &map, syntax))
    }
}

fn count_by_category(entities: &[ResolvedEntity]) -> BTreeMap<PiiCategory, usize> {
    let mut counts = BTreeMap::new();
    for entity in entities {
        *counts.entry(entity.category).or_insert(0) += 1;
    }
    counts
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnonymizeError;
    use crate::recognizer::Prediction;
    use veil_core::CandidateSpan;
    use veil_crypto::StaticKeyProvider;

    struct CannedRecognizer {
        spans: Vec<CandidateSpan>,
    }

    impl EntityRecognizer for CannedRecognizer {
        fn predict(&self, _text: &str, _policy: &Policy) -> AnonymizeResult<Prediction> {
            Ok(Prediction {
                spans: self.spans.clone(),
                processing_time_ms: 3,
                model_version: "test-model-1".to_string(),
            })
        }
    }

    struct OfflineRecognizer;

    impl EntityRecognizer for OfflineRecognizer {
        fn predict(&self, _text: &str, _policy: &Policy) -> AnonymizeResult<Prediction> {
            Err(AnonymizeError::Recognizer("endpoint offline".to_string()))
        }
    }

    fn engine() -> Anonymizer {
        Anonymizer::new(Policy::default(), Box::new(StaticKeyProvider::generate())).unwrap()
    }

    #[test]
    fn test_anonymize_and_restore_round_trip() {
        let text = "Schreiben Sie an max.mustermann@example.org oder rufen Sie \
                    +49 170 1234567 an. IBAN: DE89 3704 0044 0532 0130 00.";
        let engine = engine();

        let result = engine.anonymize(text).unwrap();

        assert!(!result.anonymized_text.contains("max.mustermann"));
        assert!(!result.anonymized_text.contains("1234567"));
        assert!(!result.anonymized_text.contains("DE89"));
        assert_eq!(result.stats.total_entities, 3);
        assert_eq!(
            result.stats.counts_by_category.get(&PiiCategory::Email),
            Some(&1)
        );
        assert_eq!(
            result.stats.counts_by_category.get(&PiiCategory::Phone),
            Some(&1)
        );
        assert_eq!(
            result.stats.counts_by_category.get(&PiiCategory::Iban),
            Some(&1)
        );
        assert!(result.validation.valid);
        assert_eq!(result.validation.leak_scan_passed, Some(true));

        let restored = engine
            .restore(&result.anonymized_text, &result.encrypted_map)
            .unwrap();
        assert_eq!(restored, text);
    }

    #[test]
    fn test_ids_count_up_from_one_in_document_order() {
        let text = "a@b.co then c@d.eu then e@f.org";
        let result = engine().anonymize(text).unwrap();

        let ids: Vec<u32> = result.entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(result.anonymized_text.contains("<PII type=\"EMAIL\" id=\"1\"/>"));
        assert!(result.anonymized_text.contains("<PII type=\"EMAIL\" id=\"3\"/>"));
    }

    #[test]
    fn test_entities_withhold_original_values() {
        let result = engine().anonymize("Mail: max@example.org").unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("max@example.org"));
    }

    #[test]
    fn test_model_spans_join_resolution() {
        let text = "Kunde Max Mustermann meldete sich";
        let recognizer = CannedRecognizer {
            spans: vec![CandidateSpan::new(
                PiiCategory::Person,
                6,
                20,
                0.92,
                SpanSource::Model,
                "Max Mustermann",
            )],
        };
        let engine = engine().with_recognizer(Box::new(recognizer));

        let result = engine.anonymize(text).unwrap();

        assert_eq!(result.stats.total_entities, 1);
        assert_eq!(result.entities[0].category, PiiCategory::Person);
        assert_eq!(result.entities[0].source, SpanSource::Model);
        assert_eq!(result.stats.model_version, Some("test-model-1".to_string()));
        assert_eq!(
            result.anonymized_text,
            "Kunde <PII type=\"PERSON\" id=\"1\"/> meldete sich"
        );
    }

    #[test]
    fn test_model_spans_with_bad_offsets_are_dropped() {
        let text = "kurz";
        let recognizer = CannedRecognizer {
            spans: vec![CandidateSpan::new(
                PiiCategory::Person,
                0,
                99,
                0.92,
                SpanSource::Model,
                "out of range",
            )],
        };
        let engine = engine().with_recognizer(Box::new(recognizer));

        let result = engine.anonymize(text).unwrap();

        assert_eq!(result.stats.total_entities, 0);
        assert_eq!(result.anonymized_text, text);
    }

    #[test]
    fn test_mislabeled_source_is_rejected() {
        // A recognizer claiming pattern provenance must not bypass the
        // model category gate.
        let text = "Kunde Max Mustermann meldete sich";
        let recognizer = CannedRecognizer {
            spans: vec![CandidateSpan::new(
                PiiCategory::Person,
                6,
                20,
                0.92,
                SpanSource::Pattern,
                "Max Mustermann",
            )],
        };
        let engine = engine().with_recognizer(Box::new(recognizer));

        let result = engine.anonymize(text).unwrap();

        assert_eq!(result.stats.total_entities, 0);
    }

    #[test]
    fn test_recognizer_failure_propagates() {
        let engine = engine().with_recognizer(Box::new(OfflineRecognizer));
        let err = engine.anonymize("anything").unwrap_err();
        assert!(matches!(err, AnonymizeError::Recognizer(_)));
        assert_eq!(err.code(), "ANON_RECOGNIZER_ERROR");
    }

    #[test]
    fn test_disabled_category_passes_through() {
        let policy = Policy::default().with_enabled_categories([PiiCategory::Phone]);
        let engine =
            Anonymizer::new(policy, Box::new(StaticKeyProvider::generate())).unwrap();

        let result = engine.anonymize("Mail: max@example.org").unwrap();

        assert_eq!(result.stats.total_entities, 0);
        assert_eq!(result.anonymized_text, "Mail: max@example.org");
        assert_eq!(result.validation.leak_scan_passed, Some(true));
    }

    #[test]
    fn test_allowlisted_term_is_not_tagged() {
        let policy = Policy::default().with_allowlist_term("support@example.com");
        let engine =
            Anonymizer::new(policy, Box::new(StaticKeyProvider::generate())).unwrap();

        let result = engine
            .anonymize("Write to support@example.com or max@example.org")
            .unwrap();

        assert_eq!(result.stats.total_entities, 1);
        assert!(result.anonymized_text.contains("support@example.com"));
        assert!(!result.anonymized_text.contains("max@example.org"));
        assert_eq!(result.validation.leak_scan_passed, Some(true));
    }

    #[test]
    fn test_leak_scan_flags_model_only_category_survivors() {
        let policy = Policy::default().with_pattern_categories([PiiCategory::Phone]);
        let engine =
            Anonymizer::new(policy, Box::new(StaticKeyProvider::generate())).unwrap();

        let result = engine
            .anonymize("Contact support or test@example.com for help")
            .unwrap();

        assert_eq!(result.stats.total_entities, 0);
        assert_eq!(result.validation.leak_scan_passed, Some(false));
        assert_eq!(result.validation.leaks.len(), 1);
        assert_eq!(result.validation.leaks[0].category, PiiCategory::Email);
        assert_eq!(result.stats.leak_scan_passed, Some(false));
        assert!(result.validation.valid);
    }

    #[test]
    fn test_batch_keeps_document_order() {
        let texts = vec![
            "first a@b.co".to_string(),
            "second c@d.eu".to_string(),
        ];
        let results = engine().anonymize_batch(&texts).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].anonymized_text.starts_with("first "));
        assert!(results[1].anonymized_text.starts_with("second "));
        assert_eq!(results[0].entities[0].id, 1);
        assert_eq!(results[1].entities[0].id, 1);
    }

    #[test]
    fn test_restore_with_strict_leaves_drifted_tags() {
        let engine = engine();
        let result = engine.anonymize("Mail: max@example.org").unwrap();
        let drifted = result.anonymized_text.replace("<PII", "<pii");

        let strict = engine
            .restore_with(&drifted, &result.encrypted_map, TagSyntax::Strict)
            .unwrap();
        assert_eq!(strict, drifted);

        let lenient = engine
            .restore(&drifted, &result.encrypted_map)
            .unwrap();
        assert_eq!(lenient, "Mail: max@example.org");
    }

    #[test]
    fn test_invalid_policy_is_rejected_at_construction() {
        let policy = Policy::default().with_threshold(PiiCategory::Email, 1.5);
        let err =
            Anonymizer::new(policy, Box::new(StaticKeyProvider::generate())).unwrap_err();
        assert!(matches!(err, AnonymizeError::Policy(_)));
    }

    #[test]
    fn test_bad_custom_pattern_is_rejected_at_construction() {
        let policy = Policy::default().with_custom_pattern(
            veil_core::CustomPattern::new("broken", PiiCategory::CaseId, "(unclosed"),
        );
        let err =
            Anonymizer::new(policy, Box::new(StaticKeyProvider::generate())).unwrap_err();
        assert!(matches!(err, AnonymizeError::PatternCompilation(_)));
    }
}
