//! Detector trait and registry.

use tracing::warn;

use veil_core::{CandidateSpan, PiiCategory, Policy};

use crate::detectors::{
    BicDetector, CardDetector, EmailDetector, IbanDetector, IpDetector, PatternDetector,
    PhoneDetector, UrlDetector,
};
use crate::error::AnonymizeResult;

/// A stateless, single-category span finder.
///
/// Detectors own their structural validation and normalization; a candidate
/// that fails a checksum or plausibility check is silently dropped rather
/// than surfaced as an error. Implementations must not share mutable state
/// so they can run in any order or in parallel.
pub trait Detector: Send + Sync {
    /// Category this detector reports.
    fn category(&self) -> PiiCategory;

    /// Finds candidate spans with byte offsets into `text`.
    fn find(&self, text: &str) -> Vec<CandidateSpan>;
}

/// Drops duplicate `(start, end)` spans, keeping the highest confidence.
///
/// Detectors with overlapping sub-patterns call this before returning so the
/// registry never sees the same range twice from one detector.
pub(crate) fn dedupe_spans(spans: &mut Vec<CandidateSpan>) {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.end.cmp(&b.end))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
    spans.dedup_by(|next, prev| prev.start == next.start && prev.end == next.end);
}

struct RegistryEntry {
    detector: Box<dyn Detector>,
    /// Force-include entries bypass policy filtering entirely.
    forced: bool,
}

/// Aggregates detectors and runs them under a policy.
///
/// Registries are plain values meant to be constructed by the caller and
/// passed in, not shared as a process-wide singleton.
#[derive(Default)]
pub struct DetectorRegistry {
    entries: Vec<RegistryEntry>,
}

impl DetectorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in detector registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EmailDetector));
        registry.register(Box::new(PhoneDetector));
        registry.register(Box::new(IbanDetector));
        registry.register(Box::new(BicDetector));
        registry.register(Box::new(CardDetector));
        registry.register(Box::new(IpDetector));
        registry.register(Box::new(UrlDetector));
        registry
    }

    /// Registers a detector subject to policy filtering.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.entries.push(RegistryEntry {
            detector,
            forced: false,
        });
    }

    /// Registers a detector whose matches bypass policy filtering.
    pub fn register_forced(&mut self, detector: Box<dyn Detector>) {
        self.entries.push(RegistryEntry {
            detector,
            forced: true,
        });
    }

    /// Compiles and registers the policy's custom and force-include patterns.
    ///
    /// # Errors
    /// Returns `PatternCompilation` for the first pattern that is not a valid
    /// regular expression; the failure is also logged at warn level with the
    /// pattern's name.
    pub fn apply_policy_patterns(&mut self, policy: &Policy) -> AnonymizeResult<()> {
        for pattern in &policy.custom_patterns {
            let detector = PatternDetector::compile(pattern).map_err(|err| {
                warn!(pattern = %pattern.name, %err, "custom pattern failed to compile");
                err
            })?;
            self.register(Box::new(detector));
        }
        for pattern in &policy.denylist_patterns {
            let detector = PatternDetector::compile_deny(pattern).map_err(|err| {
                warn!(pattern = %pattern.name, %err, "deny pattern failed to compile");
                err
            })?;
            self.register_forced(Box::new(detector));
        }
        Ok(())
    }

    /// Number of registered detectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no detector is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every detector and filters candidates through the policy.
    ///
    /// Force-include matches skip the filter. Candidate order is sorted by
    /// position for determinism, though the resolver does not rely on it.
    #[must_use]
    pub fn find_all(&self, text: &str, policy: &Policy) -> Vec<CandidateSpan> {
        let mut candidates = Vec::new();
        for entry in &self.entries {
            for span in entry.detector.find(text) {
                if entry.forced || policy.accepts(&span) {
                    candidates.push(span);
                }
            }
        }
        candidates.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
        candidates
    }

    /// Runs every detector with the leak-scan filter instead of the full
    /// acceptance filter.
    ///
    /// Source gating is deliberately ignored here so that a category routed
    /// through the recognizer still gets flagged when its shape survives in
    /// tagged output.
    #[must_use]
    pub fn scan(&self, text: &str, policy: &Policy) -> Vec<CandidateSpan> {
        let mut candidates = Vec::new();
        for entry in &self.entries {
            for span in entry.detector.find(text) {
                if entry.forced || policy.flags_leak(&span) {
                    candidates.push(span);
                }
            }
        }
        candidates.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
        candidates
    }
}
