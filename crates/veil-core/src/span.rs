//! Candidate spans and resolved entities.

use serde::{Deserialize, Serialize};

use crate::category::PiiCategory;
use crate::map::map_key;

/// Origin of a candidate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanSource {
    /// Produced by a structural pattern detector.
    Pattern,
    /// Produced by the external entity recognizer.
    Model,
}

/// A scored PII detection candidate.
///
/// `start`/`end` are half-open UTF-8 byte offsets into the original text,
/// always on `char` boundaries. Candidates are per-call values and are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpan {
    /// Detected category.
    pub category: PiiCategory,
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// Where the candidate came from.
    pub source: SpanSource,
    /// The matched text.
    pub text: String,
}

impl CandidateSpan {
    /// Creates a candidate span.
    pub fn new(
        category: PiiCategory,
        start: usize,
        end: usize,
        confidence: f64,
        source: SpanSource,
        text: impl Into<String>,
    ) -> Self {
        Self {
            category,
            start,
            end,
            confidence,
            source,
            text: text.into(),
        }
    }

    /// Span length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true for an empty span.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if the two spans overlap.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A resolved span with its assigned identifier.
///
/// Invariant: across all entities of one document, no two spans overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Stable identifier, `>= 1`.
    pub id: u32,
    /// Detected category.
    pub category: PiiCategory,
    /// Start offset into the original text (inclusive).
    pub start: usize,
    /// End offset into the original text (exclusive).
    pub end: usize,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// Where the candidate came from.
    pub source: SpanSource,
    /// The matched text.
    pub text: String,
}

impl ResolvedEntity {
    /// Attaches an identifier to a candidate span.
    #[must_use]
    pub fn from_span(id: u32, span: CandidateSpan) -> Self {
        Self {
            id,
            category: span.category,
            start: span.start,
            end: span.end,
            confidence: span.confidence,
            source: span.source,
            text: span.text,
        }
    }

    /// Returns the `"{CATEGORY}_{id}"` key for this entity.
    #[must_use]
    pub fn map_key(&self) -> String {
        map_key(self.category, self.id)
    }

    /// Returns true if the two entities' spans overlap.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Caller-facing view of a resolved entity.
///
/// The matched text is withheld; original values travel only inside the
/// encrypted map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Stable identifier, `>= 1`.
    pub id: u32,
    /// Detected category.
    pub category: PiiCategory,
    /// Start offset into the original text (inclusive).
    pub start: usize,
    /// End offset into the original text (exclusive).
    pub end: usize,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// Where the candidate came from.
    pub source: SpanSource,
}

impl From<&ResolvedEntity> for EntityRecord {
    fn from(entity: &ResolvedEntity) -> Self {
        Self {
            id: entity.id,
            category: entity.category,
            start: entity.start,
            end: entity.end,
            confidence: entity.confidence,
            source: entity.source,
        }
    }
}
