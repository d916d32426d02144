//! # Veil Anonymize
//!
//! The PII tagging pipeline: structural detectors, span resolution,
//! placeholder-tag substitution, restoration, and output validation,
//! with original values sealed in an encrypted map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod checksum;

pub mod detector;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod recognizer;
pub mod rehydrate;
pub mod resolver;
pub mod tagger;
pub mod validator;

pub use detector::{Detector, DetectorRegistry};
pub use engine::{AnonymizationResult, AnonymizationStats, Anonymizer};
pub use error::{AnonymizeError, AnonymizeResult};
pub use recognizer::{EntityRecognizer, Prediction};
pub use rehydrate::{rehydrate, rehydrate_with, TagSyntax};
pub use resolver::resolve;
pub use tagger::{canonical_tag, tag, TagOutput};
pub use validator::{validate, FindingKind, LeakRecord, ValidationFinding, ValidationOutcome};

/// Re-export common types.
pub use veil_core::{
    map_key, CandidateSpan, CustomPattern, DenyPattern, EntityRecord, PatternValidator,
    PiiCategory, PlaintextMap, Policy, ResolvedEntity, SpanSource,
};
pub use veil_crypto::{EncryptedMap, KeyProvider, PiiVault, SecureKey, StaticKeyProvider};
