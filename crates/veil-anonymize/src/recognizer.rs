//! External recognizer contract.

use serde::{Deserialize, Serialize};

use veil_core::{CandidateSpan, Policy};

use crate::error::AnonymizeResult;

/// Model-produced spans for one input text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Candidate spans, expected with `SpanSource::Model`.
    pub spans: Vec<CandidateSpan>,
    /// Inference time reported by the recognizer.
    pub processing_time_ms: u64,
    /// Identifier of the model that produced the spans.
    pub model_version: String,
}

/// A source of model-detected spans.
///
/// The pipeline makes no assumption about how spans are computed; an
/// implementation may call a local model, a remote service, or return
/// canned spans in tests. The contract is synchronous: timeouts, retries,
/// and cancellation live behind this boundary, not in the pipeline.
pub trait EntityRecognizer: Send + Sync {
    /// Detects entities in `text` under the given policy.
    fn predict(&self, text: &str, policy: &Policy) -> AnonymizeResult<Prediction>;
}
