//! # Veil Core
//!
//! Domain types for the Veil PII tagging pipeline:
//! - The closed `PiiCategory` set
//! - Candidate spans and resolved entities
//! - The plaintext original-value map
//! - The detection policy

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod category;
pub mod error;
pub mod map;
pub mod policy;
pub mod span;

pub use category::PiiCategory;
pub use error::{CategoryParseError, PolicyError};
pub use map::{map_key, PlaintextMap};
pub use policy::{CustomPattern, DenyPattern, PatternValidator, Policy, DEFAULT_CATEGORY_PRIORITY};
pub use span::{CandidateSpan, EntityRecord, ResolvedEntity, SpanSource};
