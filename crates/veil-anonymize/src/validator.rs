//! Post-tagging structural checks and the leak scan.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use veil_core::{map_key, PiiCategory, Policy, ResolvedEntity};

use crate::detector::DetectorRegistry;
use crate::rehydrate::STRICT_TAG;

/// Classes of validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    /// Two entity spans overlap.
    OverlappingEntities,
    /// One `(category, id)` pair carries more than one distinct text.
    DuplicateIds,
    /// A tag marker does not parse as a closed canonical tag.
    MalformedTag,
    /// Tag occurrences and entity records disagree for a `(category, id)`.
    IdMismatch,
    /// An entity has no plaintext map entry.
    MissingInMap,
    /// Detectable PII survived in the tagged text. Advisory.
    PotentialPiiLeak,
}

impl FindingKind {
    /// Returns the stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OverlappingEntities => "OVERLAPPING_ENTITIES",
            Self::DuplicateIds => "DUPLICATE_IDS",
            Self::MalformedTag => "MALFORMED_TAG",
            Self::IdMismatch => "ID_MISMATCH",
            Self::MissingInMap => "MISSING_IN_MAP",
            Self::PotentialPiiLeak => "POTENTIAL_PII_LEAK",
        }
    }
}

/// A single validation finding.
///
/// Messages and details carry identifiers, positions, and counts; original
/// values never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    /// What went wrong.
    pub kind: FindingKind,
    /// Human-readable description.
    pub message: String,
    /// Structured positions, keys, and counts.
    pub details: serde_json::Value,
}

/// A span in the tagged text that still looks like PII.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakRecord {
    /// Suspected category.
    pub category: PiiCategory,
    /// Start offset into the tagged text.
    pub start: usize,
    /// End offset into the tagged text.
    pub end: usize,
    /// The surviving text, as it already stands in the tagged output.
    pub text: String,
}

/// Aggregated result of all validation checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// True when no structural finding was raised. Leak findings are
    /// advisory and do not affect this flag.
    pub valid: bool,
    /// Every finding from every check; nothing short-circuits.
    pub findings: Vec<ValidationFinding>,
    /// `Some(true)` when the leak scan ran clean, `Some(false)` when it
    /// flagged text, `None` when the policy disabled it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leak_scan_passed: Option<bool>,
    /// Surviving PII-shaped spans found by the leak scan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leaks: Vec<LeakRecord>,
}

static TAG_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*pii").expect("tag opener pattern is valid"));

/// Runs every structural check plus the optional leak scan.
///
/// All checks run to completion so a caller sees every problem at once.
/// `map_keys` is the key set of the plaintext map; the values themselves
/// are not needed for validation and are not passed in.
#[must_use]
pub fn validate(
    tagged_text: &str,
    entities: &[ResolvedEntity],
    map_keys: &BTreeSet<String>,
    policy: &Policy,
    registry: &DetectorRegistry,
) -> ValidationOutcome {
    let mut findings = Vec::new();

    check_overlaps(entities, &mut findings);
    check_id_uniqueness(entities, &mut findings);
    check_well_formedness(tagged_text, &mut findings);
    check_tag_consistency(tagged_text, entities, &mut findings);
    check_map_completeness(entities, map_keys, &mut findings);

    let (leak_scan_passed, leaks) = if policy.enable_leak_scan {
        let leaks = scan_for_leaks(tagged_text, policy, registry);
        for leak in &leaks {
            findings.push(ValidationFinding {
                kind: FindingKind::PotentialPiiLeak,
                message: format!(
                    "{} shaped text survived at {}..{}",
                    leak.category, leak.start, leak.end
                ),
                details: json!({
                    "category": leak.category,
                    "start": leak.start,
                    "end": leak.end,
                }),
            });
        }
        (Some(leaks.is_empty()), leaks)
    } else {
        (None, Vec::new())
    };

    let valid = findings
        .iter()
        .all(|finding| finding.kind == FindingKind::PotentialPiiLeak);

    ValidationOutcome {
        valid,
        findings,
        leak_scan_passed,
        leaks,
    }
}

/// Pairwise overlap test, reporting every offending pair.
fn check_overlaps(entities: &[ResolvedEntity], findings: &mut Vec<ValidationFinding>) {
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            if entities[i].overlaps(&entities[j]) {
                findings.push(ValidationFinding {
                    kind: FindingKind::OverlappingEntities,
                    message: format!(
                        "entities {} and {} overlap",
                        entities[i].map_key(),
                        entities[j].map_key()
                    ),
                    details: json!({
                        "first": {
                            "key": entities[i].map_key(),
                            "start": entities[i].start,
                            "end": entities[i].end,
                        },
                        "second": {
                            "key": entities[j].map_key(),
                            "start": entities[j].start,
                            "end": entities[j].end,
                        },
                    }),
                });
            }
        }
    }
}

/// One ID on several distinct texts is an error; identical texts are the
/// ID-reuse policy at work.
fn check_id_uniqueness(entities: &[ResolvedEntity], findings: &mut Vec<ValidationFinding>) {
    let mut texts_by_key: BTreeMap<(PiiCategory, u32), BTreeSet<&str>> = BTreeMap::new();
    for entity in entities {
        texts_by_key
            .entry((entity.category, entity.id))
            .or_default()
            .insert(entity.text.as_str());
    }
    for ((category, id), texts) in texts_by_key {
        if texts.len() > 1 {
            findings.push(ValidationFinding {
                kind: FindingKind::DuplicateIds,
                message: format!(
                    "id {id} for {category} is shared by {} distinct values",
                    texts.len()
                ),
                details: json!({
                    "key": map_key(category, id),
                    "distinct_values": texts.len(),
                }),
            });
        }
    }
}

/// Every tag marker must align with a canonical tag match.
fn check_well_formedness(tagged_text: &str, findings: &mut Vec<ValidationFinding>) {
    let canonical_starts: BTreeSet<usize> = STRICT_TAG
        .find_iter(tagged_text)
        .map(|m| m.start())
        .collect();
    for opener in TAG_OPENER.find_iter(tagged_text) {
        if !canonical_starts.contains(&opener.start()) {
            findings.push(ValidationFinding {
                kind: FindingKind::MalformedTag,
                message: format!(
                    "tag marker at {} does not parse as a canonical tag",
                    opener.start()
                ),
                details: json!({ "position": opener.start() }),
            });
        }
    }
}

/// Canonical tag instances must match entity records one to one.
fn check_tag_consistency(
    tagged_text: &str,
    entities: &[ResolvedEntity],
    findings: &mut Vec<ValidationFinding>,
) {
    let mut tag_counts: HashMap<(PiiCategory, u32), usize> = HashMap::new();
    for caps in STRICT_TAG.captures_iter(tagged_text) {
        let (Some(type_m), Some(id_m)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let (Ok(category), Ok(id)) = (
            type_m.as_str().parse::<PiiCategory>(),
            id_m.as_str().parse::<u32>(),
        ) else {
            continue;
        };
        *tag_counts.entry((category, id)).or_insert(0) += 1;
    }

    let mut entity_counts: BTreeMap<(PiiCategory, u32), usize> = BTreeMap::new();
    for entity in entities {
        *entity_counts.entry((entity.category, entity.id)).or_insert(0) += 1;
    }

    let mut all_keys: BTreeSet<(PiiCategory, u32)> = entity_counts.keys().copied().collect();
    all_keys.extend(tag_counts.keys().copied());

    for (category, id) in all_keys {
        let found = tag_counts.get(&(category, id)).copied().unwrap_or(0);
        let expected = entity_counts.get(&(category, id)).copied().unwrap_or(0);
        if found != expected {
            findings.push(ValidationFinding {
                kind: FindingKind::IdMismatch,
                message: format!(
                    "{} appears in {found} tags but {expected} entities",
                    map_key(category, id)
                ),
                details: json!({
                    "key": map_key(category, id),
                    "tags": found,
                    "entities": expected,
                }),
            });
        }
    }
}

fn check_map_completeness(
    entities: &[ResolvedEntity],
    map_keys: &BTreeSet<String>,
    findings: &mut Vec<ValidationFinding>,
) {
    let mut reported: BTreeSet<String> = BTreeSet::new();
    for entity in entities {
        let key = entity.map_key();
        if !map_keys.contains(&key) && reported.insert(key.clone()) {
            findings.push(ValidationFinding {
                kind: FindingKind::MissingInMap,
                message: format!("{key} has no plaintext map entry"),
                details: json!({ "key": key }),
            });
        }
    }
}

/// Re-runs the structural detectors over the tagged text, skipping matches
/// that start inside a placeholder tag.
fn scan_for_leaks(
    tagged_text: &str,
    policy: &Policy,
    registry: &DetectorRegistry,
) -> Vec<LeakRecord> {
    registry
        .scan(tagged_text, policy)
        .into_iter()
        .filter(|span| !inside_tag(tagged_text, span.start))
        .map(|span| LeakRecord {
            category: span.category,
            start: span.start,
            end: span.end,
            text: span.text,
        })
        .collect()
}

/// A position is inside a tag when it lies strictly between the nearest
/// preceding `<` and that marker's `>`. Heuristic, not a parser; the tag
/// grammar never emits a literal `>` in attribute values.
fn inside_tag(text: &str, pos: usize) -> bool {
    let Some(open) = text[..pos].rfind('<') else {
        return false;
    };
    match text[open..].find('>') {
        Some(relative) => pos < open + relative,
        None => false,
    }
}
