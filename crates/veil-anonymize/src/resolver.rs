//! Span resolution into a non-overlapping cover.

use std::cmp::Ordering;

use veil_core::{CandidateSpan, Policy};

/// Resolves candidate spans into a maximal non-overlapping set.
///
/// Candidates are sorted ascending by start, longest first on ties, then
/// walked with an accept/evict preference: a challenger must beat every
/// accepted span it overlaps (longer wins, then higher confidence, then
/// higher category priority; a full tie keeps the incumbent). Afterwards
/// adjacent spans of the same category separated by at most one whitespace
/// character are merged, averaging confidence pairwise left to right. The
/// result is sorted by position and contains no overlapping pair.
#[must_use]
pub fn resolve(text: &str, candidates: Vec<CandidateSpan>, policy: &Policy) -> Vec<CandidateSpan> {
    let mut sorted = candidates;
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.len().cmp(&a.len())));

    let mut accepted: Vec<CandidateSpan> = Vec::new();
    for candidate in sorted {
        let overlapping: Vec<usize> = accepted
            .iter()
            .enumerate()
            .filter(|(_, span)| span.overlaps(&candidate))
            .map(|(index, _)| index)
            .collect();

        if overlapping.is_empty() {
            accepted.push(candidate);
            continue;
        }

        if overlapping
            .iter()
            .all(|&index| beats(&candidate, &accepted[index], policy))
        {
            for &index in overlapping.iter().rev() {
                accepted.remove(index);
            }
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|span| span.start);
    merge_adjacent(text, accepted)
}

fn beats(challenger: &CandidateSpan, incumbent: &CandidateSpan, policy: &Policy) -> bool {
    if challenger.len() != incumbent.len() {
        return challenger.len() > incumbent.len();
    }
    match challenger.confidence.total_cmp(&incumbent.confidence) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            policy.priority_rank(challenger.category) > policy.priority_rank(incumbent.category)
        }
    }
}

/// Absorbs entity fragments split by a detector's tokenization.
fn merge_adjacent(text: &str, spans: Vec<CandidateSpan>) -> Vec<CandidateSpan> {
    let mut merged: Vec<CandidateSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut() {
            if last.category == span.category && mergeable_gap(text, last.end, span.start) {
                if let Some(slice) = text.get(last.start..span.end) {
                    last.end = span.end;
                    last.confidence = (last.confidence + span.confidence) / 2.0;
                    last.text = slice.to_string();
                    continue;
                }
            }
        }
        merged.push(span);
    }
    merged
}

fn mergeable_gap(text: &str, end: usize, start: usize) -> bool {
    if start < end {
        return false;
    }
    let Some(gap) = text.get(end..start) else {
        return false;
    };
    gap.chars().count() <= 1 && gap.chars().all(char::is_whitespace)
}
