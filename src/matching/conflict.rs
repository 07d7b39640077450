use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::core::position::Position;
use crate::core::types::{CandIndex, MatchObject, RefIndex};
use crate::matching::{Assignment, MatchError, ObjectRole};

/// Outcome of scanning an assignment for shared candidates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// Entries beyond the first for every candidate claimed more than once
    pub duplicate_count: usize,

    /// Every reference whose candidate is shared, ascending
    pub conflicting_refs: Vec<RefIndex>,

    /// Candidates claimed by more than one reference
    pub duplicated_candidates: BTreeSet<CandIndex>,
}

impl ConflictReport {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.duplicate_count > 0
    }
}

/// Find candidates claimed by more than one reference object.
///
/// `duplicate_count` is `len(values) - len(unique values)`. All sharers of a
/// duplicated candidate are listed in `conflicting_refs`, not only the later ones.
#[must_use]
pub fn detect(assignment: &Assignment) -> ConflictReport {
    let mut claims: BTreeMap<CandIndex, usize> = BTreeMap::new();
    for &candidate in assignment.values() {
        *claims.entry(candidate).or_default() += 1;
    }

    let duplicated_candidates: BTreeSet<CandIndex> = claims
        .iter()
        .filter(|(_, &n)| n > 1)
        .map(|(&candidate, _)| candidate)
        .collect();

    let duplicate_count = assignment.len() - claims.len();

    let conflicting_refs = assignment
        .iter()
        .filter(|(_, &candidate)| duplicated_candidates.contains(&candidate))
        .map(|(&reference, _)| reference)
        .collect();

    ConflictReport {
        duplicate_count,
        conflicting_refs,
        duplicated_candidates,
    }
}

/// One cell of the conflict distance table
#[derive(Debug, Clone, Copy, PartialEq)]
struct DistanceEntry {
    reference: RefIndex,
    candidate: CandIndex,
    distance: f64,
}

fn position_of(
    objects: &[MatchObject],
    index: usize,
    role: ObjectRole,
) -> Result<Position, MatchError> {
    objects
        .iter()
        .find(|o| o.index == index)
        .map(|o| o.position)
        .ok_or(MatchError::UnknownIndex { role, index })
}

/// Re-assign the conflicting references.
///
/// The distance table spans every reference in `conflicting_refs` and every
/// candidate assigned to any of them. Entries are consumed smallest distance
/// first; each pick removes all entries sharing its reference or its candidate.
/// Exact ties go to the lowest reference index, then the lowest candidate index.
/// Entries beyond `max_radius` never enter the table.
///
/// Only the entries for `conflicting_refs` are returned; a reference whose
/// candidates were all taken by closer competitors is absent.
///
/// # Errors
///
/// Returns `MatchError::UnknownIndex` if a conflicting reference or one of the
/// shared candidates is not among the given objects.
pub fn resolve(
    conflicting_refs: &[RefIndex],
    assignment: &Assignment,
    references: &[MatchObject],
    candidates: &[MatchObject],
    max_radius: f64,
) -> Result<Assignment, MatchError> {
    let shared: BTreeSet<CandIndex> = conflicting_refs
        .iter()
        .filter_map(|r| assignment.get(r).copied())
        .collect();

    let mut table = Vec::with_capacity(conflicting_refs.len() * shared.len());
    for &reference in conflicting_refs {
        let ref_pos = position_of(references, reference, ObjectRole::Reference)?;
        for &candidate in &shared {
            let cand_pos = position_of(candidates, candidate, ObjectRole::Candidate)?;
            let distance = ref_pos.delta_r(&cand_pos);
            if distance <= max_radius {
                table.push(DistanceEntry {
                    reference,
                    candidate,
                    distance,
                });
            }
        }
    }

    table.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.reference.cmp(&b.reference))
            .then(a.candidate.cmp(&b.candidate))
    });

    let mut used_refs: HashSet<RefIndex> = HashSet::new();
    let mut used_cands: HashSet<CandIndex> = HashSet::new();
    let mut resolved = Assignment::new();

    for entry in table {
        if used_refs.contains(&entry.reference) || used_cands.contains(&entry.candidate) {
            continue;
        }
        debug!(
            reference = entry.reference,
            candidate = entry.candidate,
            distance = entry.distance,
            "Resolved conflicting match"
        );
        used_refs.insert(entry.reference);
        used_cands.insert(entry.candidate);
        resolved.insert(entry.reference, entry.candidate);
    }

    Ok(resolved)
}

/// Replace the conflicting entries of `raw` with the resolved ones.
///
/// With no conflicting references and nothing resolved this returns `raw` unchanged.
#[must_use]
pub fn merge_resolved(
    raw: &Assignment,
    conflicting_refs: &[RefIndex],
    resolved: &Assignment,
) -> Assignment {
    let mut merged = raw.clone();
    for reference in conflicting_refs {
        merged.remove(reference);
    }
    merged.extend(resolved.iter().map(|(&r, &c)| (r, c)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(pairs: &[(usize, usize)]) -> Assignment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_detect_double_count() {
        let map = assignment(&[(1, 1), (2, 2), (3, 3), (4, 2)]);
        let report = detect(&map);
        assert_eq!(report.duplicate_count, 1);
        assert_eq!(report.conflicting_refs, vec![2, 4]);
        assert_eq!(report.duplicated_candidates, BTreeSet::from([2]));
        assert!(report.has_conflicts());
    }

    #[test]
    fn test_detect_triple_claim() {
        let map = assignment(&[(0, 5), (1, 5), (2, 5), (3, 1)]);
        let report = detect(&map);
        assert_eq!(report.duplicate_count, 2);
        assert_eq!(report.conflicting_refs, vec![0, 1, 2]);
    }

    #[test]
    fn test_detect_two_shared_candidates() {
        let map = assignment(&[(0, 0), (1, 0), (2, 1), (3, 1), (4, 2)]);
        let report = detect(&map);
        assert_eq!(report.duplicate_count, 2);
        assert_eq!(report.conflicting_refs, vec![0, 1, 2, 3]);
        assert_eq!(report.duplicated_candidates, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_detect_injective() {
        let report = detect(&assignment(&[(0, 2), (1, 0), (2, 1)]));
        assert_eq!(report, ConflictReport::default());
        assert!(!report.has_conflicts());
        assert!(detect(&Assignment::new()).conflicting_refs.is_empty());
    }

    #[test]
    fn test_resolve_closest_keeps_candidate() {
        let references = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 0.0, 0.1)];
        let candidates = vec![MatchObject::new(0, 0.0, 0.04)];
        let raw = assignment(&[(0, 0), (1, 0)]);

        let resolved = resolve(&[0, 1], &raw, &references, &candidates, 0.5).unwrap();
        assert_eq!(resolved, assignment(&[(0, 0)]));
    }

    #[test]
    fn test_resolve_reassigns_to_other_shared_candidate() {
        // Refs 0,1 share cand 0; refs 2,3 share cand 1. Ref 1 is the closest
        // to cand 0, so ref 0 falls back to cand 1 and beats refs 2 and 3 for it.
        let references = vec![
            MatchObject::new(0, 0.0, 0.12),
            MatchObject::new(1, 0.0, 0.01),
            MatchObject::new(2, 0.0, 0.50),
            MatchObject::new(3, 0.0, 0.55),
        ];
        let candidates = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 0.0, 0.3)];
        let raw = assignment(&[(0, 0), (1, 0), (2, 1), (3, 1)]);

        let resolved = resolve(&[0, 1, 2, 3], &raw, &references, &candidates, 0.4).unwrap();
        // 1-0: 0.01, then 0-1: 0.18 beats 2-1: 0.20 and 3-1: 0.25
        assert_eq!(resolved, assignment(&[(0, 1), (1, 0)]));
    }

    #[test]
    fn test_resolve_respects_radius() {
        let references = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 0.0, 1.0)];
        let candidates = vec![MatchObject::new(0, 0.0, 0.2), MatchObject::new(1, 0.0, 0.9)];
        // Inconsistent raw claims, both shared candidates far from one of the refs
        let raw = assignment(&[(0, 0), (1, 0)]);
        let resolved = resolve(&[0, 1], &raw, &references, &candidates, 0.3).unwrap();
        assert_eq!(resolved, assignment(&[(0, 0)]));
    }

    #[test]
    fn test_resolve_tie_breaks_on_lowest_reference() {
        let references = vec![MatchObject::new(3, 0.0, -0.1), MatchObject::new(1, 0.0, 0.1)];
        let candidates = vec![MatchObject::new(0, 0.0, 0.0)];
        let raw = assignment(&[(1, 0), (3, 0)]);

        let resolved = resolve(&[1, 3], &raw, &references, &candidates, 0.3).unwrap();
        assert_eq!(resolved, assignment(&[(1, 0)]));
    }

    #[test]
    fn test_resolve_unknown_index() {
        let references = vec![MatchObject::new(0, 0.0, 0.0)];
        let candidates = vec![MatchObject::new(0, 0.0, 0.0)];
        let raw = assignment(&[(0, 0), (9, 0)]);

        assert_eq!(
            resolve(&[0, 9], &raw, &references, &candidates, 0.3),
            Err(MatchError::UnknownIndex {
                role: ObjectRole::Reference,
                index: 9
            })
        );

        let raw = assignment(&[(0, 4)]);
        assert_eq!(
            resolve(&[0], &raw, &references, &candidates, 0.3),
            Err(MatchError::UnknownIndex {
                role: ObjectRole::Candidate,
                index: 4
            })
        );
    }

    #[test]
    fn test_merge_resolved() {
        let raw = assignment(&[(1, 1), (2, 2), (3, 3), (4, 2)]);
        let resolved = assignment(&[(4, 2)]);
        let merged = merge_resolved(&raw, &[2, 4], &resolved);
        assert_eq!(merged, assignment(&[(1, 1), (3, 3), (4, 2)]));
    }

    #[test]
    fn test_merge_without_conflicts_is_identity() {
        let raw = assignment(&[(0, 3), (1, 1), (7, 0)]);
        let merged = merge_resolved(&raw, &[], &Assignment::new());
        assert_eq!(merged, raw);
    }
}
