use crate::core::types::{CandIndex, MatchObject};
use crate::matching::Assignment;

/// Closest candidate to `reference` within `max_radius`, with its separation.
///
/// Candidates are scanned in order and a candidate only replaces the current
/// best when it is strictly closer, so exact ties keep the first one seen.
#[must_use]
pub fn nearest_candidate(
    reference: &MatchObject,
    candidates: &[MatchObject],
    max_radius: f64,
) -> Option<(CandIndex, f64)> {
    let mut best: Option<(CandIndex, f64)> = None;

    for candidate in candidates {
        let dr = reference.position.delta_r(&candidate.position);
        let accept = match best {
            None => dr <= max_radius,
            Some((_, best_dr)) => dr < best_dr,
        };
        if accept {
            best = Some((candidate.index, dr));
        }
    }

    best
}

/// Independent nearest-candidate assignment for every reference object.
///
/// References without a candidate inside `max_radius` get no entry. Several
/// references may end up with the same candidate.
#[must_use]
pub fn raw_assign(
    references: &[MatchObject],
    candidates: &[MatchObject],
    max_radius: f64,
) -> Assignment {
    references
        .iter()
        .filter_map(|reference| {
            nearest_candidate(reference, candidates, max_radius)
                .map(|(candidate, _)| (reference.index, candidate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_closest() {
        let reference = MatchObject::new(0, 0.0, 0.0);
        let candidates = vec![
            MatchObject::new(0, 0.2, 0.0),
            MatchObject::new(1, 0.05, 0.0),
            MatchObject::new(2, 0.1, 0.0),
        ];
        let (idx, dr) = nearest_candidate(&reference, &candidates, 0.3).unwrap();
        assert_eq!(idx, 1);
        assert!((dr - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_outside_radius_not_assigned() {
        let references = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 2.0, 0.0)];
        let candidates = vec![MatchObject::new(0, 0.1, 0.0)];

        let assignment = raw_assign(&references, &candidates, 0.3);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.get(&0), Some(&0));
        assert!(!assignment.contains_key(&1));
    }

    #[test]
    fn test_radius_is_inclusive() {
        let reference = MatchObject::new(0, 0.0, 0.0);
        let candidates = vec![MatchObject::new(4, 0.25, 0.0)];
        assert_eq!(
            nearest_candidate(&reference, &candidates, 0.25).map(|(i, _)| i),
            Some(4)
        );
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        let reference = MatchObject::new(0, 0.0, 0.0);
        let candidates = vec![
            MatchObject::new(3, 0.1, 0.0),
            MatchObject::new(7, -0.1, 0.0),
        ];
        assert_eq!(
            nearest_candidate(&reference, &candidates, 0.3).map(|(i, _)| i),
            Some(3)
        );
    }

    #[test]
    fn test_uses_wrapped_azimuth() {
        let reference = MatchObject::new(0, 0.0, 3.1);
        let candidates = vec![MatchObject::new(0, 0.0, -3.1), MatchObject::new(1, 0.0, 2.5)];
        // 2*pi - 6.2 ~ 0.083 beats 0.6
        assert_eq!(
            nearest_candidate(&reference, &candidates, 0.3).map(|(i, _)| i),
            Some(0)
        );
    }

    #[test]
    fn test_empty_inputs() {
        let references = vec![MatchObject::new(0, 0.0, 0.0)];
        assert!(raw_assign(&references, &[], 0.3).is_empty());
        assert!(raw_assign(&[], &references, 0.3).is_empty());
    }

    #[test]
    fn test_shared_candidate_allowed() {
        let references = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 0.0, 0.1)];
        let candidates = vec![MatchObject::new(0, 0.0, 0.05)];
        let assignment = raw_assign(&references, &candidates, 0.3);
        assert_eq!(assignment.get(&0), Some(&0));
        assert_eq!(assignment.get(&1), Some(&0));
    }

    #[test]
    fn test_keys_follow_reference_indices() {
        // Indices survive quality selection, so they need not be contiguous
        let references = vec![MatchObject::new(2, 0.0, 0.0), MatchObject::new(5, 1.0, 1.0)];
        let candidates = vec![MatchObject::new(1, 1.0, 1.05), MatchObject::new(3, 0.0, 0.02)];
        let assignment = raw_assign(&references, &candidates, 0.3);
        assert_eq!(assignment.get(&2), Some(&3));
        assert_eq!(assignment.get(&5), Some(&1));
    }
}
