//! Input Limit Tests
//!
//! Malformed or oversized events must be rejected with an error instead of
//! allocating without bound or matching garbage.

use tau_matcher::core::event::EventError;
use tau_matcher::matching::engine::match_event;
use tau_matcher::matching::{MatchError, ObjectRole};
use tau_matcher::parsing::events::parse_events_text;
use tau_matcher::utils::validation::{MAX_MATCHING_RADIUS, MAX_OBJECTS_PER_COLLECTION};
use tau_matcher::{DoubleCountTally, Event, MatchObject};

#[test]
fn test_oversized_collection_rejected() {
    let n = MAX_OBJECTS_PER_COLLECTION + 1;
    let event = Event::new()
        .with_array("Tau_eta", vec![0.0; n])
        .with_array("Tau_phi", vec![0.0; n]);
    assert!(matches!(
        event.collection("Tau"),
        Err(EventError::TooManyObjects { .. })
    ));
}

#[test]
fn test_huge_count_rejected_before_reading_arrays() {
    let event = Event::new()
        .with_scalar("nTau", 1e12)
        .with_array("Tau_eta", vec![])
        .with_array("Tau_phi", vec![]);
    assert!(matches!(
        event.count("Tau"),
        Err(EventError::TooManyObjects { .. })
    ));
}

#[test]
fn test_fractional_count_rejected() {
    let event = Event::new()
        .with_scalar("nTau", 1.5)
        .with_array("Tau_eta", vec![0.0])
        .with_array("Tau_phi", vec![0.0]);
    assert!(matches!(
        event.count("Tau"),
        Err(EventError::InvalidCount { .. })
    ));
}

#[test]
fn test_radius_limits() {
    let refs = [MatchObject::new(0, 0.0, 0.0)];
    let cands = [MatchObject::new(0, 0.0, 0.1)];

    for radius in [-0.1, f64::NAN, f64::INFINITY, MAX_MATCHING_RADIUS * 2.0] {
        assert!(matches!(
            match_event(&refs, &cands, radius, DoubleCountTally::new()),
            Err(MatchError::InvalidRadius(_))
        ));
    }
    assert!(match_event(&refs, &cands, MAX_MATCHING_RADIUS, DoubleCountTally::new()).is_ok());
}

#[test]
fn test_non_finite_and_duplicate_objects() {
    let refs = [MatchObject::new(0, f64::NAN, 0.0)];
    let cands = [MatchObject::new(0, 0.0, 0.0)];
    assert_eq!(
        match_event(&refs, &cands, 0.3, DoubleCountTally::new()),
        Err(MatchError::NonFinitePosition {
            role: ObjectRole::Reference,
            index: 0
        })
    );

    let refs = [MatchObject::new(0, 0.0, 0.0)];
    let cands = [MatchObject::new(3, 0.0, 0.0), MatchObject::new(3, 0.1, 0.0)];
    assert_eq!(
        match_event(&refs, &cands, 0.3, DoubleCountTally::new()),
        Err(MatchError::DuplicateIndex {
            role: ObjectRole::Candidate,
            index: 3
        })
    );
}

#[test]
fn test_non_numeric_branch_rejected() {
    let text = r#"{"run": 1, "Tau_eta": ["a"], "Tau_phi": [0.0]}"#;
    assert!(parse_events_text(text).is_err());
}
