//! Reference-object to candidate matching.
//!
//! This module provides the per-event matching of reference objects
//! (generator taus, jets, generator leptons) to candidates (reconstructed taus):
//!
//! - [`raw_assign`](greedy::raw_assign): nearest candidate within a radius,
//!   independently for every reference object
//! - [`detect`](conflict::detect): candidates claimed by more than one reference
//! - [`resolve`](conflict::resolve): shortest-distance-first re-assignment of the
//!   conflicting references
//! - [`MatchingEngine`](engine::MatchingEngine): runs the three steps per event
//!   and keeps the double-count tally of one sample
//!
//! ## Matching Algorithm
//!
//! 1. **Greedy pass**: every reference object takes its closest candidate with
//!    `dR <= max_radius`. Several references may pick the same candidate.
//! 2. **Conflict detection**: references sharing a candidate are collected.
//! 3. **Resolution**: the distance table between the conflicting references and
//!    the shared candidates is consumed smallest entry first; each pick removes
//!    its reference and its candidate from the table. Exact ties go to the lowest
//!    reference index, then the lowest candidate index.
//!
//! The final assignment is injective and every pair lies within `max_radius`.
//!
//! ## Example
//!
//! ```rust
//! use tau_matcher::core::types::MatchObject;
//! use tau_matcher::matching::engine::{MatchingConfig, MatchingEngine};
//!
//! // Both generator taus are closest to reco tau 0
//! let gen_taus = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 0.0, 0.1)];
//! let reco_taus = vec![MatchObject::new(0, 0.0, 0.04), MatchObject::new(1, 0.0, 0.3)];
//!
//! let mut engine = MatchingEngine::new(MatchingConfig { max_radius: 0.5 });
//! let assignment = engine.match_event(&gen_taus, &reco_taus).unwrap();
//!
//! // The closer generator tau keeps it, the other one is left unmatched
//! assert_eq!(assignment.get(&0), Some(&0));
//! assert_eq!(assignment.get(&1), None);
//! assert_eq!(engine.tally().count(), 1);
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::types::{CandIndex, RefIndex};

pub mod conflict;
pub mod engine;
pub mod greedy;

pub use conflict::ConflictReport;
pub use engine::{DoubleCountTally, EventMatch, MatchingConfig, MatchingEngine};

/// Reference index to candidate index. Ordered so that iteration, and with it
/// every derived result, is deterministic.
pub type Assignment = BTreeMap<RefIndex, CandIndex>;

/// Role of an object in matching, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRole {
    Reference,
    Candidate,
}

impl std::fmt::Display for ObjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference object"),
            Self::Candidate => write!(f, "candidate"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Invalid matching radius: {0}")]
    InvalidRadius(f64),

    #[error("Non-finite position for {role} {index}")]
    NonFinitePosition { role: ObjectRole, index: usize },

    #[error("Duplicate index {index} among {role}s")]
    DuplicateIndex { role: ObjectRole, index: usize },

    #[error("Unknown {role} index {index}")]
    UnknownIndex { role: ObjectRole, index: usize },
}
