//! # tau-matcher
//!
//! A library for matching reconstructed hadronic taus to reference objects in
//! collider events, as needed for tau identification efficiency and fake-rate
//! studies.
//!
//! Each reference object (generator-level visible tau, reconstructed or
//! generator-level jet, generator electron or muon) is assigned at most one
//! reconstructed tau by angular distance dR. When the nearest-candidate pass
//! hands the same tau to several references, the conflict is resolved by a
//! global shortest-distance-first pass, and the event is counted towards the
//! sample's double-count tally.
//!
//! ## Features
//!
//! - **Injective matching**: no tau is assigned twice after conflict resolution
//! - **Deterministic**: ties break on the lowest reference, then candidate, index
//! - **Double-count tally**: per-sample counter that adds up across workers
//! - **Selection**: quality cuts, string cut expressions, lepton pollution veto
//! - **Ntuples**: flat TSV or JSON lines output, one row per reference object
//!
//! ## Example
//!
//! ```rust
//! use tau_matcher::{MatchObject, MatchingConfig, MatchingEngine};
//!
//! let gen_taus = vec![MatchObject::new(0, 0.0, 0.0), MatchObject::new(1, 0.0, 1.0)];
//! let reco_taus = vec![MatchObject::new(0, 0.0, 0.98), MatchObject::new(1, 0.01, 0.0)];
//!
//! let mut engine = MatchingEngine::new(MatchingConfig { max_radius: 0.3 });
//! let assignment = engine.match_event(&gen_taus, &reco_taus).unwrap();
//!
//! assert_eq!(assignment.get(&0), Some(&1));
//! assert_eq!(assignment.get(&1), Some(&0));
//! assert_eq!(engine.tally().count(), 0);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Event model, directions and object types
//! - [`matching`]: Greedy matching, conflict detection and resolution
//! - [`selection`]: Reference object selection
//! - [`config`]: Analysis configuration
//! - [`ntuple`]: Flat ntuple production
//! - [`parsing`]: Event file readers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod config;
pub mod core;
pub mod matching;
pub mod ntuple;
pub mod parsing;
pub mod selection;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::AnalysisConfig;
pub use core::event::Event;
pub use core::position::{delta_phi, delta_r, Position};
pub use core::types::*;
pub use matching::engine::{match_event, DoubleCountTally, MatchingConfig, MatchingEngine};
pub use matching::{Assignment, MatchError};
