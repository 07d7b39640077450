//! Core data types for tau matching.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Position`](position::Position): direction of an object in (eta, phi) space,
//!   with the angular separation metric
//! - [`Event`](event::Event): one event as a set of named numeric branches
//! - [`MatchObject`](types::MatchObject): an indexed object taking part in matching
//! - [`AnalysisMode`](types::AnalysisMode), [`FakeScenario`](types::FakeScenario):
//!   which objects act as references for a measurement
//!
//! ## Branch Naming
//!
//! Events follow the NanoAOD flat layout:
//!
//! | Branch            | Content                              |
//! |-------------------|--------------------------------------|
//! | `nTau`            | number of reconstructed taus         |
//! | `Tau_eta`         | pseudorapidity of each tau           |
//! | `Tau_phi`         | azimuth of each tau, in (-pi, pi]    |
//! | `GenVisTau_pt`    | visible pt of each generator tau     |
//! | `run`, `event`    | event-level information              |

pub mod event;
pub mod position;
pub mod types;
