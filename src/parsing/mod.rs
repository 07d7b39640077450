//! Readers for event files.
//!
//! Events are JSON objects mapping NanoAOD-style branch names to numbers
//! (event-level scalars) or arrays of numbers (one value per object):
//!
//! ```json
//! {"run": 1, "event": 42, "nTau": 1, "Tau_pt": [31.2], "Tau_eta": [0.4], "Tau_phi": [-2.9]}
//! ```
//!
//! ## Supported Layouts
//!
//! | Extension | Layout |
//! |-----------|--------|
//! | `.json` | One JSON array of events |
//! | `.jsonl`, `.ndjson` | One event per line |
//! | `*.gz` | Any of the above, gzip compressed |
//! | `-` | One event per line on stdin |
//!
//! ## Example
//!
//! ```rust,no_run
//! use tau_matcher::parsing::events::open_events;
//! use std::path::Path;
//!
//! for event in open_events(Path::new("events.jsonl.gz")).unwrap() {
//!     let event = event.unwrap();
//!     println!("{} taus", event.count("Tau").unwrap());
//! }
//! ```

pub mod events;

pub use events::{open_events, read_events, EventFormat, EventReader, ParseError};
