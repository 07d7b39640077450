//! Flat ntuple production.
//!
//! Every selected reference object gives one row. Cells that cannot be filled
//! (no matched tau, no opposite object on that tau) hold [`MISSING_VALUE`].
//!
//! ## Columns
//!
//! | Group | Naming | Filled when |
//! |-------|--------|-------------|
//! | Event info | branch name | always |
//! | Reference | `{ref}_{var}` | always |
//! | Tau | `{tau}_{var}` | the reference is matched |
//! | Opposite | `{opp}_{var}` | the matched tau has an opposite object |
//!
//! The opposite object of a tau is its seed jet (`{tau}_jetIdx`) in efficiency
//! mode, and the nearest generator tau within dR 0.3 in fake-rate mode.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tau_matcher::config::AnalysisConfig;
//! use tau_matcher::ntuple::{create_writer, NtupleBuilder, NtupleFormat};
//! use tau_matcher::parsing::read_events;
//! use std::path::Path;
//!
//! let config = AnalysisConfig::load_embedded().unwrap();
//! let mut builder = NtupleBuilder::new(config).unwrap();
//! let mut writer = create_writer(NtupleFormat::Tsv, std::io::stdout(), builder.columns()).unwrap();
//!
//! for event in read_events(Path::new("events.jsonl")).unwrap() {
//!     for row in builder.process_event(&event).unwrap() {
//!         writer.write_row(&row).unwrap();
//!     }
//! }
//! writer.finish().unwrap();
//! eprintln!("{:?}", builder.summary());
//! ```

pub mod builder;
pub mod writer;

pub use builder::{NtupleBuilder, NtupleError, NtupleSummary, MISSING_VALUE};
pub use writer::{create_writer, NtupleFormat, RowWriter};
