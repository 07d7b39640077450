use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::MatchObject;
use crate::matching::conflict::{detect, merge_resolved, resolve, ConflictReport};
use crate::matching::greedy::raw_assign;
use crate::matching::{Assignment, MatchError, ObjectRole};
use crate::utils::validation::is_valid_radius;

/// Default maximum angular separation for a match
pub const DEFAULT_MAX_RADIUS: f64 = 0.5;

/// Configuration for the matching engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Largest dR at which a candidate may be matched
    #[serde(rename = "dr_max")]
    pub max_radius: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_radius: DEFAULT_MAX_RADIUS,
        }
    }
}

/// Number of events in which the greedy pass assigned a candidate twice.
///
/// One tally belongs to one sample. Tallies of independent workers over the
/// same sample add up.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DoubleCountTally(u64);

impl DoubleCountTally {
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn count(self) -> u64 {
        self.0
    }

    /// Tally after one more event with a conflict
    #[must_use]
    pub fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::ops::Add for DoubleCountTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for DoubleCountTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), |acc, t| acc + t)
    }
}

impl std::fmt::Display for DoubleCountTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full result of matching one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMatch {
    /// Injective final assignment
    pub assignment: Assignment,

    /// Assignment of the greedy pass, before conflict resolution
    pub raw: Assignment,

    /// Conflicts found in the greedy pass
    pub conflicts: ConflictReport,
}

impl EventMatch {
    #[must_use]
    pub fn had_conflict(&self) -> bool {
        self.conflicts.has_conflicts()
    }
}

fn check_objects(objects: &[MatchObject], role: ObjectRole) -> Result<(), MatchError> {
    let mut seen = HashSet::with_capacity(objects.len());
    for object in objects {
        if !object.position.is_finite() {
            return Err(MatchError::NonFinitePosition {
                role,
                index: object.index,
            });
        }
        if !seen.insert(object.index) {
            return Err(MatchError::DuplicateIndex {
                role,
                index: object.index,
            });
        }
    }
    Ok(())
}

/// Validate inputs, then run the greedy pass, conflict detection and resolution.
///
/// # Errors
///
/// Returns `MatchError` if the radius is invalid, a position is not finite,
/// or an index appears twice within the references or the candidates.
pub fn match_event_detailed(
    references: &[MatchObject],
    candidates: &[MatchObject],
    max_radius: f64,
) -> Result<EventMatch, MatchError> {
    if !is_valid_radius(max_radius) {
        return Err(MatchError::InvalidRadius(max_radius));
    }
    check_objects(references, ObjectRole::Reference)?;
    check_objects(candidates, ObjectRole::Candidate)?;

    let raw = raw_assign(references, candidates, max_radius);
    let conflicts = detect(&raw);

    if !conflicts.has_conflicts() {
        return Ok(EventMatch {
            assignment: raw.clone(),
            raw,
            conflicts,
        });
    }

    debug!(
        duplicates = conflicts.duplicate_count,
        refs = ?conflicts.conflicting_refs,
        "Resolving shared candidates"
    );
    let resolved = resolve(
        &conflicts.conflicting_refs,
        &raw,
        references,
        candidates,
        max_radius,
    )?;
    let assignment = merge_resolved(&raw, &conflicts.conflicting_refs, &resolved);

    Ok(EventMatch {
        assignment,
        raw,
        conflicts,
    })
}

/// Match one event and thread the double-count tally through.
///
/// The tally grows by exactly one when the event had any conflict, however
/// many references or candidates were involved.
///
/// # Errors
///
/// See [`match_event_detailed`].
pub fn match_event(
    references: &[MatchObject],
    candidates: &[MatchObject],
    max_radius: f64,
    tally: DoubleCountTally,
) -> Result<(Assignment, DoubleCountTally), MatchError> {
    let result = match_event_detailed(references, candidates, max_radius)?;
    let tally = if result.had_conflict() {
        tally.incremented()
    } else {
        tally
    };
    Ok((result.assignment, tally))
}

/// Matches events of one sample and owns its double-count tally
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    config: MatchingConfig,
    tally: DoubleCountTally,
    events: u64,
}

impl MatchingEngine {
    #[must_use]
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            tally: DoubleCountTally::new(),
            events: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Match one event, returning the final assignment
    ///
    /// # Errors
    ///
    /// See [`match_event_detailed`].
    pub fn match_event(
        &mut self,
        references: &[MatchObject],
        candidates: &[MatchObject],
    ) -> Result<Assignment, MatchError> {
        self.match_event_detailed(references, candidates)
            .map(|result| result.assignment)
    }

    /// Match one event, keeping the greedy pass and the conflict report
    ///
    /// # Errors
    ///
    /// See [`match_event_detailed`].
    pub fn match_event_detailed(
        &mut self,
        references: &[MatchObject],
        candidates: &[MatchObject],
    ) -> Result<EventMatch, MatchError> {
        let result = match_event_detailed(references, candidates, self.config.max_radius)?;
        self.events += 1;
        if result.had_conflict() {
            self.tally = self.tally.incremented();
        }
        Ok(result)
    }

    #[must_use]
    pub fn tally(&self) -> DoubleCountTally {
        self.tally
    }

    /// Number of events matched since the last reset
    #[must_use]
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Start a new sample, returning the tally of the finished one
    pub fn reset_tally(&mut self) -> DoubleCountTally {
        self.events = 0;
        std::mem::take(&mut self.tally)
    }
}
