use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::types::MatchObject;
use crate::utils::validation::{as_count, check_object_limit};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("Missing branch: {0}")]
    MissingBranch(String),

    #[error("Branch {0} is a scalar, expected an array")]
    ExpectedArray(String),

    #[error("Branch {0} is an array, expected a scalar")]
    ExpectedScalar(String),

    #[error("Branch {branch} holds an invalid object count: {value}")]
    InvalidCount { branch: String, value: f64 },

    #[error("Branch {branch} has {found} entries, expected {expected}")]
    LengthMismatch {
        branch: String,
        expected: usize,
        found: usize,
    },

    #[error("Branch {branch} has a non-finite value at index {index}")]
    NonFinite { branch: String, index: usize },

    #[error("Index {index} out of range for branch {branch} of length {len}")]
    IndexOutOfRange {
        branch: String,
        index: usize,
        len: usize,
    },

    #[error("Collection {collection}: {message}")]
    TooManyObjects { collection: String, message: String },
}

/// Value of a single branch: event-level scalar or per-object array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BranchValue {
    Scalar(f64),
    Array(Vec<f64>),
}

/// One event: named numeric branches, NanoAOD style.
///
/// Per-object branches follow the `{collection}_{variable}` convention and the
/// optional `n{collection}` branch carries the object count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    branches: BTreeMap<String, BranchValue>,
}

impl Event {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.branches.insert(name.into(), BranchValue::Scalar(value));
        self
    }

    #[must_use]
    pub fn with_array(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.branches.insert(name.into(), BranchValue::Array(values));
        self
    }

    #[must_use]
    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// Read an event-level scalar branch
    pub fn scalar(&self, name: &str) -> Result<f64, EventError> {
        match self.branches.get(name) {
            Some(BranchValue::Scalar(v)) => Ok(*v),
            Some(BranchValue::Array(_)) => Err(EventError::ExpectedScalar(name.to_string())),
            None => Err(EventError::MissingBranch(name.to_string())),
        }
    }

    /// Read a per-object array branch
    pub fn array(&self, name: &str) -> Result<&[f64], EventError> {
        match self.branches.get(name) {
            Some(BranchValue::Array(v)) => Ok(v),
            Some(BranchValue::Scalar(_)) => Err(EventError::ExpectedArray(name.to_string())),
            None => Err(EventError::MissingBranch(name.to_string())),
        }
    }

    /// Value of `{collection}_{variable}` for the object at `index`
    pub fn object_value(
        &self,
        collection: &str,
        variable: &str,
        index: usize,
    ) -> Result<f64, EventError> {
        let branch = format!("{collection}_{variable}");
        let values = self.array(&branch)?;
        values
            .get(index)
            .copied()
            .ok_or(EventError::IndexOutOfRange {
                branch,
                index,
                len: values.len(),
            })
    }

    /// Number of objects in a collection.
    ///
    /// Uses the `n{collection}` branch when present, otherwise the length of the
    /// `{collection}_eta` branch.
    pub fn count(&self, collection: &str) -> Result<usize, EventError> {
        let count_branch = format!("n{collection}");
        let count = if self.has_branch(&count_branch) {
            let value = self.scalar(&count_branch)?;
            as_count(value).ok_or(EventError::InvalidCount {
                branch: count_branch,
                value,
            })?
        } else {
            self.array(&format!("{collection}_eta"))?.len()
        };

        if let Some(message) = check_object_limit(count) {
            return Err(EventError::TooManyObjects {
                collection: collection.to_string(),
                message,
            });
        }
        Ok(count)
    }

    /// All objects of a collection with their directions.
    ///
    /// # Errors
    ///
    /// Fails if the count or the eta/phi branches are missing, if their lengths
    /// disagree, or if any direction is not finite.
    pub fn collection(&self, collection: &str) -> Result<Vec<MatchObject>, EventError> {
        let count = self.count(collection)?;
        let eta = self.checked_array(collection, "eta", count)?;
        let phi = self.checked_array(collection, "phi", count)?;

        Ok(eta
            .iter()
            .zip(phi)
            .enumerate()
            .map(|(index, (&eta, &phi))| MatchObject::new(index, eta, phi))
            .collect())
    }

    /// Array `{collection}_{variable}` checked for length and finiteness
    pub fn checked_array(
        &self,
        collection: &str,
        variable: &str,
        expected: usize,
    ) -> Result<&[f64], EventError> {
        let branch = format!("{collection}_{variable}");
        let values = self.array(&branch)?;
        if values.len() != expected {
            return Err(EventError::LengthMismatch {
                branch,
                expected,
                found: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EventError::NonFinite { branch, index });
        }
        Ok(values)
    }
}
