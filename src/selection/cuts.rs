use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::event::{Event, EventError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CutError {
    #[error("Empty cut expression")]
    Empty,

    #[error("No comparison operator in cut '{0}'")]
    MissingOperator(String),

    #[error("No variable in cut '{0}'")]
    MissingVariable(String),

    #[error("Invalid threshold in cut '{cut}': '{value}'")]
    InvalidThreshold { cut: String, value: String },
}

/// Comparison operator of a single cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
}

impl Comparison {
    /// Operators in the order they are searched for; two-character ones first
    const SEARCH_ORDER: [Comparison; 5] = [Self::Ge, Self::Le, Self::Eq, Self::Gt, Self::Lt];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }

    #[must_use]
    #[allow(clippy::float_cmp)] // `==` cuts compare stored integers such as decay modes
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Ge => value >= threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
        }
    }
}

/// A single `variable OP threshold` requirement
#[derive(Debug, Clone, PartialEq)]
pub struct Cut {
    /// Variable name without collection prefix, or full branch name when `qualified`
    pub variable: String,
    /// Compare the absolute value (`|eta|<2.3`)
    pub absolute: bool,
    /// Branch name given in full (`@Jet_btag>0.5`)
    pub qualified: bool,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl Cut {
    fn parse(text: &str) -> Result<Self, CutError> {
        let (comparison, pos) = Comparison::SEARCH_ORDER
            .iter()
            .find_map(|&c| text.find(c.symbol()).map(|pos| (c, pos)))
            .ok_or_else(|| CutError::MissingOperator(text.to_string()))?;

        let lhs = &text[..pos];
        let rhs = &text[pos + comparison.symbol().len()..];

        let absolute = lhs.contains('|');
        let lhs = lhs.replace('|', "");
        let qualified = lhs.starts_with('@');
        let variable = lhs.trim_start_matches('@').to_string();
        if variable.is_empty() {
            return Err(CutError::MissingVariable(text.to_string()));
        }

        let threshold: f64 = rhs.parse().map_err(|_| CutError::InvalidThreshold {
            cut: text.to_string(),
            value: rhs.to_string(),
        })?;

        Ok(Self {
            variable,
            absolute,
            qualified,
            comparison,
            threshold,
        })
    }

    /// Value the cut is evaluated on for object `index` of `collection`
    fn value(&self, event: &Event, collection: &str, index: usize) -> Result<f64, EventError> {
        let raw = if self.qualified {
            match event.array(&self.variable) {
                Ok(values) => {
                    values
                        .get(index)
                        .copied()
                        .ok_or_else(|| EventError::IndexOutOfRange {
                            branch: self.variable.clone(),
                            index,
                            len: values.len(),
                        })?
                }
                Err(EventError::ExpectedArray(_)) => event.scalar(&self.variable)?,
                Err(e) => return Err(e),
            }
        } else {
            event.object_value(collection, &self.variable, index)?
        };
        Ok(if self.absolute { raw.abs() } else { raw })
    }

    /// Whether object `index` of `collection` passes this cut
    ///
    /// # Errors
    ///
    /// Returns `EventError` if the branch the cut refers to is missing or too short.
    pub fn passes(&self, event: &Event, collection: &str, index: usize) -> Result<bool, EventError> {
        let value = self.value(event, collection, index)?;
        Ok(self.comparison.apply(value, self.threshold))
    }
}

impl std::fmt::Display for Cut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let at = if self.qualified { "@" } else { "" };
        if self.absolute {
            write!(f, "|{at}{}|", self.variable)?;
        } else {
            write!(f, "{at}{}", self.variable)?;
        }
        write!(f, "{}{}", self.comparison.symbol(), self.threshold)
    }
}

/// Conjunction of cuts written as `pt>20 && |eta|<2.3`
#[derive(Debug, Clone, PartialEq)]
pub struct CutExpression {
    cuts: Vec<Cut>,
}

impl CutExpression {
    /// Parse a cut string. Whitespace is ignored and cuts are joined by `&&`.
    ///
    /// # Errors
    ///
    /// Returns `CutError` if the string is empty or a cut lacks an operator,
    /// a variable, or a numeric threshold.
    pub fn parse(text: &str) -> Result<Self, CutError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(CutError::Empty);
        }
        let cuts = compact
            .split("&&")
            .map(Cut::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cuts })
    }

    #[must_use]
    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    /// Whether object `index` of `collection` passes every cut
    ///
    /// # Errors
    ///
    /// Returns `EventError` if a referenced branch is missing or too short.
    pub fn passes(&self, event: &Event, collection: &str, index: usize) -> Result<bool, EventError> {
        for cut in &self.cuts {
            if !cut.passes(event, collection, index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl FromStr for CutExpression {
    type Err = CutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CutExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.cuts.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(" && "))
    }
}
