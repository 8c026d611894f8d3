//! Frozen trial records as exposed by the optimization engine.
//!
//! A [`FrozenTrial`] is an immutable snapshot of one evaluated point in the
//! search space.  The engine owns and mutates trial records; everything in
//! this crate treats them as read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{SlError, SlResult};

/// Whether the objective is being maximized or minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Minimize,
    Maximize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Minimize
    }
}

impl std::fmt::Display for ObjectiveDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minimize => write!(f, "minimize"),
            Self::Maximize => write!(f, "maximize"),
        }
    }
}

/// Lifecycle state of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    Running,
    Complete,
    Pruned,
    Failed,
}

/// A concrete parameter value assigned to a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Parameter-domain descriptor for one search dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Continuous range [low, high], optionally log-scaled or stepped.
    Float {
        low: f64,
        high: f64,
        log: bool,
        step: Option<f64>,
    },
    /// Integer range [low, high] inclusive.
    Int {
        low: i64,
        high: i64,
        log: bool,
        step: Option<i64>,
    },
    /// Categorical choices.
    Categorical { choices: Vec<ParameterValue> },
}

/// Immutable record of one completed (or in-flight) trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    /// Ordinal trial number within the study (0-indexed identity).
    pub number: usize,

    pub state: TrialState,

    /// Single-objective value; `None` while the trial is running or in
    /// multi-objective mode.
    pub value: Option<f64>,

    /// Multi-objective values; `None` in single-objective mode.
    pub values: Option<Vec<f64>>,

    /// Parameter assignment, keyed by parameter name.
    pub params: BTreeMap<String, ParameterValue>,

    /// Domain descriptor for each sampled parameter.
    pub distributions: BTreeMap<String, Distribution>,

    /// Step-wise intermediate values reported during the trial.  Keyed by an
    /// integer step index, which the destination namespace cannot represent
    /// directly; key coercion happens at projection time.
    pub intermediate_values: BTreeMap<u32, f64>,

    pub datetime_start: Option<DateTime<Utc>>,
    pub datetime_complete: Option<DateTime<Utc>>,
}

impl FrozenTrial {
    /// Single objective value of a completed trial.
    ///
    /// Fails for incomplete trials and for multi-objective trials that carry
    /// no single scalar; callers are expected to invoke this only on
    /// completed single-objective trials.
    pub fn objective_value(&self) -> SlResult<f64> {
        self.value.ok_or(SlError::MissingAttribute {
            object: "FrozenTrial",
            attribute: "value",
        })
    }

    /// Objective values of a completed multi-objective trial.
    pub fn objective_values(&self) -> SlResult<&[f64]> {
        match &self.values {
            Some(values) => Ok(values),
            None => Err(SlError::MissingAttribute {
                object: "FrozenTrial",
                attribute: "values",
            }),
        }
    }

    /// Wall-clock duration, derived from the start/completion timestamps.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.datetime_start, self.datetime_complete) {
            (Some(start), Some(complete)) => Some(complete - start),
            _ => None,
        }
    }
}
