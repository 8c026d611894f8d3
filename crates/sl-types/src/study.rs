//! Study aggregate: the full optimization run as seen by observers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::storage::{InMemoryStorage, StorageBackend};
use crate::trial::{FrozenTrial, ObjectiveDirection, ParameterValue, TrialState};
use crate::{SlError, SlResult};

/// A full optimization run: all trials plus metadata and a storage handle.
///
/// Owned and mutated by the optimization engine; observers receive it as a
/// read-only snapshot for the duration of one callback invocation.
#[derive(Debug)]
pub struct Study {
    pub study_name: String,

    /// One direction per objective; length ≥ 1, and > 1 means multi-objective.
    pub directions: Vec<ObjectiveDirection>,

    /// Trials in completion order, identified by their ordinal number.
    pub trials: Vec<FrozenTrial>,

    pub user_attrs: BTreeMap<String, serde_json::Value>,
    pub system_attrs: BTreeMap<String, serde_json::Value>,

    /// Internal study id; absent on engine versions that stopped exposing it.
    pub study_id: Option<u64>,

    /// Handle to wherever the engine persists this study.
    pub storage: Box<dyn StorageBackend>,

    /// Set by the engine when the run is ending.  Not a precise final-trial
    /// marker; see the frequency policy docs.
    pub stop_flag: bool,
}

impl Study {
    pub fn new(name: impl Into<String>, direction: ObjectiveDirection) -> Self {
        Self {
            study_name: name.into(),
            directions: vec![direction],
            trials: Vec::new(),
            user_attrs: BTreeMap::new(),
            system_attrs: BTreeMap::new(),
            study_id: None,
            storage: Box::new(InMemoryStorage),
            stop_flag: false,
        }
    }

    pub fn new_multi_objective(
        name: impl Into<String>,
        directions: Vec<ObjectiveDirection>,
    ) -> Self {
        let mut study = Self::new(name, ObjectiveDirection::Minimize);
        study.directions = directions;
        study
    }

    pub fn with_storage(mut self, storage: Box<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    /// Primary optimization direction (the first one).
    pub fn direction(&self) -> ObjectiveDirection {
        self.directions.first().copied().unwrap_or_default()
    }

    pub fn is_multi_objective(&self) -> bool {
        self.directions.len() > 1
    }

    /// Completed trials, in study order.
    fn completed_trials(&self) -> impl Iterator<Item = &FrozenTrial> {
        self.trials
            .iter()
            .filter(|t| t.state == TrialState::Complete)
    }

    /// The best trial(s): the single optimum in single-objective mode, or the
    /// Pareto-optimal set (in study order) in multi-objective mode.
    pub fn best_trials(&self) -> Vec<&FrozenTrial> {
        if self.is_multi_objective() {
            return self.pareto_front();
        }

        let direction = self.direction();
        let best = self
            .completed_trials()
            .filter(|t| t.value.is_some())
            .reduce(|best, t| {
                let better = match direction {
                    ObjectiveDirection::Maximize => t.value > best.value,
                    ObjectiveDirection::Minimize => t.value < best.value,
                };
                if better {
                    t
                } else {
                    best
                }
            });
        best.into_iter().collect()
    }

    /// Single best trial; fails in multi-objective mode where no single
    /// optimum exists, and when no trial has completed yet.
    pub fn best_trial(&self) -> SlResult<&FrozenTrial> {
        if self.is_multi_objective() {
            return Err(SlError::MissingAttribute {
                object: "Study",
                attribute: "best_trial",
            });
        }
        self.best_trials()
            .first()
            .copied()
            .ok_or(SlError::MissingAttribute {
                object: "Study",
                attribute: "best_trial",
            })
    }

    pub fn best_value(&self) -> SlResult<f64> {
        self.best_trial()?.objective_value()
    }

    pub fn best_params(&self) -> SlResult<&BTreeMap<String, ParameterValue>> {
        Ok(&self.best_trial()?.params)
    }

    /// Pareto-optimal completed trials, preserving study order.
    fn pareto_front(&self) -> Vec<&FrozenTrial> {
        let candidates: Vec<&FrozenTrial> = self
            .completed_trials()
            .filter(|t| t.values.is_some())
            .collect();

        let mut front = Vec::new();
        for &t in &candidates {
            let dominated = candidates
                .iter()
                .any(|&other| dominates(other, t, &self.directions));
            if !dominated {
                front.push(t);
            }
        }
        front
    }

    /// Serializable snapshot of the study's durable state.
    pub fn snapshot(&self) -> StudySnapshot {
        StudySnapshot {
            study_name: self.study_name.clone(),
            directions: self.directions.clone(),
            trials: self.trials.clone(),
            user_attrs: self.user_attrs.clone(),
            system_attrs: self.system_attrs.clone(),
            study_id: self.study_id,
        }
    }
}

/// Whether trial `a` Pareto-dominates trial `b`.
fn dominates(a: &FrozenTrial, b: &FrozenTrial, directions: &[ObjectiveDirection]) -> bool {
    let (Some(a_values), Some(b_values)) = (&a.values, &b.values) else {
        return false;
    };
    if a_values.len() != directions.len() || b_values.len() != directions.len() {
        return false;
    }

    let mut strictly_better = false;
    for ((av, bv), direction) in a_values.iter().zip(b_values).zip(directions) {
        let (better, worse) = match direction {
            ObjectiveDirection::Maximize => (av > bv, av < bv),
            ObjectiveDirection::Minimize => (av < bv, av > bv),
        };
        if worse {
            return false;
        }
        if better {
            strictly_better = true;
        }
    }
    strictly_better
}

/// The durable subset of a [`Study`], serialized in place of a location for
/// backends that cannot be re-opened by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySnapshot {
    pub study_name: String,
    pub directions: Vec<ObjectiveDirection>,
    pub trials: Vec<FrozenTrial>,
    pub user_attrs: BTreeMap<String, serde_json::Value>,
    pub system_attrs: BTreeMap<String, serde_json::Value>,
    pub study_id: Option<u64>,
}

impl StudySnapshot {
    /// Rehydrate a study from a snapshot.  The result lives in memory; the
    /// original backend connection is not restored.
    pub fn into_study(self) -> Study {
        Study {
            study_name: self.study_name,
            directions: self.directions,
            trials: self.trials,
            user_attrs: self.user_attrs,
            system_attrs: self.system_attrs,
            study_id: self.study_id,
            storage: Box::new(InMemoryStorage),
            stop_flag: false,
        }
    }
}
