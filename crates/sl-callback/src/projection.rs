//! Pure projections from trial/study state into loggable namespace values.
//!
//! Paths are stable strings derived from trial number and field name, so
//! re-projecting the same trial writes the same paths with the same values.

use std::collections::BTreeMap;

use sl_track::{FieldValue, MapKey};
use sl_types::{Distribution, FrozenTrial, ParameterValue, SlResult, Study};

/// Project a collection of trials into one mapping.
///
/// Field values are additionally accumulated into flat lists (`values`,
/// `params`, `values|params`) in iteration order; per-trial state nests under
/// `trials/{number}/...`.  Optional fields that a trial does not carry are
/// omitted rather than defaulted.
pub fn project_trials<'a, I>(trials: I) -> FieldValue
where
    I: IntoIterator<Item = &'a FrozenTrial>,
{
    let trials: Vec<&FrozenTrial> = trials.into_iter().collect();

    let mut values = Vec::new();
    let mut params = Vec::new();
    let mut combined = Vec::new();
    for trial in &trials {
        if let Some(value) = trial.value {
            values.push(FieldValue::Float(value));
        }
        params.push(project_params(&trial.params));
        combined.push(FieldValue::Str(combined_string(trial)));
    }

    let mut out = FieldValue::map();
    out.insert("values", FieldValue::Seq(values));
    out.insert("params", FieldValue::Seq(params));
    out.insert("values|params", FieldValue::Seq(combined));
    for trial in &trials {
        insert_trial_subtree(&mut out, trial);
    }
    out
}

/// Project the best-trials set of a study.
///
/// Emits aggregate `value`, `params`, and the combined string at the top
/// level for the best trial — in multi-objective mode the representative is
/// the first Pareto-front trial in study order — plus the per-trial subtrees
/// for every best trial.  Fails when no trial has completed yet.
pub fn project_best_trials(study: &Study) -> SlResult<FieldValue> {
    let best = study.best_trials();
    let representative = best.first().copied().ok_or(sl_types::SlError::MissingAttribute {
        object: "Study",
        attribute: "best_trials",
    })?;

    let mut out = FieldValue::map();
    out.insert("value", representative_value(representative));
    out.insert("params", project_params(&representative.params));
    out.insert("value|params", FieldValue::Str(combined_string(representative)));

    for trial in best {
        insert_trial_subtree(&mut out, trial);
    }
    Ok(out)
}

/// A trial's parameter-domain descriptors as a loggable mapping.
pub fn project_distributions(trial: &FrozenTrial) -> FieldValue {
    let mut out = FieldValue::map();
    for (name, distribution) in &trial.distributions {
        out.insert(name.clone(), project_distribution(distribution));
    }
    out
}

fn representative_value(trial: &FrozenTrial) -> FieldValue {
    match (trial.value, &trial.values) {
        (Some(value), _) => FieldValue::Float(value),
        (None, Some(values)) => {
            FieldValue::Seq(values.iter().map(|v| FieldValue::Float(*v)).collect())
        }
        (None, None) => FieldValue::Str("None".to_string()),
    }
}

/// Human-readable `"value: {v}| params: {p}"` pairing, kept in one string so
/// a dashboard column can show both at a glance.
fn combined_string(trial: &FrozenTrial) -> String {
    format!(
        "value: {}| params: {}",
        display_value(trial),
        display_params(&trial.params)
    )
}

fn display_value(trial: &FrozenTrial) -> String {
    match (trial.value, &trial.values) {
        (Some(value), _) => value.to_string(),
        (None, Some(values)) => format!(
            "[{}]",
            values
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        (None, None) => "None".to_string(),
    }
}

fn display_params(params: &BTreeMap<String, ParameterValue>) -> String {
    let body = params
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

fn insert_trial_subtree(out: &mut FieldValue, trial: &FrozenTrial) {
    let n = trial.number;

    if let Some(start) = trial.datetime_start {
        out.insert(format!("trials/{n}/datetime_start"), start.into());
    }
    if let Some(complete) = trial.datetime_complete {
        out.insert(format!("trials/{n}/datetime_complete"), complete.into());
    }
    if let Some(duration) = trial.duration() {
        out.insert(
            format!("trials/{n}/duration"),
            FieldValue::Duration(duration.num_milliseconds() as f64 / 1000.0),
        );
    }
    out.insert(
        format!("trials/{n}/distributions"),
        project_distributions(trial),
    );
    out.insert(
        format!("trials/{n}/intermediate_values"),
        project_intermediate_values(trial),
    );
    out.insert(format!("trials/{n}/params"), project_params(&trial.params));
    if let Some(value) = trial.value {
        out.insert(format!("trials/{n}/value"), FieldValue::Float(value));
    }
    if let Some(values) = &trial.values {
        out.insert(
            format!("trials/{n}/values"),
            FieldValue::Seq(values.iter().map(|v| FieldValue::Float(*v)).collect()),
        );
    }
}

/// Intermediate values keep their integer step keys here; the orchestrator
/// runs `stringify_keys` over the whole projection before emission.
fn project_intermediate_values(trial: &FrozenTrial) -> FieldValue {
    let mut out = FieldValue::map();
    for (step, value) in &trial.intermediate_values {
        out.insert(MapKey::Int(*step as i64), FieldValue::Float(*value));
    }
    out
}

fn project_params(params: &BTreeMap<String, ParameterValue>) -> FieldValue {
    let mut out = FieldValue::map();
    for (name, value) in params {
        out.insert(name.clone(), parameter_field(value));
    }
    out
}

fn parameter_field(value: &ParameterValue) -> FieldValue {
    match value {
        ParameterValue::Float(v) => FieldValue::Float(*v),
        ParameterValue::Int(v) => FieldValue::Int(*v),
        ParameterValue::Bool(v) => FieldValue::Bool(*v),
        ParameterValue::Str(v) => FieldValue::Str(v.clone()),
    }
}

fn project_distribution(distribution: &Distribution) -> FieldValue {
    let mut out = FieldValue::map();
    match distribution {
        Distribution::Float { low, high, log, step } => {
            out.insert("type", "FloatDistribution".into());
            out.insert("low", FieldValue::Float(*low));
            out.insert("high", FieldValue::Float(*high));
            out.insert("log", FieldValue::Bool(*log));
            if let Some(step) = step {
                out.insert("step", FieldValue::Float(*step));
            }
        }
        Distribution::Int { low, high, log, step } => {
            out.insert("type", "IntDistribution".into());
            out.insert("low", FieldValue::Int(*low));
            out.insert("high", FieldValue::Int(*high));
            out.insert("log", FieldValue::Bool(*log));
            if let Some(step) = step {
                out.insert("step", FieldValue::Int(*step));
            }
        }
        Distribution::Categorical { choices } => {
            out.insert("type", "CategoricalDistribution".into());
            out.insert(
                "choices",
                FieldValue::Seq(choices.iter().map(parameter_field).collect()),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use sl_track::stringify_keys;
    use sl_types::{ObjectiveDirection, TrialState};

    fn trial(number: usize, value: f64) -> FrozenTrial {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut params = BTreeMap::new();
        params.insert("lr".to_string(), ParameterValue::Float(0.01));
        params.insert("depth".to_string(), ParameterValue::Int(5));

        let mut distributions = BTreeMap::new();
        distributions.insert(
            "lr".to_string(),
            Distribution::Float {
                low: 1e-5,
                high: 1e-1,
                log: true,
                step: None,
            },
        );
        distributions.insert(
            "depth".to_string(),
            Distribution::Int {
                low: 1,
                high: 10,
                log: false,
                step: Some(1),
            },
        );

        FrozenTrial {
            number,
            state: TrialState::Complete,
            value: Some(value),
            values: None,
            params,
            distributions,
            intermediate_values: BTreeMap::new(),
            datetime_start: Some(start),
            datetime_complete: Some(start + chrono::Duration::seconds(30)),
        }
    }

    #[test]
    fn single_trial_projection_paths() {
        let t = trial(0, 1.5);
        let projected = project_trials([&t]);

        assert_eq!(
            projected.get("values"),
            Some(&FieldValue::Seq(vec![FieldValue::Float(1.5)]))
        );
        assert_eq!(
            projected.get("trials/0/value"),
            Some(&FieldValue::Float(1.5))
        );
        assert!(projected.get("trials/0/datetime_start").is_some());
        assert_eq!(
            projected.get("trials/0/duration"),
            Some(&FieldValue::Duration(30.0))
        );
    }

    #[test]
    fn combined_string_format() {
        let t = trial(0, 1.5);
        let projected = project_trials([&t]);
        assert_eq!(
            projected.get("values|params"),
            Some(&FieldValue::Seq(vec![FieldValue::Str(
                "value: 1.5| params: {depth: 5, lr: 0.01}".to_string()
            )]))
        );
    }

    #[test]
    fn projection_is_idempotent() {
        let t = trial(3, 0.75);
        assert_eq!(project_trials([&t]), project_trials([&t]));
    }

    #[test]
    fn accumulators_follow_iteration_order() {
        let a = trial(1, 2.0);
        let b = trial(0, 1.0);
        // Deliberately out of numeric order; lists must not be sorted.
        let projected = project_trials([&a, &b]);
        assert_eq!(
            projected.get("values"),
            Some(&FieldValue::Seq(vec![
                FieldValue::Float(2.0),
                FieldValue::Float(1.0)
            ]))
        );
    }

    #[test]
    fn valueless_trials_are_omitted_from_the_values_list() {
        let a = trial(0, 1.0);
        let mut b = trial(1, 0.0);
        b.value = None;
        b.state = TrialState::Pruned;

        let projected = project_trials([&a, &b]);

        // `values` carries only trials with an objective value, so its indices
        // do not line up with `params` on mixed-state lists; `values|params`
        // stays one-entry-per-trial and is the aligned pairing.
        assert_eq!(
            projected.get("values"),
            Some(&FieldValue::Seq(vec![FieldValue::Float(1.0)]))
        );

        let Some(FieldValue::Seq(params)) = projected.get("params") else {
            panic!("expected params list");
        };
        assert_eq!(params.len(), 2);

        let Some(FieldValue::Seq(combined)) = projected.get("values|params") else {
            panic!("expected combined list");
        };
        assert_eq!(combined.len(), 2);
        let FieldValue::Str(last) = &combined[1] else {
            panic!("expected string entry");
        };
        assert!(last.starts_with("value: None|"));
    }

    #[test]
    fn intermediate_values_keep_integer_keys_until_coercion() {
        let mut t = trial(0, 1.0);
        t.intermediate_values.insert(0, 9.0);
        t.intermediate_values.insert(5, 3.0);

        let projected = project_trials([&t]);
        let iv = projected.get("trials/0/intermediate_values").unwrap();
        let FieldValue::Map(entries) = iv else {
            panic!("expected map");
        };
        assert_eq!(entries[0].0, MapKey::Int(0));
        assert_eq!(entries[1].0, MapKey::Int(5));

        let coerced = stringify_keys(projected);
        let iv = coerced.get("trials/0/intermediate_values").unwrap();
        let FieldValue::Map(entries) = iv else {
            panic!("expected map");
        };
        assert_eq!(entries[0].0, MapKey::Str("0".into()));
        assert_eq!(entries[1].0, MapKey::Str("5".into()));
    }

    #[test]
    fn best_trials_single_objective() {
        let mut study = Study::new("s", ObjectiveDirection::Minimize);
        study.trials = vec![trial(0, 3.0), trial(1, 1.0)];

        let best = project_best_trials(&study).unwrap();
        assert_eq!(best.get("value"), Some(&FieldValue::Float(1.0)));
        assert!(best.get("trials/1/value").is_some());
        assert!(best.get("trials/0/value").is_none());
    }

    #[test]
    fn best_trials_multi_objective_representative() {
        let mut study = Study::new_multi_objective(
            "mo",
            vec![ObjectiveDirection::Minimize, ObjectiveDirection::Minimize],
        );
        let mut a = trial(0, 0.0);
        a.value = None;
        a.values = Some(vec![1.0, 4.0]);
        let mut b = trial(1, 0.0);
        b.value = None;
        b.values = Some(vec![4.0, 1.0]);
        study.trials = vec![a, b];

        let best = project_best_trials(&study).unwrap();
        // Representative is the first Pareto trial in study order.
        assert_eq!(
            best.get("value"),
            Some(&FieldValue::Seq(vec![
                FieldValue::Float(1.0),
                FieldValue::Float(4.0)
            ]))
        );
        assert!(best.get("trials/0/values").is_some());
        assert!(best.get("trials/1/values").is_some());
    }

    #[test]
    fn best_trials_fails_on_empty_study() {
        let study = Study::new("empty", ObjectiveDirection::Minimize);
        assert!(project_best_trials(&study).is_err());
    }

    #[test]
    fn distribution_projection_shape() {
        let t = trial(0, 1.0);
        let projected = project_distributions(&t);
        let lr = projected.get("lr").unwrap();
        assert_eq!(lr.get("type"), Some(&FieldValue::Str("FloatDistribution".into())));
        assert_eq!(lr.get("log"), Some(&FieldValue::Bool(true)));

        let depth = projected.get("depth").unwrap();
        assert_eq!(depth.get("step"), Some(&FieldValue::Int(1)));
    }
}
