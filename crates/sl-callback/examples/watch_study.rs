use chrono::Utc;
use std::collections::BTreeMap;

use sl_callback::{CallbackConfig, StudyCallback, UpdateFrequency};
use sl_track::InMemoryRun;
use sl_types::{
    Distribution, FrozenTrial, ObjectiveDirection, ParameterValue, Study, TrialState,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Stand-in for a real tracking client; everything lands in memory.
    let run = InMemoryRun::new();
    println!("Tracking run {}", run.run_id());

    let config = CallbackConfig {
        base_namespace: "hpo".to_string(),
        plots_update_freq: UpdateFrequency::Every(2),
        study_update_freq: UpdateFrequency::Last,
        ..CallbackConfig::default()
    };
    let mut callback = StudyCallback::new(run, config)?;

    let mut study = Study::new("watch-demo", ObjectiveDirection::Minimize);

    // Fake optimization loop: the engine would drive this and invoke the
    // callback once per completed trial.
    let candidates = [0.1, 0.03, 0.007, 0.02, 0.001];
    for (number, lr) in candidates.iter().enumerate() {
        let start = Utc::now();

        let mut params = BTreeMap::new();
        params.insert("lr".to_string(), ParameterValue::Float(*lr));

        let mut distributions = BTreeMap::new();
        distributions.insert(
            "lr".to_string(),
            Distribution::Float {
                low: 1e-4,
                high: 1e-1,
                log: true,
                step: None,
            },
        );

        let trial = FrozenTrial {
            number,
            state: TrialState::Complete,
            value: Some(lr * 10.0 + 0.5), // pretend objective
            values: None,
            params,
            distributions,
            intermediate_values: BTreeMap::new(),
            datetime_start: Some(start),
            datetime_complete: Some(Utc::now()),
        };

        study.trials.push(trial.clone());
        if number == candidates.len() - 1 {
            study.stop_flag = true;
        }
        callback.on_trial_complete(&study, &trial)?;
    }

    let run = callback.into_run();
    println!("\nAssigned fields:");
    for path in run.paths() {
        println!("  {path}");
    }
    println!("\nArtifacts:");
    for path in run.artifact_paths() {
        println!("  {path}");
    }

    Ok(())
}
