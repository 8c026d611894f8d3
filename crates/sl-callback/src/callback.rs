//! The per-trial callback orchestrator and the one-shot study logger.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sl_track::{stringify_keys, Artifact, FieldValue, Namespace, RunHandle};
use sl_types::{FrozenTrial, SlResult, Study};

use crate::freq::UpdateFrequency;
use crate::plots::{write_plots, PlotSelection};
use crate::projection::{project_best_trials, project_distributions, project_trials};
use crate::storage::{resolve_storage, StorageDescriptor};

/// Constructor-level configuration for [`StudyCallback`].
///
/// One explicit struct instead of per-call defaults: the base namespace
/// prefix, the two independent update frequencies, and the plot selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Namespace prefix joined onto every path; empty logs at the run root.
    pub base_namespace: String,
    /// Gates visualization artifact updates.
    pub plots_update_freq: UpdateFrequency,
    /// Gates full-study (storage descriptor / snapshot) updates.
    pub study_update_freq: UpdateFrequency,
    /// Backend choice and per-kind enable flags.
    pub plots: PlotSelection,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            base_namespace: String::new(),
            plots_update_freq: UpdateFrequency::Every(1),
            study_update_freq: UpdateFrequency::Every(1),
            plots: PlotSelection::default(),
        }
    }
}

impl CallbackConfig {
    pub fn validate(&self) -> SlResult<()> {
        self.plots_update_freq.validate()?;
        self.study_update_freq.validate()?;
        Ok(())
    }
}

/// Observer invoked synchronously once per completed trial.
///
/// Cheap per-trial projections run unconditionally; plots and the study
/// snapshot run when their frequency policy fires.  Write and render failures
/// propagate to the caller; there is no retry layer here.
pub struct StudyCallback<R: RunHandle> {
    run: Namespace<R>,
    config: CallbackConfig,
}

impl<R: RunHandle> StudyCallback<R> {
    /// Fails fast on an invalid configuration; no partial construction.
    pub fn new(run: R, config: CallbackConfig) -> SlResult<Self> {
        config.validate()?;
        let run = Namespace::new(run, config.base_namespace.clone());
        Ok(Self { run, config })
    }

    /// Recover the underlying run handle.
    pub fn into_run(self) -> R {
        self.run.into_inner()
    }

    pub fn run(&self) -> &R {
        self.run.inner()
    }

    /// Handle one trial completion.  Fixed sequence; steps 5 and 6 are gated
    /// by their frequency policies.
    pub fn on_trial_complete(&mut self, study: &Study, trial: &FrozenTrial) -> SlResult<()> {
        debug!(study = %study.study_name, trial = trial.number, "trial completed");

        self.run
            .assign("trials", stringify_keys(project_trials([trial])))?;
        self.run
            .append("study/distributions", project_distributions(trial))?;
        self.run
            .assign("best", stringify_keys(project_best_trials(study)?))?;

        if trial.number == 0 {
            write_study_details(&mut self.run, study)?;
        }
        if self
            .config
            .plots_update_freq
            .should_fire(trial.number, study.stop_flag)
        {
            write_plots(&mut self.run, study, &self.config.plots)?;
        }
        if self
            .config
            .study_update_freq
            .should_fire(trial.number, study.stop_flag)
        {
            write_study(&mut self.run, study)?;
        }
        Ok(())
    }
}

/// Study-level metadata, written once on the first trial.  Internal fields
/// (`_study_id`, `_storage`) are skipped silently when the engine version no
/// longer exposes them.
pub fn write_study_details<R: RunHandle>(run: &mut R, study: &Study) -> SlResult<()> {
    run.assign("study/study_name", study.study_name.as_str().into())?;
    run.assign("study/direction", study.direction().to_string().into())?;
    run.assign(
        "study/directions",
        FieldValue::Seq(
            study
                .directions
                .iter()
                .map(|d| FieldValue::Str(d.to_string()))
                .collect(),
        ),
    )?;

    let mut system_attrs = FieldValue::map();
    for (key, value) in &study.system_attrs {
        system_attrs.insert(key.clone(), value.into());
    }
    run.assign("study/system_attrs", system_attrs)?;

    let mut user_attrs = FieldValue::map();
    for (key, value) in &study.user_attrs {
        user_attrs.insert(key.clone(), value.into());
    }
    run.assign("study/user_attrs", user_attrs)?;

    if let Some(study_id) = study.study_id {
        run.assign("study/_study_id", FieldValue::Int(study_id as i64))?;
    }
    run.assign("study/_storage", study.storage.backend_name().into())?;
    Ok(())
}

/// Resolve the storage descriptor and write it with the study name.  A
/// resolver miss from attribute skew emits nothing.
pub fn write_study<R: RunHandle>(run: &mut R, study: &Study) -> SlResult<()> {
    let Some(descriptor) = resolve_storage(study)? else {
        return Ok(());
    };

    run.assign("study/study_name", study.study_name.as_str().into())?;
    run.assign("study/storage_type", descriptor.storage_type().into())?;
    match &descriptor {
        StorageDescriptor::InMemory { snapshot } => {
            run.upload("study/study", Artifact::Snapshot(snapshot.clone()))?;
        }
        StorageDescriptor::Remote { .. } | StorageDescriptor::Unknown => {
            if let Some(url) = descriptor.url() {
                run.assign("study/storage_url", url.into())?;
            }
        }
    }
    info!(
        study = %study.study_name,
        storage_type = descriptor.storage_type(),
        "study storage recorded"
    );
    Ok(())
}

/// Per-section switches for [`log_study_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOptions {
    pub base_namespace: String,
    pub log_all_trials: bool,
    pub log_distributions: bool,
    pub log_best_trials: bool,
    pub log_study_details: bool,
    pub log_plots: bool,
    pub log_study: bool,
    pub plots: PlotSelection,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            base_namespace: String::new(),
            log_all_trials: true,
            log_distributions: true,
            log_best_trials: true,
            log_study_details: true,
            log_plots: true,
            log_study: true,
            plots: PlotSelection::default(),
        }
    }
}

/// One-shot projection of an entire existing study, sharing every namespace
/// path with the per-trial callback.  Returns the run handle when done.
pub fn log_study_metadata<R: RunHandle>(
    run: R,
    study: &Study,
    options: &MetadataOptions,
) -> SlResult<R> {
    let mut run = Namespace::new(run, options.base_namespace.clone());

    if options.log_all_trials {
        run.assign("trials", stringify_keys(project_trials(&study.trials)))?;
    }
    if options.log_distributions {
        for trial in &study.trials {
            run.append("study/distributions", project_distributions(trial))?;
        }
    }
    if options.log_best_trials && !study.best_trials().is_empty() {
        run.assign("best", stringify_keys(project_best_trials(study)?))?;
    }
    if options.log_study_details {
        write_study_details(&mut run, study)?;
    }
    if options.log_plots {
        write_plots(&mut run, study, &options.plots)?;
    }
    if options.log_study {
        write_study(&mut run, study)?;
    }
    Ok(run.into_inner())
}
