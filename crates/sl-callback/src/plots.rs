//! Visualization-backend dispatch and plot artifact generation.
//!
//! Chart layout and interactivity belong to the document's plotting code;
//! the backends here produce self-contained documents carrying the study
//! series each plot kind needs.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use sl_track::{Artifact, RunHandle};
use sl_types::{ParameterValue, SlError, SlResult, Study, TrialState};

/// The plot kinds a study can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Contour,
    Edf,
    ParallelCoordinate,
    ParamImportances,
    ParetoFront,
    Slice,
    IntermediateValues,
    OptimizationHistory,
}

impl PlotKind {
    pub const ALL: [PlotKind; 8] = [
        PlotKind::Contour,
        PlotKind::Edf,
        PlotKind::ParallelCoordinate,
        PlotKind::ParamImportances,
        PlotKind::ParetoFront,
        PlotKind::Slice,
        PlotKind::IntermediateValues,
        PlotKind::OptimizationHistory,
    ];

    /// Path segment under `visualizations/`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Contour => "plot_contour",
            Self::Edf => "plot_edf",
            Self::ParallelCoordinate => "plot_parallel_coordinate",
            Self::ParamImportances => "plot_param_importances",
            Self::ParetoFront => "plot_pareto_front",
            Self::Slice => "plot_slice",
            Self::IntermediateValues => "plot_intermediate_values",
            Self::OptimizationHistory => "plot_optimization_history",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Contour => "Contour",
            Self::Edf => "Empirical Distribution Function",
            Self::ParallelCoordinate => "Parallel Coordinate",
            Self::ParamImportances => "Parameter Importances",
            Self::ParetoFront => "Pareto Front",
            Self::Slice => "Slice",
            Self::IntermediateValues => "Intermediate Values",
            Self::OptimizationHistory => "Optimization History",
        }
    }
}

/// One render function per plot kind, plus capability flags.
pub trait VisBackend {
    fn name(&self) -> &'static str;

    /// Whether the backend can render at all in this build.
    fn is_available(&self) -> bool {
        true
    }

    /// Only the interactive backend can lay out a Pareto front.
    fn supports_pareto_front(&self) -> bool;

    fn render(&self, kind: PlotKind, study: &Study) -> SlResult<Artifact>;
}

impl std::fmt::Debug for dyn VisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VisBackend({})", self.name())
    }
}

/// Select a backend by configuration string.
///
/// Fails fast with a not-implemented signal naming the offending backend;
/// an unsupported name must never silently skip rendering.
pub fn backend_for(name: &str) -> SlResult<Box<dyn VisBackend>> {
    match name {
        "plotly" => Ok(Box::new(PlotlyBackend)),
        "matplotlib" => Ok(Box::new(MatplotlibBackend)),
        other => Err(SlError::NotImplemented {
            backend: other.to_string(),
        }),
    }
}

/// Which plot kinds are enabled, and through which backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSelection {
    pub vis_backend: String,
    pub contour: bool,
    pub edf: bool,
    pub parallel_coordinate: bool,
    pub param_importances: bool,
    pub pareto_front: bool,
    pub slice: bool,
    pub intermediate_values: bool,
    pub optimization_history: bool,
}

impl Default for PlotSelection {
    fn default() -> Self {
        Self {
            vis_backend: "plotly".to_string(),
            contour: true,
            edf: true,
            parallel_coordinate: true,
            param_importances: true,
            pareto_front: true,
            slice: true,
            intermediate_values: true,
            optimization_history: true,
        }
    }
}

impl PlotSelection {
    fn enabled(&self, kind: PlotKind) -> bool {
        match kind {
            PlotKind::Contour => self.contour,
            PlotKind::Edf => self.edf,
            PlotKind::ParallelCoordinate => self.parallel_coordinate,
            PlotKind::ParamImportances => self.param_importances,
            PlotKind::ParetoFront => self.pareto_front,
            PlotKind::Slice => self.slice,
            PlotKind::IntermediateValues => self.intermediate_values,
            PlotKind::OptimizationHistory => self.optimization_history,
        }
    }
}

/// Render every enabled and applicable plot kind and upload each under
/// `visualizations/{kind}`.  Render failures propagate; nothing is caught
/// here.
pub fn write_plots<R: RunHandle>(
    run: &mut R,
    study: &Study,
    selection: &PlotSelection,
) -> SlResult<()> {
    let backend = backend_for(&selection.vis_backend)?;
    if !backend.is_available() {
        warn!(backend = backend.name(), "visualization backend unavailable");
        return Ok(());
    }

    for kind in PlotKind::ALL {
        if !selection.enabled(kind) || !applicable(kind, study, backend.as_ref()) {
            continue;
        }
        let artifact = backend.render(kind, study)?;
        let path = format!("visualizations/{}", kind.path_segment());
        run.upload(&path, artifact)?;
    }
    info!(study = %study.study_name, backend = backend.name(), "plots updated");
    Ok(())
}

/// Per-kind applicability gates evaluated against the study.
fn applicable(kind: PlotKind, study: &Study, backend: &dyn VisBackend) -> bool {
    match kind {
        PlotKind::ParamImportances => study.trials.len() > 1,
        PlotKind::ParetoFront => study.is_multi_objective() && backend.supports_pareto_front(),
        PlotKind::IntermediateValues => study
            .trials
            .iter()
            .any(|t| !t.intermediate_values.is_empty()),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Shipped backends
// ---------------------------------------------------------------------------

/// Interactive variant: a standalone HTML document embedding the study series
/// as a JSON payload for client-side plotting.
pub struct PlotlyBackend;

impl VisBackend for PlotlyBackend {
    fn name(&self) -> &'static str {
        "plotly"
    }

    fn supports_pareto_front(&self) -> bool {
        true
    }

    fn render(&self, kind: PlotKind, study: &Study) -> SlResult<Artifact> {
        let payload = json!({
            "kind": kind.path_segment(),
            "study": study.study_name,
            "data": plot_payload(kind, study),
        });
        let html = format!(
            concat!(
                "<!DOCTYPE html><html><head><meta charset=\"utf-8\">",
                "<title>{title} \u{2014} {study}</title></head><body>",
                "<div class=\"plot\" data-kind=\"{segment}\"></div>",
                "<script type=\"application/json\" id=\"plot-data\">{payload}</script>",
                "</body></html>"
            ),
            title = kind.title(),
            study = study.study_name,
            segment = kind.path_segment(),
            payload = payload,
        );
        Ok(Artifact::Html(html))
    }
}

/// Static variant: the objective series drawn as an inline SVG document.
/// No Pareto-front support.
pub struct MatplotlibBackend;

impl VisBackend for MatplotlibBackend {
    fn name(&self) -> &'static str {
        "matplotlib"
    }

    fn supports_pareto_front(&self) -> bool {
        false
    }

    fn render(&self, kind: PlotKind, study: &Study) -> SlResult<Artifact> {
        if kind == PlotKind::ParetoFront {
            return Err(SlError::Internal(
                "pareto-front plots require the interactive backend".to_string(),
            ));
        }
        let (numbers, values) = objective_series(study);
        let polyline = svg_polyline(&numbers, &values);
        let html = format!(
            concat!(
                "<!DOCTYPE html><html><head><meta charset=\"utf-8\">",
                "<title>{title} \u{2014} {study}</title></head><body>",
                "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 640 480\">",
                "<text x=\"8\" y=\"20\">{title}</text>{polyline}</svg>",
                "</body></html>"
            ),
            title = kind.title(),
            study = study.study_name,
            polyline = polyline,
        );
        Ok(Artifact::Html(html))
    }
}

/// Completed-trial objective series in study order.  Multi-objective trials
/// contribute their first objective.
fn objective_series(study: &Study) -> (Vec<usize>, Vec<f64>) {
    let mut numbers = Vec::new();
    let mut values = Vec::new();
    for trial in &study.trials {
        if trial.state != TrialState::Complete {
            continue;
        }
        let value = trial
            .value
            .or_else(|| trial.values.as_ref().and_then(|v| v.first().copied()));
        if let Some(value) = value {
            numbers.push(trial.number);
            values.push(value);
        }
    }
    (numbers, values)
}

fn param_json(value: &ParameterValue) -> serde_json::Value {
    match value {
        ParameterValue::Float(v) => json!(v),
        ParameterValue::Int(v) => json!(v),
        ParameterValue::Bool(v) => json!(v),
        ParameterValue::Str(v) => json!(v),
    }
}

fn plot_payload(kind: PlotKind, study: &Study) -> serde_json::Value {
    let (numbers, values) = objective_series(study);
    match kind {
        PlotKind::OptimizationHistory => json!({
            "numbers": numbers,
            "values": values,
        }),
        PlotKind::Edf => {
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            json!({ "values": sorted })
        }
        PlotKind::Contour | PlotKind::Slice | PlotKind::ParallelCoordinate
        | PlotKind::ParamImportances => {
            let mut params = serde_json::Map::new();
            for trial in &study.trials {
                if trial.state != TrialState::Complete {
                    continue;
                }
                for (name, value) in &trial.params {
                    let series = params.entry(name.clone()).or_insert_with(|| json!([]));
                    if let Some(series) = series.as_array_mut() {
                        series.push(param_json(value));
                    }
                }
            }
            json!({ "params": params, "values": values })
        }
        PlotKind::ParetoFront => {
            let fronts: Vec<&Vec<f64>> = study
                .trials
                .iter()
                .filter(|t| t.state == TrialState::Complete)
                .filter_map(|t| t.values.as_ref())
                .collect();
            json!({ "values": fronts })
        }
        PlotKind::IntermediateValues => {
            let mut trials = serde_json::Map::new();
            for trial in &study.trials {
                if trial.intermediate_values.is_empty() {
                    continue;
                }
                let steps: serde_json::Map<String, serde_json::Value> = trial
                    .intermediate_values
                    .iter()
                    .map(|(step, value)| (step.to_string(), json!(value)))
                    .collect();
                trials.insert(trial.number.to_string(), serde_json::Value::Object(steps));
            }
            json!({ "trials": trials })
        }
    }
}

fn svg_polyline(numbers: &[usize], values: &[f64]) -> String {
    if values.is_empty() {
        return String::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        max - min
    };
    let last = numbers.last().copied().unwrap_or(0).max(1) as f64;

    let points: Vec<String> = numbers
        .iter()
        .zip(values)
        .map(|(n, v)| {
            let x = 40.0 + (*n as f64 / last) * 560.0;
            let y = 440.0 - ((v - min) / span) * 400.0;
            format!("{x:.1},{y:.1}")
        })
        .collect();
    format!(
        "<polyline fill=\"none\" stroke=\"black\" points=\"{}\"/>",
        points.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_track::InMemoryRun;
    use sl_types::{FrozenTrial, ObjectiveDirection};
    use std::collections::BTreeMap;

    fn trial(number: usize, value: f64) -> FrozenTrial {
        FrozenTrial {
            number,
            state: TrialState::Complete,
            value: Some(value),
            values: None,
            params: BTreeMap::new(),
            distributions: BTreeMap::new(),
            intermediate_values: BTreeMap::new(),
            datetime_start: None,
            datetime_complete: None,
        }
    }

    fn study(n_trials: usize) -> Study {
        let mut study = Study::new("plots", ObjectiveDirection::Minimize);
        study.trials = (0..n_trials).map(|i| trial(i, i as f64)).collect();
        study
    }

    #[test]
    fn unknown_backend_fails_with_its_name() {
        let err = backend_for("bokeh").unwrap_err();
        match err {
            SlError::NotImplemented { backend } => assert_eq!(backend, "bokeh"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plotly_renders_self_contained_html() {
        let backend = backend_for("plotly").unwrap();
        let artifact = backend
            .render(PlotKind::OptimizationHistory, &study(3))
            .unwrap();
        let Artifact::Html(html) = artifact else {
            panic!("expected html artifact");
        };
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("plot_optimization_history"));
        assert!(html.contains("\"numbers\":[0,1,2]"));
    }

    #[test]
    fn matplotlib_renders_svg() {
        let backend = backend_for("matplotlib").unwrap();
        let artifact = backend.render(PlotKind::Slice, &study(4)).unwrap();
        let Artifact::Html(html) = artifact else {
            panic!("expected html artifact");
        };
        assert!(html.contains("<svg"));
        assert!(html.contains("<polyline"));
    }

    #[test]
    fn write_plots_uploads_enabled_kinds() {
        let mut run = InMemoryRun::new();
        let selection = PlotSelection::default();
        write_plots(&mut run, &study(3), &selection).unwrap();

        assert!(run.artifact("visualizations/plot_contour").is_some());
        assert!(run.artifact("visualizations/plot_optimization_history").is_some());
        // Single-objective: no pareto front. No intermediate values either.
        assert!(run.artifact("visualizations/plot_pareto_front").is_none());
        assert!(run.artifact("visualizations/plot_intermediate_values").is_none());
    }

    #[test]
    fn param_importances_needs_more_than_one_trial() {
        let mut run = InMemoryRun::new();
        write_plots(&mut run, &study(1), &PlotSelection::default()).unwrap();
        assert!(run.artifact("visualizations/plot_param_importances").is_none());

        let mut run = InMemoryRun::new();
        write_plots(&mut run, &study(2), &PlotSelection::default()).unwrap();
        assert!(run.artifact("visualizations/plot_param_importances").is_some());
    }

    #[test]
    fn disabled_kind_is_not_uploaded() {
        let mut run = InMemoryRun::new();
        let selection = PlotSelection {
            edf: false,
            ..PlotSelection::default()
        };
        write_plots(&mut run, &study(3), &selection).unwrap();
        assert!(run.artifact("visualizations/plot_edf").is_none());
        assert!(run.artifact("visualizations/plot_slice").is_some());
    }

    #[test]
    fn pareto_front_skipped_on_static_backend() {
        let mut study = Study::new_multi_objective(
            "mo",
            vec![ObjectiveDirection::Minimize, ObjectiveDirection::Minimize],
        );
        let mut t0 = trial(0, 0.0);
        t0.value = None;
        t0.values = Some(vec![1.0, 2.0]);
        let mut t1 = trial(1, 0.0);
        t1.value = None;
        t1.values = Some(vec![2.0, 1.0]);
        study.trials = vec![t0, t1];

        let mut run = InMemoryRun::new();
        let selection = PlotSelection {
            vis_backend: "matplotlib".to_string(),
            ..PlotSelection::default()
        };
        write_plots(&mut run, &study, &selection).unwrap();
        assert!(run.artifact("visualizations/plot_pareto_front").is_none());
        assert!(run.artifact("visualizations/plot_edf").is_some());

        let mut run = InMemoryRun::new();
        write_plots(&mut run, &study, &PlotSelection::default()).unwrap();
        assert!(run.artifact("visualizations/plot_pareto_front").is_some());
    }
}
