//! Fit output payloads and their text renderings.
//!
//! JSON output serialises [`FitOutput`] directly. The Markdown rendering
//! keeps the familiar console lines (`Posterior Gaussian (Gaussian mean):
//! Gaussian(m, v)` and friends) so results read the same in a terminal.

use crate::inference::{
    DirichletSummary, GammaSummary, GaussianSummary, InferenceReport, InferenceSettings,
};
use crate::model::{ModelKind, ModelSpec, PrecisionSource};
use mf_common::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Version of the JSON payload layout.
pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Descriptive statistics of the fitted data.
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub path: Option<PathBuf>,
    pub n: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl DataSummary {
    pub fn new(path: Option<&Path>, values: &[f64]) -> Self {
        let n = values.len();
        let mean = if n == 0 {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / n as f64
        };
        DataSummary {
            path: path.map(Path::to_path_buf),
            n,
            mean,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Posterior view of one mixture component (or the single Gaussian).
#[derive(Debug, Clone, Serialize)]
pub struct ComponentView {
    pub index: usize,
    pub mean: GaussianSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<GammaSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_precision: Option<f64>,
    /// Posterior mean of the mixture weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Assignment probabilities of one data point.
#[derive(Debug, Clone, Serialize)]
pub struct PointView {
    pub index: usize,
    pub x: f64,
    pub probabilities: Vec<f64>,
}

/// Everything a fit command prints.
#[derive(Debug, Clone, Serialize)]
pub struct FitOutput {
    pub schema_version: &'static str,
    pub run_id: String,
    pub generated_at: String,
    pub model: ModelKind,
    pub data: DataSummary,
    pub settings: InferenceSettings,
    pub components: Vec<ComponentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<DirichletSummary>,
    /// First few points, for a quick look at the assignments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PointView>,
    pub report: InferenceReport,
}

impl FitOutput {
    pub fn new(
        run_id: impl Into<String>,
        spec: &ModelSpec,
        data_path: Option<&Path>,
        settings: InferenceSettings,
        report: InferenceReport,
        diagnostic_points: usize,
    ) -> Result<Self> {
        let posteriors = &report.posteriors;
        let weights = match spec.weights() {
            Some(id) => Some(posteriors.dirichlet(id)?),
            None => None,
        };

        let mut components = Vec::with_capacity(spec.components().len());
        for (index, branch) in spec.components().iter().enumerate() {
            let (precision, fixed_precision) = match branch.precision {
                PrecisionSource::Latent(id) => (Some(posteriors.gamma(id)?), None),
                PrecisionSource::Fixed(lambda) => (None, Some(lambda)),
            };
            components.push(ComponentView {
                index,
                mean: posteriors.gaussian(branch.mean)?,
                precision,
                fixed_precision,
                weight: weights.as_ref().and_then(|w| w.mean.get(index).copied()),
            });
        }

        let values = spec.data().values();
        let mut points = Vec::new();
        for (index, (&id, &x)) in spec
            .assignments()
            .iter()
            .zip(values.iter())
            .take(diagnostic_points)
            .enumerate()
        {
            points.push(PointView {
                index,
                x,
                probabilities: posteriors.categorical(id)?.probabilities,
            });
        }

        Ok(FitOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            run_id: run_id.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            model: spec.kind(),
            data: DataSummary::new(data_path, values),
            settings,
            components,
            weights,
            points,
            report,
        })
    }

    /// One line: model, status, iterations and ELBO.
    pub fn render_summary(&self) -> String {
        format!(
            "[{}] {}: {} after {} sweeps, ELBO {:.6} (n={}, k={})",
            self.run_id,
            self.model,
            self.report.status,
            self.report.iterations,
            self.report.elbo,
            self.data.n,
            self.components.len()
        )
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# mf-core {}", self.model);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Status: {} after {} sweeps (ELBO {:.6})",
            self.report.status, self.report.iterations, self.report.elbo
        );
        if self.report.elbo_decreases > 0 {
            let _ = writeln!(
                out,
                "Warning: ELBO decreased {} time(s)",
                self.report.elbo_decreases
            );
        }
        let _ = writeln!(out, "Data: n = {}, mean = {:.4}", self.data.n, self.data.mean);
        let _ = writeln!(out);

        match self.model {
            ModelKind::GaussianMean | ModelKind::GaussianMeanPrecision => {
                if let Some(c) = self.components.first() {
                    let _ = writeln!(
                        out,
                        "Posterior Gaussian (Gaussian mean): {}",
                        gaussian_text(&c.mean)
                    );
                    if let Some(p) = &c.precision {
                        let _ = writeln!(
                            out,
                            "Posterior Gamma (Gaussian precision): {}",
                            gamma_text(p)
                        );
                    }
                }
            }
            ModelKind::Mixture => {
                for c in &self.components {
                    let _ = writeln!(
                        out,
                        "Component {}: mean {}, precision {}",
                        c.index,
                        gaussian_text(&c.mean),
                        c.precision
                            .as_ref()
                            .map(gamma_text)
                            .unwrap_or_else(|| "fixed".to_string())
                    );
                }
                let _ = writeln!(out);
                for p in &self.points {
                    let _ = writeln!(
                        out,
                        "x = {:.4} : p(z) = Discrete({})",
                        p.x,
                        join_probs(&p.probabilities)
                    );
                }
                if let Some(w) = &self.weights {
                    let _ = writeln!(out);
                    let _ = writeln!(
                        out,
                        "Posterior weight distribution: Dirichlet({})",
                        join_probs(&w.concentration)
                    );
                }
            }
        }
        out
    }
}

fn gaussian_text(s: &GaussianSummary) -> String {
    match s.to_prior() {
        Ok(g) => g.to_string(),
        Err(_) => format!("Gaussian({}, {})", s.mean, s.variance),
    }
}

fn gamma_text(s: &GammaSummary) -> String {
    match s.to_prior() {
        Ok(g) => g.to_string(),
        Err(_) => format!("Gamma({}, {})", s.shape, s.rate),
    }
}

fn join_probs(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(" ")
}
