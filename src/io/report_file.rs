//! Read/write fit report JSON files.
//!
//! A report is the portable record of one `pidfit fit` run: the selected
//! [`FitResult`], the options that shaped it, and (for multi-start runs) a
//! summary of every start point.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DerivativeScheme, FitResult, Solver};
use crate::error::{PidError, PidResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub input: Option<String>,
    pub n_samples: usize,
    pub derivative: DerivativeScheme,
    pub solver: Solver,
    pub initial_guess: Vec<f64>,
    pub result: FitResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub starts: Vec<StartSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSummary {
    pub label: String,
    pub guess: Vec<f64>,
    #[serde(with = "crate::domain::non_finite")]
    pub loss: f64,
    pub converged: bool,
}

impl FitReportFile {
    pub fn new(
        input: Option<&Path>,
        n_samples: usize,
        derivative: DerivativeScheme,
        solver: Solver,
        initial_guess: Vec<f64>,
        result: FitResult,
    ) -> Self {
        Self {
            tool: "pidfit".to_string(),
            generated_at: Utc::now(),
            input: input.map(|p| p.display().to_string()),
            n_samples,
            derivative,
            solver,
            initial_guess,
            result,
            starts: Vec::new(),
        }
    }
}

/// Write a fit report JSON file.
pub fn write_report_json(path: &Path, report: &FitReportFile) -> PidResult<()> {
    let file = File::create(path)
        .map_err(|e| PidError::io(format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| PidError::io(format!("Failed to write report JSON: {e}")))?;
    log::info!("wrote fit report to {}", path.display());
    Ok(())
}

/// Read a fit report JSON file.
pub fn read_report_json(path: &Path) -> PidResult<FitReportFile> {
    let file = File::open(path)
        .map_err(|e| PidError::data_load(format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| PidError::data_load(format!("Invalid report JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ControllerOrder, LossKind, PidGains, Termination};

    fn report() -> FitReportFile {
        let result = FitResult {
            gains: PidGains::new(2.0, 0.5, 0.0),
            loss: 0.25,
            converged: true,
            iterations: 120,
            evaluations: 230,
            order: ControllerOrder::Pi,
            loss_kind: LossKind::Mse,
            termination: Termination::Converged,
        };
        FitReportFile::new(
            Some(Path::new("trace.csv")),
            100,
            DerivativeScheme::Gradient,
            Solver::NelderMead,
            vec![1.0, 1.0],
            result,
        )
    }

    #[test]
    fn report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        let mut original = report();
        original.starts.push(StartSummary {
            label: "flow".into(),
            guess: vec![2.0, 0.5],
            loss: 3.0,
            converged: false,
        });
        write_report_json(&path, &original).unwrap();
        assert_eq!(read_report_json(&path).unwrap(), original);
    }

    #[test]
    fn unbounded_losses_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diverged.json");
        let mut original = report();
        original.result.loss = f64::INFINITY;
        original.result.converged = false;
        original.result.termination = Termination::EvaluationLimit;
        original.starts.push(StartSummary {
            label: "initial".into(),
            guess: vec![1e307, 1e307],
            loss: f64::INFINITY,
            converged: false,
        });
        write_report_json(&path, &original).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("null"));
        assert_eq!(read_report_json(&path).unwrap(), original);
    }

    #[test]
    fn report_json_uses_readable_enums() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["tool"], "pidfit");
        assert_eq!(json["result"]["order"], "pi");
        assert_eq!(json["result"]["termination"], "converged");
        assert_eq!(json["solver"], "nelder-mead");
        assert!(json.get("starts").is_none());
    }

    #[test]
    fn invalid_json_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_report_json(&path), Err(PidError::DataLoad(_))));
    }
}
