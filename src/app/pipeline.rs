//! Shared pipeline logic behind the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load CSV -> select columns -> fit (single or multi-start) -> residuals
//!
//! The CLI can then focus on presentation (printing, plotting, exports).

use std::path::Path;

use crate::data::generate;
use crate::domain::{ColumnSelection, FitConfig, FitResult, GenerateConfig, Trace};
use crate::error::{PidError, PidResult};
use crate::fit::{MultiStartFit, fit_gains, fit_multistart, start_points};
use crate::io::{CsvSource, DataSource, IngestedTrace, TabularData};
use crate::models::synthesize_output;
use crate::report::{Residuals, compute_residuals};

/// Caller-owned working context: the data source plus the last loaded table.
#[derive(Debug, Default)]
pub struct Session<S: DataSource = CsvSource> {
    source: S,
    table: Option<TabularData>,
}

impl Session<CsvSource> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: DataSource> Session<S> {
    pub fn with_source(source: S) -> Self {
        Self { source, table: None }
    }

    /// Load `path`, replacing any previously loaded table.
    ///
    /// On failure the previous table is discarded too, so a later `select`
    /// never runs against stale data.
    pub fn load(&mut self, path: &Path) -> PidResult<&TabularData> {
        self.table = None;
        let table = self.source.load(path)?;
        Ok(self.table.insert(table))
    }

    pub fn table(&self) -> Option<&TabularData> {
        self.table.as_ref()
    }

    pub fn select(&self, columns: &ColumnSelection) -> PidResult<IngestedTrace> {
        self.table
            .as_ref()
            .ok_or_else(|| PidError::data_load("No data loaded; load a file first."))?
            .select(columns)
    }

    pub fn clear(&mut self) {
        self.table = None;
    }
}

/// Everything computed by one `pidfit fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub ingest: IngestedTrace,
    pub guess: Vec<f64>,
    pub fit: FitResult,
    pub multistart: Option<MultiStartFit>,
    pub residuals: Residuals,
}

/// Execute the full fitting pipeline.
pub fn run_fit(config: &FitConfig) -> PidResult<FitRun> {
    let mut session = Session::new();
    run_fit_in_session(&mut session, config)
}

/// Execute the fitting pipeline inside an existing session.
pub fn run_fit_in_session<S: DataSource>(session: &mut Session<S>, config: &FitConfig) -> PidResult<FitRun> {
    session.load(&config.input)?;
    let ingest = session.select(&config.columns)?;
    log::info!(
        "fitting {} samples from {} ({} order)",
        ingest.trace.len(),
        config.input.display(),
        config.options.order.display_name()
    );

    let guess = config.initial_guess();
    let (fit, multistart) = if config.multistart {
        let starts = start_points(Some(&guess), config.options.order);
        let ms = fit_multistart(&ingest.trace, &starts, &config.options)?;
        (ms.best.clone(), Some(ms))
    } else {
        (fit_gains(&ingest.trace, &guess, &config.options)?, None)
    };

    let residuals = compute_residuals(&ingest.trace, &fit, config.options.derivative);
    Ok(FitRun {
        ingest,
        guess,
        fit,
        multistart,
        residuals,
    })
}

/// Generate a trace, optionally relabelling OUT with a known controller.
pub fn run_generate(config: &GenerateConfig) -> PidResult<Trace> {
    let trace = generate(&config.scenario)?;
    match &config.model_gains {
        Some(gains) => {
            log::info!("replacing OUT with the PID response to {gains}");
            synthesize_output(&trace, gains, config.derivative)
        }
        None => Ok(trace),
    }
}
