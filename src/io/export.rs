//! Export traces to CSV.
//!
//! The layout (`time,PV,OUT,SP`) is the same one [`CsvSource`](crate::io::CsvSource)
//! reads by default, so an exported trace can be fed straight back into a fit.
//! Values are written in Rust's shortest round-trip form, so nothing is lost.

use std::path::Path;

use crate::domain::Trace;
use crate::error::{PidError, PidResult};

/// Anything that can persist a trace.
pub trait DataSink {
    fn save(&self, path: &Path, trace: &Trace) -> PidResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSink;

pub const TRACE_HEADER: [&str; 4] = ["time", "PV", "OUT", "SP"];

impl DataSink for CsvSink {
    fn save(&self, path: &Path, trace: &Trace) -> PidResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| PidError::io(format!("Failed to create CSV '{}': {e}", path.display())))?;

        writer
            .write_record(TRACE_HEADER)
            .map_err(|e| PidError::io(format!("Failed to write CSV header: {e}")))?;

        for i in 0..trace.len() {
            writer
                .write_record([
                    trace.time()[i].to_string(),
                    trace.pv()[i].to_string(),
                    trace.out()[i].to_string(),
                    trace.sp()[i].to_string(),
                ])
                .map_err(|e| PidError::io(format!("Failed to write CSV row {}: {e}", i + 1)))?;
        }

        writer
            .flush()
            .map_err(|e| PidError::io(format!("Failed to flush CSV '{}': {e}", path.display())))?;
        log::info!("wrote {} samples to {}", trace.len(), path.display());
        Ok(())
    }
}

/// Write `trace` with [`CsvSink`].
pub fn write_trace_csv(path: &Path, trace: &Trace) -> PidResult<()> {
    CsvSink.save(path, trace)
}
