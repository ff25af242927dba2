//! Error taxonomy shared by the library and the `pidfit` binary.
//!
//! Every fallible operation returns [`PidResult`]. The binary maps each kind to
//! a process exit code via [`PidError::exit_code`]:
//!
//! - `2` configuration / parameter parsing (bad flags, bad scenario settings)
//! - `3` data loading (missing file, missing columns, unusable rows)
//! - `4` optimizer non-convergence (only when a caller asks for a hard failure)
//! - `5` output I/O

use thiserror::Error;

use crate::domain::FitResult;

/// Result alias used throughout the crate.
pub type PidResult<T> = Result<T, PidError>;

#[derive(Debug, Clone, Error)]
pub enum PidError {
    /// Missing or unsupported input file, missing columns, unusable rows.
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Invalid scenario or fit settings (inverted bounds, negative noise, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A numeric parameter supplied as text could not be parsed.
    #[error("Parameter parse error: {0}")]
    ParameterParse(String),

    /// The optimizer stopped before converging. Carries the best iterate found.
    #[error(
        "Optimizer did not converge ({:?}) after {} iterations; best loss {:.6e}",
        .best.termination,
        .best.iterations,
        .best.loss
    )]
    OptimizationFailure { best: Box<FitResult> },

    /// Writing an export failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl PidError {
    pub fn data_load(message: impl Into<String>) -> Self {
        Self::DataLoad(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParameterParse(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PidError::Configuration(_) | PidError::ParameterParse(_) => 2,
            PidError::DataLoad(_) => 3,
            PidError::OptimizationFailure { .. } => 4,
            PidError::Io(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(PidError::config("x").exit_code(), 2);
        assert_eq!(PidError::parse("x").exit_code(), 2);
        assert_eq!(PidError::data_load("x").exit_code(), 3);
        assert_eq!(PidError::io("x").exit_code(), 5);
    }

    #[test]
    fn messages_carry_context() {
        let err = PidError::data_load("Missing required column: `PV`");
        assert_eq!(err.to_string(), "Data load error: Missing required column: `PV`");
    }
}
