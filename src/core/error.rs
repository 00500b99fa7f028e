use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimulationError>;

/// Why a request cannot produce distribution statistics.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegenerateInput {
    /// The horizon is zero months.
    NoPeriods,
    /// The ensemble has no simulated paths.
    NoSimulations,
}

impl std::fmt::Display for DegenerateInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegenerateInput::NoPeriods => f.write_str("horizon has zero months"),
            DegenerateInput::NoSimulations => f.write_str("ensemble has zero simulations"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A request parameter is outside its documented domain.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Statistics are undefined for an empty ensemble.
    #[error("statistics undefined: {0}")]
    Degenerate(DegenerateInput),

    /// A simulated value became NaN or infinite.
    #[error("non-finite value {value} in simulation {simulation} at month {month}")]
    NumericAnomaly {
        simulation: usize,
        month: usize,
        value: f64,
    },
}

impl SimulationError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending request field, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}
