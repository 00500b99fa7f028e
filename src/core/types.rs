use serde::Serialize;

use super::error::{DegenerateInput, Result, SimulationError};

pub const MAX_MONTHS: usize = 480;
pub const MAX_INITIAL_INVESTMENT: f64 = 500.0;
pub const MAX_MONTHLY_INVESTMENT: f64 = 10.0;
pub const MAX_TOTAL_INVESTMENT: f64 = 1800.0;
pub const MAX_SIMULATIONS: usize = 10_000;

/// Coefficients of the EGARCH(1,1,1) monthly return model.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EgarchParameters {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub mu: f64,
    pub warmup_length: usize,
}

impl Default for EgarchParameters {
    fn default() -> Self {
        Self {
            omega: -2.293,
            alpha: 0.337,
            beta: 0.638,
            gamma: -0.345,
            mu: 0.00692,
            warmup_length: 100,
        }
    }
}

/// One projection request: horizon, contribution plan and ensemble size.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub total_month: usize,
    pub initial_investment: f64,
    pub monthly_investment: f64,
    pub total_investment: f64,
    pub simulations: usize,
    pub seed: u64,
}

impl SimulationRequest {
    pub fn validate(&self) -> Result<()> {
        if self.total_month > MAX_MONTHS {
            return Err(SimulationError::validation(
                "totalMonth",
                format!("must be between 0 and {MAX_MONTHS}"),
            ));
        }
        for (field, value, max) in [
            (
                "initialInvestment",
                self.initial_investment,
                MAX_INITIAL_INVESTMENT,
            ),
            (
                "monthlyInvestment",
                self.monthly_investment,
                MAX_MONTHLY_INVESTMENT,
            ),
            ("totalInvestment", self.total_investment, MAX_TOTAL_INVESTMENT),
        ] {
            if !value.is_finite() || !(0.0..=max).contains(&value) {
                return Err(SimulationError::validation(
                    field,
                    format!("must be between 0 and {max}"),
                ));
            }
        }
        if self.simulations > MAX_SIMULATIONS {
            return Err(SimulationError::validation(
                "simulations",
                format!("must be between 0 and {MAX_SIMULATIONS}"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatistics {
    pub median: Vec<f64>,
    pub q1: Vec<f64>,
    pub q3: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalStatistics {
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub minimum: f64,
    /// Fraction of paths ending strictly below `total_invested`.
    pub shortfall_probability: f64,
    pub total_invested: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub period: PeriodStatistics,
    pub terminal: TerminalStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub request: SimulationRequest,
    pub model: EgarchParameters,
    pub schedule: Vec<f64>,
    pub statistics: Option<DistributionSummary>,
    pub degenerate: Option<DegenerateInput>,
}
