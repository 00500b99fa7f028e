use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::error::{Result, SimulationError};
use super::returns::ReturnGenerator;
use super::schedule::ContributionSchedule;
use super::stats::aggregate;
use super::types::{EgarchParameters, ProjectionReport, SimulationRequest};

/// Simulated portfolio values, row-major: one row per path, one column per month.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPathEnsemble {
    simulations: usize,
    months: usize,
    values: Vec<f64>,
}

impl AssetPathEnsemble {
    pub(crate) fn empty(simulations: usize, months: usize) -> Self {
        debug_assert!(simulations == 0 || months == 0);
        Self {
            simulations,
            months,
            values: Vec::new(),
        }
    }

    pub fn from_rows(simulations: usize, months: usize, values: Vec<f64>) -> Result<Self> {
        if simulations.checked_mul(months) != Some(values.len()) {
            return Err(SimulationError::validation(
                "ensemble",
                format!(
                    "{} values do not fill {simulations} rows of {months} months",
                    values.len()
                ),
            ));
        }
        Ok(Self {
            simulations,
            months,
            values,
        })
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    pub fn months(&self) -> usize {
        self.months
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row(&self, simulation: usize) -> &[f64] {
        let start = simulation * self.months;
        &self.values[start..start + self.months]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.months.max(1))
    }

    pub fn column(&self, month: usize) -> Vec<f64> {
        self.rows().map(|row| row[month]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioPathSimulator {
    generator: ReturnGenerator,
    seed: u64,
}

impl PortfolioPathSimulator {
    pub fn new(seed: u64) -> Self {
        Self::with_parameters(EgarchParameters::default(), seed)
    }

    pub fn with_parameters(params: EgarchParameters, seed: u64) -> Self {
        Self {
            generator: ReturnGenerator::new(params),
            seed,
        }
    }

    pub fn params(&self) -> &EgarchParameters {
        self.generator.params()
    }

    // Row `s` always draws from the stream seeded by `derive_seed(seed, s)`.
    pub fn simulate(
        &self,
        schedule: &ContributionSchedule,
        simulations: usize,
    ) -> Result<AssetPathEnsemble> {
        let months = schedule.len();
        if months == 0 || simulations == 0 {
            return Ok(AssetPathEnsemble::empty(simulations, months));
        }

        let mut values = vec![0.0; simulations * months];
        values
            .par_chunks_mut(months)
            .enumerate()
            .try_for_each_init(
                || Vec::with_capacity(months),
                |returns, (simulation, row)| {
                    let mut rng = ChaCha20Rng::seed_from_u64(derive_seed(self.seed, simulation));
                    self.generator.generate_into(months, &mut rng, returns);
                    accumulate_path(schedule, returns, row);
                    check_finite(simulation, row)
                },
            )?;

        Ok(AssetPathEnsemble {
            simulations,
            months,
            values,
        })
    }
}

/// `V ← (V + A_t)·e^{r_t}` from `V = 0`; month t's contribution goes in before its return.
pub fn accumulate_path(schedule: &ContributionSchedule, returns: &[f64], out: &mut [f64]) {
    debug_assert_eq!(returns.len(), schedule.len());
    debug_assert_eq!(out.len(), schedule.len());

    let mut value = 0.0;
    for (month, (&r, slot)) in returns.iter().zip(out.iter_mut()).enumerate() {
        value = (value + schedule.contribution(month)) * r.exp();
        *slot = value;
    }
}

fn check_finite(simulation: usize, row: &[f64]) -> Result<()> {
    match row.iter().position(|v| !v.is_finite()) {
        Some(month) => Err(SimulationError::NumericAnomaly {
            simulation,
            month,
            value: row[month],
        }),
        None => Ok(()),
    }
}

pub fn run_projection(request: &SimulationRequest) -> Result<ProjectionReport> {
    run_projection_with(request, EgarchParameters::default())
}

pub fn run_projection_with(
    request: &SimulationRequest,
    params: EgarchParameters,
) -> Result<ProjectionReport> {
    request.validate()?;
    info!(
        months = request.total_month,
        initial = request.initial_investment,
        monthly = request.monthly_investment,
        cap = request.total_investment,
        simulations = request.simulations,
        seed = request.seed,
        "Running portfolio projection"
    );

    let schedule = ContributionSchedule::new(
        request.total_month,
        request.initial_investment,
        request.monthly_investment,
        request.total_investment,
    );
    debug!(total_invested = ?schedule.total_invested(), "Contribution schedule built");

    let simulator = PortfolioPathSimulator::with_parameters(params, request.seed);
    let ensemble = simulator.simulate(&schedule, request.simulations)?;
    debug!(
        rows = ensemble.simulations(),
        months = ensemble.months(),
        "Ensemble complete"
    );

    let (statistics, degenerate) = match aggregate(&ensemble, &schedule) {
        Ok(summary) => {
            info!(
                terminal_median = summary.terminal.median,
                shortfall = summary.terminal.shortfall_probability,
                "Projection complete"
            );
            (Some(summary), None)
        }
        Err(SimulationError::Degenerate(reason)) => {
            warn!(%reason, "Projection has no statistics");
            (None, Some(reason))
        }
        Err(e) => return Err(e),
    };

    Ok(ProjectionReport {
        request: *request,
        model: params,
        schedule: schedule.into_vec(),
        statistics,
        degenerate,
    })
}

fn derive_seed(base_seed: u64, simulation: usize) -> u64 {
    splitmix64(base_seed ^ (simulation as u64).rotate_left(32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
