use rayon::prelude::*;

use super::engine::AssetPathEnsemble;
use super::error::{DegenerateInput, Result, SimulationError};
use super::schedule::ContributionSchedule;
use super::types::{DistributionSummary, PeriodStatistics, TerminalStatistics};

#[derive(Copy, Clone, Debug, PartialEq)]
struct Quartiles {
    q1: f64,
    median: f64,
    q3: f64,
}

impl Quartiles {
    fn of_sorted(sorted: &[f64]) -> Self {
        Self {
            q1: percentile_sorted(sorted, 25.0),
            median: percentile_sorted(sorted, 50.0),
            q3: percentile_sorted(sorted, 75.0),
        }
    }
}

pub fn aggregate(
    ensemble: &AssetPathEnsemble,
    schedule: &ContributionSchedule,
) -> Result<DistributionSummary> {
    if ensemble.months() == 0 {
        return Err(SimulationError::Degenerate(DegenerateInput::NoPeriods));
    }
    if ensemble.simulations() == 0 || ensemble.is_empty() {
        return Err(SimulationError::Degenerate(DegenerateInput::NoSimulations));
    }
    if schedule.len() != ensemble.months() {
        return Err(SimulationError::validation(
            "schedule",
            format!(
                "schedule covers {} months but the ensemble has {}",
                schedule.len(),
                ensemble.months()
            ),
        ));
    }
    let Some(total_invested) = schedule.total_invested() else {
        return Err(SimulationError::Degenerate(DegenerateInput::NoPeriods));
    };

    let per_month = (0..ensemble.months())
        .into_par_iter()
        .map(|month| {
            let mut column = ensemble.column(month);
            if let Some(simulation) = column.iter().position(|v| !v.is_finite()) {
                return Err(SimulationError::NumericAnomaly {
                    simulation,
                    month,
                    value: column[simulation],
                });
            }
            sort_values(&mut column);
            Ok(Quartiles::of_sorted(&column))
        })
        .collect::<Result<Vec<Quartiles>>>()?;

    let mut last = ensemble.column(ensemble.months() - 1);
    sort_values(&mut last);
    let quartiles = Quartiles::of_sorted(&last);
    let shortfalls = last.iter().filter(|&&v| v < total_invested).count();

    let terminal = TerminalStatistics {
        median: quartiles.median,
        q1: quartiles.q1,
        q3: quartiles.q3,
        minimum: last[0],
        shortfall_probability: shortfalls as f64 / last.len() as f64,
        total_invested,
    };

    Ok(DistributionSummary {
        period: PeriodStatistics {
            median: per_month.iter().map(|q| q.median).collect(),
            q1: per_month.iter().map(|q| q.q1).collect(),
            q3: per_month.iter().map(|q| q.q3).collect(),
        },
        terminal,
    })
}

fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

// `p` in percent, rank `(p / 100)·(n − 1)`; `values` sorted and non-empty.
pub fn percentile_sorted(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] + (values[upper] - values[lower]) * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::PortfolioPathSimulator;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn flat_schedule(months: usize, amount: f64) -> ContributionSchedule {
        ContributionSchedule::new(months, amount, 0.0, amount)
    }

    #[test]
    fn percentile_interpolates_between_points() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_approx(percentile_sorted(&values, 25.0), 1.75);
        assert_approx(percentile_sorted(&values, 50.0), 2.5);
        assert_approx(percentile_sorted(&values, 75.0), 3.25);
        assert_approx(percentile_sorted(&values, 0.0), 1.0);
        assert_approx(percentile_sorted(&values, 100.0), 4.0);
    }

    #[test]
    fn percentile_hits_order_statistic_on_integer_rank() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_approx(percentile_sorted(&values, 25.0), 20.0);
        assert_approx(percentile_sorted(&values, 50.0), 30.0);
        assert_approx(percentile_sorted(&values, 75.0), 40.0);
    }

    #[test]
    fn aggregate_computes_columns_and_terminal_outcome() {
        let ensemble = AssetPathEnsemble::from_rows(
            4,
            2,
            vec![
                1.0, 40.0, //
                2.0, 30.0, //
                3.0, 20.0, //
                4.0, 10.0,
            ],
        )
        .unwrap();
        let summary = aggregate(&ensemble, &flat_schedule(2, 25.0)).unwrap();

        assert_approx(summary.period.median[0], 2.5);
        assert_approx(summary.period.q1[0], 1.75);
        assert_approx(summary.period.q3[0], 3.25);
        assert_approx(summary.period.median[1], 25.0);

        let terminal = summary.terminal;
        assert_approx(terminal.median, 25.0);
        assert_approx(terminal.q1, 17.5);
        assert_approx(terminal.q3, 32.5);
        assert_approx(terminal.minimum, 10.0);
        assert_approx(terminal.shortfall_probability, 0.5);
        assert_approx(terminal.total_invested, 25.0);
    }

    #[test]
    fn shortfall_counts_strictly_below_invested() {
        let ensemble = AssetPathEnsemble::from_rows(3, 1, vec![100.0, 99.99, 100.01]).unwrap();
        let summary = aggregate(&ensemble, &flat_schedule(1, 100.0)).unwrap();
        assert_approx(summary.terminal.shortfall_probability, 1.0 / 3.0);
    }

    #[test]
    fn single_simulation_collapses_quartiles() {
        let schedule = ContributionSchedule::new(24, 100.0, 5.0, 1000.0);
        let ensemble = PortfolioPathSimulator::new(8).simulate(&schedule, 1).unwrap();
        let summary = aggregate(&ensemble, &schedule).unwrap();

        for t in 0..24 {
            assert_eq!(summary.period.q1[t], summary.period.median[t]);
            assert_eq!(summary.period.median[t], summary.period.q3[t]);
            assert_eq!(summary.period.median[t], ensemble.row(0)[t]);
        }
        assert_eq!(summary.terminal.minimum, summary.terminal.median);
    }

    #[test]
    fn empty_ensemble_is_signalled_not_zeroed() {
        let schedule = flat_schedule(6, 10.0);
        let no_rows = AssetPathEnsemble::from_rows(0, 6, Vec::new()).unwrap();
        assert_eq!(
            aggregate(&no_rows, &schedule),
            Err(SimulationError::Degenerate(DegenerateInput::NoSimulations))
        );

        let no_months = AssetPathEnsemble::from_rows(10, 0, Vec::new()).unwrap();
        assert_eq!(
            aggregate(&no_months, &flat_schedule(0, 10.0)),
            Err(SimulationError::Degenerate(DegenerateInput::NoPeriods))
        );
    }

    #[test]
    fn non_finite_terminal_value_is_reported_with_its_position() {
        let ensemble = AssetPathEnsemble::from_rows(
            3,
            2,
            vec![
                1.0, 2.0, //
                3.0, f64::NAN, //
                5.0, 6.0,
            ],
        )
        .unwrap();
        match aggregate(&ensemble, &flat_schedule(2, 1.0)) {
            Err(SimulationError::NumericAnomaly {
                simulation,
                month,
                value,
            }) => {
                assert_eq!((simulation, month), (1, 1));
                assert!(value.is_nan());
            }
            other => panic!("expected numeric anomaly, got {other:?}"),
        }

        let overflowed =
            AssetPathEnsemble::from_rows(2, 1, vec![f64::INFINITY, 4.0]).unwrap();
        assert_eq!(
            aggregate(&overflowed, &flat_schedule(1, 1.0)),
            Err(SimulationError::NumericAnomaly {
                simulation: 0,
                month: 0,
                value: f64::INFINITY,
            })
        );
    }

    #[test]
    fn schedule_must_cover_the_ensemble_horizon() {
        let ensemble = AssetPathEnsemble::from_rows(2, 1, vec![5.0, 6.0]).unwrap();
        let err = aggregate(&ensemble, &flat_schedule(10, 5.5)).unwrap_err();
        assert_eq!(err.field(), Some("schedule"));

        let err = aggregate(&ensemble, &flat_schedule(0, 5.5)).unwrap_err();
        assert_eq!(err.field(), Some("schedule"));
    }

    #[test]
    fn aggregation_is_idempotent_and_leaves_ensemble_untouched() {
        let schedule = ContributionSchedule::new(36, 50.0, 10.0, 300.0);
        let ensemble = PortfolioPathSimulator::new(12).simulate(&schedule, 101).unwrap();
        let before = ensemble.clone();

        let first = aggregate(&ensemble, &schedule).unwrap();
        let second = aggregate(&ensemble, &schedule).unwrap();
        assert_eq!(first, second);
        assert_eq!(ensemble, before);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_quartiles_are_ordered_and_shortfall_is_a_probability(
            values in vec(-1_000.0f64..1_000.0, 1..200),
            invested in 0.0f64..500.0
        ) {
            let n = values.len();
            let ensemble = AssetPathEnsemble::from_rows(n, 1, values.clone()).unwrap();
            let summary = aggregate(&ensemble, &flat_schedule(1, invested)).unwrap();
            let terminal = summary.terminal;

            prop_assert!(terminal.q1 <= terminal.median);
            prop_assert!(terminal.median <= terminal.q3);
            prop_assert!((0.0..=1.0).contains(&terminal.shortfall_probability));

            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            prop_assert_eq!(terminal.minimum, min);
            prop_assert_eq!(summary.period.median[0], terminal.median);
        }
    }
}
