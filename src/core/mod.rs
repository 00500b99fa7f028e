mod engine;
mod error;
mod returns;
mod schedule;
mod stats;
mod types;

pub use engine::{
    AssetPathEnsemble, PortfolioPathSimulator, accumulate_path, run_projection,
    run_projection_with,
};
pub use error::{DegenerateInput, Result, SimulationError};
pub use returns::ReturnGenerator;
pub use schedule::ContributionSchedule;
pub use stats::{aggregate, percentile_sorted};
pub use types::{
    DistributionSummary, EgarchParameters, MAX_INITIAL_INVESTMENT, MAX_MONTHLY_INVESTMENT,
    MAX_MONTHS, MAX_SIMULATIONS, MAX_TOTAL_INVESTMENT, PeriodStatistics, ProjectionReport,
    SimulationRequest, TerminalStatistics,
};
