/// Cumulative capital invested through each month of a contribution plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSchedule {
    cumulative: Vec<f64>,
}

impl ContributionSchedule {
    pub fn new(months: usize, initial_amount: f64, periodic_amount: f64, total_cap: f64) -> Self {
        let mut cumulative = Vec::with_capacity(months);
        let mut invested = 0.0;
        for month in 0..months {
            invested +=
                month_contribution(month, invested, initial_amount, periodic_amount, total_cap);
            cumulative.push(invested);
        }
        Self { cumulative }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Total invested by the final month, or `None` for an empty plan.
    pub fn total_invested(&self) -> Option<f64> {
        self.cumulative.last().copied()
    }

    /// New money added in `month` (zero-indexed).
    pub fn contribution(&self, month: usize) -> f64 {
        match month {
            0 => self.cumulative[0],
            m => self.cumulative[m] - self.cumulative[m - 1],
        }
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.cumulative
    }
}

/// Amount added in `month` given what has been invested before it.
///
/// The first month always invests `initial_amount` in full, even above the
/// cap; later months are throttled so the running total never passes it.
fn month_contribution(
    month: usize,
    invested: f64,
    initial_amount: f64,
    periodic_amount: f64,
    total_cap: f64,
) -> f64 {
    if month == 0 {
        return initial_amount;
    }
    if invested < total_cap {
        periodic_amount.min(total_cap - invested)
    } else {
        0.0
    }
}
