// ln σ²_t = ω + β·ln σ²_{t-1} + γ·z_{t-1} + α·(|z_{t-1}| − √(2/π)),  ln σ²_1 = ω
// r_t     = μ + σ_t·z_t

use std::f64::consts::FRAC_2_PI;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::types::EgarchParameters;

#[derive(Copy, Clone, Debug)]
pub struct ReturnGenerator {
    params: EgarchParameters,
}

impl ReturnGenerator {
    pub fn new(params: EgarchParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EgarchParameters {
        &self.params
    }

    /// The first `warmup_length` steps are simulated and dropped.
    pub fn generate<R: Rng + ?Sized>(&self, months: usize, rng: &mut R) -> Vec<f64> {
        let mut out = Vec::with_capacity(months);
        self.generate_into(months, rng, &mut out);
        out
    }

    pub fn generate_into<R: Rng + ?Sized>(&self, months: usize, rng: &mut R, out: &mut Vec<f64>) {
        out.clear();
        if months == 0 {
            return;
        }

        let EgarchParameters {
            omega,
            alpha,
            beta,
            gamma,
            mu,
            warmup_length,
        } = self.params;
        let expected_abs_z = FRAC_2_PI.sqrt();

        let mut log_var = omega;
        for step in 0..months + warmup_length {
            let z: f64 = StandardNormal.sample(rng);
            let sigma = log_var.exp().sqrt();
            if step >= warmup_length {
                out.push(mu + sigma * z);
            }
            log_var = omega + beta * log_var + gamma * z + alpha * (z.abs() - expected_abs_z);
        }
    }
}

impl Default for ReturnGenerator {
    fn default() -> Self {
        Self::new(EgarchParameters::default())
    }
}
