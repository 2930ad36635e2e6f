// src/feed.rs
//
// Seeded synthetic workload generator for the research harness.
//
// Real deployments feed per-user demand from stored records or live
// capture; that path is external. This sampler produces deterministic
// synthetic demand so episodes are reproducible given a seed: per-user
// traits (base rate, abusive habit) are fixed at construction, and each
// `sample_interval` call draws one interval of requested rates.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Workload shape parameters.
///
/// Each `(min, max)` range is sampled uniformly. Collapsed ranges and
/// zero probabilities give constant demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Per-user baseline demand range (Kbps), sampled once per user.
    pub base_rate_range: (f64, f64),
    /// Per-interval multiplicative jitter around the baseline, as a
    /// fraction (0.1 = +/-10%).
    pub jitter_frac: f64,
    /// Probability a user bursts in a given interval.
    pub burst_prob: f64,
    /// Burst multiplier range.
    pub burst_mult_range: (f64, f64),
    /// Probability a user requests nothing in a given interval.
    pub idle_prob: f64,
    /// Fraction of users with a sustained-overshoot habit.
    pub abusive_user_frac: f64,
    /// Demand multiplier range for abusive users, applied every interval.
    pub abusive_mult_range: (f64, f64),
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self::bursty()
    }
}

impl WorkloadConfig {
    /// Constant demand, no bursts, no abusers. Useful as a baseline and
    /// in tests that want fully predictable inputs.
    pub fn steady() -> Self {
        Self {
            base_rate_range: (1_500.0, 1_500.0),
            jitter_frac: 0.0,
            burst_prob: 0.0,
            burst_mult_range: (1.0, 1.0),
            idle_prob: 0.0,
            abusive_user_frac: 0.0,
            abusive_mult_range: (1.0, 1.0),
        }
    }

    /// Mixed demand with occasional bursts, idle intervals, and a
    /// minority of persistently greedy users.
    pub fn bursty() -> Self {
        Self {
            base_rate_range: (500.0, 4_000.0),
            jitter_frac: 0.15,
            burst_prob: 0.05,
            burst_mult_range: (2.0, 5.0),
            idle_prob: 0.02,
            abusive_user_frac: 0.2,
            abusive_mult_range: (1.8, 2.6),
        }
    }
}

/// Deterministic per-episode demand sampler.
pub struct WorkloadSampler {
    cfg: WorkloadConfig,
    rng: ChaCha8Rng,
    base_rates: Vec<f64>,
    abusive: Vec<bool>,
}

impl WorkloadSampler {
    /// Create a sampler for `num_users`, fixing per-user traits from
    /// the seed.
    pub fn new(cfg: WorkloadConfig, num_users: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut base_rates = Vec::with_capacity(num_users);
        let mut abusive = Vec::with_capacity(num_users);
        for _ in 0..num_users {
            base_rates.push(sample_range(&mut rng, cfg.base_rate_range));
            abusive.push(rng.gen::<f64>() < cfg.abusive_user_frac);
        }
        Self {
            cfg,
            rng,
            base_rates,
            abusive,
        }
    }

    pub fn num_users(&self) -> usize {
        self.base_rates.len()
    }

    /// Which users carry the sustained-overshoot habit.
    pub fn abusive_users(&self) -> &[bool] {
        &self.abusive
    }

    /// Draw one interval of per-user requested rates.
    pub fn sample_interval(&mut self) -> Vec<f64> {
        let n = self.base_rates.len();
        let mut requested = Vec::with_capacity(n);
        for i in 0..n {
            if self.rng.gen::<f64>() < self.cfg.idle_prob {
                requested.push(0.0);
                continue;
            }
            let jitter = if self.cfg.jitter_frac > 0.0 {
                1.0 + self.cfg.jitter_frac * self.rng.gen_range(-1.0..=1.0)
            } else {
                1.0
            };
            let mut rate = self.base_rates[i] * jitter;
            if self.rng.gen::<f64>() < self.cfg.burst_prob {
                rate *= sample_range(&mut self.rng, self.cfg.burst_mult_range);
            }
            if self.abusive[i] {
                rate *= sample_range(&mut self.rng, self.cfg.abusive_mult_range);
            }
            requested.push(rate.max(0.0));
        }
        requested
    }
}

fn sample_range(rng: &mut ChaCha8Rng, range: (f64, f64)) -> f64 {
    if range.0 >= range.1 {
        return range.0;
    }
    rng.gen_range(range.0..=range.1)
}
