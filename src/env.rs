// src/env.rs
//
// Step driver: orchestrates one interval end-to-end and threads the
// hysteresis counters across intervals.
//
// An episode is strictly sequential (the abuse counters make intervals
// order-dependent); independent episodes share no mutable state and may
// run in parallel, one `SimEnv` each.

use serde::{Deserialize, Serialize};

use crate::abuse::AbuseDetector;
use crate::alloc;
use crate::config::{AbuseNormalization, Config, ConfigError};
use crate::reward;
use crate::types::{EnvError, IntervalResult, RewardOutcome, UserRecord};

/// Episode lifecycle phase.
///
/// `Idle → Running` on `reset`; `Running → Done` when the interval
/// index reaches the configured episode length. `step` is accepted only
/// while `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodePhase {
    Idle,
    Running,
    Done,
}

/// Extra per-step information alongside the interval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub interval_index: u64,
    /// Total abuse score emitted this interval across users (streak
    /// breaks, plus the episode-end flush on the final interval).
    pub abuse_score_emitted: f64,
    /// The emitted score after normalization, as fed to the reward.
    pub abuse_total_normalized: f64,
    /// Sum of per-user scores accumulated so far this episode.
    pub cumulative_abuse_score: f64,
    /// Whether the episode-end flush ran (final interval only).
    pub flushed: bool,
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub interval: IntervalResult,
    pub reward: RewardOutcome,
    /// True when this step completed the episode.
    pub done: bool,
    pub info: StepInfo,
}

/// Per-interval simulation environment.
///
/// One call to `step` runs allocation, the abuse update (with the
/// realized allocation as each user's effective rate), and the reward,
/// in that order. All inputs are validated before any state mutation:
/// a rejected step leaves counters and history untouched.
pub struct SimEnv {
    cfg: Config,
    detector: AbuseDetector,
    phase: EpisodePhase,
    interval_index: u64,
    history: Vec<IntervalResult>,
    rewards: Vec<RewardOutcome>,
}

impl SimEnv {
    /// Create an idle environment. The configuration is validated here;
    /// a constructed `SimEnv` can never fail on constants later.
    pub fn new(cfg: Config) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let detector = AbuseDetector::new(cfg.num_users, cfg.theta, cfg.min_duration);
        Ok(Self {
            cfg,
            detector,
            phase: EpisodePhase::Idle,
            interval_index: 0,
            history: Vec::new(),
            rewards: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == EpisodePhase::Done
    }

    /// Intervals completed so far this episode.
    pub fn interval_index(&self) -> u64 {
        self.interval_index
    }

    /// All interval results of the current episode, in index order.
    pub fn history(&self) -> &[IntervalResult] {
        &self.history
    }

    /// Reward outcomes parallel to `history`.
    pub fn rewards(&self) -> &[RewardOutcome] {
        &self.rewards
    }

    /// Current hysteresis counters, indexed by user slot.
    pub fn abuse_counters(&self) -> &[u32] {
        self.detector.counters()
    }

    /// Start a fresh episode: zero all counters, drop history.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.phase = EpisodePhase::Running;
        self.interval_index = 0;
        self.history.clear();
        self.rewards.clear();
    }

    /// Run one interval.
    ///
    /// `mir_action` is the raw per-user target from the policy under
    /// evaluation; it is validated, then clamped to
    /// `[floor, pool_capacity]` before the allocator sees it. On the
    /// final interval the detector is flushed so a trailing abusive
    /// streak still lands in this interval's score.
    pub fn step(&mut self, requested: &[f64], mir_action: &[f64]) -> Result<StepResult, EnvError> {
        match self.phase {
            EpisodePhase::Idle => return Err(EnvError::StepBeforeReset),
            EpisodePhase::Done => {
                return Err(EnvError::EpisodeDone {
                    num_intervals: self.cfg.num_intervals,
                })
            }
            EpisodePhase::Running => {}
        }

        let n = self.cfg.num_users;
        if requested.len() != n {
            return Err(EnvError::RequestedLenMismatch {
                expected: n,
                got: requested.len(),
            });
        }
        if mir_action.len() != n {
            return Err(EnvError::MirTargetLenMismatch {
                expected: n,
                got: mir_action.len(),
            });
        }
        crate::types::check_requested(requested)?;
        crate::types::check_mir_target(mir_action)?;

        // Actions are proposals; the driver enforces the target bounds.
        let mir_target: Vec<f64> = mir_action
            .iter()
            .map(|m| m.clamp(self.cfg.floor, self.cfg.pool_capacity))
            .collect();

        let allocation = alloc::allocate(
            requested,
            &mir_target,
            self.cfg.floor,
            self.cfg.pool_capacity,
        )?;

        // Inputs are valid from here on: state mutation may begin.
        let update = self.detector.update(requested, &allocation.allocated)?;

        let idx = self.interval_index;
        let last = idx + 1 == self.cfg.num_intervals;

        // Records carry the post-update counters; the episode-end flush
        // below zeroes the detector but not this interval's snapshot.
        let counters: Vec<u32> = self.detector.counters().to_vec();

        let mut per_user_score = update.per_user_score;
        if last {
            for (score, flushed) in per_user_score.iter_mut().zip(self.detector.flush()) {
                *score += flushed;
            }
        }

        let abuse_score_emitted: f64 = per_user_score.iter().sum();
        let intervals_in_scope = match self.cfg.abuse_normalization {
            AbuseNormalization::EpisodeLength => self.cfg.num_intervals,
            AbuseNormalization::ElapsedIntervals => idx + 1,
        };
        let abuse_total_normalized =
            abuse_score_emitted / (n as f64 * intervals_in_scope as f64);

        let user_records: Vec<UserRecord> = (0..n)
            .map(|i| UserRecord {
                user_id: i,
                requested_bw: requested[i],
                mir_target: mir_target[i],
                allocated_bw: allocation.allocated[i],
                abuse_counter: counters[i],
                abuse_flag: update.flags[i],
            })
            .collect();

        let interval = IntervalResult {
            interval_index: idx,
            user_records,
            total_allocated: allocation.total_allocated,
            remaining_capacity: allocation.remaining_capacity,
        };

        let reward = reward::evaluate_interval(
            &interval,
            abuse_total_normalized,
            self.cfg.beta,
            self.cfg.gamma_magnitude,
            self.cfg.pool_capacity,
        )?;

        self.history.push(interval.clone());
        self.rewards.push(reward);
        self.interval_index += 1;
        if last {
            self.phase = EpisodePhase::Done;
        }

        Ok(StepResult {
            interval,
            reward,
            done: last,
            info: StepInfo {
                interval_index: idx,
                abuse_score_emitted,
                abuse_total_normalized,
                cumulative_abuse_score: self.detector.cumulative_scores().iter().sum(),
                flushed: last,
            },
        })
    }

    /// Aggregate view of the episode so far.
    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary::compute(
            &self.history,
            &self.rewards,
            self.detector.cumulative_scores(),
        )
    }
}

/// Aggregates over a completed (or in-flight) episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub intervals_run: u64,
    /// Sum of total rewards over scored intervals.
    pub total_reward: f64,
    /// Mean efficiency over scored intervals; `None` if none scored.
    pub mean_efficiency: Option<f64>,
    /// Mean of `allocated / requested` over every user-interval with a
    /// nonzero request; `None` if demand was zero throughout.
    pub mean_allocation_ratio: Option<f64>,
    pub no_traffic_intervals: u64,
    /// Intervals whose cross-user total exceeded the pool.
    pub over_capacity_intervals: u64,
    /// Sum of abuse scores emitted this episode.
    pub total_abuse_score: f64,
    /// Per-user accumulated abuse scores, indexed by user slot.
    pub per_user_abuse_score: Vec<f64>,
}

impl EpisodeSummary {
    pub fn compute(
        history: &[IntervalResult],
        rewards: &[RewardOutcome],
        per_user_abuse: &[f64],
    ) -> Self {
        let mut total_reward = 0.0;
        let mut efficiency_sum = 0.0;
        let mut scored = 0u64;
        let mut no_traffic = 0u64;
        for outcome in rewards {
            match outcome {
                RewardOutcome::Scored(b) => {
                    total_reward += b.total_reward;
                    efficiency_sum += b.efficiency;
                    scored += 1;
                }
                RewardOutcome::NoTraffic => no_traffic += 1,
            }
        }

        let mut ratio_sum = 0.0;
        let mut ratio_count = 0u64;
        let mut over_capacity = 0u64;
        for interval in history {
            if interval.remaining_capacity < 0.0 {
                over_capacity += 1;
            }
            for rec in &interval.user_records {
                if rec.requested_bw > 0.0 {
                    ratio_sum += rec.allocated_bw / rec.requested_bw;
                    ratio_count += 1;
                }
            }
        }

        Self {
            intervals_run: history.len() as u64,
            total_reward,
            mean_efficiency: (scored > 0).then(|| efficiency_sum / scored as f64),
            mean_allocation_ratio: (ratio_count > 0).then(|| ratio_sum / ratio_count as f64),
            no_traffic_intervals: no_traffic,
            over_capacity_intervals: over_capacity,
            total_abuse_score: per_user_abuse.iter().sum(),
            per_user_abuse_score: per_user_abuse.to_vec(),
        }
    }
}

/// N independent environments stepped as a batch.
///
/// Member environments share no mutable state; each is an isolated
/// episode with its own counters and history.
pub struct VecEnv {
    envs: Vec<SimEnv>,
}

impl VecEnv {
    pub fn new(n: usize, cfg: Config) -> Result<Self, ConfigError> {
        let mut envs = Vec::with_capacity(n);
        for _ in 0..n {
            envs.push(SimEnv::new(cfg.clone())?);
        }
        Ok(Self { envs })
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    pub fn reset_all(&mut self) {
        for env in &mut self.envs {
            env.reset();
        }
    }

    /// Step every environment with its own inputs.
    ///
    /// Batch lengths must match the environment count. On a per-env
    /// input error the batch stops at that environment; environments
    /// earlier in the batch have already stepped (each env is itself
    /// atomic on rejection).
    pub fn step(
        &mut self,
        requested: &[Vec<f64>],
        mir_action: &[Vec<f64>],
    ) -> Result<Vec<StepResult>, EnvError> {
        assert_eq!(
            requested.len(),
            self.envs.len(),
            "requested batch length must match number of environments"
        );
        assert_eq!(
            mir_action.len(),
            self.envs.len(),
            "action batch length must match number of environments"
        );

        let mut results = Vec::with_capacity(self.envs.len());
        for (i, env) in self.envs.iter_mut().enumerate() {
            results.push(env.step(&requested[i], &mir_action[i])?);
        }
        Ok(results)
    }

    pub fn dones(&self) -> Vec<bool> {
        self.envs.iter().map(|e| e.is_done()).collect()
    }

    pub fn summaries(&self) -> Vec<EpisodeSummary> {
        self.envs.iter().map(|e| e.summary()).collect()
    }

    pub fn envs(&self) -> &[SimEnv] {
        &self.envs
    }
}
