// src/types.rs
//
// Common shared types for the mirpool allocation engine.

use serde::{Deserialize, Serialize};

/// Zero-based interval index within an episode.
pub type IntervalIndex = u64;

/// Per-user outcome for one interval.
///
/// One instance per user per interval. `abuse_counter` is the value of
/// the user's hysteresis counter *after* this interval's update, so a
/// longitudinal stream of records carries the counter forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable user slot assigned at config time.
    pub user_id: usize,
    /// Requested bandwidth this interval (Kbps, >= 0).
    pub requested_bw: f64,
    /// MIR target applied this interval (clamped to [floor, pool_capacity]).
    pub mir_target: f64,
    /// Granted bandwidth (0 <= allocated_bw <= requested_bw).
    pub allocated_bw: f64,
    /// Hysteresis counter after this interval.
    pub abuse_counter: u32,
    /// Whether this interval's request exceeded the overshoot threshold.
    pub abuse_flag: bool,
}

/// Result of one simulated interval. Immutable after creation.
///
/// `user_records` is ordered by ascending `user_id`; that ordering is a
/// contract, not an accident of iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalResult {
    pub interval_index: IntervalIndex,
    pub user_records: Vec<UserRecord>,
    /// Sum of granted bandwidth across users.
    pub total_allocated: f64,
    /// `pool_capacity - total_allocated`. May be negative; the pool is
    /// soft-enforced and overage is penalized, never clamped.
    pub remaining_capacity: f64,
}

/// Reward components for one scored interval.
///
/// `efficiency` is in (0, 1]; both penalties are reported as
/// non-negative magnitudes and subtracted, regardless of how any
/// coefficient is signed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub efficiency: f64,
    pub over_penalty: f64,
    pub abuse_penalty: f64,
    pub total_reward: f64,
}

/// Outcome of reward evaluation for one interval.
///
/// An interval in which every user requested zero bandwidth has no
/// defined efficiency term; it is reported as `NoTraffic` so callers
/// can tell it apart from a genuinely low-reward interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RewardOutcome {
    Scored(RewardBreakdown),
    NoTraffic,
}

impl RewardOutcome {
    pub fn breakdown(&self) -> Option<&RewardBreakdown> {
        match self {
            RewardOutcome::Scored(b) => Some(b),
            RewardOutcome::NoTraffic => None,
        }
    }

    pub fn total_reward(&self) -> Option<f64> {
        self.breakdown().map(|b| b.total_reward)
    }

    pub fn is_no_traffic(&self) -> bool {
        matches!(self, RewardOutcome::NoTraffic)
    }
}

/// Coarse error category, for callers that branch on class rather than
/// on the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed per-interval values (negative / non-finite / empty).
    Input,
    /// Wrong number of users in an input vector.
    Shape,
    /// Driver called out of phase.
    Usage,
}

/// Errors raised by the allocation / abuse / reward core and the step
/// driver. All are terminal for the current call and leave episode
/// state unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnvError {
    NegativeRequest { user_id: usize, value: f64 },
    NonFiniteRequest { user_id: usize, value: f64 },
    NegativeMirTarget { user_id: usize, value: f64 },
    NonFiniteMirTarget { user_id: usize, value: f64 },
    EmptyUserSet,
    RequestedLenMismatch { expected: usize, got: usize },
    MirTargetLenMismatch { expected: usize, got: usize },
    /// `step` called before the first `reset`.
    StepBeforeReset,
    /// `step` called after the episode reached its configured length.
    EpisodeDone { num_intervals: u64 },
}

impl EnvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvError::NegativeRequest { .. }
            | EnvError::NonFiniteRequest { .. }
            | EnvError::NegativeMirTarget { .. }
            | EnvError::NonFiniteMirTarget { .. }
            | EnvError::EmptyUserSet => ErrorKind::Input,
            EnvError::RequestedLenMismatch { .. } | EnvError::MirTargetLenMismatch { .. } => {
                ErrorKind::Shape
            }
            EnvError::StepBeforeReset | EnvError::EpisodeDone { .. } => ErrorKind::Usage,
        }
    }
}

pub(crate) fn check_requested(requested: &[f64]) -> Result<(), EnvError> {
    for (user_id, &value) in requested.iter().enumerate() {
        if !value.is_finite() {
            return Err(EnvError::NonFiniteRequest { user_id, value });
        }
        if value < 0.0 {
            return Err(EnvError::NegativeRequest { user_id, value });
        }
    }
    Ok(())
}

pub(crate) fn check_mir_target(mir_target: &[f64]) -> Result<(), EnvError> {
    for (user_id, &value) in mir_target.iter().enumerate() {
        if !value.is_finite() {
            return Err(EnvError::NonFiniteMirTarget { user_id, value });
        }
        if value < 0.0 {
            return Err(EnvError::NegativeMirTarget { user_id, value });
        }
    }
    Ok(())
}
