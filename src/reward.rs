// src/reward.rs
//
// Composite reward for one interval: allocation efficiency minus the
// over-allocation and sustained-abuse penalties.
//
// All functions here are pure; the step driver supplies the interval
// result and the normalized abuse total.

use crate::types::{EnvError, IntervalResult, RewardBreakdown, RewardOutcome, UserRecord};

/// Mean per-user allocation efficiency.
///
/// Per user, `min(allocated / requested, 1)`: the fraction of the
/// deserved rate actually granted, full credit when the request sits
/// below the realized target. Users with a zero request carry no
/// efficiency term and are excluded from the mean; returns `None` when
/// every user requested zero.
pub fn efficiency(records: &[UserRecord]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for rec in records {
        if rec.requested_bw > 0.0 {
            sum += (rec.allocated_bw / rec.requested_bw).min(1.0);
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / f64::from(count))
    }
}

/// Penalty for oversubscribing the shared pool.
///
/// Zero within capacity, then linear in the relative overage.
pub fn over_allocation_penalty(total_allocated: f64, pool_capacity: f64, beta: f64) -> f64 {
    beta * ((total_allocated - pool_capacity) / pool_capacity).max(0.0)
}

/// Penalty for normalized sustained-overshoot score.
///
/// Reported as a non-negative magnitude whatever the sign convention of
/// the stored coefficient.
pub fn abuse_penalty(abuse_total_normalized: f64, gamma_magnitude: f64) -> f64 {
    gamma_magnitude.abs() * abuse_total_normalized
}

/// Score one interval.
///
/// Returns `NoTraffic` when no user requested bandwidth (undefined
/// efficiency), a full breakdown otherwise.
pub fn evaluate_interval(
    interval: &IntervalResult,
    abuse_total_normalized: f64,
    beta: f64,
    gamma_magnitude: f64,
    pool_capacity: f64,
) -> Result<RewardOutcome, EnvError> {
    if interval.user_records.is_empty() {
        return Err(EnvError::EmptyUserSet);
    }

    let Some(efficiency) = efficiency(&interval.user_records) else {
        return Ok(RewardOutcome::NoTraffic);
    };

    let over_penalty = over_allocation_penalty(interval.total_allocated, pool_capacity, beta);
    let abuse_penalty = abuse_penalty(abuse_total_normalized, gamma_magnitude);

    Ok(RewardOutcome::Scored(RewardBreakdown {
        efficiency,
        over_penalty,
        abuse_penalty,
        total_reward: efficiency - over_penalty - abuse_penalty,
    }))
}
