// src/alloc.rs
//
// Two-phase bandwidth allocator.
//
// Pure function of the current interval's inputs: no hidden state, so
// per-user work is trivially parallelizable and the result depends only
// on (requested, mir_target, floor, pool_capacity).

use serde::{Deserialize, Serialize};

use crate::types::{check_mir_target, check_requested, EnvError};

/// Per-interval allocation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Granted bandwidth per user, same order as the inputs.
    pub allocated: Vec<f64>,
    pub total_allocated: f64,
    /// `pool_capacity - total_allocated`; negative when the pool is
    /// oversubscribed. A signal for the reward layer, not a clamp.
    pub remaining_capacity: f64,
}

/// Allocate one interval.
///
/// Phase 1 grants every user up to `floor` regardless of the action;
/// phase 2 grants the policy-controlled increment up to `mir_target`.
/// Neither phase has any cross-user dependency, and the cross-user
/// total is never capped against the pool.
///
/// Callers must clamp `mir_target` to `[floor, pool_capacity]` before
/// calling; raw negative targets are rejected here.
pub fn allocate(
    requested: &[f64],
    mir_target: &[f64],
    floor: f64,
    pool_capacity: f64,
) -> Result<AllocationOutcome, EnvError> {
    if requested.is_empty() {
        return Err(EnvError::EmptyUserSet);
    }
    if mir_target.len() != requested.len() {
        return Err(EnvError::MirTargetLenMismatch {
            expected: requested.len(),
            got: mir_target.len(),
        });
    }
    check_requested(requested)?;
    check_mir_target(mir_target)?;

    let mut allocated = Vec::with_capacity(requested.len());
    for (&req, &mir) in requested.iter().zip(mir_target.iter()) {
        let base = req.min(floor);
        let extra = (req - base).min(mir - base).max(0.0);
        // Rounding in base + extra must never push the grant above the request.
        allocated.push((base + extra).min(req));
    }

    let total_allocated: f64 = allocated.iter().sum();
    Ok(AllocationOutcome {
        allocated,
        total_allocated,
        remaining_capacity: pool_capacity - total_allocated,
    })
}
