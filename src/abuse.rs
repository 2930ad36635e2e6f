// src/abuse.rs
//
// Hysteresis-based sustained-overshoot detector.
//
// Each user carries one streak counter across intervals. Overshoot past
// `realized_mir * (1 + theta)` increments it; the first compliant
// interval scores `counter - min_duration` (when the streak outlived
// the grace period) and resets the counter. Scores are therefore
// emitted one interval after the abuse stops, never while the streak is
// still running; `flush` closes out streaks still open at episode end.

use serde::{Deserialize, Serialize};

use crate::types::EnvError;

/// Per-interval detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbuseUpdate {
    /// Score emitted for each user this interval (0 for most users on
    /// most intervals; nonzero only when a streak just broke).
    pub per_user_score: Vec<f64>,
    /// Whether each user overshot the threshold this interval.
    pub flags: Vec<bool>,
}

/// Streak state for every user in an episode.
///
/// Counters persist across intervals and are zeroed only by `reset`
/// (episode start) or by a compliant interval for that user.
#[derive(Debug, Clone)]
pub struct AbuseDetector {
    theta: f64,
    min_duration: u32,
    counters: Vec<u32>,
    cumulative: Vec<f64>,
}

impl AbuseDetector {
    pub fn new(num_users: usize, theta: f64, min_duration: u32) -> Self {
        Self {
            theta,
            min_duration,
            counters: vec![0; num_users],
            cumulative: vec![0.0; num_users],
        }
    }

    /// Zero all counters and accumulated scores (episode start).
    pub fn reset(&mut self) {
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.cumulative.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Current streak counters, indexed by user slot.
    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    /// Scores accumulated per user since the last `reset`.
    pub fn cumulative_scores(&self) -> &[f64] {
        &self.cumulative
    }

    /// Advance every user's streak by one interval.
    ///
    /// `realized_mir` is the per-user rate actually granted this
    /// interval. Value validation is the caller's concern; shapes are
    /// checked here against the configured user count.
    pub fn update(
        &mut self,
        requested: &[f64],
        realized_mir: &[f64],
    ) -> Result<AbuseUpdate, EnvError> {
        let n = self.counters.len();
        if requested.len() != n {
            return Err(EnvError::RequestedLenMismatch {
                expected: n,
                got: requested.len(),
            });
        }
        if realized_mir.len() != n {
            return Err(EnvError::MirTargetLenMismatch {
                expected: n,
                got: realized_mir.len(),
            });
        }

        let mut per_user_score = vec![0.0; n];
        let mut flags = vec![false; n];
        for i in 0..n {
            if requested[i] > realized_mir[i] * (1.0 + self.theta) {
                self.counters[i] += 1;
                flags[i] = true;
            } else {
                if self.counters[i] >= self.min_duration {
                    let score = f64::from(self.counters[i] - self.min_duration);
                    per_user_score[i] = score;
                    self.cumulative[i] += score;
                }
                self.counters[i] = 0;
            }
        }

        Ok(AbuseUpdate {
            per_user_score,
            flags,
        })
    }

    /// Close out streaks still open at episode end.
    ///
    /// Any counter at or past the grace period emits its overflow score
    /// exactly as a streak break would; a trailing streak is never
    /// silently dropped. All counters are zeroed.
    pub fn flush(&mut self) -> Vec<f64> {
        let mut per_user_score = vec![0.0; self.counters.len()];
        for i in 0..self.counters.len() {
            if self.counters[i] >= self.min_duration {
                let score = f64::from(self.counters[i] - self.min_duration);
                per_user_score[i] = score;
                self.cumulative[i] += score;
            }
            self.counters[i] = 0;
        }
        per_user_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_streak(det: &mut AbuseDetector, abusive_intervals: u32) -> Vec<f64> {
        // One user: overshoot for N intervals, then one compliant interval.
        for _ in 0..abusive_intervals {
            let up = det.update(&[2_000.0], &[1_000.0]).unwrap();
            assert_eq!(up.per_user_score, vec![0.0], "no score mid-streak");
        }
        det.update(&[1_000.0], &[1_000.0]).unwrap().per_user_score
    }

    #[test]
    fn streak_at_grace_period_scores_zero() {
        let mut det = AbuseDetector::new(1, 0.2, 3);
        assert_eq!(run_streak(&mut det, 3), vec![0.0]);
        assert_eq!(det.counters(), &[0]);
    }

    #[test]
    fn streak_past_grace_period_scores_overflow_at_break() {
        let mut det = AbuseDetector::new(1, 0.2, 3);
        assert_eq!(run_streak(&mut det, 5), vec![2.0]);
        assert_eq!(det.cumulative_scores(), &[2.0]);
    }

    #[test]
    fn short_streak_resets_without_score() {
        let mut det = AbuseDetector::new(1, 0.2, 3);
        assert_eq!(run_streak(&mut det, 2), vec![0.0]);
        assert_eq!(det.cumulative_scores(), &[0.0]);
    }

    #[test]
    fn threshold_is_strict_overshoot() {
        let mut det = AbuseDetector::new(1, 0.2, 3);
        // Exactly at (1 + theta) * mir is compliant.
        let up = det.update(&[1_200.0], &[1_000.0]).unwrap();
        assert_eq!(up.flags, vec![false]);
        assert_eq!(det.counters(), &[0]);
        let up = det.update(&[1_200.1], &[1_000.0]).unwrap();
        assert_eq!(up.flags, vec![true]);
        assert_eq!(det.counters(), &[1]);
    }

    #[test]
    fn flush_emits_trailing_streak() {
        let mut det = AbuseDetector::new(2, 0.2, 3);
        for _ in 0..5 {
            det.update(&[2_000.0, 1_000.0], &[1_000.0, 1_000.0]).unwrap();
        }
        let flushed = det.flush();
        assert_eq!(flushed, vec![2.0, 0.0]);
        assert_eq!(det.counters(), &[0, 0]);
        // A second flush finds nothing.
        assert_eq!(det.flush(), vec![0.0, 0.0]);
    }

    #[test]
    fn multiple_streaks_accumulate() {
        let mut det = AbuseDetector::new(1, 0.2, 3);
        assert_eq!(run_streak(&mut det, 4), vec![1.0]);
        assert_eq!(run_streak(&mut det, 6), vec![3.0]);
        assert_eq!(det.cumulative_scores(), &[4.0]);
    }

    #[test]
    fn reset_clears_counters_and_scores() {
        let mut det = AbuseDetector::new(1, 0.2, 3);
        run_streak(&mut det, 5);
        det.reset();
        assert_eq!(det.counters(), &[0]);
        assert_eq!(det.cumulative_scores(), &[0.0]);
    }

    #[test]
    fn rejects_shape_mismatch() {
        let mut det = AbuseDetector::new(2, 0.2, 3);
        assert_eq!(
            det.update(&[1.0], &[1.0, 1.0]),
            Err(EnvError::RequestedLenMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            det.update(&[1.0, 1.0], &[1.0]),
            Err(EnvError::MirTargetLenMismatch {
                expected: 2,
                got: 1
            })
        );
    }
}
