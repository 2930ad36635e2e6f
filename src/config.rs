// src/config.rs
//
// Central configuration for the mirpool simulator.
//
// Every component takes these constants explicitly at construction;
// nothing reads ambient globals. Defaults correspond to the reference
// deployment: a 10 Mbps shared pool, a 1 Mbps per-user floor, and a
// day of five-minute intervals.

use serde::{Deserialize, Serialize};

/// Denominator used when normalizing the per-interval abuse score.
///
/// The accumulated abuse score is divided by `num_users * T` before the
/// penalty coefficient is applied; the two modes differ in what `T` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbuseNormalization {
    /// `T` is the fixed configured episode length.
    EpisodeLength,
    /// `T` is the number of intervals elapsed so far (including the
    /// current one). Early intervals weigh abuse more heavily.
    ElapsedIntervals,
}

/// Immutable simulation constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Human-readable config / release version.
    pub version: &'static str,
    /// Total shared link capacity (Kbps).
    pub pool_capacity: f64,
    /// Guaranteed per-user baseline rate (Kbps). Every user receives up
    /// to this rate before any policy-controlled elasticity applies.
    pub floor: f64,
    /// Overshoot tolerance: a request is abusive when it exceeds
    /// `realized_mir * (1 + theta)`.
    pub theta: f64,
    /// Grace period in intervals before a sustained overshoot streak
    /// starts accruing score.
    pub min_duration: u32,
    /// Over-allocation penalty coefficient.
    pub beta: f64,
    /// Abuse penalty coefficient magnitude. The penalty is always
    /// subtracted as a non-negative quantity.
    pub gamma_magnitude: f64,
    /// Number of user slots.
    pub num_users: usize,
    /// Episode length in intervals.
    pub num_intervals: u64,
    /// Abuse score normalization mode.
    pub abuse_normalization: AbuseNormalization,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "mirpool-0.3",
            pool_capacity: 10_000.0,
            floor: 1_000.0,
            theta: 0.2,
            min_duration: 3,
            beta: 3.0,
            gamma_magnitude: 0.5,
            num_users: 10,
            num_intervals: 288,
            abuse_normalization: AbuseNormalization::EpisodeLength,
        }
    }
}

impl Config {
    pub fn with_pool_capacity(mut self, pool_capacity: f64) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.floor = floor;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_min_duration(mut self, min_duration: u32) -> Self {
        self.min_duration = min_duration;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_gamma_magnitude(mut self, gamma_magnitude: f64) -> Self {
        self.gamma_magnitude = gamma_magnitude;
        self
    }

    pub fn with_users(mut self, num_users: usize) -> Self {
        self.num_users = num_users;
        self
    }

    pub fn with_intervals(mut self, num_intervals: u64) -> Self {
        self.num_intervals = num_intervals;
        self
    }

    pub fn with_abuse_normalization(mut self, mode: AbuseNormalization) -> Self {
        self.abuse_normalization = mode;
        self
    }

    /// Validate the constants. Invalid configuration is rejected here,
    /// at construction time, never per step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pool_capacity.is_finite() || self.pool_capacity <= 0.0 {
            return Err(ConfigError::NonPositivePoolCapacity {
                value: self.pool_capacity,
            });
        }
        if !self.floor.is_finite() || self.floor < 0.0 {
            return Err(ConfigError::NegativeFloor { value: self.floor });
        }
        if self.floor > self.pool_capacity {
            return Err(ConfigError::FloorExceedsPool {
                floor: self.floor,
                pool_capacity: self.pool_capacity,
            });
        }
        if !self.theta.is_finite() || self.theta < 0.0 {
            return Err(ConfigError::NegativeTheta { value: self.theta });
        }
        if self.min_duration == 0 {
            return Err(ConfigError::ZeroMinDuration);
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(ConfigError::NegativeBeta { value: self.beta });
        }
        if !self.gamma_magnitude.is_finite() || self.gamma_magnitude < 0.0 {
            return Err(ConfigError::NegativeGamma {
                value: self.gamma_magnitude,
            });
        }
        if self.num_users == 0 {
            return Err(ConfigError::ZeroUsers);
        }
        if self.num_intervals == 0 {
            return Err(ConfigError::ZeroIntervals);
        }
        Ok(())
    }
}

/// Invalid simulation constants. Raised at construction time only.
///
/// Value-carrying variants report the offending value (which may be
/// non-finite) rather than a sanitized stand-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigError {
    NonPositivePoolCapacity { value: f64 },
    NegativeFloor { value: f64 },
    FloorExceedsPool { floor: f64, pool_capacity: f64 },
    NegativeTheta { value: f64 },
    ZeroMinDuration,
    NegativeBeta { value: f64 },
    NegativeGamma { value: f64 },
    ZeroUsers,
    ZeroIntervals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn builders_apply() {
        let cfg = Config::default()
            .with_users(4)
            .with_intervals(10)
            .with_pool_capacity(2_000.0)
            .with_floor(500.0)
            .with_abuse_normalization(AbuseNormalization::ElapsedIntervals);
        assert_eq!(cfg.num_users, 4);
        assert_eq!(cfg.num_intervals, 10);
        assert_eq!(cfg.pool_capacity, 2_000.0);
        assert_eq!(cfg.floor, 500.0);
        assert_eq!(
            cfg.abuse_normalization,
            AbuseNormalization::ElapsedIntervals
        );
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_constants() {
        assert!(matches!(
            Config::default().with_pool_capacity(0.0).validate(),
            Err(ConfigError::NonPositivePoolCapacity { .. })
        ));
        assert!(matches!(
            Config::default().with_pool_capacity(f64::NAN).validate(),
            Err(ConfigError::NonPositivePoolCapacity { .. })
        ));
        assert!(matches!(
            Config::default().with_floor(-1.0).validate(),
            Err(ConfigError::NegativeFloor { .. })
        ));
        assert!(matches!(
            Config::default()
                .with_pool_capacity(500.0)
                .with_floor(1_000.0)
                .validate(),
            Err(ConfigError::FloorExceedsPool { .. })
        ));
        assert!(matches!(
            Config::default().with_theta(-0.1).validate(),
            Err(ConfigError::NegativeTheta { .. })
        ));
        assert_eq!(
            Config::default().with_min_duration(0).validate(),
            Err(ConfigError::ZeroMinDuration)
        );
        assert!(matches!(
            Config::default().with_beta(-3.0).validate(),
            Err(ConfigError::NegativeBeta { .. })
        ));
        assert!(matches!(
            Config::default().with_gamma_magnitude(-0.5).validate(),
            Err(ConfigError::NegativeGamma { .. })
        ));
        assert_eq!(
            Config::default().with_users(0).validate(),
            Err(ConfigError::ZeroUsers)
        );
        assert_eq!(
            Config::default().with_intervals(0).validate(),
            Err(ConfigError::ZeroIntervals)
        );
    }
}
