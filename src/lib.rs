//! Mirpool core library.
//!
//! Simulates bandwidth admission control for a fixed-capacity shared
//! link serving multiple users over discrete intervals. Each interval,
//! every user declares a requested rate; the engine grants an
//! allocation bounded by a per-user MIR target and scores the outcome
//! with a composite reward (allocation efficiency minus over-allocation
//! and sustained-abuse penalties). The scalar reward is consumed by an
//! external policy-optimization loop searching for MIR-setting
//! policies; the binary (`src/main.rs`) is a thin research harness
//! around these components.
//!
//! # Architecture
//!
//! - **Allocator** (`alloc`): pure two-phase allocation, guaranteed
//!   floor first, policy-controlled increment second. No hidden state.
//! - **Abuse detector** (`abuse`): per-user hysteresis counters that
//!   convert sustained overshoot into a score, emitted only when a
//!   streak breaks (or at episode-end flush).
//! - **Reward** (`reward`): pure reward composition with a
//!   distinguished no-traffic outcome.
//! - **Environment** (`env`): the step driver threading counters and
//!   history across intervals, plus `VecEnv` for independent parallel
//!   episodes.
//! - **Workload** (`feed`): seeded synthetic demand for reproducible
//!   experiments.
//! - **Telemetry** (`telemetry`): env-var controlled JSONL sink.
//!
//! Determinism: the core is randomness-free; the same input sequence
//! under the same config yields bit-identical reward sequences. The
//! only randomness lives in the workload sampler, which is ChaCha8
//! seeded.

pub mod abuse;
pub mod alloc;
pub mod config;
pub mod env;
pub mod feed;
pub mod reward;
pub mod telemetry;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{AbuseNormalization, Config, ConfigError};

pub use types::{
    EnvError, ErrorKind, IntervalIndex, IntervalResult, RewardBreakdown, RewardOutcome, UserRecord,
};

pub use alloc::{allocate, AllocationOutcome};

pub use abuse::{AbuseDetector, AbuseUpdate};

pub use env::{EpisodePhase, EpisodeSummary, SimEnv, StepInfo, StepResult, VecEnv};

pub use feed::{WorkloadConfig, WorkloadSampler};

pub use telemetry::{TelemetrySink, SCHEMA_VERSION};

// --- End-to-end unit tests --------------------------------------------------
