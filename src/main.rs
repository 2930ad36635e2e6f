// src/main.rs
//
// Research-harness CLI for mirpool.
//
// Runs seeded episodes of synthetic demand through the allocation /
// reward engine with a grant-what-is-asked baseline action, printing a
// concise run header and one summary line per episode. Telemetry is
// controlled by the MIRPOOL_TELEMETRY_* environment variables.

use clap::{ArgAction, Parser, ValueEnum};

use mirpool::{Config, SimEnv, TelemetrySink, WorkloadConfig, WorkloadSampler};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum WorkloadArg {
    Steady,
    Bursty,
}

#[derive(Debug, Parser)]
#[command(
    name = "mirpool",
    about = "Shared-link bandwidth admission simulator (MIR policy research harness)",
    version
)]
struct Args {
    /// Number of user slots.
    #[arg(long, default_value_t = 10)]
    users: usize,

    /// Episode length in intervals.
    #[arg(long, default_value_t = 288)]
    intervals: u64,

    /// Number of episodes to run.
    #[arg(long, default_value_t = 1)]
    episodes: u64,

    /// Deterministic seed; episode e uses seed + e.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Synthetic workload profile.
    #[arg(long, value_enum, default_value_t = WorkloadArg::Bursty)]
    workload: WorkloadArg,

    /// Verbosity: -v per-episode detail, -vv per-interval detail.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn fnv1a64(s: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut h = FNV_OFFSET;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

fn main() {
    let args = Args::parse();

    let cfg = Config::default()
        .with_users(args.users)
        .with_intervals(args.intervals);
    let cfg_hash = fnv1a64(&format!("{cfg:?}"));

    let mut env = match SimEnv::new(cfg.clone()) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("mirpool: invalid configuration: {e:?}");
            std::process::exit(2);
        }
    };

    println!(
        "mirpool | cfg={} | cfg_hash=0x{:016x} | users={} | intervals={} | episodes={} | seed={} | workload={:?}",
        cfg.version, cfg_hash, cfg.num_users, cfg.num_intervals, args.episodes, args.seed, args.workload
    );

    let workload = match args.workload {
        WorkloadArg::Steady => WorkloadConfig::steady(),
        WorkloadArg::Bursty => WorkloadConfig::bursty(),
    };

    let mut telemetry = TelemetrySink::from_env();

    for episode in 0..args.episodes {
        let seed = args.seed.wrapping_add(episode);
        let mut sampler = WorkloadSampler::new(workload.clone(), cfg.num_users, seed);

        env.reset();
        telemetry.reset_episode(episode);
        telemetry.log_episode_start(seed);

        while !env.is_done() {
            let requested = sampler.sample_interval();
            // Baseline action: grant what is asked, within target bounds.
            let mir_action: Vec<f64> = requested
                .iter()
                .map(|r| r.clamp(cfg.floor, cfg.pool_capacity))
                .collect();

            match env.step(&requested, &mir_action) {
                Ok(step) => {
                    telemetry.log_step(&step);
                    if args.verbose >= 2 {
                        println!(
                            "  t={} total_allocated={:.1} remaining={:.1} reward={:?}",
                            step.info.interval_index,
                            step.interval.total_allocated,
                            step.interval.remaining_capacity,
                            step.reward.total_reward()
                        );
                    }
                }
                Err(e) => {
                    eprintln!("mirpool: step failed: {e:?}");
                    std::process::exit(1);
                }
            }
        }

        let summary = env.summary();
        telemetry.log_episode_end(seed, &summary);

        println!(
            "episode={} seed={} intervals={} total_reward={:.4} mean_eff={} alloc_ratio={} abuse={:.1} over_cap={} idle={}",
            episode,
            seed,
            summary.intervals_run,
            summary.total_reward,
            summary
                .mean_efficiency
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "n/a".to_string()),
            summary
                .mean_allocation_ratio
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "n/a".to_string()),
            summary.total_abuse_score,
            summary.over_capacity_intervals,
            summary.no_traffic_intervals
        );

        if args.verbose >= 1 {
            println!("  per_user_abuse={:?}", summary.per_user_abuse_score);
        }
    }

    telemetry.flush();
}
