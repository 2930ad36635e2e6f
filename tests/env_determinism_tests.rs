// tests/env_determinism_tests.rs
//
// The core is randomness-free: the same input sequence under the same
// config must yield bit-identical results across runs. The workload
// sampler is the only source of randomness and is seed-deterministic.

use mirpool::{Config, SimEnv, VecEnv, WorkloadConfig, WorkloadSampler};

fn small_config() -> Config {
    Config::default().with_users(4).with_intervals(20)
}

fn run_episode(cfg: &Config, seed: u64) -> Vec<String> {
    let mut env = SimEnv::new(cfg.clone()).unwrap();
    let mut sampler = WorkloadSampler::new(WorkloadConfig::bursty(), cfg.num_users, seed);
    env.reset();

    let mut serialized = Vec::new();
    while !env.is_done() {
        let requested = sampler.sample_interval();
        let action: Vec<f64> = requested
            .iter()
            .map(|r| r.clamp(cfg.floor, cfg.pool_capacity))
            .collect();
        let step = env.step(&requested, &action).unwrap();
        serialized.push(serde_json::to_string(&step).unwrap());
    }
    serialized
}

#[test]
fn same_inputs_bit_identical_results() {
    let cfg = small_config();
    let run1 = run_episode(&cfg, 12345);
    let run2 = run_episode(&cfg, 12345);
    assert_eq!(run1.len(), 20);
    for (i, (a, b)) in run1.iter().zip(run2.iter()).enumerate() {
        assert_eq!(a, b, "step {i} must serialize identically");
    }
}

#[test]
fn different_seeds_diverge() {
    let cfg = small_config();
    let run1 = run_episode(&cfg, 12345);
    let run2 = run_episode(&cfg, 54321);
    assert_ne!(run1, run2);
}

#[test]
fn reset_replays_identically() {
    // Re-running the same scripted inputs through one env after reset
    // matches a fresh env exactly.
    let cfg = Config::default().with_users(2).with_intervals(5);
    let script: Vec<(Vec<f64>, Vec<f64>)> = (0..5)
        .map(|t| {
            let requested = vec![1_500.0 + 100.0 * t as f64, 3_000.0];
            let action = vec![1_500.0, 2_000.0];
            (requested, action)
        })
        .collect();

    let mut env = SimEnv::new(cfg.clone()).unwrap();
    env.reset();
    let first: Vec<_> = script
        .iter()
        .map(|(r, a)| env.step(r, a).unwrap())
        .collect();

    env.reset();
    let second: Vec<_> = script
        .iter()
        .map(|(r, a)| env.step(r, a).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(env.summary(), {
        let mut fresh = SimEnv::new(cfg).unwrap();
        fresh.reset();
        for (r, a) in &script {
            fresh.step(r, a).unwrap();
        }
        fresh.summary()
    });
}

#[test]
fn vec_env_matches_individual_envs() {
    let cfg = Config::default().with_users(3).with_intervals(8);
    let mut venv = VecEnv::new(2, cfg.clone()).unwrap();
    venv.reset_all();

    let mut solo = SimEnv::new(cfg.clone()).unwrap();
    solo.reset();

    let mut sampler = WorkloadSampler::new(WorkloadConfig::bursty(), cfg.num_users, 7);
    for _ in 0..8 {
        let requested = sampler.sample_interval();
        let action: Vec<f64> = requested
            .iter()
            .map(|r| r.clamp(cfg.floor, cfg.pool_capacity))
            .collect();

        let batch = venv
            .step(
                &[requested.clone(), requested.clone()],
                &[action.clone(), action.clone()],
            )
            .unwrap();
        let single = solo.step(&requested, &action).unwrap();

        // Same inputs, independent state: all three agree.
        assert_eq!(batch[0], batch[1]);
        assert_eq!(batch[0], single);
    }
    assert_eq!(venv.dones(), vec![true, true]);
    assert_eq!(venv.summaries()[0], solo.summary());
}
