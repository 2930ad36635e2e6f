// tests/telemetry_tests.rs
//
// JSONL contract of the telemetry sink: one interval row plus one row
// per user per step, episode markers at the boundaries, schema_version
// on every record.

use std::fs;

use serde_json::Value;

use mirpool::{Config, SimEnv, TelemetrySink, SCHEMA_VERSION};

fn run_logged_episode(path: std::path::PathBuf) -> (usize, u64) {
    let cfg = Config::default().with_users(3).with_intervals(4);
    let mut env = SimEnv::new(cfg.clone()).unwrap();
    let mut sink = TelemetrySink::enable(path);
    assert!(sink.is_enabled());

    env.reset();
    sink.reset_episode(0);
    sink.log_episode_start(42);
    while !env.is_done() {
        let step = env
            .step(&[1_500.0, 2_500.0, 800.0], &[1_500.0, 2_000.0, 1_000.0])
            .unwrap();
        sink.log_step(&step);
    }
    sink.log_episode_end(42, &env.summary());
    sink.flush();
    (cfg.num_users, cfg.num_intervals)
}

#[test]
fn jsonl_rows_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry.jsonl");
    let (num_users, num_intervals) = run_logged_episode(path.clone());

    let contents = fs::read_to_string(&path).unwrap();
    let records: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // start marker + per interval (1 + users) rows + end marker.
    let expected = 2 + num_intervals as usize * (1 + num_users);
    assert_eq!(records.len(), expected);

    for record in &records {
        assert_eq!(record["schema_version"], SCHEMA_VERSION);
        assert_eq!(record["episode_id"], 0);
    }

    assert_eq!(records[0]["marker_type"], "Start");
    assert_eq!(records[0]["seed"], 42);

    let last = records.last().unwrap();
    assert_eq!(last["marker_type"], "End");
    let summary = &last["summary"];
    assert_eq!(summary["intervals_run"], num_intervals);

    // First step: interval row then user rows in user-id order.
    let interval_row = &records[1];
    assert_eq!(interval_row["interval_index"], 0);
    assert!(interval_row["total_reward"].is_f64());
    assert_eq!(interval_row["no_traffic"], false);
    for user_id in 0..num_users {
        let row = &records[2 + user_id];
        assert_eq!(row["user_id"], user_id as u64);
        assert_eq!(row["interval_index"], 0);
        assert!(row["allocated_bw"].is_f64());
    }
}

#[test]
fn no_traffic_interval_omits_reward_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idle.jsonl");

    let cfg = Config::default().with_users(2).with_intervals(1);
    let mut env = SimEnv::new(cfg).unwrap();
    let mut sink = TelemetrySink::enable(path.clone());
    env.reset();
    let step = env.step(&[0.0, 0.0], &[1_000.0, 1_000.0]).unwrap();
    sink.log_step(&step);
    sink.flush();

    let contents = fs::read_to_string(&path).unwrap();
    let interval_row: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(interval_row["no_traffic"], true);
    assert!(interval_row["efficiency"].is_null());
    assert!(interval_row["total_reward"].is_null());
}

#[test]
fn disabled_sink_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.jsonl");

    let cfg = Config::default().with_users(1).with_intervals(1);
    let mut env = SimEnv::new(cfg).unwrap();
    let mut sink = TelemetrySink::new();
    env.reset();
    let step = env.step(&[1_000.0], &[1_000.0]).unwrap();
    sink.log_step(&step);
    sink.flush();

    assert!(!path.exists());
}
