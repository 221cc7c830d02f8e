// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::config::{
    load_and_validate_config, load_rows, ArtifactShape, Strategy, TaskKind,
};
use crate::engine::JobPlan;

#[test]
fn test_queue_fanout_yaml_loading() {
    let config = load_and_validate_config("configs/queue-fanout.yaml").unwrap();

    assert_eq!(config.dispatch.strategy, Strategy::Queue);
    assert_eq!(config.dispatch.queues, vec!["robots-work-a", "robots-work-b"]);
    assert_eq!(
        config.dispatch.dead_letter_queue.as_deref(),
        Some("robots-dead-letter")
    );
    assert_eq!(config.tracker.poll_interval(), Duration::from_millis(200));
    assert_eq!(config.tracker.timeout(), Some(Duration::from_secs(60)));
    assert_eq!(config.consolidator.prefix, "artifacts/");

    let plan = JobPlan::from_config(&config.job).unwrap();
    assert_eq!(plan.split().unwrap().len(), 10);
}

#[test]
fn test_direct_invoke_yaml_loading() {
    let config = load_and_validate_config("configs/direct-invoke.yaml").unwrap();

    assert_eq!(config.dispatch.strategy, Strategy::Direct);
    assert_eq!(config.dispatch.invocation_group_size, 4);
    assert_eq!(config.dispatch.dead_letter_queue, None);
    assert_eq!(config.consolidator.shape, ArtifactShape::JsonLines);
    assert!(!config.consolidator.compress);

    let units = JobPlan::from_config(&config.job).unwrap().split().unwrap();
    assert_eq!(units.len(), 7);
    assert_eq!(units[6].range().end_pos, 20);
}

#[test]
fn test_sync_invoke_toml_loading() {
    let config = load_and_validate_config("configs/sync-invoke.toml").unwrap();

    assert_eq!(config.dispatch.strategy, Strategy::Sync);
    assert_eq!(config.dispatch.max_workers, 2);
    assert!(config.dispatch.log_tail);
    assert_eq!(config.worker.task, TaskKind::Echo);

    let units = JobPlan::from_config(&config.job).unwrap().split().unwrap();
    assert_eq!(units.len(), 4);
    assert!(units.iter().all(|u| u.proc_count == 3));
}

#[test]
fn test_sample_input_covers_queue_job() {
    let config = load_and_validate_config("configs/queue-fanout.yaml").unwrap();
    let rows = load_rows(&config.worker.input).unwrap();
    let total = JobPlan::from_config(&config.job).unwrap().total_items();

    assert_eq!(rows.len() as u64, total);
    assert!(rows[0].contains("google.com"));
}
