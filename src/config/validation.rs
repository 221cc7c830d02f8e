//! Configuration validation.
//!
//! Collects every problem in one pass so a bad file is fixed in one edit
//! instead of one error per run. Checks are grouped per section; the job
//! section is validated by resolving it into a [`JobPlan`], the same way the
//! runner will.

use std::collections::HashSet;

use crate::config::consts::{MAX_INVOCATION_GROUP, MAX_QUEUE_BATCH};
use crate::config::{Config, Strategy};
use crate::engine::splitter::JobPlan;
use crate::errors::ValidationError;

pub fn validate_config(cfg: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(err) = JobPlan::from_config(&cfg.job) {
        errors.push(ValidationError::InvalidJob { reason: err.reason });
    }

    validate_dispatch(cfg, &mut errors);

    if cfg.tracker.poll_interval_ms == 0 {
        errors.push(zero("tracker.poll_interval_ms"));
    }
    if cfg.tracker.timeout_secs == Some(0) {
        errors.push(zero("tracker.timeout_secs"));
    }
    if cfg.governor.threshold == 0 {
        errors.push(zero("governor.threshold"));
    }
    if cfg.consolidator.output_key.is_empty() {
        errors.push(missing("consolidator.output_key", "the consolidator"));
    }
    if cfg.storage.page_size == 0 {
        errors.push(zero("storage.page_size"));
    }
    if cfg.platform.consumer_batch_size == 0 {
        errors.push(zero("platform.consumer_batch_size"));
    }
    if cfg.platform.log_page_size == 0 {
        errors.push(zero("platform.log_page_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_dispatch(cfg: &Config, errors: &mut Vec<ValidationError>) {
    let dispatch = &cfg.dispatch;

    if dispatch.function_name.is_empty() {
        errors.push(missing("dispatch.function_name", "every strategy"));
    }
    check_range(
        "dispatch.queue_batch_size",
        dispatch.queue_batch_size,
        MAX_QUEUE_BATCH,
        errors,
    );
    check_range(
        "dispatch.invocation_group_size",
        dispatch.invocation_group_size,
        MAX_INVOCATION_GROUP,
        errors,
    );
    if cfg.platform.consumer_batch_size > MAX_QUEUE_BATCH {
        errors.push(ValidationError::LimitExceeded {
            field: "platform.consumer_batch_size".into(),
            value: cfg.platform.consumer_batch_size as u64,
            max: MAX_QUEUE_BATCH as u64,
        });
    }
    if dispatch.max_receive_count == 0 {
        errors.push(zero("dispatch.max_receive_count"));
    }

    match dispatch.strategy {
        Strategy::Queue => {
            if dispatch.queues.is_empty() {
                errors.push(missing("dispatch.queues", "the queue strategy"));
            }
            let mut seen = HashSet::new();
            for name in &dispatch.queues {
                if !seen.insert(name.as_str()) {
                    errors.push(ValidationError::DuplicateQueue { name: name.clone() });
                }
            }
            if let Some(dead_letter) = &dispatch.dead_letter_queue {
                if seen.contains(dead_letter.as_str()) {
                    errors.push(ValidationError::DuplicateQueue {
                        name: dead_letter.clone(),
                    });
                }
            }
        }
        Strategy::Direct => {
            if dispatch.relay_function.is_empty() {
                errors.push(missing("dispatch.relay_function", "the direct strategy"));
            }
        }
        Strategy::Sync => {
            if dispatch.max_workers == 0 {
                errors.push(zero("dispatch.max_workers"));
            }
        }
    }
}

fn check_range(field: &str, value: usize, max: usize, errors: &mut Vec<ValidationError>) {
    if value == 0 {
        errors.push(zero(field));
    } else if value > max {
        errors.push(ValidationError::LimitExceeded {
            field: field.to_string(),
            value: value as u64,
            max: max as u64,
        });
    }
}

fn zero(field: &str) -> ValidationError {
    ValidationError::ZeroValue {
        field: field.to_string(),
    }
}

fn missing(field: &str, required_by: &str) -> ValidationError {
    ValidationError::MissingSetting {
        field: field.to_string(),
        required_by: required_by.to_string(),
    }
}
