// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{TaskKind, WorkerConfig};
use crate::traits::RowTask;

/// Wraps every row as `{"row": ...}`.
pub struct EchoTask;

#[async_trait]
impl RowTask for EchoTask {
    async fn process(&self, row: &str) -> Option<Value> {
        Some(json!({ "row": row.trim_end() }))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Pulls the domain out of a `rank,tld_rank,domain,...` row. Rows without
/// that column, or with an empty one, are dropped.
pub struct DomainColumnTask {
    column: usize,
}

impl DomainColumnTask {
    pub fn new(column: usize) -> Self {
        Self { column }
    }
}

#[async_trait]
impl RowTask for DomainColumnTask {
    async fn process(&self, row: &str) -> Option<Value> {
        let domain = row.split(',').nth(self.column)?.trim();
        if domain.is_empty() {
            return None;
        }
        Some(json!({ "domain": domain }))
    }

    fn name(&self) -> &'static str {
        "domain"
    }
}

pub fn build_task(config: &WorkerConfig) -> Arc<dyn RowTask> {
    match config.task {
        TaskKind::Echo => Arc::new(EchoTask),
        TaskKind::Domain => Arc::new(DomainColumnTask::new(config.domain_column)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_domain_column() {
        let task = DomainColumnTask::new(2);
        assert_eq!(
            task.process("1,1,google.com,com\n").await,
            Some(json!({"domain": "google.com"}))
        );
        assert_eq!(task.process("1,1,facebook.com").await, Some(json!({"domain": "facebook.com"})));
        assert_eq!(task.process("1,1").await, None);
        assert_eq!(task.process("1,1, ,x").await, None);
    }

    #[tokio::test]
    async fn test_echo() {
        assert_eq!(EchoTask.process("a,b\r").await, Some(json!({"row": "a,b"})));
    }

    #[test]
    fn test_build_task_follows_config() {
        let mut config = WorkerConfig::default();
        assert_eq!(build_task(&config).name(), "domain");
        config.task = TaskKind::Echo;
        assert_eq!(build_task(&config).name(), "echo");
    }
}
