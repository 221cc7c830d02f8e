// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::observability::messages::tracking::{
    DeadLetterEmpty, DeadLetterReported, DeadLetterUnavailable,
};
use crate::observability::messages::StructuredLog;
use crate::traits::WorkQueue;

/// How many units failed irrecoverably. `failed_count` is `None` when the
/// dead-letter queue could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterReport {
    pub queue: String,
    pub failed_count: Option<u64>,
}

impl DeadLetterReport {
    pub fn has_failures(&self) -> bool {
        self.failed_count.is_some_and(|count| count > 0)
    }
}

/// Reads the dead-letter depth (visible plus in flight). Never fails: an
/// unreadable queue is logged and reported as unknown.
pub async fn check_dead_letter(channel: &dyn WorkQueue) -> DeadLetterReport {
    let failed_count = match channel.attributes().await {
        Ok(attributes) => {
            let count = attributes.total();
            if count > 0 {
                DeadLetterReported {
                    queue: channel.name(),
                    count,
                }
                .log();
            } else {
                DeadLetterEmpty {
                    queue: channel.name(),
                }
                .log();
            }
            Some(count)
        }
        Err(error) => {
            DeadLetterUnavailable {
                queue: channel.name(),
                error: &error,
            }
            .log();
            None
        }
    };

    DeadLetterReport {
        queue: channel.name().to_string(),
        failed_count,
    }
}

/// Watches one dead-letter queue on behalf of a job.
pub struct FailureMonitor {
    channel: Arc<dyn WorkQueue>,
}

impl FailureMonitor {
    pub fn new(channel: Arc<dyn WorkQueue>) -> Self {
        Self { channel }
    }

    pub async fn check(&self) -> DeadLetterReport {
        check_dead_letter(self.channel.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::RecordingQueue;

    #[tokio::test]
    async fn test_counts_visible_and_in_flight() {
        let dlq = RecordingQueue::new("robots-dead-letter").with_depth(2, 1);

        let report = check_dead_letter(&dlq).await;
        assert_eq!(report.failed_count, Some(3));
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let monitor = FailureMonitor::new(Arc::new(RecordingQueue::new("robots-dead-letter")));

        let report = monitor.check().await;
        assert_eq!(report.failed_count, Some(0));
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_unreadable_queue_is_unknown() {
        let dlq = RecordingQueue::new("robots-dead-letter").unreadable();

        let report = check_dead_letter(&dlq).await;
        assert_eq!(report.failed_count, None);
        assert_eq!(report.queue, "robots-dead-letter");
    }
}
