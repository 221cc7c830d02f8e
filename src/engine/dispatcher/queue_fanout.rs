// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{validate_units, DispatchReport, Dispatcher};
use crate::config::consts::MAX_QUEUE_BATCH;
use crate::config::Strategy;
use crate::errors::{DispatchError, DispatchFailureKind, InvalidPartition, PlatformError};
use crate::observability::messages::dispatch::{
    DispatchCompleted, DispatchStarted, SubBatchFailed, SubBatchSent,
};
use crate::observability::messages::StructuredLog;
use crate::payload::{PayloadBatch, QueueEntry, UnitRange, WorkUnit};
use crate::traits::WorkQueue;

/// Sends units as sub-batches of at most `max_batch` messages, in index
/// order, striped across the queues: sub-batch `i` goes to queue `i mod k`.
///
/// N units make exactly `ceil(N / max_batch)` send calls. A failed call or
/// a refused entry is counted and the next sub-batch is still sent.
pub struct QueueFanoutDispatcher {
    queues: Vec<Arc<dyn WorkQueue>>,
    max_batch: usize,
}

impl QueueFanoutDispatcher {
    pub fn new(queues: Vec<Arc<dyn WorkQueue>>, max_batch: usize) -> Self {
        Self {
            queues,
            max_batch: max_batch.clamp(1, MAX_QUEUE_BATCH),
        }
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    async fn send_sub_batch(
        &self,
        queue: &dyn WorkQueue,
        batch: &PayloadBatch,
        report: &mut DispatchReport,
    ) {
        let first_index = batch.index() * self.max_batch;
        let entries: Vec<QueueEntry> = batch
            .units()
            .iter()
            .enumerate()
            .map(|(offset, unit)| QueueEntry::for_unit(first_index + offset, unit))
            .collect();
        let by_id: HashMap<String, WorkUnit> = entries
            .iter()
            .map(|entry| entry.id.clone())
            .zip(batch.units().iter().copied())
            .collect();

        report.calls += 1;
        let output = match queue.send_batch(entries).await {
            Ok(output) => output,
            Err(err) => {
                let error = DispatchError::from_platform(batch.range(), batch.len(), &err);
                SubBatchFailed {
                    queue: queue.name(),
                    batch_index: batch.index(),
                    error: &error,
                }
                .log();
                report.record_failure(error);
                return;
            }
        };

        let mut sent = 0;
        let mut failed = 0;
        for id in &output.successful {
            if by_id.contains_key(id) {
                sent += 1;
            }
        }
        for failure in &output.failed {
            let range = by_id
                .get(&failure.id)
                .map(WorkUnit::range)
                .unwrap_or_else(|| batch.range());
            let error = DispatchError {
                range,
                units: 1,
                kind: DispatchFailureKind::Rejected {
                    code: failure.code.clone(),
                },
                message: failure.message.clone(),
            };
            SubBatchFailed {
                queue: queue.name(),
                batch_index: batch.index(),
                error: &error,
            }
            .log();
            report.record_failure(error);
            failed += 1;
        }

        // Entries the queue neither accepted nor refused are not counted as sent.
        let unacknowledged = batch.len().saturating_sub(sent + failed);
        if unacknowledged > 0 {
            let error = DispatchError::from_platform(
                batch.range(),
                unacknowledged,
                &PlatformError::Unavailable(format!(
                    "{} entries missing from the batch response",
                    unacknowledged
                )),
            );
            report.record_failure(error);
        }

        report.dispatched += sent;
        SubBatchSent {
            queue: queue.name(),
            batch_index: batch.index(),
            range: batch.range(),
            sent,
            failed: failed + unacknowledged,
        }
        .log();
    }
}

#[async_trait]
impl Dispatcher for QueueFanoutDispatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Queue
    }

    async fn dispatch(&self, units: &[WorkUnit]) -> Result<DispatchReport, InvalidPartition> {
        validate_units(units)?;
        let started = Instant::now();
        let batches = PayloadBatch::partition(units, self.max_batch);
        let mut report = DispatchReport {
            attempted: units.len(),
            ..DispatchReport::default()
        };

        DispatchStarted {
            strategy: Strategy::Queue.as_str(),
            units: units.len(),
            calls: batches.len(),
        }
        .log();

        if self.queues.is_empty() && !units.is_empty() {
            report.record_failure(DispatchError::from_platform(
                UnitRange::spanning(units).unwrap_or(UnitRange::new(0, 0)),
                units.len(),
                &PlatformError::NotFound("no work queues configured".to_string()),
            ));
            return Ok(report);
        }

        for batch in &batches {
            let queue = &self.queues[batch.index() % self.queues.len()];
            self.send_sub_batch(queue.as_ref(), batch, &mut report).await;
        }

        DispatchCompleted {
            strategy: Strategy::Queue.as_str(),
            dispatched: report.dispatched,
            failed: report.failed,
            calls: report.calls,
            duration: started.elapsed(),
        }
        .log();

        Ok(report)
    }
}
