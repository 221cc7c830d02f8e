// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One crawl job from split to merged artifact.
//!
//! ```text
//! split -> clear prefix -> [reserve -> dispatch -> track -> release]
//!       -> dead-letter check -> consolidate -> JobReport
//! ```
//!
//! Only an invalid partition, a tracking timeout and a storage failure while
//! consolidating end the job with an error. Partial dispatch failures and
//! dead-lettered units are reported, not raised.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use crate::config::Strategy;
use crate::engine::consolidator::{ConsolidationReport, ResultConsolidator};
use crate::engine::dead_letter::{DeadLetterReport, FailureMonitor};
use crate::engine::dispatcher::{DispatchReport, Dispatcher};
use crate::engine::governor::ConcurrencyGovernor;
use crate::engine::splitter::JobPlan;
use crate::engine::tracker::{
    CompletionSignal, CompletionTracker, ExecutionLogSignal, QueueDepthSignal, TrackerReport,
};
use crate::errors::{JobError, TrackingError};
use crate::observability::messages::consolidation::StorageClearFailed;
use crate::observability::messages::job::{JobCompleted, JobStarted};
use crate::observability::messages::StructuredLog;
use crate::payload::WorkUnit;
use crate::traits::{ExecutionLogSource, WorkQueue};
use crate::utils::clock::epoch_millis;

/// Where the tracker should look to learn that dispatched work finished.
pub enum CompletionSource {
    QueueDepth(Vec<Arc<dyn WorkQueue>>),
    ExecutionLogs {
        logs: Arc<dyn ExecutionLogSource>,
        function_name: String,
    },
    /// Dispatch itself waited for every unit.
    Immediate,
}

impl CompletionSource {
    fn signal(&self, start_time_ms: u64) -> Option<Box<dyn CompletionSignal>> {
        match self {
            CompletionSource::QueueDepth(queues) => {
                Some(Box::new(QueueDepthSignal::new(queues.clone())))
            }
            CompletionSource::ExecutionLogs {
                logs,
                function_name,
            } => Some(Box::new(ExecutionLogSignal::new(
                logs.clone(),
                function_name,
                start_time_ms,
            ))),
            CompletionSource::Immediate => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub strategy: Strategy,
    pub planned: usize,
    pub dispatch: DispatchReport,
    /// Granted reservation, if one was made
    pub reservation: Option<u32>,
    pub tracking: Option<TrackerReport>,
    pub dead_letter: Option<DeadLetterReport>,
    pub consolidation: ConsolidationReport,
    pub elapsed: Duration,
}

impl JobReport {
    /// Units known to have failed irrecoverably on the dead-letter queue.
    pub fn dead_lettered(&self) -> u64 {
        self.dead_letter
            .as_ref()
            .and_then(|report| report.failed_count)
            .unwrap_or(0)
    }

    /// True when every planned unit was dispatched and the dead-letter queue,
    /// if there is one, was read and found empty.
    pub fn is_clean(&self) -> bool {
        let dead_letters_known = self
            .dead_letter
            .as_ref()
            .map_or(true, |report| report.failed_count.is_some());
        self.dispatch.failed == 0 && dead_letters_known && self.dead_lettered() == 0
    }
}

pub struct JobRunner {
    dispatcher: Box<dyn Dispatcher>,
    completion: CompletionSource,
    tracker: CompletionTracker,
    governor: ConcurrencyGovernor,
    failure_monitor: Option<FailureMonitor>,
    consolidator: ResultConsolidator,
}

impl JobRunner {
    pub fn new(
        dispatcher: Box<dyn Dispatcher>,
        completion: CompletionSource,
        tracker: CompletionTracker,
        governor: ConcurrencyGovernor,
        failure_monitor: Option<FailureMonitor>,
        consolidator: ResultConsolidator,
    ) -> Self {
        Self {
            dispatcher,
            completion,
            tracker,
            governor,
            failure_monitor,
            consolidator,
        }
    }

    pub fn consolidator(&self) -> &ResultConsolidator {
        &self.consolidator
    }

    pub async fn run(&self, plan: &JobPlan) -> Result<JobReport, JobError> {
        let units = plan.split()?;

        let job = JobStarted {
            strategy: self.dispatcher.strategy().as_str(),
            units: units.len(),
            items: plan.total_items(),
        };
        job.log();
        let span = job.span("run");

        self.run_units(units).instrument(span).await
    }

    async fn run_units(&self, units: Vec<WorkUnit>) -> Result<JobReport, JobError> {
        let started = Instant::now();
        let strategy = self.dispatcher.strategy();

        if let Err(err) = self.consolidator.clear().await {
            StorageClearFailed {
                prefix: self.consolidator.prefix(),
                error: &err,
            }
            .log();
        }

        let start_time_ms = epoch_millis();
        let (reservation, outcome) = self
            .governor
            .with_reservation(units.len(), self.dispatch_and_track(&units, start_time_ms))
            .await;
        let (dispatch, tracking) = outcome?;

        let dead_letter = match &self.failure_monitor {
            Some(monitor) => Some(monitor.check().await),
            None => None,
        };
        let tracking = match tracking {
            Ok(tracking) => tracking,
            Err(source) => {
                return Err(JobError::TimedOut {
                    source,
                    dispatch,
                    dead_letter,
                });
            }
        };

        let consolidation = self.consolidator.consolidate().await?;

        let report = JobReport {
            strategy,
            planned: units.len(),
            dispatch,
            reservation: reservation.granted(),
            tracking,
            dead_letter,
            consolidation,
            elapsed: started.elapsed(),
        };

        JobCompleted {
            strategy: strategy.as_str(),
            dispatched: report.dispatch.dispatched,
            failed: report.dispatch.failed,
            dead_lettered: report.dead_letter.as_ref().and_then(|d| d.failed_count),
            records: report.consolidation.records,
            duration: report.elapsed,
        }
        .log();

        Ok(report)
    }

    /// Dispatch failures are structural and end the job; a tracking timeout
    /// is handed back next to the dispatch report.
    async fn dispatch_and_track(
        &self,
        units: &[WorkUnit],
        start_time_ms: u64,
    ) -> Result<(DispatchReport, Result<Option<TrackerReport>, TrackingError>), JobError> {
        let dispatch = self.dispatcher.dispatch(units).await?;

        let tracking = match self.completion.signal(start_time_ms) {
            Some(signal) => self
                .tracker
                .track(signal.as_ref(), dispatch.dispatched as u64)
                .await
                .map(Some),
            None => Ok(None),
        };

        Ok((dispatch, tracking))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tracker::TrackerState;

    fn report(dead_letter: Option<DeadLetterReport>) -> JobReport {
        JobReport {
            strategy: Strategy::Queue,
            planned: 2,
            dispatch: DispatchReport {
                attempted: 2,
                dispatched: 2,
                calls: 1,
                ..DispatchReport::default()
            },
            reservation: None,
            tracking: Some(TrackerReport {
                ticks: 1,
                failed_polls: 0,
                last: None,
                transitions: vec![TrackerState::Drained],
                elapsed: Duration::from_millis(5),
            }),
            dead_letter,
            consolidation: ConsolidationReport {
                artifacts: 2,
                records: 4,
                output_key: "robots.json.gz".into(),
                bytes: 40,
                compressed: true,
            },
            elapsed: Duration::from_millis(10),
        }
    }

    fn dead_letter(failed_count: Option<u64>) -> Option<DeadLetterReport> {
        Some(DeadLetterReport {
            queue: "robots-dead-letter".into(),
            failed_count,
        })
    }

    #[test]
    fn test_clean_when_dead_letter_queue_is_empty_or_absent() {
        assert!(report(None).is_clean());
        assert!(report(dead_letter(Some(0))).is_clean());
    }

    #[test]
    fn test_dead_letters_make_the_job_unclean() {
        let job = report(dead_letter(Some(3)));
        assert_eq!(job.dead_lettered(), 3);
        assert!(!job.is_clean());
    }

    #[test]
    fn test_unreadable_dead_letter_queue_is_not_clean() {
        let job = report(dead_letter(None));
        assert_eq!(job.dead_lettered(), 0);
        assert!(!job.is_clean());
    }
}
