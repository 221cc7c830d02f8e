// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Completion tracking without a return channel.
//!
//! Workers never report back to the dispatcher, so completion is inferred by
//! polling a signal the platform exposes anyway:
//! * [`QueueDepthSignal`] - every fan-out queue shows zero visible and zero
//!   in-flight messages
//! * [`ExecutionLogSignal`] - the worker's log group holds at least as many
//!   `END RequestId` records since the job started as units were dispatched
//!
//! [`CompletionTracker::track`] sleeps one interval, observes, and repeats
//! until the signal reads drained. A failed observation is counted and the
//! loop carries on. Without a timeout the loop only ends when the fleet drains.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::TrackerConfig;
use crate::errors::{PlatformError, TrackingError};
use crate::observability::messages::tracking::{
    PollFailed, TrackingDrained, TrackingStarted, TrackingTick, TrackingTimedOut,
};
use crate::observability::messages::StructuredLog;
use crate::traits::logs::{log_group_name, END_PATTERN, START_PATTERN};
use crate::traits::{ExecutionLogSource, QueueAttributes, WorkQueue};

/// One reading of a completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalObservation {
    Queue(QueueAttributes),
    Executions { started: u64, ended: u64 },
}

impl SignalObservation {
    pub fn is_drained(&self, dispatched: u64) -> bool {
        match self {
            SignalObservation::Queue(attributes) => attributes.is_drained(),
            SignalObservation::Executions { ended, .. } => *ended >= dispatched,
        }
    }

    /// Keeps counts from going backwards: a reading lower than an earlier
    /// one is replaced by the earlier value.
    fn monotonic(self, previous: Option<SignalObservation>) -> SignalObservation {
        match (self, previous) {
            (
                SignalObservation::Executions { started, ended },
                Some(SignalObservation::Executions {
                    started: prev_started,
                    ended: prev_ended,
                }),
            ) => SignalObservation::Executions {
                started: started.max(prev_started),
                ended: ended.max(prev_ended),
            },
            (observation, _) => observation,
        }
    }
}

impl fmt::Display for SignalObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalObservation::Queue(a) => write!(
                f,
                "{} visible, {} in flight",
                a.approximate_number_of_messages, a.approximate_number_of_messages_not_visible
            ),
            SignalObservation::Executions { started, ended } => {
                write!(f, "{} started, {} ended", started, ended)
            }
        }
    }
}

#[async_trait]
pub trait CompletionSignal: Send + Sync {
    fn name(&self) -> &str;

    async fn observe(&self) -> Result<SignalObservation, PlatformError>;
}

/// Sums the depth of every fan-out queue.
pub struct QueueDepthSignal {
    name: String,
    queues: Vec<Arc<dyn WorkQueue>>,
}

impl QueueDepthSignal {
    pub fn new(queues: Vec<Arc<dyn WorkQueue>>) -> Self {
        let names: Vec<&str> = queues.iter().map(|q| q.name()).collect();
        Self {
            name: format!("queue depth of [{}]", names.join(", ")),
            queues,
        }
    }
}

#[async_trait]
impl CompletionSignal for QueueDepthSignal {
    fn name(&self) -> &str {
        &self.name
    }

    async fn observe(&self) -> Result<SignalObservation, PlatformError> {
        let mut total = QueueAttributes::default();
        for queue in &self.queues {
            let attributes = queue.attributes().await?;
            total.approximate_number_of_messages += attributes.approximate_number_of_messages;
            total.approximate_number_of_messages_not_visible +=
                attributes.approximate_number_of_messages_not_visible;
        }
        Ok(SignalObservation::Queue(total))
    }
}

/// Counts `START` / `END` execution records of a function since `start_time_ms`.
pub struct ExecutionLogSignal {
    name: String,
    logs: Arc<dyn ExecutionLogSource>,
    log_group: String,
    start_time_ms: u64,
}

impl ExecutionLogSignal {
    pub fn new(logs: Arc<dyn ExecutionLogSource>, function_name: &str, start_time_ms: u64) -> Self {
        let log_group = log_group_name(function_name);
        Self {
            name: format!("execution logs of '{}'", log_group),
            logs,
            log_group,
            start_time_ms,
        }
    }

    async fn count(&self, pattern: &str) -> Result<u64, PlatformError> {
        let mut count = 0u64;
        let mut token = None;
        loop {
            let page = self
                .logs
                .filter_log_events(&self.log_group, pattern, self.start_time_ms, token)
                .await?;
            count += page.events.len() as u64;
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Ok(count),
            }
        }
    }
}

#[async_trait]
impl CompletionSignal for ExecutionLogSignal {
    fn name(&self) -> &str {
        &self.name
    }

    async fn observe(&self) -> Result<SignalObservation, PlatformError> {
        let started = self.count(START_PATTERN).await?;
        let ended = self.count(END_PATTERN).await?;
        Ok(SignalObservation::Executions { started, ended })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Polling,
    Drained,
}

/// Final counters of a tracking loop that drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerReport {
    pub ticks: u64,
    pub failed_polls: u64,
    pub last: Option<SignalObservation>,
    /// State after each tick, ending with `Drained`
    pub transitions: Vec<TrackerState>,
    pub elapsed: Duration,
}

impl TrackerReport {
    pub fn state(&self) -> TrackerState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(TrackerState::Drained)
    }
}

pub struct CompletionTracker {
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl CompletionTracker {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.poll_interval(), config.timeout())
    }

    /// Polls `signal` until it reads drained for `dispatched` units.
    pub async fn track(
        &self,
        signal: &dyn CompletionSignal,
        dispatched: u64,
    ) -> Result<TrackerReport, TrackingError> {
        let started = Instant::now();
        let mut report = TrackerReport {
            ticks: 0,
            failed_polls: 0,
            last: None,
            transitions: Vec::new(),
            elapsed: Duration::ZERO,
        };

        TrackingStarted {
            signal: signal.name(),
            dispatched,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
        .log();

        if dispatched == 0 {
            report.transitions.push(TrackerState::Drained);
            return Ok(report);
        }

        loop {
            tokio::time::sleep(self.poll_interval).await;
            report.ticks += 1;

            let state = match signal.observe().await {
                Ok(observation) => {
                    let observation = observation.monotonic(report.last);
                    report.last = Some(observation);
                    if observation.is_drained(dispatched) {
                        TrackerState::Drained
                    } else {
                        TrackingTick {
                            signal: signal.name(),
                            tick: report.ticks,
                            observation: &observation,
                        }
                        .log();
                        TrackerState::Polling
                    }
                }
                Err(error) => {
                    report.failed_polls += 1;
                    PollFailed {
                        signal: signal.name(),
                        tick: report.ticks,
                        failed_polls: report.failed_polls,
                        error: &error,
                    }
                    .log();
                    TrackerState::Polling
                }
            };
            report.transitions.push(state);

            if state == TrackerState::Drained {
                report.elapsed = started.elapsed();
                TrackingDrained {
                    signal: signal.name(),
                    ticks: report.ticks,
                    failed_polls: report.failed_polls,
                    duration: report.elapsed,
                }
                .log();
                return Ok(report);
            }

            if let Some(timeout) = self.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    TrackingTimedOut {
                        signal: signal.name(),
                        ticks: report.ticks,
                        elapsed,
                    }
                    .log();
                    return Err(TrackingError::Timeout {
                        elapsed,
                        ticks: report.ticks,
                        last: report.last,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{RecordingQueue, ScriptedSignal, StubLogSource};

    fn executions(started: u64, ended: u64) -> SignalObservation {
        SignalObservation::Executions { started, ended }
    }

    fn depth(visible: u64, in_flight: u64) -> SignalObservation {
        SignalObservation::Queue(QueueAttributes {
            approximate_number_of_messages: visible,
            approximate_number_of_messages_not_visible: in_flight,
        })
    }

    #[tokio::test]
    async fn test_queue_depth_sequence_drains_on_third_tick() {
        let signal = ScriptedSignal::new(vec![
            Ok(depth(5, 3)),
            Ok(depth(0, 2)),
            Ok(depth(0, 0)),
            Ok(depth(9, 9)),
        ]);
        let tracker = CompletionTracker::new(Duration::from_millis(1), None);

        let report = tracker.track(&signal, 10).await.unwrap();

        assert_eq!(
            report.transitions,
            vec![TrackerState::Polling, TrackerState::Polling, TrackerState::Drained]
        );
        assert_eq!(report.ticks, 3);
        assert_eq!(signal.observations(), 3);
        assert_eq!(report.last, Some(depth(0, 0)));
        assert_eq!(report.state(), TrackerState::Drained);
    }

    #[tokio::test]
    async fn test_failed_polls_are_absorbed() {
        let signal = ScriptedSignal::new(vec![
            Err(PlatformError::Throttled("slow down".into())),
            Ok(executions(4, 2)),
            Err(PlatformError::Unavailable("timeout".into())),
            Ok(executions(4, 4)),
        ]);
        let tracker = CompletionTracker::new(Duration::from_millis(1), None);

        let report = tracker.track(&signal, 4).await.unwrap();

        assert_eq!(report.ticks, 4);
        assert_eq!(report.failed_polls, 2);
        assert_eq!(report.last, Some(executions(4, 4)));
    }

    #[tokio::test]
    async fn test_completed_count_never_goes_backwards() {
        let signal = ScriptedSignal::new(vec![
            Ok(executions(6, 5)),
            Ok(executions(6, 3)),
            Ok(executions(6, 6)),
        ]);
        let tracker = CompletionTracker::new(Duration::from_millis(1), None);

        let report = tracker.track(&signal, 6).await.unwrap();

        assert_eq!(report.ticks, 3);
        assert_eq!(report.last, Some(executions(6, 6)));
    }

    #[tokio::test]
    async fn test_end_count_at_or_above_dispatched_is_drained() {
        let signal = ScriptedSignal::new(vec![Ok(executions(9, 9))]);
        let tracker = CompletionTracker::new(Duration::from_millis(1), None);

        let report = tracker.track(&signal, 8).await.unwrap();
        assert_eq!(report.ticks, 1);
    }

    #[tokio::test]
    async fn test_nothing_dispatched_needs_no_polling() {
        let signal = ScriptedSignal::new(vec![]);
        let tracker = CompletionTracker::new(Duration::from_secs(60), None);

        let report = tracker.track(&signal, 0).await.unwrap();
        assert_eq!(report.ticks, 0);
        assert_eq!(signal.observations(), 0);
        assert_eq!(report.state(), TrackerState::Drained);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_carries_last_observation() {
        let signal = ScriptedSignal::repeating(Ok(executions(3, 1)));
        let tracker = CompletionTracker::new(Duration::from_secs(3), Some(Duration::from_secs(10)));

        let err = tracker.track(&signal, 5).await.unwrap_err();

        let TrackingError::Timeout { ticks, last, .. } = err;
        assert_eq!(ticks, 4);
        assert_eq!(last, Some(executions(3, 1)));
    }

    #[tokio::test]
    async fn test_queue_depth_signal_sums_queues() {
        let a: Arc<dyn WorkQueue> = Arc::new(RecordingQueue::new("a").with_depth(2, 1));
        let b: Arc<dyn WorkQueue> = Arc::new(RecordingQueue::new("b").with_depth(0, 4));
        let signal = QueueDepthSignal::new(vec![a, b]);

        assert_eq!(signal.observe().await.unwrap(), depth(2, 5));
        assert!(signal.name().contains("a, b"));
    }

    #[tokio::test]
    async fn test_execution_log_signal_follows_pages() {
        let logs = Arc::new(StubLogSource::new(2));
        for request in 0..5 {
            logs.record("robots-worker", 1_000 + request, &format!("START RequestId: {}", request));
            logs.record("robots-worker", 1_000 + request, &format!("END RequestId: {}", request));
        }
        logs.record("robots-worker", 10, "END RequestId: stale");

        let signal = ExecutionLogSignal::new(logs.clone(), "robots-worker", 1_000);

        assert_eq!(signal.observe().await.unwrap(), executions(5, 5));
        assert!(logs.queries() > 2);
    }
}
