// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for completion polling and dead-letter checks.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::engine::tracker::SignalObservation;
use crate::errors::PlatformError;
use crate::observability::messages::StructuredLog;

/// # Log Level
/// `info!` - Important operational event
pub struct TrackingStarted<'a> {
    pub signal: &'a str,
    pub dispatched: u64,
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Display for TrackingStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Waiting for {} dispatched units to drain via {} every {:?}",
            self.dispatched, self.signal, self.poll_interval
        )?;
        if let Some(timeout) = self.timeout {
            write!(f, " (timeout {:?})", timeout)?;
        }
        Ok(())
    }
}

impl StructuredLog for TrackingStarted<'_> {
    fn log(&self) {
        tracing::info!(
            signal = self.signal,
            dispatched = self.dispatched,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            timeout = ?self.timeout,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "tracking",
            span_name = name,
            signal = self.signal,
            dispatched = self.dispatched,
        )
    }
}

/// A poll that found work still outstanding.
///
/// # Log Level
/// `info!` - Progress
pub struct TrackingTick<'a> {
    pub signal: &'a str,
    pub tick: u64,
    pub observation: &'a SignalObservation,
}

impl Display for TrackingTick<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Tick {} on {}: {}", self.tick, self.signal, self.observation)
    }
}

impl StructuredLog for TrackingTick<'_> {
    fn log(&self) {
        tracing::info!(
            signal = self.signal,
            tick = self.tick,
            observation = %self.observation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "tracking_tick",
            span_name = name,
            signal = self.signal,
            tick = self.tick,
        )
    }
}

/// The signal could not be read this tick. Polling continues.
///
/// # Log Level
/// `warn!` - Absorbed into a counter
pub struct PollFailed<'a> {
    pub signal: &'a str,
    pub tick: u64,
    pub failed_polls: u64,
    pub error: &'a PlatformError,
}

impl Display for PollFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Tick {} could not read {} ({} failed so far): {}",
            self.tick, self.signal, self.failed_polls, self.error
        )
    }
}

impl StructuredLog for PollFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            signal = self.signal,
            tick = self.tick,
            failed_polls = self.failed_polls,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "poll_failed",
            span_name = name,
            signal = self.signal,
            tick = self.tick,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct TrackingDrained<'a> {
    pub signal: &'a str,
    pub ticks: u64,
    pub failed_polls: u64,
    pub duration: Duration,
}

impl Display for TrackingDrained<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "All dispatched work drained according to {} after {} ticks in {:?}",
            self.signal, self.ticks, self.duration
        )
    }
}

impl StructuredLog for TrackingDrained<'_> {
    fn log(&self) {
        tracing::info!(
            signal = self.signal,
            ticks = self.ticks,
            failed_polls = self.failed_polls,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "tracking_drained",
            span_name = name,
            signal = self.signal,
            ticks = self.ticks,
        )
    }
}

/// # Log Level
/// `error!` - Job ends with an error
pub struct TrackingTimedOut<'a> {
    pub signal: &'a str,
    pub ticks: u64,
    pub elapsed: Duration,
}

impl Display for TrackingTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Gave up waiting on {} after {} ticks and {:?}",
            self.signal, self.ticks, self.elapsed
        )
    }
}

impl StructuredLog for TrackingTimedOut<'_> {
    fn log(&self) {
        tracing::error!(
            signal = self.signal,
            ticks = self.ticks,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "tracking_timed_out",
            span_name = name,
            signal = self.signal,
        )
    }
}

/// Units ended up on the dead-letter queue. Advisory only.
///
/// # Log Level
/// `warn!` - Partial failure
pub struct DeadLetterReported<'a> {
    pub queue: &'a str,
    pub count: u64,
}

impl Display for DeadLetterReported<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} work units failed irrecoverably and sit on dead-letter queue '{}'",
            self.count, self.queue
        )
    }
}

impl StructuredLog for DeadLetterReported<'_> {
    fn log(&self) {
        tracing::warn!(queue = self.queue, count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "dead_letter",
            span_name = name,
            queue = self.queue,
            count = self.count,
        )
    }
}

/// # Log Level
/// `debug!`
pub struct DeadLetterEmpty<'a> {
    pub queue: &'a str,
}

impl Display for DeadLetterEmpty<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dead-letter queue '{}' is empty", self.queue)
    }
}

impl StructuredLog for DeadLetterEmpty<'_> {
    fn log(&self) {
        tracing::debug!(queue = self.queue, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("dead_letter_empty", span_name = name, queue = self.queue)
    }
}

/// # Log Level
/// `warn!` - Failure count unknown
pub struct DeadLetterUnavailable<'a> {
    pub queue: &'a str,
    pub error: &'a PlatformError,
}

impl Display for DeadLetterUnavailable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not read dead-letter queue '{}': {}",
            self.queue, self.error
        )
    }
}

impl StructuredLog for DeadLetterUnavailable<'_> {
    fn log(&self) {
        tracing::warn!(queue = self.queue, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "dead_letter_unavailable",
            span_name = name,
            queue = self.queue,
        )
    }
}
