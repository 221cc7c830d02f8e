// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for handing work units to the fleet.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::errors::DispatchError;
use crate::observability::messages::StructuredLog;
use crate::payload::UnitRange;

/// Dispatch of a job's units is about to begin.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DispatchStarted<'a> {
    pub strategy: &'a str,
    pub units: usize,
    /// Number of platform calls the units will be sent in.
    pub calls: usize,
}

impl Display for DispatchStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching {} units with {} strategy in {} calls",
            self.units, self.strategy, self.calls
        )
    }
}

impl StructuredLog for DispatchStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            units = self.units,
            calls = self.calls,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "dispatch",
            span_name = name,
            strategy = self.strategy,
            units = self.units,
            calls = self.calls,
        )
    }
}

/// A sub-batch reached a queue. Some entries may still have been refused.
///
/// # Log Level
/// `debug!` - One per sub-batch
pub struct SubBatchSent<'a> {
    pub queue: &'a str,
    pub batch_index: usize,
    pub range: UnitRange,
    pub sent: usize,
    pub failed: usize,
}

impl Display for SubBatchSent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sub-batch {} {} to queue '{}': {} sent, {} failed",
            self.batch_index, self.range, self.queue, self.sent, self.failed
        )
    }
}

impl StructuredLog for SubBatchSent<'_> {
    fn log(&self) {
        tracing::debug!(
            queue = self.queue,
            batch_index = self.batch_index,
            range = %self.range,
            sent = self.sent,
            failed = self.failed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "sub_batch",
            span_name = name,
            queue = self.queue,
            batch_index = self.batch_index,
        )
    }
}

/// A whole queue call, or a single entry, failed.
///
/// # Log Level
/// `warn!` - Counted, dispatch continues
pub struct SubBatchFailed<'a> {
    pub queue: &'a str,
    pub batch_index: usize,
    pub error: &'a DispatchError,
}

impl Display for SubBatchFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sub-batch {} to queue '{}': {}",
            self.batch_index, self.queue, self.error
        )
    }
}

impl StructuredLog for SubBatchFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            queue = self.queue,
            batch_index = self.batch_index,
            range = %self.error.range,
            kind = %self.error.kind,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "sub_batch_failed",
            span_name = name,
            queue = self.queue,
            batch_index = self.batch_index,
        )
    }
}

/// An invocation group was accepted by the fan-out relay.
///
/// # Log Level
/// `debug!` - One per group
pub struct GroupInvoked<'a> {
    pub relay: &'a str,
    pub group_index: usize,
    pub range: UnitRange,
    pub units: usize,
}

impl Display for GroupInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Group {} {} of {} units handed to relay '{}'",
            self.group_index, self.range, self.units, self.relay
        )
    }
}

impl StructuredLog for GroupInvoked<'_> {
    fn log(&self) {
        tracing::debug!(
            relay = self.relay,
            group_index = self.group_index,
            range = %self.range,
            units = self.units,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "group_invoked",
            span_name = name,
            relay = self.relay,
            group_index = self.group_index,
        )
    }
}

/// # Log Level
/// `warn!` - Counted, dispatch continues
pub struct InvocationFailed<'a> {
    pub function_name: &'a str,
    pub error: &'a DispatchError,
}

impl Display for InvocationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Invocation of '{}': {}", self.function_name, self.error)
    }
}

impl StructuredLog for InvocationFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            function_name = self.function_name,
            range = %self.error.range,
            kind = %self.error.kind,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "invocation_failed",
            span_name = name,
            function_name = self.function_name,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct DispatchCompleted<'a> {
    pub strategy: &'a str,
    pub dispatched: usize,
    pub failed: usize,
    pub calls: usize,
    pub duration: Duration,
}

impl Display for DispatchCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatch with {} strategy finished in {:?}: {} dispatched, {} failed, {} calls",
            self.strategy, self.duration, self.dispatched, self.failed, self.calls
        )
    }
}

impl StructuredLog for DispatchCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            dispatched = self.dispatched,
            failed = self.failed,
            calls = self.calls,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "dispatch_completed",
            span_name = name,
            strategy = self.strategy,
            dispatched = self.dispatched,
            failed = self.failed,
        )
    }
}
