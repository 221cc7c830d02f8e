// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the local worker platform and its queue consumers.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::observability::messages::StructuredLog;
use crate::payload::UnitRange;

/// # Log Level
/// `debug!` - One per invocation
pub struct UnitProcessed<'a> {
    pub function_name: &'a str,
    pub range: UnitRange,
    pub records: usize,
    pub key: &'a str,
}

impl Display for UnitProcessed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "'{}' processed {} into {} records at '{}'",
            self.function_name, self.range, self.records, self.key
        )
    }
}

impl StructuredLog for UnitProcessed<'_> {
    fn log(&self) {
        tracing::debug!(
            function_name = self.function_name,
            range = %self.range,
            records = self.records,
            key = self.key,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "unit_processed",
            span_name = name,
            function_name = self.function_name,
            range = %self.range,
        )
    }
}

/// # Log Level
/// `warn!`
pub struct FunctionErrored<'a> {
    pub function_name: &'a str,
    pub request_id: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for FunctionErrored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Request {} of '{}' failed: {}",
            self.request_id, self.function_name, self.error
        )
    }
}

impl StructuredLog for FunctionErrored<'_> {
    fn log(&self) {
        tracing::warn!(
            function_name = self.function_name,
            request_id = self.request_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "function_errored",
            span_name = name,
            function_name = self.function_name,
            request_id = self.request_id,
        )
    }
}

/// # Log Level
/// `debug!`
pub struct ConsumerStarted<'a> {
    pub queue: &'a str,
    pub function_name: &'a str,
}

impl Display for ConsumerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Consumer started: queue '{}' triggers '{}'",
            self.queue, self.function_name
        )
    }
}

impl StructuredLog for ConsumerStarted<'_> {
    fn log(&self) {
        tracing::debug!(queue = self.queue, function_name = self.function_name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "consumer",
            span_name = name,
            queue = self.queue,
            function_name = self.function_name,
        )
    }
}

/// # Log Level
/// `debug!`
pub struct ConsumerStopped<'a> {
    pub queue: &'a str,
    pub delivered: u64,
}

impl Display for ConsumerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Consumer on '{}' stopped after {} deliveries",
            self.queue, self.delivered
        )
    }
}

impl StructuredLog for ConsumerStopped<'_> {
    fn log(&self) {
        tracing::debug!(queue = self.queue, delivered = self.delivered, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("consumer_stopped", span_name = name, queue = self.queue)
    }
}

/// A message exhausted its receives and moved to the dead-letter queue.
///
/// # Log Level
/// `warn!`
pub struct MessageDeadLettered<'a> {
    pub queue: &'a str,
    pub dead_letter_queue: &'a str,
    pub receive_count: u32,
}

impl Display for MessageDeadLettered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Message moved from '{}' to '{}' after {} receives",
            self.queue, self.dead_letter_queue, self.receive_count
        )
    }
}

impl StructuredLog for MessageDeadLettered<'_> {
    fn log(&self) {
        tracing::warn!(
            queue = self.queue,
            dead_letter_queue = self.dead_letter_queue,
            receive_count = self.receive_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "message_dead_lettered",
            span_name = name,
            queue = self.queue,
        )
    }
}
