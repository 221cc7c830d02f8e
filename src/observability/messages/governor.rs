// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the concurrency reservation lifecycle.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::errors::ConcurrencyReservationError;
use crate::observability::messages::StructuredLog;

/// Too few pending invocations to bother reserving concurrency.
///
/// # Log Level
/// `debug!` - Expected for small jobs
pub struct ReservationSkipped<'a> {
    pub function_name: &'a str,
    pub pending: usize,
    pub threshold: usize,
}

impl Display for ReservationSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} pending invocations of '{}' is below the reservation threshold of {}",
            self.pending, self.function_name, self.threshold
        )
    }
}

impl StructuredLog for ReservationSkipped<'_> {
    fn log(&self) {
        tracing::debug!(
            function_name = self.function_name,
            pending = self.pending,
            threshold = self.threshold,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "reservation_skipped",
            span_name = name,
            function_name = self.function_name,
            pending = self.pending,
        )
    }
}

/// The platform granted a concurrency reservation.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ReservationAcquired<'a> {
    pub function_name: &'a str,
    pub requested: u32,
    pub granted: u32,
}

impl Display for ReservationAcquired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reserved {} concurrent executions for '{}' (requested {})",
            self.granted, self.function_name, self.requested
        )
    }
}

impl StructuredLog for ReservationAcquired<'_> {
    fn log(&self) {
        tracing::info!(
            function_name = self.function_name,
            requested = self.requested,
            granted = self.granted,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reservation",
            span_name = name,
            function_name = self.function_name,
            granted = self.granted,
        )
    }
}

/// The platform refused the reservation; the job continues unreserved.
///
/// # Log Level
/// `warn!` - Degraded but not failing
pub struct ReservationRejected<'a> {
    pub error: &'a ConcurrencyReservationError,
}

impl Display for ReservationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}; continuing without a reservation", self.error)
    }
}

impl StructuredLog for ReservationRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            function_name = self.error.function_name.as_str(),
            requested = self.error.requested,
            error = %self.error.source,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "reservation_rejected",
            span_name = name,
            function_name = self.error.function_name.as_str(),
            requested = self.error.requested,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct ReservationReleased<'a> {
    pub function_name: &'a str,
}

impl Display for ReservationReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Released reserved concurrency for '{}'", self.function_name)
    }
}

impl StructuredLog for ReservationReleased<'_> {
    fn log(&self) {
        tracing::info!(function_name = self.function_name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reservation_released",
            span_name = name,
            function_name = self.function_name,
        )
    }
}

/// # Log Level
/// `debug!` - Nothing to undo
pub struct ReservationAlreadyReleased<'a> {
    pub function_name: &'a str,
}

impl Display for ReservationAlreadyReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No reserved concurrency left to release for '{}'",
            self.function_name
        )
    }
}

impl StructuredLog for ReservationAlreadyReleased<'_> {
    fn log(&self) {
        tracing::debug!(function_name = self.function_name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "reservation_already_released",
            span_name = name,
            function_name = self.function_name,
        )
    }
}

/// Releasing failed and the reservation may outlive the job.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ReservationReleaseFailed<'a> {
    pub function_name: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ReservationReleaseFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to release reserved concurrency for '{}': {}",
            self.function_name, self.error
        )
    }
}

impl StructuredLog for ReservationReleaseFailed<'_> {
    fn log(&self) {
        tracing::error!(
            function_name = self.function_name,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "reservation_release_failed",
            span_name = name,
            function_name = self.function_name,
        )
    }
}
