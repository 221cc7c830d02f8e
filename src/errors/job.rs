// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::PlatformError;
use crate::engine::dead_letter::DeadLetterReport;
use crate::engine::dispatcher::DispatchReport;
use crate::engine::tracker::SignalObservation;
use crate::payload::UnitRange;

/// A work range that cannot be split or dispatched. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid partition: {reason}")]
pub struct InvalidPartition {
    pub reason: String,
}

impl InvalidPartition {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why a dispatch call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailureKind {
    Throttled,
    MalformedPayload,
    /// Refused by the queue or invoker, with the platform's error code.
    Rejected { code: String },
    Transport,
}

impl fmt::Display for DispatchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailureKind::Throttled => write!(f, "throttled"),
            DispatchFailureKind::MalformedPayload => write!(f, "malformed payload"),
            DispatchFailureKind::Rejected { code } => write!(f, "rejected ({})", code),
            DispatchFailureKind::Transport => write!(f, "transport"),
        }
    }
}

impl From<&PlatformError> for DispatchFailureKind {
    fn from(err: &PlatformError) -> Self {
        match err {
            PlatformError::Throttled(_) => DispatchFailureKind::Throttled,
            PlatformError::MalformedPayload(_) => DispatchFailureKind::MalformedPayload,
            PlatformError::Rejected { code, .. } => DispatchFailureKind::Rejected { code: code.clone() },
            PlatformError::NotFound(_) => DispatchFailureKind::Rejected {
                code: "NotFound".to_string(),
            },
            PlatformError::Unavailable(_) => DispatchFailureKind::Transport,
        }
    }
}

/// A batch, sub-batch, group or single invocation that could not be handed
/// to the fleet. Counted and reported, never fatal to the job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dispatch of {units} unit(s) covering {range} failed ({kind}): {message}")]
pub struct DispatchError {
    pub range: UnitRange,
    pub units: usize,
    pub kind: DispatchFailureKind,
    pub message: String,
}

impl DispatchError {
    pub fn from_platform(range: UnitRange, units: usize, err: &PlatformError) -> Self {
        Self {
            range,
            units,
            kind: err.into(),
            message: err.to_string(),
        }
    }
}

/// The platform refused a concurrency reservation. The job continues without one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Reserving {requested} concurrent executions for '{function_name}' failed: {source}")]
pub struct ConcurrencyReservationError {
    pub function_name: String,
    pub requested: u32,
    pub source: PlatformError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    #[error("Completion tracking timed out after {elapsed:?} and {ticks} tick(s); last observation: {}", describe(.last))]
    Timeout {
        elapsed: Duration,
        ticks: u64,
        last: Option<SignalObservation>,
    },
}

fn describe(last: &Option<SignalObservation>) -> String {
    match last {
        Some(observation) => observation.to_string(),
        None => "none".to_string(),
    }
}

/// Errors that end a job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    InvalidPartition(#[from] InvalidPartition),

    /// Tracking gave up before the fleet drained. What was dispatched, and
    /// what the dead-letter queue held at that point, travel with the error.
    #[error(
        "{source} ({} of {} units dispatched, {} failed)",
        .dispatch.dispatched,
        .dispatch.attempted,
        .dispatch.failed
    )]
    TimedOut {
        source: TrackingError,
        dispatch: DispatchReport,
        dead_letter: Option<DeadLetterReport>,
    },

    #[error("Storage failure during consolidation: {0}")]
    Storage(#[from] PlatformError),

    #[error("Artifact '{key}' is not valid {expected}: {reason}")]
    MalformedArtifact {
        key: String,
        expected: &'static str,
        reason: String,
    },
}

/// Failure inside a worker function invocation.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Malformed work unit payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    InvalidUnit(#[from] InvalidPartition),

    #[error("Sub-worker {index} failed: {reason}")]
    SubWorker { index: usize, reason: String },

    #[error("Unable to write artifact: {0}")]
    Storage(#[from] PlatformError),

    #[error("Unit starting at {start_pos} rejected: {reason}")]
    Rejected { start_pos: u64, reason: String },
}
