// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Delivery of work units to the fleet.
//!
//! Three strategies share the [`Dispatcher`] trait:
//! * [`QueueFanoutDispatcher`] - batch-sends onto durable queues, striping
//!   sub-batches across them
//! * [`DirectInvokeDispatcher`] - fires invocation groups at the fan-out relay
//! * [`SyncInvokeDispatcher`] - request/response, one unit per invocation,
//!   with a bounded number in flight
//!
//! Units are validated before anything is sent; an invalid unit aborts the
//! dispatch with [`InvalidPartition`]. After that, failures are per call and
//! end up in the [`DispatchReport`], never as an `Err`.

mod direct;
mod queue_fanout;
mod sync;

use std::fmt;

use async_trait::async_trait;

pub use direct::DirectInvokeDispatcher;
pub use queue_fanout::QueueFanoutDispatcher;
pub use sync::SyncInvokeDispatcher;

use crate::config::Strategy;
use crate::errors::{DispatchError, InvalidPartition};
use crate::payload::{InvocationOutcome, WorkUnit};

/// The worker function a dispatch is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    pub function_name: String,
    pub region: String,
}

impl DispatchTarget {
    pub fn new(function_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.function_name, self.region)
    }
}

/// Counts of one dispatch. `dispatched + failed == attempted`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub dispatched: usize,
    pub failed: usize,
    /// Platform calls made (queue sends or invocations)
    pub calls: usize,
    pub errors: Vec<DispatchError>,
    /// Responses of the sync strategy, in completion order
    pub responses: Vec<InvocationOutcome>,
}

impl DispatchReport {
    fn record_failure(&mut self, error: DispatchError) {
        self.failed += error.units;
        self.errors.push(error);
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn dispatch(&self, units: &[WorkUnit]) -> Result<DispatchReport, InvalidPartition>;
}

/// Rejects the whole dispatch if any unit is malformed.
pub fn validate_units(units: &[WorkUnit]) -> Result<(), InvalidPartition> {
    units.iter().try_for_each(WorkUnit::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_units_stops_at_first_bad_unit() {
        let units = vec![WorkUnit::new(0, 2, 1), WorkUnit::new(2, 2, 1)];
        let err = validate_units(&units).unwrap_err();
        assert!(err.reason.contains("[2, 2)"));

        assert!(validate_units(&[]).is_ok());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(DispatchTarget::new("robots-worker", "local").to_string(), "robots-worker@local");
    }
}
