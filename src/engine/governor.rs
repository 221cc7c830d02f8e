// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrency reservation scoped to one job.
//!
//! Large jobs reserve `pending + headroom` parallel executions for the worker
//! function before dispatch and drop the reservation once tracking ends.
//! [`ConcurrencyGovernor::with_reservation`] is the scoped form: the work
//! future runs between reserve and release and the release happens whatever
//! the work returns.

use std::future::Future;
use std::sync::Arc;

use crate::config::GovernorConfig;
use crate::errors::{ConcurrencyReservationError, PlatformError};
use crate::observability::messages::governor::{
    ReservationAcquired, ReservationAlreadyReleased, ReservationRejected, ReservationReleaseFailed,
    ReservationReleased, ReservationSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::traits::ConcurrencyPlatform;

/// Outcome of a reservation request. `granted` is `None` when nothing was
/// reserved, either because the job was small or because the platform refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationHandle {
    function_name: String,
    requested: Option<u32>,
    granted: Option<u32>,
}

impl ReservationHandle {
    fn unreserved(function_name: &str, requested: Option<u32>) -> Self {
        Self {
            function_name: function_name.to_string(),
            requested,
            granted: None,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn requested(&self) -> Option<u32> {
        self.requested
    }

    pub fn granted(&self) -> Option<u32> {
        self.granted
    }

    pub fn is_reserved(&self) -> bool {
        self.granted.is_some()
    }
}

pub struct ConcurrencyGovernor {
    platform: Arc<dyn ConcurrencyPlatform>,
    function_name: String,
    config: GovernorConfig,
}

impl ConcurrencyGovernor {
    pub fn new(
        platform: Arc<dyn ConcurrencyPlatform>,
        function_name: impl Into<String>,
        config: GovernorConfig,
    ) -> Self {
        Self {
            platform,
            function_name: function_name.into(),
            config,
        }
    }

    /// Slots to request for `pending` invocations, `None` below the threshold.
    pub fn slots_for(&self, pending: usize) -> Option<u32> {
        if pending < self.config.threshold {
            return None;
        }
        let pending = u32::try_from(pending).unwrap_or(u32::MAX);
        Some(pending.saturating_add(self.config.headroom))
    }

    /// Requests a reservation sized for `pending` invocations. A refusal is
    /// logged and yields an unreserved handle.
    pub async fn reserve(&self, pending: usize) -> ReservationHandle {
        let Some(slots) = self.slots_for(pending) else {
            ReservationSkipped {
                function_name: &self.function_name,
                pending,
                threshold: self.config.threshold,
            }
            .log();
            return ReservationHandle::unreserved(&self.function_name, None);
        };

        match self
            .platform
            .put_reserved_concurrency(&self.function_name, slots)
            .await
        {
            Ok(granted) => {
                ReservationAcquired {
                    function_name: &self.function_name,
                    requested: slots,
                    granted,
                }
                .log();
                // Give the platform time to apply the new limit before the burst.
                tokio::time::sleep(self.config.propagation_delay()).await;
                ReservationHandle {
                    function_name: self.function_name.clone(),
                    requested: Some(slots),
                    granted: Some(granted),
                }
            }
            Err(source) => {
                let error = ConcurrencyReservationError {
                    function_name: self.function_name.clone(),
                    requested: slots,
                    source,
                };
                ReservationRejected { error: &error }.log();
                ReservationHandle::unreserved(&self.function_name, Some(slots))
            }
        }
    }

    /// Removes the reservation behind `handle`. A reservation that is already
    /// gone counts as released.
    pub async fn release(&self, handle: &ReservationHandle) -> Result<(), PlatformError> {
        if !handle.is_reserved() {
            return Ok(());
        }

        match self
            .platform
            .delete_reserved_concurrency(&handle.function_name)
            .await
        {
            Ok(()) => {
                ReservationReleased {
                    function_name: &handle.function_name,
                }
                .log();
                Ok(())
            }
            Err(PlatformError::NotFound(_)) => {
                ReservationAlreadyReleased {
                    function_name: &handle.function_name,
                }
                .log();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Runs `work` under a reservation sized for `pending` invocations and
    /// releases it once `work` completes, whatever it returned.
    pub async fn with_reservation<F, T>(&self, pending: usize, work: F) -> (ReservationHandle, T)
    where
        F: Future<Output = T>,
    {
        let handle = self.reserve(pending).await;
        let output = work.await;
        if let Err(err) = self.release(&handle).await {
            ReservationReleaseFailed {
                function_name: &handle.function_name,
                error: &err,
            }
            .log();
        }
        (handle, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubConcurrency;

    fn config() -> GovernorConfig {
        GovernorConfig {
            threshold: 100,
            headroom: 10,
            propagation_delay_ms: 0,
        }
    }

    #[test]
    fn test_slots_for() {
        let governor = ConcurrencyGovernor::new(Arc::new(StubConcurrency::default()), "w", config());
        assert_eq!(governor.slots_for(99), None);
        assert_eq!(governor.slots_for(100), Some(110));
        assert_eq!(governor.slots_for(500), Some(510));
    }

    #[tokio::test]
    async fn test_no_reservation_below_threshold() {
        let platform = Arc::new(StubConcurrency::default());
        let governor = ConcurrencyGovernor::new(platform.clone(), "robots-worker", config());

        let handle = governor.reserve(50).await;
        assert!(!handle.is_reserved());
        assert_eq!(handle.requested(), None);
        assert!(platform.puts().is_empty());

        governor.release(&handle).await.unwrap();
        assert_eq!(platform.deletes(), 0);
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let platform = Arc::new(StubConcurrency::default());
        let governor = ConcurrencyGovernor::new(platform.clone(), "robots-worker", config());

        let handle = governor.reserve(250).await;
        assert_eq!(handle.granted(), Some(260));
        assert_eq!(platform.puts(), vec![("robots-worker".to_string(), 260)]);
        assert_eq!(platform.current("robots-worker"), Some(260));

        governor.release(&handle).await.unwrap();
        assert_eq!(platform.current("robots-worker"), None);

        // Second release finds nothing and is still fine.
        governor.release(&handle).await.unwrap();
        assert_eq!(platform.deletes(), 2);
    }

    #[tokio::test]
    async fn test_rejected_reservation_is_not_fatal() {
        let platform = Arc::new(StubConcurrency::rejecting());
        let governor = ConcurrencyGovernor::new(platform.clone(), "robots-worker", config());

        let (handle, output) = governor.with_reservation(500, async { 7 }).await;
        assert_eq!(output, 7);
        assert!(!handle.is_reserved());
        assert_eq!(handle.requested(), Some(510));
        assert_eq!(platform.deletes(), 0);
    }

    #[tokio::test]
    async fn test_released_when_work_fails() {
        let platform = Arc::new(StubConcurrency::default());
        let governor = ConcurrencyGovernor::new(platform.clone(), "robots-worker", config());

        let (handle, output) = governor
            .with_reservation(100, async { Err::<(), &str>("tracking timed out") })
            .await;

        assert!(output.is_err());
        assert!(handle.is_reserved());
        assert_eq!(platform.current("robots-worker"), None);
        assert_eq!(platform.deletes(), 1);
    }
}
