// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::{mpsc, Semaphore};

use super::{validate_units, DispatchReport, DispatchTarget, Dispatcher};
use crate::config::Strategy;
use crate::errors::{DispatchError, InvalidPartition, PlatformError};
use crate::observability::messages::dispatch::{
    DispatchCompleted, DispatchStarted, InvocationFailed,
};
use crate::observability::messages::StructuredLog;
use crate::payload::{InvocationOutcome, InvocationResponse, InvocationType, WorkUnit};
use crate::traits::{FunctionInvoker, LogType, RawInvocationResponse};

/// Invokes the target once per unit in request/response mode with at most
/// `max_workers` invocations in flight. Responses are collected in the
/// order the invocations finish, not the order they were started.
pub struct SyncInvokeDispatcher {
    invoker: Arc<dyn FunctionInvoker>,
    target: DispatchTarget,
    max_workers: usize,
    log_type: LogType,
}

impl SyncInvokeDispatcher {
    pub fn new(
        invoker: Arc<dyn FunctionInvoker>,
        target: DispatchTarget,
        max_workers: usize,
        log_type: LogType,
    ) -> Self {
        Self {
            invoker,
            target,
            max_workers: max_workers.max(1),
            log_type,
        }
    }

    async fn invoke_one(
        invoker: Arc<dyn FunctionInvoker>,
        function_name: String,
        log_type: LogType,
        unit: WorkUnit,
    ) -> Result<InvocationOutcome, DispatchError> {
        let fail = |err: &PlatformError| DispatchError::from_platform(unit.range(), 1, err);

        let raw = invoker
            .invoke(
                &function_name,
                InvocationType::RequestResponse,
                log_type,
                unit.to_body().into_bytes(),
            )
            .await
            .map_err(|err| fail(&err))?;

        decode_response(unit, raw).map_err(|err| fail(&err))
    }
}

fn decode_response(
    unit: WorkUnit,
    raw: RawInvocationResponse,
) -> Result<InvocationOutcome, PlatformError> {
    if !raw.is_success() {
        let detail = raw
            .function_error
            .clone()
            .unwrap_or_else(|| String::from_utf8_lossy(&raw.payload).into_owned());
        return Err(PlatformError::rejected(raw.status_code.to_string(), detail));
    }

    let response: InvocationResponse = serde_json::from_slice(&raw.payload)?;
    let log_tail = match raw.log_result {
        Some(encoded) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|err| PlatformError::MalformedPayload(format!("log tail: {}", err)))?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => None,
    };

    Ok(InvocationOutcome {
        unit,
        response,
        log_tail,
    })
}

#[async_trait]
impl Dispatcher for SyncInvokeDispatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Sync
    }

    async fn dispatch(&self, units: &[WorkUnit]) -> Result<DispatchReport, InvalidPartition> {
        validate_units(units)?;
        let started = Instant::now();
        let mut report = DispatchReport {
            attempted: units.len(),
            calls: units.len(),
            ..DispatchReport::default()
        };

        DispatchStarted {
            strategy: Strategy::Sync.as_str(),
            units: units.len(),
            calls: units.len(),
        }
        .log();

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::with_capacity(units.len());

        for unit in units.iter().copied() {
            let invoker = self.invoker.clone();
            let function_name = self.target.function_name.clone();
            let log_type = self.log_type;
            let semaphore = semaphore.clone();
            let tx = tx.clone();

            let task = tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => Self::invoke_one(invoker, function_name, log_type, unit).await,
                    Err(err) => Err(DispatchError::from_platform(
                        unit.range(),
                        1,
                        &PlatformError::Unavailable(err.to_string()),
                    )),
                };
                // The receiver outlives every sender.
                let _ = tx.send(result);
            });
            tasks.push((unit, task));
        }
        drop(tx);

        while let Some(result) = rx.recv().await {
            match result {
                Ok(outcome) => {
                    report.dispatched += 1;
                    report.responses.push(outcome);
                }
                Err(error) => {
                    InvocationFailed {
                        function_name: &self.target.function_name,
                        error: &error,
                    }
                    .log();
                    report.record_failure(error);
                }
            }
        }

        // A task that panicked never reported; count its unit as failed.
        for (unit, task) in tasks {
            if let Err(join_error) = task.await {
                let error = DispatchError::from_platform(
                    unit.range(),
                    1,
                    &PlatformError::Unavailable(join_error.to_string()),
                );
                report.record_failure(error);
            }
        }

        DispatchCompleted {
            strategy: Strategy::Sync.as_str(),
            dispatched: report.dispatched,
            failed: report.failed,
            calls: report.calls,
            duration: started.elapsed(),
        }
        .log();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubInvoker;
    use crate::engine::splitter::split_by_size;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_every_response() {
        let invoker = Arc::new(StubInvoker::default());
        let dispatcher = SyncInvokeDispatcher::new(
            invoker.clone(),
            DispatchTarget::new("robots-worker", "local"),
            4,
            LogType::None,
        );
        let units = split_by_size(20, 2, 1).unwrap();

        let report = dispatcher.dispatch(&units).await.unwrap();

        assert_eq!(report.dispatched, 10);
        assert_eq!(report.responses.len(), 10);
        let files: HashSet<String> = report
            .responses
            .iter()
            .filter_map(|o| o.response.result_file.clone())
            .collect();
        assert!(files.contains("0-2.txt"));
        assert!(files.contains("18-20.txt"));
        assert!(report.responses.iter().all(|o| o.log_tail.is_none()));
        assert!(invoker
            .calls()
            .iter()
            .all(|c| c.invocation_type == InvocationType::RequestResponse));
    }

    #[tokio::test]
    async fn test_in_flight_bounded_by_max_workers() {
        let invoker = Arc::new(StubInvoker::default().with_latency(Duration::from_millis(20)));
        let dispatcher = SyncInvokeDispatcher::new(
            invoker.clone(),
            DispatchTarget::new("robots-worker", "local"),
            3,
            LogType::None,
        );
        let units = split_by_size(12, 1, 1).unwrap();

        let report = dispatcher.dispatch(&units).await.unwrap();

        assert_eq!(report.dispatched, 12);
        assert!(invoker.max_in_flight() <= 3);
        assert!(invoker.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_log_tail_is_decoded() {
        let invoker = Arc::new(StubInvoker::default());
        let dispatcher = SyncInvokeDispatcher::new(
            invoker,
            DispatchTarget::new("robots-worker", "local"),
            1,
            LogType::Tail,
        );

        let report = dispatcher
            .dispatch(&[WorkUnit::new(0, 2, 1)])
            .await
            .unwrap();

        let tail = report.responses[0].log_tail.as_deref().unwrap();
        assert!(tail.contains("START RequestId"));
        assert!(tail.contains("END RequestId"));
    }

    #[tokio::test]
    async fn test_failures_carry_the_unit_range() {
        let invoker = Arc::new(StubInvoker::failing_calls(&[0]));
        let dispatcher = SyncInvokeDispatcher::new(
            invoker,
            DispatchTarget::new("robots-worker", "local"),
            1,
            LogType::None,
        );
        let units = split_by_size(6, 2, 1).unwrap();

        let report = dispatcher.dispatch(&units).await.unwrap();

        assert_eq!(report.dispatched, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].units, 1);
        assert!(units.iter().any(|u| u.range() == report.errors[0].range));
    }

    #[test]
    fn test_function_error_is_a_failure() {
        let raw = RawInvocationResponse {
            status_code: 200,
            payload: br#"{"errorMessage": "boom"}"#.to_vec(),
            function_error: Some("Unhandled".into()),
            log_result: None,
        };
        let err = decode_response(WorkUnit::new(0, 1, 1), raw).unwrap_err();
        assert_eq!(err, PlatformError::rejected("200", "Unhandled"));
    }
}
