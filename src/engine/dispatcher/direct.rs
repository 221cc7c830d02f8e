// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{validate_units, DispatchReport, DispatchTarget, Dispatcher};
use crate::config::consts::MAX_INVOCATION_GROUP;
use crate::config::Strategy;
use crate::errors::{DispatchError, InvalidPartition, PlatformError};
use crate::observability::messages::dispatch::{
    DispatchCompleted, DispatchStarted, GroupInvoked, InvocationFailed,
};
use crate::observability::messages::StructuredLog;
use crate::payload::{InvocationGroup, InvocationType, PayloadBatch, WorkUnit};
use crate::traits::{FunctionInvoker, LogType};

/// Groups units into invocation groups of at most `group_size` and fires
/// each group as one asynchronous invocation of the fan-out relay, waiting
/// `delay` between submissions. The relay invokes the target once per unit.
pub struct DirectInvokeDispatcher {
    invoker: Arc<dyn FunctionInvoker>,
    relay_function: String,
    target: DispatchTarget,
    group_size: usize,
    delay: Duration,
}

impl DirectInvokeDispatcher {
    pub fn new(
        invoker: Arc<dyn FunctionInvoker>,
        relay_function: impl Into<String>,
        target: DispatchTarget,
        group_size: usize,
        delay: Duration,
    ) -> Self {
        Self {
            invoker,
            relay_function: relay_function.into(),
            target,
            group_size: group_size.clamp(1, MAX_INVOCATION_GROUP),
            delay,
        }
    }

    async fn invoke_group(&self, batch: &PayloadBatch) -> Result<(), DispatchError> {
        let group = InvocationGroup {
            function_name: self.target.function_name.clone(),
            invocation_type: InvocationType::Event,
            payloads: batch.units().to_vec(),
        };
        let body = serde_json::to_vec(&group).map_err(|err| {
            DispatchError::from_platform(batch.range(), batch.len(), &PlatformError::from(err))
        })?;

        let response = self
            .invoker
            .invoke(&self.relay_function, InvocationType::Event, LogType::None, body)
            .await
            .map_err(|err| DispatchError::from_platform(batch.range(), batch.len(), &err))?;

        if !response.is_success() {
            return Err(DispatchError::from_platform(
                batch.range(),
                batch.len(),
                &PlatformError::rejected(
                    response.status_code.to_string(),
                    response
                        .function_error
                        .unwrap_or_else(|| "relay refused the group".to_string()),
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for DirectInvokeDispatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Direct
    }

    async fn dispatch(&self, units: &[WorkUnit]) -> Result<DispatchReport, InvalidPartition> {
        validate_units(units)?;
        let started = Instant::now();
        let groups = PayloadBatch::partition(units, self.group_size);
        let mut report = DispatchReport {
            attempted: units.len(),
            ..DispatchReport::default()
        };

        DispatchStarted {
            strategy: Strategy::Direct.as_str(),
            units: units.len(),
            calls: groups.len(),
        }
        .log();

        for group in &groups {
            if group.index() > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            report.calls += 1;
            match self.invoke_group(group).await {
                Ok(()) => {
                    report.dispatched += group.len();
                    GroupInvoked {
                        relay: &self.relay_function,
                        group_index: group.index(),
                        range: group.range(),
                        units: group.len(),
                    }
                    .log();
                }
                Err(error) => {
                    InvocationFailed {
                        function_name: &self.relay_function,
                        error: &error,
                    }
                    .log();
                    report.record_failure(error);
                }
            }
        }

        DispatchCompleted {
            strategy: Strategy::Direct.as_str(),
            dispatched: report.dispatched,
            failed: report.failed,
            calls: report.calls,
            duration: started.elapsed(),
        }
        .log();

        Ok(report)
    }
}
