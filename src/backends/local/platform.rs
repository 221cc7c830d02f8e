// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process worker platform.
//!
//! Hosts registered [`WorkerFunction`]s behind the [`FunctionInvoker`]
//! contract, keeps reserved-concurrency settings and writes a
//! `START RequestId` / `END RequestId` pair to each function's log group
//! for every execution. The fan-out relay is built in: invoking it with an
//! [`InvocationGroup`] body invokes the group's function once per payload.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::Mutex;

use crate::config::consts::{DEFAULT_ACCOUNT_CONCURRENCY_LIMIT, DEFAULT_LOG_PAGE_SIZE};
use crate::errors::PlatformError;
use crate::observability::messages::worker::FunctionErrored;
use crate::observability::messages::StructuredLog;
use crate::payload::{InvocationGroup, InvocationType};
use crate::traits::logs::{log_group_name, LogEvent, LogEventsPage};
use crate::traits::{
    ConcurrencyPlatform, ExecutionLogSource, FunctionInvoker, LogType, RawInvocationResponse,
    WorkerFunction,
};
use crate::utils::clock::epoch_millis;

struct Inner {
    functions: HashMap<String, Arc<dyn WorkerFunction>>,
    relay: Option<String>,
    account_limit: u32,
    log_page_size: usize,
    reservations: Mutex<HashMap<String, u32>>,
    logs: Mutex<HashMap<String, Vec<LogEvent>>>,
    next_request: AtomicU64,
}

#[derive(Clone)]
pub struct LocalPlatform {
    inner: Arc<Inner>,
}

pub struct LocalPlatformBuilder {
    functions: HashMap<String, Arc<dyn WorkerFunction>>,
    relay: Option<String>,
    account_limit: u32,
    log_page_size: usize,
}

impl LocalPlatformBuilder {
    /// Registers a function under its own name.
    pub fn function(mut self, function: Arc<dyn WorkerFunction>) -> Self {
        self.functions.insert(function.name().to_string(), function);
        self
    }

    /// Name the fan-out relay answers to.
    pub fn relay(mut self, name: impl Into<String>) -> Self {
        self.relay = Some(name.into());
        self
    }

    pub fn account_limit(mut self, limit: u32) -> Self {
        self.account_limit = limit;
        self
    }

    pub fn log_page_size(mut self, size: usize) -> Self {
        self.log_page_size = size.max(1);
        self
    }

    pub fn build(self) -> LocalPlatform {
        LocalPlatform {
            inner: Arc::new(Inner {
                functions: self.functions,
                relay: self.relay,
                account_limit: self.account_limit,
                log_page_size: self.log_page_size,
                reservations: Mutex::new(HashMap::new()),
                logs: Mutex::new(HashMap::new()),
                next_request: AtomicU64::new(1),
            }),
        }
    }
}

impl LocalPlatform {
    pub fn builder() -> LocalPlatformBuilder {
        LocalPlatformBuilder {
            functions: HashMap::new(),
            relay: None,
            account_limit: DEFAULT_ACCOUNT_CONCURRENCY_LIMIT,
            log_page_size: DEFAULT_LOG_PAGE_SIZE,
        }
    }

    /// Current reservation of a function, if any.
    pub async fn reserved_concurrency(&self, function_name: &str) -> Option<u32> {
        self.inner.reservations.lock().await.get(function_name).copied()
    }

    fn is_relay(&self, function_name: &str) -> bool {
        self.inner.relay.as_deref() == Some(function_name)
    }

    fn knows(&self, function_name: &str) -> bool {
        self.is_relay(function_name) || self.inner.functions.contains_key(function_name)
    }

    async fn write_log(&self, function_name: &str, message: String) {
        self.inner
            .logs
            .lock()
            .await
            .entry(log_group_name(function_name))
            .or_default()
            .push(LogEvent {
                timestamp_ms: epoch_millis(),
                message,
            });
    }

    async fn execute(
        &self,
        function_name: &str,
        log_type: LogType,
        payload: Vec<u8>,
    ) -> Result<RawInvocationResponse, PlatformError> {
        if self.is_relay(function_name) {
            return self.relay_group(&payload).await;
        }
        let function = self
            .inner
            .functions
            .get(function_name)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("function '{}'", function_name)))?;

        let request_id = self.inner.next_request.fetch_add(1, Ordering::Relaxed);
        let start_line = format!("START RequestId: {}", request_id);
        self.write_log(function_name, start_line.clone()).await;
        let result = function.handle(&payload).await;
        let end_line = format!("END RequestId: {}", request_id);
        self.write_log(function_name, end_line.clone()).await;

        let mut response = match result {
            Ok(body) => RawInvocationResponse {
                status_code: 200,
                payload: serde_json::to_vec(&body)?,
                function_error: None,
                log_result: None,
            },
            Err(error) => {
                FunctionErrored {
                    function_name,
                    request_id,
                    error: &error,
                }
                .log();
                RawInvocationResponse {
                    status_code: 200,
                    payload: serde_json::to_vec(&serde_json::json!({
                        "errorMessage": error.to_string(),
                    }))?,
                    function_error: Some("Unhandled".to_string()),
                    log_result: None,
                }
            }
        };
        if log_type == LogType::Tail {
            let tail = format!("{}\n{}\n", start_line, end_line);
            response.log_result = Some(base64::engine::general_purpose::STANDARD.encode(tail));
        }
        Ok(response)
    }

    async fn relay_group(&self, payload: &[u8]) -> Result<RawInvocationResponse, PlatformError> {
        let group: InvocationGroup = serde_json::from_slice(payload)?;
        for unit in group.payloads {
            self.invoke(
                &group.function_name,
                group.invocation_type,
                LogType::None,
                unit.to_body().into_bytes(),
            )
            .await?;
        }
        Ok(RawInvocationResponse {
            status_code: 200,
            payload: Vec::new(),
            function_error: None,
            log_result: None,
        })
    }
}

#[async_trait]
impl FunctionInvoker for LocalPlatform {
    async fn invoke(
        &self,
        function_name: &str,
        invocation_type: InvocationType,
        log_type: LogType,
        payload: Vec<u8>,
    ) -> Result<RawInvocationResponse, PlatformError> {
        if !self.knows(function_name) {
            return Err(PlatformError::NotFound(format!("function '{}'", function_name)));
        }
        match invocation_type {
            InvocationType::RequestResponse => self.execute(function_name, log_type, payload).await,
            InvocationType::Event => {
                let platform = self.clone();
                let function_name = function_name.to_string();
                tokio::spawn(async move {
                    if let Err(error) = platform
                        .execute(&function_name, LogType::None, payload)
                        .await
                    {
                        FunctionErrored {
                            function_name: &function_name,
                            request_id: 0,
                            error: &error,
                        }
                        .log();
                    }
                });
                Ok(RawInvocationResponse::accepted())
            }
        }
    }
}

#[async_trait]
impl ConcurrencyPlatform for LocalPlatform {
    async fn put_reserved_concurrency(
        &self,
        function_name: &str,
        reserved: u32,
    ) -> Result<u32, PlatformError> {
        if !self.inner.functions.contains_key(function_name) {
            return Err(PlatformError::NotFound(format!("function '{}'", function_name)));
        }
        if reserved > self.inner.account_limit {
            return Err(PlatformError::rejected(
                "InvalidParameterValue",
                format!(
                    "reserved concurrency {} exceeds the account limit of {}",
                    reserved, self.inner.account_limit
                ),
            ));
        }
        self.inner
            .reservations
            .lock()
            .await
            .insert(function_name.to_string(), reserved);
        Ok(reserved)
    }

    async fn delete_reserved_concurrency(&self, function_name: &str) -> Result<(), PlatformError> {
        match self.inner.reservations.lock().await.remove(function_name) {
            Some(_) => Ok(()),
            None => Err(PlatformError::NotFound(format!(
                "no reserved concurrency for '{}'",
                function_name
            ))),
        }
    }
}

#[async_trait]
impl ExecutionLogSource for LocalPlatform {
    async fn filter_log_events(
        &self,
        log_group: &str,
        filter_pattern: &str,
        start_time_ms: u64,
        next_token: Option<String>,
    ) -> Result<LogEventsPage, PlatformError> {
        let offset = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                PlatformError::rejected("InvalidParameterException", "bad next token")
            })?,
            None => 0,
        };

        // A group that has not been written to yet reads as empty.
        let logs = self.inner.logs.lock().await;
        let matching: Vec<&LogEvent> = logs
            .get(log_group)
            .into_iter()
            .flatten()
            .filter(|event| event.timestamp_ms >= start_time_ms)
            .filter(|event| event.message.contains(filter_pattern))
            .collect();

        let end = (offset + self.inner.log_page_size).min(matching.len());
        let page = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|event| (*event).clone())
            .collect();
        Ok(LogEventsPage {
            events: page,
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}
