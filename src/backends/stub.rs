// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recording and scripted collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;

use crate::engine::tracker::{CompletionSignal, SignalObservation};
use crate::errors::PlatformError;
use crate::payload::{InvocationResponse, InvocationType, QueueEntry, WorkUnit};
use crate::traits::logs::log_group_name;
use crate::traits::{
    BatchEntryFailure, ConcurrencyPlatform, ExecutionLogSource, FunctionInvoker, LogEvent,
    LogEventsPage, LogType, QueueAttributes, RawInvocationResponse, SendBatchOutput, WorkQueue,
};

/// Grants whatever is requested unless built with [`StubConcurrency::rejecting`].
#[derive(Default)]
pub struct StubConcurrency {
    reject: bool,
    puts: Mutex<Vec<(String, u32)>>,
    deletes: AtomicUsize,
    current: Mutex<HashMap<String, u32>>,
}

impl StubConcurrency {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn puts(&self) -> Vec<(String, u32)> {
        self.puts.lock().unwrap().clone()
    }

    /// Every delete call, including ones that found nothing.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn current(&self, function_name: &str) -> Option<u32> {
        self.current.lock().unwrap().get(function_name).copied()
    }
}

#[async_trait]
impl ConcurrencyPlatform for StubConcurrency {
    async fn put_reserved_concurrency(
        &self,
        function_name: &str,
        reserved: u32,
    ) -> Result<u32, PlatformError> {
        if self.reject {
            return Err(PlatformError::rejected(
                "InvalidParameterValue",
                "unreserved account concurrency too low",
            ));
        }
        self.puts
            .lock()
            .unwrap()
            .push((function_name.to_string(), reserved));
        self.current
            .lock()
            .unwrap()
            .insert(function_name.to_string(), reserved);
        Ok(reserved)
    }

    async fn delete_reserved_concurrency(&self, function_name: &str) -> Result<(), PlatformError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match self.current.lock().unwrap().remove(function_name) {
            Some(_) => Ok(()),
            None => Err(PlatformError::NotFound(function_name.to_string())),
        }
    }
}

/// Accepts every batch and remembers it. Depth is fixed at construction.
pub struct RecordingQueue {
    name: String,
    rejected_ids: HashSet<String>,
    failing_calls: HashSet<usize>,
    depth: QueueAttributes,
    unreadable: bool,
    batches: Mutex<Vec<Vec<QueueEntry>>>,
}

impl RecordingQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rejected_ids: HashSet::new(),
            failing_calls: HashSet::new(),
            depth: QueueAttributes::default(),
            unreadable: false,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Entries with these ids come back as per-entry failures.
    pub fn rejecting_ids(mut self, ids: &[&str]) -> Self {
        self.rejected_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Calls at these indices fail as a whole.
    pub fn failing_calls(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.iter().copied().collect();
        self
    }

    pub fn with_depth(mut self, visible: u64, in_flight: u64) -> Self {
        self.depth = QueueAttributes {
            approximate_number_of_messages: visible,
            approximate_number_of_messages_not_visible: in_flight,
        };
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    /// Every batch sent, failed calls included.
    pub fn batches(&self) -> Vec<Vec<QueueEntry>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<SendBatchOutput, PlatformError> {
        let call = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(entries.clone());
            batches.len() - 1
        };
        if self.failing_calls.contains(&call) {
            return Err(PlatformError::Throttled(format!("call {} throttled", call)));
        }

        let mut output = SendBatchOutput::default();
        for entry in entries {
            if self.rejected_ids.contains(&entry.id) {
                output.failed.push(BatchEntryFailure {
                    id: entry.id,
                    code: "InternalError".to_string(),
                    message: "rejected by stub".to_string(),
                });
            } else {
                output.successful.push(entry.id);
            }
        }
        Ok(output)
    }

    async fn attributes(&self) -> Result<QueueAttributes, PlatformError> {
        if self.unreadable {
            return Err(PlatformError::Unavailable(format!("{} unreadable", self.name)));
        }
        Ok(self.depth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub function_name: String,
    pub invocation_type: InvocationType,
    pub log_type: LogType,
    pub payload: Vec<u8>,
}

/// Answers like a healthy worker: events are accepted, synchronous calls
/// return `{start}-{end}.txt` for the unit in the payload.
#[derive(Default)]
pub struct StubInvoker {
    failing_calls: HashSet<usize>,
    latency: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubInvoker {
    /// Calls at these indices are throttled.
    pub fn failing_calls(calls: &[usize]) -> Self {
        Self {
            failing_calls: calls.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(
        invocation_type: InvocationType,
        log_type: LogType,
        payload: &[u8],
    ) -> Result<RawInvocationResponse, PlatformError> {
        if invocation_type == InvocationType::Event {
            return Ok(RawInvocationResponse::accepted());
        }
        let unit = WorkUnit::from_body(payload)?;
        let body = InvocationResponse {
            status: 200,
            result_file: Some(unit.artifact_key("", ".txt")),
        };
        let log_result = (log_type == LogType::Tail).then(|| {
            base64::engine::general_purpose::STANDARD
                .encode("START RequestId: 1\nEND RequestId: 1\n")
        });
        Ok(RawInvocationResponse {
            status_code: 200,
            payload: serde_json::to_vec(&body)?,
            function_error: None,
            log_result,
        })
    }
}

#[async_trait]
impl FunctionInvoker for StubInvoker {
    async fn invoke(
        &self,
        function_name: &str,
        invocation_type: InvocationType,
        log_type: LogType,
        payload: Vec<u8>,
    ) -> Result<RawInvocationResponse, PlatformError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                function_name: function_name.to_string(),
                invocation_type,
                log_type,
                payload: payload.clone(),
            });
            calls.len() - 1
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_calls.contains(&call) {
            return Err(PlatformError::Throttled(format!("call {} throttled", call)));
        }
        Self::respond(invocation_type, log_type, &payload)
    }
}

/// Plays back a fixed list of observations, one per `observe`.
pub struct ScriptedSignal {
    script: Vec<Result<SignalObservation, PlatformError>>,
    repeat: bool,
    observations: AtomicUsize,
}

impl ScriptedSignal {
    pub fn new(script: Vec<Result<SignalObservation, PlatformError>>) -> Self {
        Self {
            script,
            repeat: false,
            observations: AtomicUsize::new(0),
        }
    }

    /// Returns the same result forever.
    pub fn repeating(result: Result<SignalObservation, PlatformError>) -> Self {
        Self {
            script: vec![result],
            repeat: true,
            observations: AtomicUsize::new(0),
        }
    }

    pub fn observations(&self) -> usize {
        self.observations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionSignal for ScriptedSignal {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn observe(&self) -> Result<SignalObservation, PlatformError> {
        let index = self.observations.fetch_add(1, Ordering::SeqCst);
        let index = if self.repeat { 0 } else { index };
        self.script
            .get(index)
            .cloned()
            .unwrap_or_else(|| Err(PlatformError::Unavailable("script exhausted".to_string())))
    }
}

/// Log groups held in memory, paged by offset.
pub struct StubLogSource {
    page_size: usize,
    groups: Mutex<HashMap<String, Vec<LogEvent>>>,
    queries: AtomicUsize,
}

impl StubLogSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            groups: Mutex::new(HashMap::new()),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn record(&self, function_name: &str, timestamp_ms: u64, message: &str) {
        self.groups
            .lock()
            .unwrap()
            .entry(log_group_name(function_name))
            .or_default()
            .push(LogEvent {
                timestamp_ms,
                message: message.to_string(),
            });
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionLogSource for StubLogSource {
    async fn filter_log_events(
        &self,
        log_group: &str,
        filter_pattern: &str,
        start_time_ms: u64,
        next_token: Option<String>,
    ) -> Result<LogEventsPage, PlatformError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let offset: usize = next_token.map(|t| t.parse().unwrap()).unwrap_or(0);

        let groups = self.groups.lock().unwrap();
        let matching: Vec<LogEvent> = groups
            .get(log_group)
            .into_iter()
            .flatten()
            .filter(|e| e.timestamp_ms >= start_time_ms && e.message.contains(filter_pattern))
            .cloned()
            .collect();

        let events: Vec<LogEvent> = matching.iter().skip(offset).take(self.page_size).cloned().collect();
        let consumed = offset + events.len();
        Ok(LogEventsPage {
            events,
            next_token: (consumed < matching.len()).then(|| consumed.to_string()),
        })
    }
}
