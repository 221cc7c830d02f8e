// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process work queue with receive counts and a dead-letter redrive.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::consts::{MAX_MESSAGE_BYTES, MAX_QUEUE_BATCH};
use crate::errors::PlatformError;
use crate::observability::messages::worker::MessageDeadLettered;
use crate::observability::messages::StructuredLog;
use crate::payload::QueueEntry;
use crate::traits::{BatchEntryFailure, QueueAttributes, SendBatchOutput, WorkQueue};

#[derive(Debug, Clone)]
struct StoredMessage {
    body: String,
    receive_count: u32,
}

#[derive(Default)]
struct QueueState {
    visible: VecDeque<StoredMessage>,
    in_flight: HashMap<u64, StoredMessage>,
}

/// A message handed to a consumer. It stays in flight until acknowledged
/// or released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub receipt: u64,
    pub body: String,
    pub receive_count: u32,
}

struct Redrive {
    queue: Arc<LocalQueue>,
    max_receive_count: u32,
}

pub struct LocalQueue {
    name: String,
    state: Mutex<QueueState>,
    next_receipt: AtomicU64,
    redrive: Option<Redrive>,
}

impl LocalQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            next_receipt: AtomicU64::new(1),
            redrive: None,
        }
    }

    /// Messages released `max_receive_count` times move to `dead_letter`.
    pub fn with_dead_letter(mut self, dead_letter: Arc<LocalQueue>, max_receive_count: u32) -> Self {
        self.redrive = Some(Redrive {
            queue: dead_letter,
            max_receive_count: max_receive_count.max(1),
        });
        self
    }

    pub async fn receive(&self, max: usize) -> Vec<ReceivedMessage> {
        let mut state = self.state.lock().await;
        let mut received = Vec::new();
        while received.len() < max {
            let Some(mut message) = state.visible.pop_front() else {
                break;
            };
            message.receive_count += 1;
            let receipt = self.next_receipt.fetch_add(1, Ordering::Relaxed);
            received.push(ReceivedMessage {
                receipt,
                body: message.body.clone(),
                receive_count: message.receive_count,
            });
            state.in_flight.insert(receipt, message);
        }
        received
    }

    /// Deletes a received message. Returns false for an unknown receipt.
    pub async fn acknowledge(&self, receipt: u64) -> bool {
        self.state.lock().await.in_flight.remove(&receipt).is_some()
    }

    /// Gives up on a received message: it becomes visible again, or moves
    /// to the dead-letter queue once its receives are exhausted.
    pub async fn release(&self, receipt: u64) -> bool {
        let mut state = self.state.lock().await;
        let Some(message) = state.in_flight.remove(&receipt) else {
            return false;
        };

        match &self.redrive {
            Some(redrive) if message.receive_count >= redrive.max_receive_count => {
                // Moved while still locked so depth never reads zero
                // before the dead-letter queue has the message.
                MessageDeadLettered {
                    queue: &self.name,
                    dead_letter_queue: redrive.queue.name(),
                    receive_count: message.receive_count,
                }
                .log();
                redrive.queue.push(message.body).await;
            }
            _ => state.visible.push_back(message),
        }
        true
    }

    async fn push(&self, body: String) {
        self.state.lock().await.visible.push_back(StoredMessage {
            body,
            receive_count: 0,
        });
    }

    fn check_entry(entry: &QueueEntry) -> Result<(), BatchEntryFailure> {
        let failure = |code: &str, message: String| BatchEntryFailure {
            id: entry.id.clone(),
            code: code.to_string(),
            message,
        };
        if entry.body.is_empty() {
            return Err(failure("EmptyMessage", "message body is empty".to_string()));
        }
        if entry.body.len() > MAX_MESSAGE_BYTES {
            return Err(failure(
                "MessageTooLong",
                format!(
                    "message is {} bytes, limit is {}",
                    entry.body.len(),
                    MAX_MESSAGE_BYTES
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for LocalQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<SendBatchOutput, PlatformError> {
        if entries.is_empty() {
            return Err(PlatformError::rejected(
                "EmptyBatchRequest",
                "batch contains no entries",
            ));
        }
        if entries.len() > MAX_QUEUE_BATCH {
            return Err(PlatformError::rejected(
                "TooManyEntriesInBatchRequest",
                format!("{} entries, limit is {}", entries.len(), MAX_QUEUE_BATCH),
            ));
        }
        let mut ids = HashSet::new();
        if let Some(duplicate) = entries.iter().find(|entry| !ids.insert(entry.id.as_str())) {
            return Err(PlatformError::rejected(
                "BatchEntryIdsNotDistinct",
                format!("id '{}' appears more than once", duplicate.id),
            ));
        }

        let mut output = SendBatchOutput::default();
        let mut state = self.state.lock().await;
        for entry in entries {
            match Self::check_entry(&entry) {
                Ok(()) => {
                    state.visible.push_back(StoredMessage {
                        body: entry.body,
                        receive_count: 0,
                    });
                    output.successful.push(entry.id);
                }
                Err(failure) => output.failed.push(failure),
            }
        }
        Ok(output)
    }

    async fn attributes(&self) -> Result<QueueAttributes, PlatformError> {
        let state = self.state.lock().await;
        Ok(QueueAttributes {
            approximate_number_of_messages: state.visible.len() as u64,
            approximate_number_of_messages_not_visible: state.in_flight.len() as u64,
        })
    }
}
