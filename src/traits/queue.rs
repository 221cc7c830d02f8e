use async_trait::async_trait;

use crate::errors::PlatformError;
use crate::payload::QueueEntry;

/// Depth counters of a queue as the platform reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueAttributes {
    /// Messages waiting to be received.
    pub approximate_number_of_messages: u64,
    /// Messages received by a consumer but not yet deleted.
    pub approximate_number_of_messages_not_visible: u64,
}

impl QueueAttributes {
    pub fn total(&self) -> u64 {
        self.approximate_number_of_messages + self.approximate_number_of_messages_not_visible
    }

    pub fn is_drained(&self) -> bool {
        self.approximate_number_of_messages == 0
            && self.approximate_number_of_messages_not_visible == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntryFailure {
    pub id: String,
    pub code: String,
    pub message: String,
}

/// Per-entry outcome of a batch send. Ids refer to `QueueEntry::id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendBatchOutput {
    pub successful: Vec<String>,
    pub failed: Vec<BatchEntryFailure>,
}

/// A durable work queue. `Err` means the whole call failed; individual
/// entries can still fail inside an `Ok`.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    fn name(&self) -> &str;

    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<SendBatchOutput, PlatformError>;

    async fn attributes(&self) -> Result<QueueAttributes, PlatformError>;
}
