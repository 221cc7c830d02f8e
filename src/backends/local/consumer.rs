// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event-source mapping between a local queue and a function: received
//! messages become synchronous invocations, successes are deleted and
//! failures go back to the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::queue::{LocalQueue, ReceivedMessage};
use crate::errors::PlatformError;
use crate::observability::messages::worker::{ConsumerStarted, ConsumerStopped};
use crate::observability::messages::StructuredLog;
use crate::payload::InvocationType;
use crate::traits::{FunctionInvoker, LogType, RawInvocationResponse, WorkQueue};

pub struct QueueConsumer {
    queue: Arc<LocalQueue>,
    invoker: Arc<dyn FunctionInvoker>,
    function_name: String,
    batch_size: usize,
    poll_interval: Duration,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<LocalQueue>,
        invoker: Arc<dyn FunctionInvoker>,
        function_name: impl Into<String>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            invoker,
            function_name: function_name.into(),
            batch_size: batch_size.max(1),
            poll_interval,
        }
    }

    /// Polls until `shutdown` is cancelled. The handle yields the number of
    /// messages delivered.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) -> u64 {
        ConsumerStarted {
            queue: self.queue.name(),
            function_name: &self.function_name,
        }
        .log();

        let mut delivered = 0u64;
        loop {
            let messages = self.queue.receive(self.batch_size).await;
            if messages.is_empty() {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => continue,
                }
            }
            delivered += self.deliver(messages).await;
            if shutdown.is_cancelled() {
                break;
            }
        }

        ConsumerStopped {
            queue: self.queue.name(),
            delivered,
        }
        .log();
        delivered
    }

    async fn deliver(&self, messages: Vec<ReceivedMessage>) -> u64 {
        let mut invocations = JoinSet::new();
        for message in messages {
            let invoker = self.invoker.clone();
            let function_name = self.function_name.clone();
            let ReceivedMessage { receipt, body, .. } = message;
            invocations.spawn(async move {
                // A panicking function counts as a failed invocation.
                let result = tokio::spawn(async move {
                    invoker
                        .invoke(
                            &function_name,
                            InvocationType::RequestResponse,
                            LogType::None,
                            body.into_bytes(),
                        )
                        .await
                })
                .await
                .unwrap_or_else(|err| Err(PlatformError::Unavailable(err.to_string())));
                (receipt, result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = invocations.join_next().await {
            let Ok((receipt, result)) = joined else {
                continue;
            };
            if succeeded(&result) {
                self.queue.acknowledge(receipt).await;
                delivered += 1;
            } else {
                self.queue.release(receipt).await;
            }
        }
        delivered
    }
}

fn succeeded(result: &Result<RawInvocationResponse, PlatformError>) -> bool {
    matches!(result, Ok(response) if response.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubInvoker;
    use crate::payload::{QueueEntry, WorkUnit};

    #[tokio::test]
    async fn test_consumer_drains_queue() {
        let queue = Arc::new(LocalQueue::new("work"));
        let entries = (0..3)
            .map(|i| QueueEntry::for_unit(i, &WorkUnit::new(i as u64, i as u64 + 1, 1)))
            .collect();
        queue.send_batch(entries).await.unwrap();

        let invoker = Arc::new(StubInvoker::default());
        let token = CancellationToken::new();
        let handle = QueueConsumer::new(
            queue.clone(),
            invoker.clone(),
            "robots-worker",
            2,
            Duration::from_millis(5),
        )
        .spawn(token.clone());

        while !queue.attributes().await.unwrap().is_drained() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        token.cancel();

        assert_eq!(handle.await.unwrap(), 3);
        let calls = invoker.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls
            .iter()
            .all(|call| call.invocation_type == InvocationType::RequestResponse));
    }

    /// Panics on its first call and answers normally afterwards.
    #[derive(Default)]
    struct PanicsOnce {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl FunctionInvoker for PanicsOnce {
        async fn invoke(
            &self,
            _function_name: &str,
            _invocation_type: InvocationType,
            _log_type: LogType,
            _payload: Vec<u8>,
        ) -> Result<RawInvocationResponse, PlatformError> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                panic!("worker crashed");
            }
            Ok(RawInvocationResponse {
                status_code: 200,
                payload: b"{}".to_vec(),
                function_error: None,
                log_result: None,
            })
        }
    }

    #[tokio::test]
    async fn test_panicked_invocation_is_released() {
        let queue = Arc::new(LocalQueue::new("work"));
        queue
            .send_batch(vec![QueueEntry::for_unit(0, &WorkUnit::new(0, 1, 1))])
            .await
            .unwrap();

        let invoker = Arc::new(PanicsOnce::default());
        let token = CancellationToken::new();
        let handle = QueueConsumer::new(
            queue.clone(),
            invoker.clone(),
            "robots-worker",
            10,
            Duration::from_millis(5),
        )
        .spawn(token.clone());

        tokio::time::timeout(Duration::from_secs(5), async {
            while !queue.attributes().await.unwrap().is_drained() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        token.cancel();

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(invoker.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_invocation_is_redriven() {
        let dead = Arc::new(LocalQueue::new("dead"));
        let queue = Arc::new(LocalQueue::new("work").with_dead_letter(dead.clone(), 2));
        queue
            .send_batch(vec![QueueEntry::for_unit(0, &WorkUnit::new(0, 1, 1))])
            .await
            .unwrap();

        let invoker = Arc::new(StubInvoker::failing_calls(&[0, 1]));
        let token = CancellationToken::new();
        let handle = QueueConsumer::new(
            queue.clone(),
            invoker.clone(),
            "robots-worker",
            10,
            Duration::from_millis(5),
        )
        .spawn(token.clone());

        while dead.attributes().await.unwrap().is_drained() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        token.cancel();

        assert_eq!(handle.await.unwrap(), 0);
        assert_eq!(invoker.calls().len(), 2);
        assert!(queue.attributes().await.unwrap().is_drained());
    }
}
