use async_trait::async_trait;
use serde_json::Value;

use crate::errors::WorkerError;
use crate::payload::InvocationResponse;

/// Code the worker platform runs for one invocation.
#[async_trait]
pub trait WorkerFunction: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<InvocationResponse, WorkerError>;

    fn name(&self) -> &str;
}

/// Per-row work done by a sub-worker. `None` drops the row.
#[async_trait]
pub trait RowTask: Send + Sync {
    async fn process(&self, row: &str) -> Option<Value>;

    fn name(&self) -> &'static str;
}
