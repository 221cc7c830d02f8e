use async_trait::async_trait;

use crate::errors::PlatformError;
use crate::payload::InvocationType;

/// Whether a synchronous invocation should return the tail of its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogType {
    #[default]
    None,
    Tail,
}

/// What the endpoint hands back. `payload` is empty for `Event` invocations
/// and `log_result` is base64 when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInvocationResponse {
    pub status_code: u16,
    pub payload: Vec<u8>,
    pub function_error: Option<String>,
    pub log_result: Option<String>,
}

impl RawInvocationResponse {
    pub fn accepted() -> Self {
        Self {
            status_code: 202,
            payload: Vec::new(),
            function_error: None,
            log_result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code) && self.function_error.is_none()
    }
}

#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(
        &self,
        function_name: &str,
        invocation_type: InvocationType,
        log_type: LogType,
        payload: Vec<u8>,
    ) -> Result<RawInvocationResponse, PlatformError>;
}
