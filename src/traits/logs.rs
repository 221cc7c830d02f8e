use async_trait::async_trait;

use crate::errors::PlatformError;

pub const START_PATTERN: &str = "START RequestId";
pub const END_PATTERN: &str = "END RequestId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp_ms: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEventsPage {
    pub events: Vec<LogEvent>,
    pub next_token: Option<String>,
}

/// Query side of the platform's execution logs.
#[async_trait]
pub trait ExecutionLogSource: Send + Sync {
    /// Events of `log_group` at or after `start_time_ms` whose message
    /// contains `filter_pattern`.
    async fn filter_log_events(
        &self,
        log_group: &str,
        filter_pattern: &str,
        start_time_ms: u64,
        next_token: Option<String>,
    ) -> Result<LogEventsPage, PlatformError>;
}

/// Log group a function writes its execution records to.
pub fn log_group_name(function_name: &str) -> String {
    format!("/functions/{}", function_name)
}
