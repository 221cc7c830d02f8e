use async_trait::async_trait;

use crate::errors::PlatformError;

/// Reserved-concurrency controls of the worker platform.
#[async_trait]
pub trait ConcurrencyPlatform: Send + Sync {
    /// Reserves `reserved` parallel executions for the function and returns
    /// what the platform granted.
    async fn put_reserved_concurrency(
        &self,
        function_name: &str,
        reserved: u32,
    ) -> Result<u32, PlatformError>;

    /// Removes the reservation. `PlatformError::NotFound` when there is none.
    async fn delete_reserved_concurrency(&self, function_name: &str) -> Result<(), PlatformError>;
}
