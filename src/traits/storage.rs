use async_trait::async_trait;

use crate::errors::PlatformError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// One page of a listing, in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PlatformError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, PlatformError>;

    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, PlatformError>;

    /// Deletes the keys, ignoring ones that do not exist. Returns how many were removed.
    async fn delete_many(&self, keys: &[String]) -> Result<usize, PlatformError>;
}

/// Follows continuation tokens until the listing is exhausted.
pub async fn list_all(
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<Vec<ObjectSummary>, PlatformError> {
    let mut objects = Vec::new();
    let mut token = None;

    loop {
        let page = store.list(prefix, token).await?;
        objects.extend(page.objects);
        match page.next_continuation_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(objects)
}
