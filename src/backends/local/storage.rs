// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Object storage backed by memory or by a directory.
//!
//! Both list keys in ascending order, `page_size` at a time. The
//! continuation token is the last key of the previous page.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::consts::DEFAULT_LIST_PAGE_SIZE;
use crate::errors::PlatformError;
use crate::traits::{ListPage, ObjectStore, ObjectSummary};

fn page_of(
    mut keys: impl Iterator<Item = (String, u64)>,
    page_size: usize,
) -> ListPage {
    let objects: Vec<ObjectSummary> = keys
        .by_ref()
        .take(page_size)
        .map(|(key, size)| ObjectSummary { key, size })
        .collect();
    let next_continuation_token = match keys.next() {
        Some(_) => objects.last().map(|o| o.key.clone()),
        None => None,
    };
    ListPage {
        objects,
        next_continuation_token,
    }
}

pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_LIST_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PlatformError> {
        self.objects.write().await.insert(key.to_string(), body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, PlatformError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("object '{}'", key)))
    }

    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, PlatformError> {
        let objects = self.objects.read().await;
        let lower = match continuation_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Included(prefix.to_string()),
        };
        let keys = objects
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, body)| (key.clone(), body.len() as u64));
        Ok(page_of(keys, self.page_size))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, PlatformError> {
        let mut objects = self.objects.write().await;
        Ok(keys.iter().filter(|key| objects.remove(*key).is_some()).count())
    }
}

/// Keys map to paths under `root`; `/` in a key becomes a subdirectory.
pub struct FsObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            page_size: page_size.max(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PlatformError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(PlatformError::rejected(
                "InvalidKey",
                format!("'{}' is not a relative object key", key),
            ));
        }
        Ok(self.root.join(relative))
    }

    /// Every key under the root, sorted.
    fn walk(root: &Path) -> std::io::Result<BTreeMap<String, u64>> {
        let mut keys = BTreeMap::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    let path = entry.path();
                    if let Ok(relative) = path.strip_prefix(root) {
                        let key = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/");
                        keys.insert(key, entry.metadata()?.len());
                    }
                }
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PlatformError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, PlatformError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, PlatformError> {
        let root = self.root.clone();
        let keys = tokio::task::spawn_blocking(move || Self::walk(&root))
            .await
            .map_err(|err| PlatformError::Unavailable(err.to_string()))??;

        let keys = keys
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| match &continuation_token {
                Some(token) => key.as_str() > token.as_str(),
                None => true,
            });
        Ok(page_of(keys, self.page_size))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, PlatformError> {
        let mut removed = 0;
        for key in keys {
            let path = self.path_for(key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::list_all;

    async fn exercise_listing(store: &dyn ObjectStore) {
        for key in ["a/3-4.txt", "a/0-1.txt", "a/1-3.txt", "b/0-1.txt", "a/9-10.txt"] {
            store.put(key, key.as_bytes().to_vec()).await.unwrap();
        }

        let first = store.list("a/", None).await.unwrap();
        assert_eq!(
            first.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(),
            vec!["a/0-1.txt", "a/1-3.txt"]
        );
        assert_eq!(first.next_continuation_token.as_deref(), Some("a/1-3.txt"));

        let all = list_all(store, "a/").await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].key, "a/9-10.txt");
        assert_eq!(all[0].size, "a/0-1.txt".len() as u64);

        let removed = store
            .delete_many(&["a/0-1.txt".to_string(), "a/missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(matches!(store.get("a/0-1.txt").await, Err(PlatformError::NotFound(_))));
        assert_eq!(store.get("b/0-1.txt").await.unwrap(), b"b/0-1.txt".to_vec());
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        exercise_listing(&InMemoryObjectStore::with_page_size(2)).await;
    }

    #[tokio::test]
    async fn test_fs_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("bucket"), 2).unwrap();
        exercise_listing(&store).await;
        assert!(store.root().join("b/0-1.txt").exists());
    }

    #[tokio::test]
    async fn test_fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), 10).unwrap();
        assert!(store.put("../outside", vec![]).await.is_err());
        assert!(store.put("/abs", vec![]).await.is_err());
        assert!(store.put("", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_prefix_lists_everything() {
        let store = InMemoryObjectStore::new();
        store.put("x", vec![1]).await.unwrap();
        store.put("y", vec![2]).await.unwrap();
        let page = store.list("", None).await.unwrap();
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.next_continuation_token, None);
    }
}
