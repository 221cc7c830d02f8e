// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Merging of per-unit artifacts into one output.
//!
//! Artifacts are read in `(start_pos, end_pos)` order, so the merged bytes
//! depend only on the artifacts present and not on the order workers
//! finished. The gzip header carries no timestamp or file name, so
//! re-running over an unchanged set reproduces the output byte for byte.

use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::config::consts::MAX_DELETE_BATCH;
use crate::config::{ArtifactShape, ConsolidatorConfig};
use crate::errors::{JobError, PlatformError};
use crate::observability::messages::consolidation::{
    ArtifactSkipped, ConsolidationCompleted, ObjectCompressed, StorageCleared,
};
use crate::observability::messages::StructuredLog;
use crate::traits::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub artifacts: usize,
    pub records: usize,
    pub output_key: String,
    pub bytes: usize,
    pub compressed: bool,
}

/// Merged (and possibly compressed) bytes, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArtifact {
    pub artifacts: usize,
    pub records: usize,
    pub bytes: Vec<u8>,
}

pub struct ResultConsolidator {
    store: Arc<dyn ObjectStore>,
    config: ConsolidatorConfig,
}

impl ResultConsolidator {
    pub fn new(store: Arc<dyn ObjectStore>, config: ConsolidatorConfig) -> Self {
        Self { store, config }
    }

    pub fn output_key(&self) -> &str {
        &self.config.output_key
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Keys of the per-unit artifacts under the prefix, in range order.
    async fn artifact_keys(&self) -> Result<Vec<String>, PlatformError> {
        let listed = crate::traits::list_all(self.store.as_ref(), &self.config.prefix).await?;

        let mut artifacts: Vec<((u64, u64), String)> = Vec::with_capacity(listed.len());
        for object in listed {
            if object.key == self.config.output_key {
                continue;
            }
            match parse_artifact_range(&object.key, &self.config.prefix) {
                Some(range) => artifacts.push((range, object.key)),
                None => ArtifactSkipped { key: &object.key }.log(),
            }
        }
        artifacts.sort();

        Ok(artifacts.into_iter().map(|(_, key)| key).collect())
    }

    /// Reads and merges every artifact without writing anything back.
    pub async fn merge(&self) -> Result<MergedArtifact, JobError> {
        let keys = self.artifact_keys().await?;

        let (records, body) = match self.config.shape {
            ArtifactShape::JsonArray => {
                let mut merged: Vec<Value> = Vec::new();
                for key in &keys {
                    let bytes = self.store.get(key).await?;
                    let items: Vec<Value> =
                        serde_json::from_slice(&bytes).map_err(|err| JobError::MalformedArtifact {
                            key: key.clone(),
                            expected: ArtifactShape::JsonArray.as_str(),
                            reason: err.to_string(),
                        })?;
                    merged.extend(items);
                }
                let records = merged.len();
                let body = serde_json::to_vec(&Value::Array(merged))
                    .map_err(|err| JobError::Storage(err.into()))?;
                (records, body)
            }
            ArtifactShape::JsonLines => {
                let mut records = 0;
                let mut body = Vec::new();
                for key in &keys {
                    let bytes = self.store.get(key).await?;
                    let text =
                        std::str::from_utf8(&bytes).map_err(|err| JobError::MalformedArtifact {
                            key: key.clone(),
                            expected: ArtifactShape::JsonLines.as_str(),
                            reason: err.to_string(),
                        })?;
                    for line in text.lines().filter(|line| !line.trim().is_empty()) {
                        body.extend_from_slice(line.as_bytes());
                        body.push(b'\n');
                        records += 1;
                    }
                }
                (records, body)
            }
        };

        let bytes = if self.config.compress {
            gzip(&body)?
        } else {
            body
        };

        Ok(MergedArtifact {
            artifacts: keys.len(),
            records,
            bytes,
        })
    }

    /// Merges the artifacts and writes the result under the output key.
    pub async fn consolidate(&self) -> Result<ConsolidationReport, JobError> {
        let merged = self.merge().await?;
        let bytes = merged.bytes.len();
        self.store.put(&self.config.output_key, merged.bytes).await?;

        let report = ConsolidationReport {
            artifacts: merged.artifacts,
            records: merged.records,
            output_key: self.config.output_key.clone(),
            bytes,
            compressed: self.config.compress,
        };
        ConsolidationCompleted {
            artifacts: report.artifacts,
            records: report.records,
            output_key: &report.output_key,
            bytes: report.bytes,
            compressed: report.compressed,
        }
        .log();
        Ok(report)
    }

    /// Deletes the per-unit artifacts and the merged output under the prefix.
    /// Any other object sharing the prefix is left alone.
    pub async fn clear(&self) -> Result<usize, PlatformError> {
        let listed = crate::traits::list_all(self.store.as_ref(), &self.config.prefix).await?;
        let keys: Vec<String> = listed
            .into_iter()
            .map(|object| object.key)
            .filter(|key| {
                *key == self.config.output_key
                    || parse_artifact_range(key, &self.config.prefix).is_some()
            })
            .collect();

        let mut deleted = 0;
        for batch in keys.chunks(MAX_DELETE_BATCH) {
            deleted += self.store.delete_many(batch).await?;
        }

        StorageCleared {
            prefix: &self.config.prefix,
            deleted,
        }
        .log();
        Ok(deleted)
    }

    /// Gzips one existing object into `<key>.gz` and returns the new key.
    pub async fn compress_object(&self, key: &str) -> Result<String, PlatformError> {
        let body = self.store.get(key).await?;
        let compressed = gzip(&body)?;
        let target_key = format!("{}.gz", key);
        let bytes = compressed.len();
        self.store.put(&target_key, compressed).await?;

        ObjectCompressed {
            source_key: key,
            target_key: &target_key,
            bytes,
        }
        .log();
        Ok(target_key)
    }
}

/// `{prefix}{start}-{end}{suffix}` -> `(start, end)`; `None` for any other key.
/// Unit ranges are never empty, so `start < end` is required.
pub fn parse_artifact_range(key: &str, prefix: &str) -> Option<(u64, u64)> {
    let rest = key.strip_prefix(prefix)?;
    let stem = rest.split('.').next()?;
    let (start, end) = stem.split_once('-')?;
    let (start, end): (u64, u64) = (start.parse().ok()?, end.parse().ok()?);
    (start < end).then_some((start, end))
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>, PlatformError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::InMemoryObjectStore;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
        out
    }

    fn consolidator(store: Arc<InMemoryObjectStore>, shape: ArtifactShape, compress: bool) -> ResultConsolidator {
        ResultConsolidator::new(
            store,
            ConsolidatorConfig {
                prefix: String::new(),
                shape,
                compress,
                output_key: "robots.json.gz".into(),
            },
        )
    }

    async fn seed_arrays(store: &InMemoryObjectStore) {
        store.put("10-20.txt", br#"[{"domain":"c.com"}]"#.to_vec()).await.unwrap();
        store.put("0-10.txt", br#"[{"domain":"a.com"},{"domain":"b.com"}]"#.to_vec()).await.unwrap();
        store.put("100-110.txt", b"[]".to_vec()).await.unwrap();
        store.put("20-30.txt", br#"[{"domain":"d.com"}]"#.to_vec()).await.unwrap();
    }

    #[test]
    fn test_parse_artifact_range() {
        assert_eq!(parse_artifact_range("0-250.txt", ""), Some((0, 250)));
        assert_eq!(parse_artifact_range("out/5-9.jsonl", "out/"), Some((5, 9)));
        assert_eq!(parse_artifact_range("5-9", ""), Some((5, 9)));
        assert_eq!(parse_artifact_range("robots.json.gz", ""), None);
        assert_eq!(parse_artifact_range("other/5-9", "out/"), None);
        assert_eq!(parse_artifact_range("2024-01.md", ""), None);
        assert_eq!(parse_artifact_range("7-7.txt", ""), None);
    }

    #[tokio::test]
    async fn test_flattens_arrays_in_range_order() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed_arrays(&store).await;
        let consolidator = consolidator(store.clone(), ArtifactShape::JsonArray, false);

        let report = consolidator.consolidate().await.unwrap();

        assert_eq!(report.artifacts, 4);
        assert_eq!(report.records, 4);
        let merged: Vec<Value> = serde_json::from_slice(&store.get("robots.json.gz").await.unwrap()).unwrap();
        let domains: Vec<&str> = merged.iter().map(|v| v["domain"].as_str().unwrap()).collect();
        // 100-110 sorts numerically after 20-30 and is empty.
        assert_eq!(domains, vec!["a.com", "b.com", "c.com", "d.com"]);
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical_and_skips_output() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed_arrays(&store).await;
        let consolidator = consolidator(store.clone(), ArtifactShape::JsonArray, true);

        let first = consolidator.consolidate().await.unwrap();
        let first_bytes = store.get("robots.json.gz").await.unwrap();
        let second = consolidator.consolidate().await.unwrap();
        let second_bytes = store.get("robots.json.gz").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert!(gunzip(&second_bytes).contains("d.com"));
    }

    #[tokio::test]
    async fn test_concatenates_json_lines() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("3-6.jsonl", b"{\"n\":3}\n{\"n\":4}\n".to_vec()).await.unwrap();
        store.put("0-3.jsonl", b"{\"n\":0}\n\n{\"n\":1}".to_vec()).await.unwrap();
        let consolidator = consolidator(store.clone(), ArtifactShape::JsonLines, true);

        let merged = consolidator.merge().await.unwrap();

        assert_eq!(merged.records, 4);
        assert_eq!(gunzip(&merged.bytes), "{\"n\":0}\n{\"n\":1}\n{\"n\":3}\n{\"n\":4}\n");
    }

    #[tokio::test]
    async fn test_malformed_artifact_names_the_key() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("0-2.txt", b"not json".to_vec()).await.unwrap();
        let consolidator = consolidator(store, ArtifactShape::JsonArray, false);

        match consolidator.merge().await {
            Err(JobError::MalformedArtifact { key, .. }) => assert_eq!(key, "0-2.txt"),
            other => panic!("expected a malformed artifact error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_walks_every_page() {
        let store = Arc::new(InMemoryObjectStore::with_page_size(3));
        for i in 0..10u64 {
            store.put(&format!("{}-{}.txt", i, i + 1), b"[]".to_vec()).await.unwrap();
        }
        let consolidator = consolidator(store.clone(), ArtifactShape::JsonArray, false);

        assert_eq!(consolidator.clear().await.unwrap(), 10);
        assert!(store.list("", None).await.unwrap().objects.is_empty());
        assert_eq!(consolidator.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_leaves_unrelated_objects() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed_arrays(&store).await;
        store.put("robots.json.gz", b"old".to_vec()).await.unwrap();
        for key in ["notes.md", "src/main.rs", "2024-01.md", "Cargo.toml"] {
            store.put(key, b"keep".to_vec()).await.unwrap();
        }
        let consolidator = consolidator(store.clone(), ArtifactShape::JsonArray, false);

        assert_eq!(consolidator.clear().await.unwrap(), 5);

        let mut left: Vec<String> = store
            .list("", None)
            .await
            .unwrap()
            .objects
            .into_iter()
            .map(|o| o.key)
            .collect();
        left.sort();
        assert_eq!(left, vec!["2024-01.md", "Cargo.toml", "notes.md", "src/main.rs"]);
    }

    #[tokio::test]
    async fn test_compress_object() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("report.json", b"{\"ok\":true}".to_vec()).await.unwrap();
        let consolidator = consolidator(store.clone(), ArtifactShape::JsonArray, false);

        let key = consolidator.compress_object("report.json").await.unwrap();

        assert_eq!(key, "report.json.gz");
        assert_eq!(gunzip(&store.get(&key).await.unwrap()), "{\"ok\":true}");
        assert!(consolidator.compress_object("missing.json").await.is_err());
    }
}
