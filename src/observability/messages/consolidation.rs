// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for storage reset and artifact merging.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::observability::messages::StructuredLog;

/// # Log Level
/// `info!` - Important operational event
pub struct StorageCleared<'a> {
    pub prefix: &'a str,
    pub deleted: usize,
}

impl Display for StorageCleared<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Deleted {} objects under '{}'", self.deleted, self.prefix)
    }
}

impl StructuredLog for StorageCleared<'_> {
    fn log(&self) {
        tracing::info!(prefix = self.prefix, deleted = self.deleted, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("storage_cleared", span_name = name, prefix = self.prefix)
    }
}

/// # Log Level
/// `warn!` - Job continues over stale artifacts
pub struct StorageClearFailed<'a> {
    pub prefix: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StorageClearFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Could not clear '{}': {}", self.prefix, self.error)
    }
}

impl StructuredLog for StorageClearFailed<'_> {
    fn log(&self) {
        tracing::warn!(prefix = self.prefix, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("storage_clear_failed", span_name = name, prefix = self.prefix)
    }
}

/// A listed object is not a per-unit artifact.
///
/// # Log Level
/// `debug!`
pub struct ArtifactSkipped<'a> {
    pub key: &'a str,
}

impl Display for ArtifactSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipping '{}': not a work unit artifact", self.key)
    }
}

impl StructuredLog for ArtifactSkipped<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("artifact_skipped", span_name = name, key = self.key)
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct ConsolidationCompleted<'a> {
    pub artifacts: usize,
    pub records: usize,
    pub output_key: &'a str,
    pub bytes: usize,
    pub compressed: bool,
}

impl Display for ConsolidationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Merged {} records from {} artifacts into '{}' ({} bytes{})",
            self.records,
            self.artifacts,
            self.output_key,
            self.bytes,
            if self.compressed { ", gzip" } else { "" }
        )
    }
}

impl StructuredLog for ConsolidationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            artifacts = self.artifacts,
            records = self.records,
            output_key = self.output_key,
            bytes = self.bytes,
            compressed = self.compressed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "consolidation",
            span_name = name,
            output_key = self.output_key,
            artifacts = self.artifacts,
        )
    }
}

/// # Log Level
/// `info!`
pub struct ObjectCompressed<'a> {
    pub source_key: &'a str,
    pub target_key: &'a str,
    pub bytes: usize,
}

impl Display for ObjectCompressed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compressed '{}' into '{}' ({} bytes)",
            self.source_key, self.target_key, self.bytes
        )
    }
}

impl StructuredLog for ObjectCompressed<'_> {
    fn log(&self) {
        tracing::info!(
            source_key = self.source_key,
            target_key = self.target_key,
            bytes = self.bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "object_compressed",
            span_name = name,
            source_key = self.source_key,
        )
    }
}
