// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{ArtifactShape, Config};
use crate::errors::WorkerError;
use crate::observability::messages::worker::UnitProcessed;
use crate::observability::messages::StructuredLog;
use crate::payload::{InvocationResponse, WorkUnit};
use crate::traits::{ObjectStore, RowTask, WorkerFunction};
use crate::worker::{build_task, run_partitioned};

/// The crawl worker: reads its unit's rows, shares them among `proc_count`
/// sub-workers and writes one `{start}-{end}` artifact.
pub struct LocalWorker {
    name: String,
    rows: Arc<Vec<String>>,
    task: Arc<dyn RowTask>,
    store: Arc<dyn ObjectStore>,
    prefix: String,
    suffix: String,
    shape: ArtifactShape,
}

impl LocalWorker {
    pub fn new(
        name: impl Into<String>,
        rows: Arc<Vec<String>>,
        task: Arc<dyn RowTask>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let shape = ArtifactShape::default();
        Self {
            name: name.into(),
            rows,
            task,
            store,
            prefix: String::new(),
            suffix: shape.default_suffix().to_string(),
            shape,
        }
    }

    pub fn from_config(config: &Config, rows: Arc<Vec<String>>, store: Arc<dyn ObjectStore>) -> Self {
        Self::new(
            config.dispatch.function_name.clone(),
            rows,
            build_task(&config.worker),
            store,
        )
        .with_artifacts(
            &config.consolidator.prefix,
            &config.worker.suffix_for(config.consolidator.shape),
            config.consolidator.shape,
        )
    }

    pub fn with_artifacts(mut self, prefix: &str, suffix: &str, shape: ArtifactShape) -> Self {
        self.prefix = prefix.to_string();
        self.suffix = suffix.to_string();
        self.shape = shape;
        self
    }

    /// Rows of the unit; a range running past the input stops at its end.
    fn rows_for(&self, unit: &WorkUnit) -> &[String] {
        let len = self.rows.len();
        let start = (unit.start_pos as usize).min(len);
        let end = (unit.end_pos as usize).min(len);
        &self.rows[start..end]
    }

    fn render(&self, records: &[Value]) -> Result<Vec<u8>, WorkerError> {
        let rendered = match self.shape {
            ArtifactShape::JsonArray => serde_json::to_vec(records),
            ArtifactShape::JsonLines => records
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()
                .map(|lines| lines.iter().map(|line| format!("{}\n", line)).collect::<String>().into_bytes()),
        };
        rendered.map_err(|err| WorkerError::MalformedPayload(err.to_string()))
    }
}

#[async_trait]
impl WorkerFunction for LocalWorker {
    async fn handle(&self, payload: &[u8]) -> Result<InvocationResponse, WorkerError> {
        let unit = WorkUnit::from_body(payload)
            .map_err(|err| WorkerError::MalformedPayload(err.to_string()))?;
        unit.validate()?;

        let records = run_partitioned(self.rows_for(&unit), unit.proc_count, self.task.clone()).await?;
        let key = unit.artifact_key(&self.prefix, &self.suffix);
        self.store.put(&key, self.render(&records)?).await?;

        UnitProcessed {
            function_name: &self.name,
            range: unit.range(),
            records: records.len(),
            key: &key,
        }
        .log();

        Ok(InvocationResponse {
            status: 200,
            result_file: Some(key),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
