// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use serde_json::Value;

use crate::errors::WorkerError;
use crate::traits::RowTask;

/// Splits `rows` into `proc_count` slices of `ceil(len / proc_count)` rows,
/// runs each slice on its own task and returns the results in slice order.
///
/// Fewer tasks run when there are fewer rows than sub-workers. A sub-worker
/// that panics fails the whole unit.
pub async fn run_partitioned(
    rows: &[String],
    proc_count: u32,
    task: Arc<dyn RowTask>,
) -> Result<Vec<Value>, WorkerError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let per_slice = rows.len().div_ceil(proc_count.max(1) as usize);
    let mut handles = Vec::with_capacity(proc_count as usize);

    for slice in rows.chunks(per_slice) {
        let slice = slice.to_vec();
        let task = task.clone();
        handles.push(tokio::spawn(async move {
            let mut results = Vec::with_capacity(slice.len());
            for row in &slice {
                if let Some(value) = task.process(row).await {
                    results.push(value);
                }
            }
            results
        }));
    }

    let mut collected = Vec::with_capacity(rows.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let results = handle.await.map_err(|err| WorkerError::SubWorker {
            index,
            reason: err.to_string(),
        })?;
        collected.extend(results);
    }

    Ok(collected)
}
