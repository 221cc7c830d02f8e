// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backends::local::{
    FsObjectStore, InMemoryObjectStore, LocalPlatform, LocalQueue, LocalWorker, QueueConsumer,
};
use crate::config::{Config, Strategy};
use crate::engine::factory::{Collaborators, JobRunnerFactory};
use crate::engine::job::JobRunner;
use crate::errors::ConfigError;
use crate::traits::{ObjectStore, WorkQueue};

/// Reads the crawl input, one row per non-blank line.
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// A local fleet wired from configuration: storage, the worker platform,
/// the queues and their consumers, and a job runner that drives them.
pub struct LocalRuntime {
    runner: JobRunner,
    store: Arc<dyn ObjectStore>,
    platform: LocalPlatform,
    queues: Vec<Arc<LocalQueue>>,
    dead_letter_queue: Option<Arc<LocalQueue>>,
    shutdown: CancellationToken,
    consumers: Vec<JoinHandle<u64>>,
}

impl LocalRuntime {
    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn platform(&self) -> &LocalPlatform {
        &self.platform
    }

    pub fn queues(&self) -> &[Arc<LocalQueue>] {
        &self.queues
    }

    pub fn dead_letter_queue(&self) -> Option<&Arc<LocalQueue>> {
        self.dead_letter_queue.as_ref()
    }

    /// Stops the queue consumers and waits for them. Returns how many
    /// messages they delivered in total.
    pub async fn shutdown(self) -> u64 {
        self.shutdown.cancel();
        let mut delivered = 0;
        for consumer in self.consumers {
            if let Ok(count) = consumer.await {
                delivered += count;
            }
        }
        delivered
    }
}

/// Builds runnable fleets from configuration.
///
/// # Examples
///
/// ```
/// use robots_fleet::config::{Config, RuntimeBuilder, Strategy};
/// use robots_fleet::engine::JobPlan;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut config = Config::default();
/// config.dispatch.strategy = Strategy::Sync;
/// config.job.unit_count = Some(2);
/// config.job.items_per_unit = Some(2);
/// config.worker.task = robots_fleet::config::TaskKind::Echo;
///
/// let rows = (0..4).map(|i| format!("{},{},site{}.com", i, i, i)).collect();
/// let runtime = RuntimeBuilder::local(&config, rows).unwrap();
/// let plan = JobPlan::from_config(&config.job).unwrap();
///
/// let report = runtime.runner().run(&plan).await.unwrap();
/// assert_eq!(report.consolidation.records, 4);
/// runtime.shutdown().await;
/// # });
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Wires the local backends for `cfg` around `rows`. Queue consumers are
    /// spawned for the queue strategy, so this must run inside a tokio
    /// runtime.
    pub fn local(cfg: &Config, rows: Vec<String>) -> Result<LocalRuntime, ConfigError> {
        let store: Arc<dyn ObjectStore> = match &cfg.storage.root {
            Some(root) => Arc::new(FsObjectStore::new(root, cfg.storage.page_size)?),
            None => Arc::new(InMemoryObjectStore::with_page_size(cfg.storage.page_size)),
        };

        let worker = LocalWorker::from_config(cfg, Arc::new(rows), store.clone());
        let platform = LocalPlatform::builder()
            .function(Arc::new(worker))
            .relay(&cfg.dispatch.relay_function)
            .account_limit(cfg.platform.account_concurrency_limit)
            .log_page_size(cfg.platform.log_page_size)
            .build();

        let dead_letter_queue = cfg
            .dispatch
            .dead_letter_queue
            .as_ref()
            .map(|name| Arc::new(LocalQueue::new(name)));
        let queues: Vec<Arc<LocalQueue>> = cfg
            .dispatch
            .queues
            .iter()
            .map(|name| {
                let queue = LocalQueue::new(name);
                let queue = match &dead_letter_queue {
                    Some(dlq) => queue.with_dead_letter(dlq.clone(), cfg.dispatch.max_receive_count),
                    None => queue,
                };
                Arc::new(queue)
            })
            .collect();

        let shutdown = CancellationToken::new();
        let consumers = match cfg.dispatch.strategy {
            Strategy::Queue => queues
                .iter()
                .map(|queue| {
                    QueueConsumer::new(
                        queue.clone(),
                        Arc::new(platform.clone()),
                        &cfg.dispatch.function_name,
                        cfg.platform.consumer_batch_size,
                        Duration::from_millis(cfg.platform.consumer_poll_ms),
                    )
                    .spawn(shutdown.clone())
                })
                .collect(),
            Strategy::Direct | Strategy::Sync => Vec::new(),
        };

        let collaborators = Collaborators {
            queues: queues
                .iter()
                .map(|queue| queue.clone() as Arc<dyn WorkQueue>)
                .collect(),
            dead_letter_queue: dead_letter_queue
                .clone()
                .map(|queue| queue as Arc<dyn WorkQueue>),
            invoker: Arc::new(platform.clone()),
            concurrency: Arc::new(platform.clone()),
            logs: Arc::new(platform.clone()),
            store: store.clone(),
        };
        let runner = JobRunnerFactory::from_config(cfg, collaborators);

        Ok(LocalRuntime {
            runner,
            store,
            platform,
            queues,
            dead_letter_queue,
            shutdown,
            consumers,
        })
    }
}
