// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::consts::*;
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

/// Complete configuration of one crawl job and the fleet it runs on.
///
/// Every section is optional and falls back to its defaults, so an empty
/// file describes the default 5 x 2 job dispatched over one local queue.
///
/// # Example
/// ```yaml
/// job:
///   unit_count: 500
///   items_per_unit: 2000
///   proc_count: 125
/// dispatch:
///   strategy: queue
///   queues: [robots-work-a, robots-work-b]
///   dead_letter_queue: robots-dead-letter
/// tracker:
///   poll_interval_ms: 3000
/// consolidator:
///   shape: json_array
///   output_key: robots.json.gz
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub consolidator: ConsolidatorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// How to deliver work units to the fleet.
///
/// # Variants
/// * `Queue` - batch-send onto durable queues; a consumer triggers the worker
/// * `Direct` - asynchronous invocation groups through the fan-out relay
/// * `Sync` - request/response invocation, at most `max_workers` in flight
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Queue,
    Direct,
    Sync,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Queue => "queue",
            Strategy::Direct => "direct",
            Strategy::Sync => "sync",
        }
    }
}

/// Size of the job. Either `total_items` with one of `items_per_unit` /
/// `unit_count`, or `unit_count` x `items_per_unit` (each defaulting to the
/// CLI defaults of 5 and 2).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JobConfig {
    pub total_items: Option<u64>,
    pub items_per_unit: Option<u64>,
    pub unit_count: Option<u64>,
    pub proc_count: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            total_items: None,
            items_per_unit: None,
            unit_count: None,
            proc_count: DEFAULT_PROC_COUNT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    pub strategy: Strategy,
    /// Worker function the units are meant for
    pub function_name: String,
    /// Fan-out relay used by the direct strategy
    pub relay_function: String,
    pub region: String,
    /// Queues the queue strategy stripes sub-batches across
    pub queues: Vec<String>,
    pub dead_letter_queue: Option<String>,
    pub max_receive_count: u32,
    pub queue_batch_size: usize,
    pub invocation_group_size: usize,
    pub invoke_delay_ms: u64,
    /// In-flight bound for the sync strategy
    pub max_workers: usize,
    /// Ask the sync strategy to return each invocation's log tail
    pub log_tail: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            function_name: "robots-worker".to_string(),
            relay_function: "fanout-relay".to_string(),
            region: "local".to_string(),
            queues: vec!["robots-work".to_string()],
            dead_letter_queue: Some("robots-dead-letter".to_string()),
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
            queue_batch_size: MAX_QUEUE_BATCH,
            invocation_group_size: MAX_INVOCATION_GROUP,
            invoke_delay_ms: DEFAULT_INVOKE_DELAY_MS,
            max_workers: 1,
            log_tail: false,
        }
    }
}

impl DispatchConfig {
    pub fn invoke_delay(&self) -> Duration {
        Duration::from_millis(self.invoke_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GovernorConfig {
    pub threshold: usize,
    pub headroom: u32,
    pub propagation_delay_ms: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_RESERVATION_THRESHOLD,
            headroom: DEFAULT_RESERVATION_HEADROOM,
            propagation_delay_ms: DEFAULT_PROPAGATION_DELAY_MS,
        }
    }
}

impl GovernorConfig {
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    pub poll_interval_ms: u64,
    /// No timeout unless set; tracking then waits for the fleet to drain.
    pub timeout_secs: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_secs: None,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Layout of a per-unit artifact. Chosen by configuration, never sniffed.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactShape {
    /// One JSON array per artifact; merged by flattening.
    #[default]
    JsonArray,
    /// One JSON document per line; merged by concatenation.
    JsonLines,
}

impl ArtifactShape {
    pub fn default_suffix(&self) -> &'static str {
        match self {
            ArtifactShape::JsonArray => ".txt",
            ArtifactShape::JsonLines => ".jsonl",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactShape::JsonArray => "JSON array",
            ArtifactShape::JsonLines => "JSON lines",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsolidatorConfig {
    /// Key prefix shared by the per-unit artifacts
    pub prefix: String,
    pub shape: ArtifactShape,
    pub compress: bool,
    pub output_key: String,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            shape: ArtifactShape::default(),
            compress: true,
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
        }
    }
}

/// Per-row work done by the local worker's sub-workers.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Wrap each row as `{"row": ...}`
    Echo,
    /// Extract the domain column as `{"domain": ...}`
    #[default]
    Domain,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    pub task: TaskKind,
    pub domain_column: usize,
    /// Defaults to the shape's suffix
    pub artifact_suffix: Option<String>,
    /// Rows the local worker reads, one item per line
    pub input: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            task: TaskKind::default(),
            domain_column: DEFAULT_DOMAIN_COLUMN,
            artifact_suffix: None,
            input: PathBuf::from("data/sample-domains.csv"),
        }
    }
}

impl WorkerConfig {
    pub fn suffix_for(&self, shape: ArtifactShape) -> String {
        self.artifact_suffix
            .clone()
            .unwrap_or_else(|| shape.default_suffix().to_string())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory backing the object store; in-memory when unset
    pub root: Option<PathBuf>,
    pub page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

/// Knobs of the local worker platform.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformConfig {
    pub account_concurrency_limit: u32,
    pub log_page_size: usize,
    pub consumer_batch_size: usize,
    pub consumer_poll_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            account_concurrency_limit: DEFAULT_ACCOUNT_CONCURRENCY_LIMIT,
            log_page_size: DEFAULT_LOG_PAGE_SIZE,
            consumer_batch_size: MAX_QUEUE_BATCH,
            consumer_poll_ms: DEFAULT_CONSUMER_POLL_MS,
        }
    }
}

/// Reads a configuration file, TOML when the extension is `.toml` and YAML otherwise.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let cfg: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    Ok(cfg)
}

pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}
