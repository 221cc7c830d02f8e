// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::Parser;

use crate::config::validation::validate_config;
use crate::config::{load_config, Config, Strategy, TaskKind};
use crate::errors::ConfigError;

/// Command-line surface of the `robots-fleet` binary.
///
/// Flags override the configuration file, which overrides the built-in
/// defaults. Every flag can also come from the environment (or a `.env`
/// file) through its `FLEET_*` variable.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "robots-fleet",
    version,
    about = "Split a crawl into work units, run them on a worker fleet and merge the results"
)]
pub struct CliArgs {
    /// YAML or TOML configuration file
    #[arg(short, long, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of work units to dispatch [default: 5]
    #[arg(short = 'n', long, env = "FLEET_NUM_INVOCATIONS")]
    pub num_invocations: Option<u64>,

    /// Items (input rows) per work unit [default: 2]
    #[arg(short = 'p', long, env = "FLEET_PER_UNIT")]
    pub per_unit: Option<u64>,

    /// Sub-workers per work unit [default: 2]
    #[arg(short = 'm', long, env = "FLEET_PROC_COUNT")]
    pub proc_count: Option<u32>,

    /// Input rows, one item per line
    #[arg(short, long, env = "FLEET_INPUT")]
    pub input: Option<PathBuf>,

    /// Directory for object storage; in-memory when omitted
    #[arg(long, env = "FLEET_STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    #[arg(long, value_enum, env = "FLEET_STRATEGY")]
    pub strategy: Option<Strategy>,

    #[arg(long, value_enum, env = "FLEET_TASK")]
    pub task: Option<TaskKind>,

    /// Stop waiting for the fleet after this many seconds
    #[arg(long, env = "FLEET_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Also write the merged artifact to this local path
    #[arg(short, long, env = "FLEET_OUTPUT")]
    pub output: Option<PathBuf>,
}

impl CliArgs {
    /// Loads the configuration file when one was given, applies the flags
    /// and validates the result.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        self.apply(&mut cfg);
        validate_config(&cfg).map_err(ConfigError::Invalid)?;
        Ok(cfg)
    }

    pub fn apply(&self, cfg: &mut Config) {
        if self.num_invocations.is_some() || self.per_unit.is_some() {
            // -n / -p describe the job as unit_count x items_per_unit
            cfg.job.total_items = None;
        }
        if let Some(n) = self.num_invocations {
            cfg.job.unit_count = Some(n);
        }
        if let Some(p) = self.per_unit {
            cfg.job.items_per_unit = Some(p);
        }
        if let Some(m) = self.proc_count {
            cfg.job.proc_count = m;
        }
        if let Some(input) = &self.input {
            cfg.worker.input = input.clone();
        }
        if let Some(root) = &self.storage_root {
            cfg.storage.root = Some(root.clone());
        }
        if let Some(strategy) = self.strategy {
            cfg.dispatch.strategy = strategy;
        }
        if let Some(task) = self.task {
            cfg.worker.task = task;
        }
        if let Some(timeout) = self.timeout_secs {
            cfg.tracker.timeout_secs = Some(timeout);
        }
    }
}
