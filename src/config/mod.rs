// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod cli;
mod loader;
mod runtime;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use cli::CliArgs;
pub use loader::{
    load_and_validate_config, load_config, ArtifactShape, Config, ConsolidatorConfig,
    DispatchConfig, GovernorConfig, JobConfig, PlatformConfig, StorageConfig, Strategy, TaskKind,
    TrackerConfig, WorkerConfig,
};
pub use runtime::{load_rows, LocalRuntime, RuntimeBuilder};
pub use validation::validate_config;
