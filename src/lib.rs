// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // local fleet + test stubs
pub mod config;        // config, CLI, runtime wiring
pub mod engine;        // splitter, dispatchers, tracker, consolidator, job runner
pub mod errors;        // error handling
pub mod observability;
pub mod payload;       // work units and wire shapes
pub mod traits;        // platform contracts
pub mod utils;
pub mod worker;        // per-invocation sub-worker pool
