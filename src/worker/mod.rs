// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Inside one worker invocation: the per-row tasks and the pool of
//! sub-workers that share a unit's rows.

pub mod pool;
pub mod tasks;

pub use pool::run_partitioned;
pub use tasks::{build_task, DomainColumnTask, EchoTask};
