// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed payloads that cross the dispatch boundary.

mod envelope;
mod work_unit;

pub use envelope::{InvocationGroup, InvocationOutcome, InvocationResponse, InvocationType, QueueEntry};
pub use work_unit::{PayloadBatch, UnitRange, WorkUnit};
