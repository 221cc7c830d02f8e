// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod job;
mod platform;

pub use config::{ConfigError, ValidationError};
pub use job::{
    ConcurrencyReservationError, DispatchError, DispatchFailureKind, InvalidPartition, JobError,
    TrackingError, WorkerError,
};
pub use platform::PlatformError;
