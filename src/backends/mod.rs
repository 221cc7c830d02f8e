// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Implementations of the platform contracts in [`crate::traits`].
//!
//! # Available Backends
//!
//! ## Local Backend
//! An in-process fleet: work queues with receive counts and a dead-letter
//! redrive, a worker platform with execution logs and reserved concurrency,
//! a queue consumer that turns queued units into invocations, and object
//! storage in memory or on disk. The CLI and the end-to-end tests run jobs
//! against it.
//!
//! ## Stub Backend (Test-Only)
//! Recording and scripted collaborators for unit tests. Not available in
//! production builds.
//!
//! # Examples
//!
//! ```rust
//! use robots_fleet::backends::local::LocalQueue;
//! use robots_fleet::payload::{QueueEntry, WorkUnit};
//! use robots_fleet::traits::WorkQueue;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let queue = LocalQueue::new("robots-work");
//! let entry = QueueEntry::for_unit(0, &WorkUnit::new(0, 2, 2));
//! queue.send_batch(vec![entry]).await.unwrap();
//!
//! let depth = queue.attributes().await.unwrap();
//! assert_eq!(depth.approximate_number_of_messages, 1);
//! # });
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
