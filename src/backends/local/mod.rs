// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process implementations of every platform contract the engine talks
//! to, so a whole job can run on one machine.

mod consumer;
mod platform;
mod queue;
mod storage;
mod worker;

pub use consumer::QueueConsumer;
pub use platform::{LocalPlatform, LocalPlatformBuilder};
pub use queue::{LocalQueue, ReceivedMessage};
pub use storage::{FsObjectStore, InMemoryObjectStore};
pub use worker::LocalWorker;
