// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the fleet.
//!
//! Every operational event is a small struct with a `Display` implementation
//! and a [`messages::StructuredLog`] implementation that emits it as a
//! `tracing` event with typed fields. Keeping the wording in one place keeps
//! log lines consistent between the dispatch, tracking and consolidation
//! paths and keeps string literals out of the engine.
//!
//! Messages are organized by subsystem:
//! * `messages::dispatch` - queue fan-out and invocation events
//! * `messages::governor` - concurrency reservation lifecycle
//! * `messages::tracking` - completion polling and dead-letter checks
//! * `messages::consolidation` - storage reset and artifact merging
//! * `messages::job` - job lifecycle
//! * `messages::worker` - local worker platform and queue consumer events
//!
//! The binary installs the subscriber through [`init_tracing`]; the library
//! never does.

pub mod messages;
mod subscriber;

pub use subscriber::init_tracing;
