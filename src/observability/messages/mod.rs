// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging.
//!
//! # Usage Pattern
//!
//! ```rust
//! use robots_fleet::observability::messages::StructuredLog;
//! use robots_fleet::observability::messages::governor::ReservationSkipped;
//!
//! let msg = ReservationSkipped {
//!     function_name: "robots-worker",
//!     pending: 12,
//!     threshold: 100,
//! };
//!
//! msg.log();
//! assert_eq!(
//!     msg.to_string(),
//!     "12 pending invocations of 'robots-worker' is below the reservation threshold of 100"
//! );
//! ```

use std::fmt::Display;

use tracing::Span;

pub mod consolidation;
pub mod dispatch;
pub mod governor;
pub mod job;
pub mod tracking;
pub mod worker;

/// A log message that knows its own level and fields.
pub trait StructuredLog: Display {
    /// Emits the message as a `tracing` event at its level.
    fn log(&self);

    /// Opens a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
