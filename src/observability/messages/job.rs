// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::observability::messages::StructuredLog;

pub struct JobStarted<'a> {
    pub strategy: &'a str,
    pub units: usize,
    pub items: u64,
}

impl Display for JobStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting job: {} items in {} units via {}",
            self.items, self.units, self.strategy
        )
    }
}

impl StructuredLog for JobStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            units = self.units,
            items = self.items,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "job",
            span_name = name,
            strategy = self.strategy,
            units = self.units,
            items = self.items,
        )
    }
}

pub struct JobCompleted<'a> {
    pub strategy: &'a str,
    pub dispatched: usize,
    pub failed: usize,
    pub dead_lettered: Option<u64>,
    pub records: usize,
    pub duration: Duration,
}

impl Display for JobCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job finished in {:?}: {} units dispatched, {} failed to dispatch, ",
            self.duration, self.dispatched, self.failed
        )?;
        match self.dead_lettered {
            Some(count) => write!(f, "{} dead-lettered, ", count)?,
            None => write!(f, "dead letters unknown, ")?,
        }
        write!(f, "{} records merged", self.records)
    }
}

impl StructuredLog for JobCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            dispatched = self.dispatched,
            failed = self.failed,
            dead_lettered = ?self.dead_lettered,
            records = self.records,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "job_completed",
            span_name = name,
            strategy = self.strategy,
            records = self.records,
        )
    }
}
