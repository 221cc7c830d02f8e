// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod consolidator;
pub mod dead_letter;
pub mod dispatcher;
pub mod factory;
pub mod governor;
pub mod job;
pub mod splitter;
pub mod tracker;

pub use consolidator::{ConsolidationReport, ResultConsolidator};
pub use dead_letter::{check_dead_letter, DeadLetterReport, FailureMonitor};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use factory::{Collaborators, JobRunnerFactory};
pub use governor::{ConcurrencyGovernor, ReservationHandle};
pub use job::{CompletionSource, JobReport, JobRunner};
pub use splitter::{split_by_count, split_by_size, split_invocations, JobPlan};
pub use tracker::{CompletionTracker, TrackerReport, TrackerState};
