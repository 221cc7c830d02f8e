// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::{Config, Strategy};
use crate::engine::consolidator::ResultConsolidator;
use crate::engine::dead_letter::FailureMonitor;
use crate::engine::dispatcher::{
    DirectInvokeDispatcher, DispatchTarget, Dispatcher, QueueFanoutDispatcher,
    SyncInvokeDispatcher,
};
use crate::engine::governor::ConcurrencyGovernor;
use crate::engine::job::{CompletionSource, JobRunner};
use crate::engine::tracker::CompletionTracker;
use crate::traits::{
    ConcurrencyPlatform, ExecutionLogSource, FunctionInvoker, LogType, ObjectStore, WorkQueue,
};

/// The external services a job talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub queues: Vec<Arc<dyn WorkQueue>>,
    pub dead_letter_queue: Option<Arc<dyn WorkQueue>>,
    pub invoker: Arc<dyn FunctionInvoker>,
    pub concurrency: Arc<dyn ConcurrencyPlatform>,
    pub logs: Arc<dyn ExecutionLogSource>,
    pub store: Arc<dyn ObjectStore>,
}

/// Factory for creating dispatchers and job runners from configuration
pub struct JobRunnerFactory;

impl JobRunnerFactory {
    /// Create the dispatcher for the configured strategy
    pub fn dispatcher(cfg: &Config, collaborators: &Collaborators) -> Box<dyn Dispatcher> {
        let dispatch = &cfg.dispatch;
        let target = DispatchTarget::new(&dispatch.function_name, &dispatch.region);

        match dispatch.strategy {
            Strategy::Queue => Box::new(QueueFanoutDispatcher::new(
                collaborators.queues.clone(),
                dispatch.queue_batch_size,
            )),
            Strategy::Direct => Box::new(DirectInvokeDispatcher::new(
                collaborators.invoker.clone(),
                &dispatch.relay_function,
                target,
                dispatch.invocation_group_size,
                dispatch.invoke_delay(),
            )),
            Strategy::Sync => Box::new(SyncInvokeDispatcher::new(
                collaborators.invoker.clone(),
                target,
                dispatch.max_workers,
                if dispatch.log_tail {
                    LogType::Tail
                } else {
                    LogType::None
                },
            )),
        }
    }

    /// Signal the tracker polls for the configured strategy
    pub fn completion_source(cfg: &Config, collaborators: &Collaborators) -> CompletionSource {
        match cfg.dispatch.strategy {
            Strategy::Queue => CompletionSource::QueueDepth(collaborators.queues.clone()),
            Strategy::Direct => CompletionSource::ExecutionLogs {
                logs: collaborators.logs.clone(),
                function_name: cfg.dispatch.function_name.clone(),
            },
            Strategy::Sync => CompletionSource::Immediate,
        }
    }

    pub fn from_config(cfg: &Config, collaborators: Collaborators) -> JobRunner {
        let dispatcher = Self::dispatcher(cfg, &collaborators);
        let completion = Self::completion_source(cfg, &collaborators);
        let governor = ConcurrencyGovernor::new(
            collaborators.concurrency.clone(),
            &cfg.dispatch.function_name,
            cfg.governor.clone(),
        );
        // Only the queue strategy redelivers, so only it can dead-letter.
        let failure_monitor = match cfg.dispatch.strategy {
            Strategy::Queue => collaborators.dead_letter_queue.clone().map(FailureMonitor::new),
            Strategy::Direct | Strategy::Sync => None,
        };
        let consolidator =
            ResultConsolidator::new(collaborators.store.clone(), cfg.consolidator.clone());

        JobRunner::new(
            dispatcher,
            completion,
            CompletionTracker::from_config(&cfg.tracker),
            governor,
            failure_monitor,
            consolidator,
        )
    }
}
