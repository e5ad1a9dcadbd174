/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use slog::trace;
use slog::Logger;

use crate::builder::CommandSequenceBuilder;
use crate::config::SchedulerConfig;
use crate::diagnostics::build_logger;
use crate::sync_object::SyncObject;
use crate::work_queue::WorkQueue;
use crate::worker::WorkerHandle;

/// Owns a [`WorkQueue`] and the pool of [`WorkerHandle`]s draining it,
/// matching the role the source's `main` plays around `TaskQueueMT` and its
/// `WorkerThread`s, and the structural role `Coordinator` plays in the
/// teacher lineage: the one place that knows the full worker roster.
pub struct Scheduler {
    queue: Arc<WorkQueue>,
    workers: Vec<WorkerHandle>,
    logger: Logger,
    initial_arena_capacity: usize,
}

impl Scheduler {
    /// Builds a [`WorkQueue`] and spawns `config.worker_count` worker
    /// threads bound to it.
    ///
    /// # Errors
    /// Propagates a failure to spawn any of the worker threads (see
    /// [`WorkerHandle::spawn`]).
    pub fn new(config: &SchedulerConfig) -> anyhow::Result<Self> {
        let logger = build_logger(config.verbosity);
        let queue = Arc::new(WorkQueue::new("scheduler", &logger));
        let workers = (0..config.worker_count)
            .map(|index| WorkerHandle::spawn(format!("worker-{}", index), queue.clone(), &logger))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            queue,
            workers,
            logger,
            initial_arena_capacity: config.initial_arena_capacity,
        })
    }

    /// The [`WorkQueue`] backing this scheduler, for submitting sequences
    /// built with [`Self::builder`] or for constructing [`SyncObject`]s that
    /// resubmit to it.
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// A fresh [`CommandSequenceBuilder`] pre-sized per this scheduler's
    /// configuration.
    pub fn builder(&self) -> CommandSequenceBuilder {
        CommandSequenceBuilder::with_capacity(self.initial_arena_capacity)
    }

    /// Constructs a [`SyncObject`] using this scheduler's logger.
    pub fn sync_object(&self, required_signals: u32) -> SyncObject {
        SyncObject::new(required_signals, &self.logger)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Shuts the Work Queue down and joins every worker thread.
    ///
    /// Per spec §9's caller contract, every [`SyncObject`] that could still
    /// resubmit to this scheduler's queue must already be signaled (or
    /// otherwise unreachable) before calling this.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.queue.shutdown()?;
        for worker in self.workers.drain(..) {
            worker.join(&self.logger)?;
        }
        trace!(self.logger, "all workers joined");
        Ok(())
    }
}
