/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Condvar;
use std::sync::Mutex;

use slog::o;
use slog::trace;
use slog::Logger;

use crate::sequence::CommandSequence;

struct WorkQueueInternal {
    /// Ready sequences, in submission/resubmission order.
    wq_tasks: VecDeque<CommandSequence>,
    /// Set once [`WorkQueue::shutdown`] has been called.
    wq_shutting_down: bool,
    /// Number of worker threads currently registered against this queue.
    wq_worker_count: u32,
}

/// A strictly-FIFO, multi-producer / multi-consumer queue of ready
/// [`CommandSequence`]s, matching the source's `TaskQueueMT`.
pub struct WorkQueue {
    wq_mutex: Mutex<WorkQueueInternal>,
    /// Wakes workers blocked in [`Self::wait`] when work is submitted, or
    /// when shutdown begins.
    wq_available_cv: Condvar,
    /// Wakes [`Self::shutdown`] when the registered worker count reaches
    /// zero.
    wq_shutdown_cv: Condvar,
    wq_name: String,
    wq_logger: Logger,
}

impl Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl Display for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl WorkQueue {
    pub fn new(name: impl Into<String>, logger: &Logger) -> Self {
        let name = name.into();
        let logger = logger.new(o!("queue" => name.clone()));
        Self {
            wq_mutex: Mutex::new(WorkQueueInternal {
                wq_tasks: VecDeque::new(),
                wq_shutting_down: false,
                wq_worker_count: 0,
            }),
            wq_available_cv: Condvar::new(),
            wq_shutdown_cv: Condvar::new(),
            wq_name: name,
            wq_logger: logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.wq_name
    }

    /// Appends `sequence` to the tail and wakes any worker blocked in
    /// [`Self::wait`]. Callable from any thread.
    pub fn submit(&self, sequence: CommandSequence) -> anyhow::Result<()> {
        let mut internal = match self.wq_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => anyhow::bail!("Failed to acquire lock on submit with error {}", error),
        };
        internal.wq_tasks.push_back(sequence);
        self.wq_available_cv.notify_all();
        Ok(())
    }

    /// Blocks until a sequence is available or the queue is shutting down.
    ///
    /// Returns `None` iff the queue is shutting down — even if the queue is
    /// momentarily non-empty at that instant (spec §3: "a dequeue returning
    /// 'no work' after shutdown never produces a sequence"). Callers must
    /// stop submitting before calling [`Self::shutdown`].
    pub fn wait(&self) -> anyhow::Result<Option<CommandSequence>> {
        let mut internal = match self.wq_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => anyhow::bail!("Failed to acquire lock on wait with error {}", error),
        };
        loop {
            if internal.wq_shutting_down {
                return Ok(None);
            }
            if let Some(sequence) = internal.wq_tasks.pop_front() {
                return Ok(Some(sequence));
            }
            internal = match self.wq_available_cv.wait(internal) {
                Ok(internal) => internal,
                Err(error) => anyhow::bail!("Failed to wait with error {}", error),
            };
        }
    }

    pub fn register_worker(&self) -> anyhow::Result<()> {
        let mut internal = match self.wq_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => {
                anyhow::bail!("Failed to acquire lock on register worker with error {}", error)
            }
        };
        internal.wq_worker_count += 1;
        Ok(())
    }

    pub fn unregister_worker(&self) -> anyhow::Result<()> {
        let mut internal = match self.wq_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => {
                anyhow::bail!("Failed to acquire lock on unregister worker with error {}", error)
            }
        };
        internal.wq_worker_count -= 1;
        if internal.wq_worker_count == 0 {
            self.wq_shutdown_cv.notify_all();
        }
        Ok(())
    }

    /// Marks the queue as shutting down and blocks until every registered
    /// worker has unregistered. Must only be called once all producers have
    /// stopped submitting.
    pub fn shutdown(&self) -> anyhow::Result<()> {
        let mut internal = match self.wq_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => anyhow::bail!("Failed to acquire lock on shutdown with error {}", error),
        };
        internal.wq_shutting_down = true;
        while internal.wq_worker_count > 0 {
            trace!(
                self.wq_logger,
                "waiting for {} worker(s)",
                internal.wq_worker_count
            );
            self.wq_available_cv.notify_all();
            internal = match self.wq_shutdown_cv.wait(internal) {
                Ok(internal) => internal,
                Err(error) => anyhow::bail!("Failed to wait on shutdown with error {}", error),
            };
        }
        Ok(())
    }

    pub fn num_tasks(&self) -> anyhow::Result<usize> {
        let internal = match self.wq_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => {
                anyhow::bail!("Failed to acquire lock on num_tasks with error {}", error)
            }
        };
        Ok(internal.wq_tasks.len())
    }

    fn fmt_internal(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<WorkQueue Name={:?}/>", self.wq_name)
    }
}
