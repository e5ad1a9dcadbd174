/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use slog::o;
use slog::trace;
use slog::Logger;

use crate::interpreter;
use crate::interpreter::ProcessOutcome;
use crate::work_queue::WorkQueue;

/// RAII guard that unregisters a worker from its [`WorkQueue`] when dropped,
/// including on an early return out of the worker loop. Registration itself
/// already happened synchronously on the producer thread, in
/// [`WorkerHandle::spawn`], before this guard (and the OS thread it lives on)
/// ever existed — matching the source's `WorkerThread::WorkerThread()`, which
/// calls `RegisterThread()` before `pthread_create()` so the worker count is
/// incremented before the constructor returns. This guard only plays the
/// `UnregisterThread()` half, and does so even on an early return, which the
/// source has no equivalent of because `Run()` has no error path to return
/// early from.
struct WorkerRegistration<'a> {
    queue: &'a WorkQueue,
}

impl<'a> WorkerRegistration<'a> {
    fn new(queue: &'a WorkQueue) -> Self {
        Self { queue }
    }
}

impl Drop for WorkerRegistration<'_> {
    fn drop(&mut self) {
        let _ = self.queue.unregister_worker();
    }
}

/// Runs the worker loop directly on the calling thread: repeatedly waits on
/// `queue`, drives whatever it dequeues through [`interpreter::process`],
/// and exits once the queue reports shutdown.
///
/// Corresponds to the source's `WorkerThread::Run`. The caller must already
/// have registered this worker with `queue` (see [`WorkerHandle::spawn`]);
/// this function only unregisters, on exit or early return.
pub fn run_worker_loop(queue: &WorkQueue, logger: &Logger) -> anyhow::Result<()> {
    let _registration = WorkerRegistration::new(queue);
    loop {
        let sequence = match queue.wait()? {
            Some(sequence) => sequence,
            None => return Ok(()),
        };
        match interpreter::process(sequence, logger)? {
            ProcessOutcome::Complete | ProcessOutcome::Yielded | ProcessOutcome::Parked => {}
        }
    }
}

/// A single OS-level worker thread bound to a [`WorkQueue`], matching the
/// source's `WorkerThread`: created registered, joined (and thereby
/// unregistered) on drop/explicit join.
pub struct WorkerHandle {
    wh_name: String,
    wh_status: Option<JoinHandle<anyhow::Result<()>>>,
}

impl Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl Display for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl WorkerHandle {
    /// Spawns a new worker thread bound to `queue`. Matches the source's
    /// "creating thread" trace.
    ///
    /// Registers with `queue` synchronously, on the calling thread, before
    /// the OS thread is created — matching `WorkerThread::WorkerThread()`'s
    /// `RegisterThread()`-before-`pthread_create()` ordering, so that a
    /// `shutdown()` racing a freshly spawned worker can never observe a
    /// worker count of zero for a worker that hasn't run yet.
    ///
    /// # Errors
    /// Propagates a failure to register with `queue`, or to spawn the OS
    /// thread itself (e.g. resource exhaustion) — the latter unregisters the
    /// worker it had just registered before returning.
    pub fn spawn(
        name: impl Into<String>,
        queue: Arc<WorkQueue>,
        logger: &Logger,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        let logger = logger.new(o!("worker" => name.clone()));
        trace!(logger, "creating thread");
        queue.register_worker()?;
        let thread_logger = logger;
        let handle_name = name.clone();
        let unregister_queue = queue.clone();
        let handle = match thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker_loop(&queue, &thread_logger))
        {
            Ok(handle) => handle,
            Err(error) => {
                let _ = unregister_queue.unregister_worker();
                return Err(anyhow::Error::from(error).context("failed to spawn worker thread"));
            }
        };
        Ok(Self {
            wh_name: handle_name,
            wh_status: Some(handle),
        })
    }

    /// Blocks until the worker thread exits, matching the source's
    /// "joining thread" trace in `~WorkerThread`.
    ///
    /// # Errors
    /// Propagates any error returned by the worker loop, and converts a
    /// panic inside the thread into an `anyhow::Error` rather than
    /// re-panicking the joining thread.
    pub fn join(mut self, logger: &Logger) -> anyhow::Result<()> {
        trace!(logger, "joining thread {}", self.wh_name);
        let handle = match self.wh_status.take() {
            Some(handle) => handle,
            None => anyhow::bail!("worker {} already joined", self.wh_name),
        };
        match handle.join() {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "<non-string panic payload>".to_string());
                anyhow::bail!("worker {} panicked: {}", self.wh_name, message)
            }
        }
    }

    fn fmt_internal(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<WorkerHandle Name={:?} Joined={}/>",
            self.wh_name,
            self.wh_status.is_none()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::CommandSequenceBuilder;
    use crate::command::CommandRecord;
    use crate::command::DrawTarget;
    use crate::command::Origin;
    use crate::command::Transform;
    use crate::diagnostics::build_logger;

    struct NullTarget;
    impl DrawTarget for NullTarget {}

    #[test]
    fn worker_drains_queue_then_exits_on_shutdown() {
        let logger = build_logger(0);
        let queue = Arc::new(WorkQueue::new("worker-test", &logger));

        let mut builder = CommandSequenceBuilder::new();
        builder
            .begin(queue.clone(), Arc::new(NullTarget), Transform::identity(), Origin::default())
            .unwrap();
        builder.add(CommandRecord::Print(Arc::from("hello"))).unwrap();
        queue.submit(builder.end().unwrap()).unwrap();

        let handle = WorkerHandle::spawn("w0", queue.clone(), &logger).unwrap();
        // Give the worker a chance to drain the single task before shutdown.
        std::thread::sleep(std::time::Duration::from_millis(20));
        queue.shutdown().unwrap();
        handle.join(&logger).unwrap();
        assert_eq!(queue.num_tasks().unwrap(), 0);
    }

    #[test]
    fn spawn_registers_with_the_queue_before_returning() {
        let logger = build_logger(0);
        let queue = Arc::new(WorkQueue::new("register-before-return", &logger));
        let handle = WorkerHandle::spawn("w0", queue.clone(), &logger).unwrap();
        // No sleep: if registration happened on the spawned thread instead
        // of synchronously in `spawn`, this shutdown could race ahead of it
        // and return immediately with the worker still running.
        queue.shutdown().unwrap();
        handle.join(&logger).unwrap();
    }
}
