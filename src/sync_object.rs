/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Condvar;
use std::sync::Mutex;

use slog::crit;
use slog::o;
use slog::Logger;

use crate::sequence::CommandSequence;

struct SyncObjectInternal {
    /// Remaining signals before this object is considered signaled.
    ///
    /// Monotonically non-increasing; once it reaches zero it never moves
    /// again (spec §3: "counter is monotonically non-increasing").
    so_remaining: u32,
    /// Sequences parked here by [`SyncObject::register`], in registration
    /// order. Drained exactly once, by whichever [`SyncObject::signal`]
    /// call brings `so_remaining` to zero.
    so_parked: Vec<CommandSequence>,
}

/// Countdown rendezvous matching the source's `SyncObject`: threads can
/// block on it synchronously ([`SyncObject::wait_sync`]), and
/// [`CommandSequence`]s can park on it for asynchronous resumption
/// ([`SyncObject::register`]).
///
/// "Armed" while the internal counter is greater than zero, "signaled" once
/// it reaches zero (spec §4.4).
pub struct SyncObject {
    so_mutex: Mutex<SyncObjectInternal>,
    so_cv: Condvar,
    so_logger: Logger,
}

impl Debug for SyncObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl Display for SyncObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl SyncObject {
    /// Creates a Sync Object requiring `required_signals` calls to
    /// [`Self::signal`] before it is considered signaled.
    ///
    /// # Panics
    /// Panics if `required_signals` is zero: a Sync Object that starts
    /// signaled has no well-defined "the Nth signal drains the parked list"
    /// moment, which every caller of this type relies on.
    pub fn new(required_signals: u32, logger: &Logger) -> Self {
        assert!(
            required_signals >= 1,
            "SyncObject requires at least one signal"
        );
        Self {
            so_mutex: Mutex::new(SyncObjectInternal {
                so_remaining: required_signals,
                so_parked: Vec::new(),
            }),
            so_cv: Condvar::new(),
            so_logger: logger.new(o!("component" => "sync_object")),
        }
    }

    /// Registers `sequence` to be resubmitted once this object is signaled.
    ///
    /// Returns `Ok(None)` if the sequence was parked (ownership transferred
    /// to this Sync Object); returns `Ok(Some(sequence))` if the object was
    /// already signaled, handing the sequence straight back to the caller,
    /// which must continue processing it.
    pub fn register(
        &self,
        sequence: CommandSequence,
    ) -> anyhow::Result<Option<CommandSequence>> {
        let mut internal = match self.so_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => anyhow::bail!("Failed to acquire lock on register with error {}", error),
        };
        if internal.so_remaining == 0 {
            return Ok(Some(sequence));
        }
        internal.so_parked.push(sequence);
        Ok(None)
    }

    /// Decrements the signal counter. A no-op if already signaled.
    ///
    /// On the decrement that brings the counter to zero, drains the parked
    /// list and resubmits every parked sequence to its own queue, then wakes
    /// any threads blocked in [`Self::wait_sync`] — all while still holding
    /// this object's lock (spec §4.4: "atomically with still holding the
    /// lock").
    pub fn signal(&self) -> anyhow::Result<()> {
        let mut internal = match self.so_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => anyhow::bail!("Failed to acquire lock on signal with error {}", error),
        };
        if internal.so_remaining == 0 {
            return Ok(());
        }
        internal.so_remaining -= 1;
        if internal.so_remaining == 0 {
            for sequence in internal.so_parked.drain(..) {
                sequence.queue().clone().submit(sequence)?;
            }
            self.so_cv.notify_all();
        }
        Ok(())
    }

    /// Blocks the calling thread until this object is signaled. Returns
    /// immediately if already signaled.
    pub fn wait_sync(&self) -> anyhow::Result<()> {
        let mut internal = match self.so_mutex.lock() {
            Ok(internal) => internal,
            Err(error) => {
                anyhow::bail!("Failed to acquire lock on wait_sync with error {}", error)
            }
        };
        while internal.so_remaining > 0 {
            internal = match self.so_cv.wait(internal) {
                Ok(internal) => internal,
                Err(error) => anyhow::bail!("Failed to wait with error {}", error),
            };
        }
        Ok(())
    }

    fn fmt_internal(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<SyncObject/>")
    }
}

impl Drop for SyncObject {
    /// A non-empty parked list at destruction is a programming error (spec
    /// §4.4 / §7): some code path registered a sequence on a Sync Object
    /// that will never be signaled again. Matches the source's `assert`
    /// in `~SyncObject()`.
    fn drop(&mut self) {
        if let Ok(internal) = self.so_mutex.lock() {
            if !internal.so_parked.is_empty() {
                crit!(
                    self.so_logger,
                    "SyncObject dropped with {} sequence(s) still parked",
                    internal.so_parked.len()
                );
                debug_assert!(
                    internal.so_parked.is_empty(),
                    "SyncObject dropped with sequences still parked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::command::DrawTarget;
    use crate::command::Origin;
    use crate::command::Transform;
    use crate::diagnostics::build_logger;
    use crate::work_queue::WorkQueue;

    struct NullTarget;
    impl DrawTarget for NullTarget {}

    fn sequence(queue: Arc<WorkQueue>) -> CommandSequence {
        CommandSequence::new(queue, Arc::new(NullTarget), Transform::identity(), Origin::default(), 4)
    }

    #[test]
    fn register_while_armed_parks_and_returns_none() {
        let logger = build_logger(0);
        let queue = Arc::new(WorkQueue::new("q", &logger));
        let sync = SyncObject::new(1, &logger);
        let parked = sync.register(sequence(queue)).unwrap();
        assert!(parked.is_none());
    }

    #[test]
    fn register_after_signaled_returns_sequence_back() {
        let logger = build_logger(0);
        let queue = Arc::new(WorkQueue::new("q", &logger));
        let sync = SyncObject::new(1, &logger);
        sync.signal().unwrap();
        let returned = sync.register(sequence(queue)).unwrap();
        assert!(returned.is_some());
    }

    #[test]
    fn nth_signal_drains_parked_list_into_its_queue() {
        let logger = build_logger(0);
        let queue = Arc::new(WorkQueue::new("q", &logger));
        let sync = SyncObject::new(2, &logger);
        assert!(sync.register(sequence(queue.clone())).unwrap().is_none());
        assert_eq!(queue.num_tasks().unwrap(), 0);
        sync.signal().unwrap();
        assert_eq!(queue.num_tasks().unwrap(), 0);
        sync.signal().unwrap();
        assert_eq!(queue.num_tasks().unwrap(), 1);
    }

    #[test]
    fn extra_signals_past_zero_are_no_ops() {
        let logger = build_logger(0);
        let sync = SyncObject::new(1, &logger);
        sync.signal().unwrap();
        sync.signal().unwrap();
        sync.signal().unwrap();
    }

    #[test]
    fn wait_sync_blocks_until_fully_signaled() {
        let logger = build_logger(0);
        let sync = Arc::new(SyncObject::new(2, &logger));
        let waiter = sync.clone();
        let handle = thread::spawn(move || waiter.wait_sync().unwrap());
        thread::sleep(Duration::from_millis(20));
        sync.signal().unwrap();
        thread::sleep(Duration::from_millis(20));
        sync.signal().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn wait_sync_returns_immediately_if_already_signaled() {
        let logger = build_logger(0);
        let sync = SyncObject::new(1, &logger);
        sync.signal().unwrap();
        sync.wait_sync().unwrap();
    }
}
