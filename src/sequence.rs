/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;

use crate::arena::ArenaOverflowError;
use crate::arena::PackedByteArena;
use crate::command::CommandRecord;
use crate::command::DrawTarget;
use crate::command::Origin;
use crate::command::Transform;
use crate::work_queue::WorkQueue;

/// An ordered, single-consumer stream of [`CommandRecord`]s plus the
/// execution state ([`Transform`]/[`Origin`]/target) those commands run
/// against, and a back-reference to the [`WorkQueue`] it belongs to.
///
/// Corresponds to the source's `CommandBuffer`. At any instant it is owned by
/// exactly one of: a [`crate::builder::CommandSequenceBuilder`], a
/// [`WorkQueue`], a worker thread, or a [`crate::sync_object::SyncObject`]'s
/// parked list (spec §3, "Ownership summary").
pub struct CommandSequence {
    cs_arena: PackedByteArena<CommandRecord>,
    /// Read cursor into `cs_arena`; only ever advanced by [`Self::pop`].
    cs_cursor: usize,
    cs_remaining: usize,
    cs_queue: Arc<WorkQueue>,
    cs_target: Arc<dyn DrawTarget>,
    cs_transform: Transform,
    cs_origin: Origin,
}

impl Debug for CommandSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl Display for CommandSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_internal(f)
    }
}

impl CommandSequence {
    pub(crate) fn new(
        queue: Arc<WorkQueue>,
        target: Arc<dyn DrawTarget>,
        transform: Transform,
        origin: Origin,
        initial_arena_capacity: usize,
    ) -> Self {
        Self {
            cs_arena: PackedByteArena::new("command sequence", initial_arena_capacity, true),
            cs_cursor: 0,
            cs_remaining: 0,
            cs_queue: queue,
            cs_target: target,
            cs_transform: transform,
            cs_origin: origin,
        }
    }

    /// Appends one command. Only meant to be called by
    /// [`crate::builder::CommandSequenceBuilder::add`] between `begin`/
    /// `recycle` and `end`.
    pub(crate) fn push(&mut self, record: CommandRecord) -> Result<(), ArenaOverflowError> {
        self.cs_arena.append(record)?;
        self.cs_remaining += 1;
        Ok(())
    }

    /// Resets this sequence for reuse by
    /// [`crate::builder::CommandSequenceBuilder::recycle`]: the read cursor,
    /// remaining-record count, and queue/execution-state binding are
    /// replaced, but the arena's backing storage is retained.
    pub(crate) fn recycle(
        &mut self,
        queue: Arc<WorkQueue>,
        target: Arc<dyn DrawTarget>,
        transform: Transform,
        origin: Origin,
    ) {
        self.cs_arena.reset();
        self.cs_cursor = 0;
        self.cs_remaining = 0;
        self.cs_queue = queue;
        self.cs_target = target;
        self.cs_transform = transform;
        self.cs_origin = origin;
    }

    /// Returns the next command, advancing the read cursor, or `None` if the
    /// sequence is drained.
    ///
    /// Must only be called by the thread currently executing this sequence;
    /// `CommandSequence` is not internally synchronized. Safe handoff
    /// between threads is arranged entirely by [`WorkQueue`] and
    /// [`crate::sync_object::SyncObject`], which own exclusive access to a
    /// sequence whenever more than one thread could otherwise see it.
    pub fn pop(&mut self) -> Option<CommandRecord> {
        if self.cs_remaining == 0 {
            return None;
        }
        let record = self
            .cs_arena
            .at(self.cs_cursor)
            .cloned()
            .expect("cursor within [0, remaining) must address a previously appended record");
        self.cs_cursor += 1;
        self.cs_remaining -= 1;
        Some(record)
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.cs_queue
    }

    pub fn target(&self) -> &Arc<dyn DrawTarget> {
        &self.cs_target
    }

    pub fn transform(&self) -> &Transform {
        &self.cs_transform
    }

    pub fn origin(&self) -> &Origin {
        &self.cs_origin
    }

    fn fmt_internal(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<CommandSequence Remaining={} Queue={:?}/>",
            self.cs_remaining, self.cs_queue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::build_logger;

    struct NullTarget;
    impl DrawTarget for NullTarget {}

    fn new_sequence() -> CommandSequence {
        let logger = build_logger(0);
        let queue = Arc::new(WorkQueue::new("test", &logger));
        CommandSequence::new(queue, Arc::new(NullTarget), Transform::identity(), Origin::default(), 4)
    }

    #[test]
    fn pop_drains_exactly_what_was_pushed_in_order() {
        let mut sequence = new_sequence();
        sequence.push(CommandRecord::Print(Arc::from("a"))).unwrap();
        sequence.push(CommandRecord::Yield).unwrap();
        sequence.push(CommandRecord::Print(Arc::from("b"))).unwrap();

        let first = sequence.pop().unwrap();
        assert!(matches!(first, CommandRecord::Print(text) if &*text == "a"));
        assert!(matches!(sequence.pop().unwrap(), CommandRecord::Yield));
        let third = sequence.pop().unwrap();
        assert!(matches!(third, CommandRecord::Print(text) if &*text == "b"));
        assert!(sequence.pop().is_none());
    }

    #[test]
    fn recycle_resets_cursor_and_count_but_keeps_capacity() {
        let mut sequence = new_sequence();
        sequence.push(CommandRecord::Yield).unwrap();
        sequence.push(CommandRecord::Yield).unwrap();
        let _ = sequence.pop();

        let logger = build_logger(0);
        let new_queue = Arc::new(WorkQueue::new("recycled-into", &logger));
        sequence.recycle(new_queue.clone(), Arc::new(NullTarget), Transform::identity(), Origin { x: 1, y: 2 });

        assert!(sequence.pop().is_none());
        sequence.push(CommandRecord::Print(Arc::from("fresh"))).unwrap();
        let record = sequence.pop().unwrap();
        assert!(matches!(record, CommandRecord::Print(text) if &*text == "fresh"));
        assert_eq!(sequence.origin().x, 1);
        assert_eq!(sequence.queue().name(), "recycled-into");
    }
}
