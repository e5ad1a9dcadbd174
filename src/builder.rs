/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use anyhow::Context;

use crate::command::CommandRecord;
use crate::command::DrawTarget;
use crate::command::Origin;
use crate::command::Transform;
use crate::sequence::CommandSequence;
use crate::work_queue::WorkQueue;

const DEFAULT_INITIAL_ARENA_CAPACITY: usize = 16;

/// Write-side façade that owns a [`CommandSequence`] under construction.
///
/// Single-threaded, and exists only for the duration of one sequence's
/// construction: corresponds to the source's `CommandBufferBuilder`.
pub struct CommandSequenceBuilder {
    in_flight: Option<CommandSequence>,
    initial_arena_capacity: usize,
}

impl Default for CommandSequenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSequenceBuilder {
    pub fn new() -> Self {
        Self {
            in_flight: None,
            initial_arena_capacity: DEFAULT_INITIAL_ARENA_CAPACITY,
        }
    }

    /// Like [`Self::new`], but every sequence `begin`s on this builder starts
    /// with an arena pre-sized to `initial_arena_capacity` records, as
    /// configured by [`crate::config::SchedulerConfig::initial_arena_capacity`].
    pub fn with_capacity(initial_arena_capacity: usize) -> Self {
        Self {
            in_flight: None,
            initial_arena_capacity,
        }
    }

    /// Associates a fresh sequence with `queue` and its execution state.
    ///
    /// # Errors
    /// Fails if a sequence is already in flight on this builder (it must be
    /// finished with [`Self::end`] first).
    pub fn begin(
        &mut self,
        queue: Arc<WorkQueue>,
        target: Arc<dyn DrawTarget>,
        transform: Transform,
        origin: Origin,
    ) -> anyhow::Result<()> {
        if self.in_flight.is_some() {
            anyhow::bail!("begin called while a sequence was already in flight on this builder");
        }
        self.in_flight = Some(CommandSequence::new(
            queue,
            target,
            transform,
            origin,
            self.initial_arena_capacity,
        ));
        Ok(())
    }

    /// Like [`Self::begin`], but reuses `existing`'s arena storage instead of
    /// allocating a new one.
    ///
    /// # Errors
    /// Fails if a sequence is already in flight on this builder.
    pub fn recycle(
        &mut self,
        mut existing: CommandSequence,
        queue: Arc<WorkQueue>,
        target: Arc<dyn DrawTarget>,
        transform: Transform,
        origin: Origin,
    ) -> anyhow::Result<()> {
        if self.in_flight.is_some() {
            anyhow::bail!("recycle called while a sequence was already in flight on this builder");
        }
        existing.recycle(queue, target, transform, origin);
        self.in_flight = Some(existing);
        Ok(())
    }

    /// Appends one command to the sequence currently in flight.
    ///
    /// # Errors
    /// Fails if called outside a `begin`/`recycle` .. `end` span, or if the
    /// sequence's arena is non-growable and full (not reachable through this
    /// builder today, since sequences are always built growable, but kept as
    /// a real error path rather than an `unwrap` for forward compatibility
    /// with a caller-supplied capacity policy).
    pub fn add(&mut self, command: CommandRecord) -> anyhow::Result<()> {
        let sequence = self
            .in_flight
            .as_mut()
            .context("add called without a begin/recycle in progress")?;
        sequence
            .push(command)
            .context("failed to append command to sequence arena")?;
        Ok(())
    }

    /// Finalizes and hands out the sequence; the builder no longer owns it.
    ///
    /// # Errors
    /// Fails if no sequence is in flight.
    pub fn end(&mut self) -> anyhow::Result<CommandSequence> {
        self.in_flight
            .take()
            .context("end called without a begin/recycle in progress")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::build_logger;

    struct NullTarget;
    impl DrawTarget for NullTarget {}

    fn queue() -> Arc<WorkQueue> {
        let logger = build_logger(0);
        Arc::new(WorkQueue::new("builder-test", &logger))
    }

    #[test]
    fn add_before_begin_fails() {
        let mut builder = CommandSequenceBuilder::new();
        assert!(builder.add(CommandRecord::Yield).is_err());
    }

    #[test]
    fn double_begin_fails() {
        let mut builder = CommandSequenceBuilder::new();
        builder
            .begin(queue(), Arc::new(NullTarget), Transform::identity(), Origin::default())
            .unwrap();
        let err = builder.begin(queue(), Arc::new(NullTarget), Transform::identity(), Origin::default());
        assert!(err.is_err());
    }

    #[test]
    fn begin_add_end_round_trips() {
        let mut builder = CommandSequenceBuilder::new();
        builder
            .begin(queue(), Arc::new(NullTarget), Transform::identity(), Origin::default())
            .unwrap();
        builder.add(CommandRecord::Print(Arc::from("hi"))).unwrap();
        builder.add(CommandRecord::Yield).unwrap();
        let mut sequence = builder.end().unwrap();
        assert!(matches!(sequence.pop().unwrap(), CommandRecord::Print(_)));
        assert!(matches!(sequence.pop().unwrap(), CommandRecord::Yield));
        assert!(sequence.pop().is_none());
    }

    #[test]
    fn end_without_begin_fails() {
        let mut builder = CommandSequenceBuilder::new();
        assert!(builder.end().is_err());
    }

    #[test]
    fn recycle_reuses_sequence_after_completion() {
        let mut builder = CommandSequenceBuilder::new();
        builder
            .begin(queue(), Arc::new(NullTarget), Transform::identity(), Origin::default())
            .unwrap();
        builder.add(CommandRecord::Yield).unwrap();
        let mut sequence = builder.end().unwrap();
        let _ = sequence.pop();

        builder
            .recycle(sequence, queue(), Arc::new(NullTarget), Transform::identity(), Origin { x: 3, y: 4 })
            .unwrap();
        builder.add(CommandRecord::Print(Arc::from("again"))).unwrap();
        let mut recycled = builder.end().unwrap();
        assert_eq!(recycled.origin().x, 3);
        assert!(matches!(recycled.pop().unwrap(), CommandRecord::Print(_)));
        assert!(recycled.pop().is_none());
    }
}
