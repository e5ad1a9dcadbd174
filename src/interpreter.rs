/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use slog::error;
use slog::trace;
use slog::Logger;

use crate::command::CommandRecord;
use crate::sequence::CommandSequence;

/// Outcome of driving a [`CommandSequence`] to a suspension point.
///
/// Corresponds to the source's `CommandStatus`, minus `ERROR` (an error here
/// is a lock failure, reported through `anyhow::Result`'s error channel
/// instead of a fourth ok-variant) and `CONTINUE` (an implementation detail
/// of the source's internal loop, not a status `ProcessCommands` ever
/// returns to its caller). Unlike the source, `Yielded` and `Parked` carry
/// no pointer the caller must remember not to use: `process` takes the
/// sequence by value and moves it into the queue or Sync Object itself
/// before returning, so there is nothing left to own on those paths.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The sequence ran out of commands. The caller received it back by
    /// value and may simply let it drop.
    Complete,
    /// The sequence hit a `Yield`; it has already been resubmitted to its
    /// own queue.
    Yielded,
    /// The sequence hit a `Wait` on an unsignaled [`crate::sync_object::SyncObject`]
    /// and has been parked there.
    Parked,
}

/// Drives `sequence` until it completes, yields, or parks on a Sync Object.
///
/// Corresponds to the source's `ProcessCommands`. Draw failures are logged
/// and processing continues — the best-effort rendering model of spec §7 —
/// rather than propagated as an error.
pub fn process(mut sequence: CommandSequence, logger: &Logger) -> anyhow::Result<ProcessOutcome> {
    loop {
        let record = match sequence.pop() {
            Some(record) => record,
            None => return Ok(ProcessOutcome::Complete),
        };
        match record {
            CommandRecord::Draw(op) => {
                let ok = op.execute(sequence.target().as_ref(), sequence.transform());
                if !ok {
                    error!(logger, "Draw command failed at Origin={:?}", sequence.origin());
                }
            }
            CommandRecord::Signal(sync) => {
                sync.signal()?;
            }
            CommandRecord::Wait(sync) => match sync.register(sequence)? {
                Some(returned) => sequence = returned,
                None => return Ok(ProcessOutcome::Parked),
            },
            CommandRecord::Yield => {
                let queue = sequence.queue().clone();
                queue.submit(sequence)?;
                return Ok(ProcessOutcome::Yielded);
            }
            CommandRecord::Print(text) => {
                trace!(logger, "{}", text);
            }
        }
    }
}
