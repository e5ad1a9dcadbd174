/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use thiserror::Error;

/// Error raised when appending to a non-growable, full [`PackedByteArena`].
#[derive(Debug, Error)]
#[error("packed byte arena \"{name}\" is full at capacity {capacity}")]
pub struct ArenaOverflowError {
    name: String,
    capacity: usize,
}

/// A grow-on-overflow container that appends values of a single record type
/// and returns stable offsets for as long as the arena is alive.
///
/// This plays the role the source's `Pool`/`GrowablePool` (a raw `memcpy`
/// byte pool) play, but stores `T` directly instead of its byte
/// representation: per the spec's own design notes the on-the-wire layout is
/// not part of the contract, and a `memcpy`-based pool has no sound
/// generalization to non-`Copy` payloads such as the `Arc`s a `CommandRecord`
/// holds. Growth still follows the source's doubling policy.
pub struct PackedByteArena<T> {
    name: String,
    records: Vec<T>,
    growable: bool,
}

impl<T> PackedByteArena<T> {
    /// Creates a new arena with the given initial capacity.
    pub fn new(name: impl Into<String>, initial_capacity: usize, growable: bool) -> Self {
        Self {
            name: name.into(),
            records: Vec::with_capacity(initial_capacity),
            growable,
        }
    }

    /// Appends `value`, returning the offset it was stored at.
    ///
    /// A non-growable arena that is at capacity fails without mutating
    /// state; a growable arena doubles its capacity (preserving every prior
    /// offset) before appending.
    pub fn append(&mut self, value: T) -> Result<usize, ArenaOverflowError> {
        if !self.growable && self.records.len() == self.records.capacity() {
            return Err(ArenaOverflowError {
                name: self.name.clone(),
                capacity: self.records.capacity(),
            });
        }
        let offset = self.records.len();
        self.records.push(value);
        Ok(offset)
    }

    /// Returns the value at `offset`, if `offset` was previously returned by
    /// [`Self::append`] on this arena and has not since been invalidated by a
    /// [`Self::reset`].
    pub fn at(&self, offset: usize) -> Option<&T> {
        self.records.get(offset)
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clears the write cursor to zero, dropping any stored records but
    /// retaining the underlying capacity for reuse.
    pub fn reset(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_increasing_offsets() {
        let mut arena = PackedByteArena::new("test", 2, true);
        assert_eq!(arena.append(10).unwrap(), 0);
        assert_eq!(arena.append(20).unwrap(), 1);
        assert_eq!(arena.append(30).unwrap(), 2);
        assert_eq!(arena.at(0), Some(&10));
        assert_eq!(arena.at(1), Some(&20));
        assert_eq!(arena.at(2), Some(&30));
    }

    #[test]
    fn growth_preserves_prior_offsets() {
        let mut arena = PackedByteArena::new("test", 1, true);
        let mut offsets = Vec::new();
        for i in 0..64 {
            offsets.push(arena.append(i).unwrap());
        }
        for (i, offset) in offsets.iter().enumerate() {
            assert_eq!(arena.at(*offset), Some(&i));
        }
    }

    #[test]
    fn non_growable_overflow_fails_without_mutating_state() {
        let mut arena = PackedByteArena::new("fixed", 2, false);
        arena.append(1).unwrap();
        arena.append(2).unwrap();
        let err = arena.append(3).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.at(0), Some(&1));
        assert_eq!(arena.at(1), Some(&2));
    }

    #[test]
    fn reset_clears_len_but_not_capacity() {
        let mut arena = PackedByteArena::new("recycled", 4, true);
        arena.append(1).unwrap();
        arena.append(2).unwrap();
        let capacity_before = arena.records.capacity();
        arena.reset();
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.records.capacity(), capacity_before);
        assert_eq!(arena.append(9).unwrap(), 0);
    }
}
