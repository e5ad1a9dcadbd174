/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Knobs a caller of this library needs to stand up a [`crate::scheduler::Scheduler`],
/// mirroring the shape (if not the exhaustive option set) of the teacher
/// lineage's `SendStreamUpgradeOptions`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads in the pool.
    ///
    /// 4 is the default, matching the worker count used throughout the
    /// spec's end-to-end scenarios (spec §8).
    pub worker_count: u32,

    /// Initial capacity (in records) of a freshly `begin`-ed sequence's
    /// arena, before any growth.
    ///
    /// 16 is the default; chosen to avoid a reallocation for small
    /// command sequences without over-allocating for one-shot ones.
    pub initial_arena_capacity: usize,

    /// Log verbosity, interpreted by [`crate::diagnostics::build_logger`].
    ///
    /// 0 disables logging entirely; higher values map to increasingly
    /// permissive `slog::Level`s.
    pub verbosity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            initial_arena_capacity: 16,
            verbosity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.initial_arena_capacity, 16);
        assert_eq!(config.verbosity, 0);
    }
}
