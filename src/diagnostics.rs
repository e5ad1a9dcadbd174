/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use slog::o;
use slog::Drain;
use slog::Level;
use slog::Logger;

/// Builds the root logger for a [`crate::scheduler::Scheduler`].
///
/// A verbosity of zero disables logging entirely (matches the source's
/// "quiet" path); otherwise verbosity is interpreted as a [`slog::Level`]
/// ordinal, same as `SendStreamUpgradeContext::new`'s logger construction,
/// clamped to `Level::Trace` for anything out of range.
pub fn build_logger(verbosity: usize) -> Logger {
    if verbosity == 0 {
        let drain = slog::Discard;
        return slog::Logger::root(drain, o!());
    }
    let level = Level::from_usize(verbosity).unwrap_or(Level::Trace);
    let stderr_term = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(stderr_term).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    slog::Logger::root(drain, o!())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_verbosity_builds_a_logger_without_panicking() {
        let logger = build_logger(0);
        slog::trace!(logger, "discarded");
    }

    #[test]
    fn nonzero_verbosity_builds_a_logger_without_panicking() {
        let logger = build_logger(3);
        slog::trace!(logger, "not discarded, but no one is watching stderr in a test");
    }
}
