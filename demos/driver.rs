/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use clap::Parser;
use cmd_scheduler_lib::CommandRecord;
use cmd_scheduler_lib::DrawTarget;
use cmd_scheduler_lib::Origin;
use cmd_scheduler_lib::Scheduler;
use cmd_scheduler_lib::SchedulerConfig;
use cmd_scheduler_lib::Transform;

/// Reconstruction of the original demo's three-sequence rendezvous: this
/// command-scheduler core has no concrete drawing target, so a no-op one is
/// used in its place.
struct NullTarget;
impl DrawTarget for NullTarget {}

#[derive(Debug, Parser)]
#[command(about = "Runs the command scheduler's A/B/C rendezvous demo")]
struct DriverArgs {
    /// Number of worker threads in the pool.
    #[arg(short, long, default_value_t = 4)]
    worker_count: u32,

    /// Log verbosity (repeat for more detail); 0 disables logging.
    #[arg(short, long, default_value_t = 0)]
    verbose: usize,
}

fn main() -> anyhow::Result<()> {
    let args = DriverArgs::parse();
    let scheduler = Scheduler::new(&SchedulerConfig {
        worker_count: args.worker_count,
        verbosity: args.verbose,
        ..SchedulerConfig::default()
    })?;

    let target: Arc<dyn DrawTarget> = Arc::new(NullTarget);
    let sync_obj = Arc::new(scheduler.sync_object(1));
    let completion_sync = Arc::new(scheduler.sync_object(3));

    // Sequence A: prints 1A, waits for sync_obj, then prints 2A/3A across a
    // yield, then signals completion.
    let mut cmd_a = scheduler.builder();
    cmd_a.begin(
        scheduler.queue().clone(),
        target.clone(),
        Transform::identity(),
        Origin::default(),
    )?;
    cmd_a.add(CommandRecord::Print(Arc::from("1A")))?;
    cmd_a.add(CommandRecord::Wait(sync_obj.clone()))?;
    cmd_a.add(CommandRecord::Print(Arc::from("2A")))?;
    cmd_a.add(CommandRecord::Yield)?;
    cmd_a.add(CommandRecord::Print(Arc::from("3A")))?;
    cmd_a.add(CommandRecord::Print(Arc::from("4A")))?;
    cmd_a.add(CommandRecord::Signal(completion_sync.clone()))?;
    scheduler.queue().submit(cmd_a.end()?)?;

    // Sequence B: prints 1B, waits for sync_obj, prints 2B/3B/4B, signals
    // completion.
    let mut cmd_b = scheduler.builder();
    cmd_b.begin(
        scheduler.queue().clone(),
        target.clone(),
        Transform::identity(),
        Origin::default(),
    )?;
    cmd_b.add(CommandRecord::Print(Arc::from("1B")))?;
    cmd_b.add(CommandRecord::Wait(sync_obj.clone()))?;
    cmd_b.add(CommandRecord::Print(Arc::from("2B")))?;
    cmd_b.add(CommandRecord::Print(Arc::from("3B")))?;
    cmd_b.add(CommandRecord::Print(Arc::from("4B")))?;
    cmd_b.add(CommandRecord::Signal(completion_sync.clone()))?;
    scheduler.queue().submit(cmd_b.end()?)?;

    // Sequence C: prints through a yield, signals sync_obj (unblocking A and
    // B), then signals completion.
    let mut cmd_c = scheduler.builder();
    cmd_c.begin(
        scheduler.queue().clone(),
        target.clone(),
        Transform::identity(),
        Origin::default(),
    )?;
    cmd_c.add(CommandRecord::Print(Arc::from("1C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("2C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("3C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("4C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("5C")))?;
    cmd_c.add(CommandRecord::Yield)?;
    cmd_c.add(CommandRecord::Print(Arc::from("6C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("7C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("8C")))?;
    cmd_c.add(CommandRecord::Print(Arc::from("9C")))?;
    cmd_c.add(CommandRecord::Signal(sync_obj))?;
    cmd_c.add(CommandRecord::Signal(completion_sync.clone()))?;
    scheduler.queue().submit(cmd_c.end()?)?;

    println!(" -- wait for completion");
    completion_sync.wait_sync()?;

    println!(" -- Shutdown");
    scheduler.shutdown()?;
    println!(" -- bye");
    Ok(())
}
