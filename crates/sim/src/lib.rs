//! # In-Process Simulation Harness
//!
//! A deterministic, host-only harness that drives a [`move_planner::MovePlanner`]
//! through its `isr_fill_queue` callback and a [`step_engine::testing::ReferenceConsumer`]
//! the way the overflow-timer ISR and the output-compare ISR would on real
//! hardware, without needing either. Grounded on the `SimMcu`/`SimHost`
//! split in the teacher's `crates/sim`: there, an in-process fake stands in
//! for the MCU side of a host/firmware link; here it stands in for the
//! hardware-timer side of the move planner.

use move_planner::{ChannelId, MovePlanner};
use step_engine::testing::ReferenceConsumer;
use tracing::debug;

/// One recorded step pulse: the interval (in ticks) since the previous
/// pulse, and the consumer's absolute position right after the pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSample {
    pub interval_ticks: u32,
    pub position: i32,
}

/// Bails a [`Sim::run_to_completion`] loop that never reaches its target —
/// a planner bug, not a caller error, so this harness panics rather than
/// returning a `Result`.
const MAX_FILL_ITERATIONS: usize = 1_000_000;

/// Installs a `tracing` subscriber so `isr_fill_queue`'s `debug!` spans and
/// this harness's own `run_to_completion` span are actually printed, the way
/// the teacher's `crates/sim` test binary calls `tracing_subscriber::fmt::init()`
/// at its entry point. Safe to call from every test in a suite: `try_init`
/// no-ops if a subscriber is already installed instead of panicking.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Drives one channel's [`MovePlanner`] to completion and records every
/// emitted pulse.
pub struct Sim<const Q: usize> {
    planner: MovePlanner<Q>,
    consumer: ReferenceConsumer,
    target: i32,
    trace: Vec<PulseSample>,
}

impl<const Q: usize> Sim<Q> {
    pub const fn new(channel_id: ChannelId) -> Self {
        Self {
            planner: MovePlanner::new(channel_id),
            consumer: ReferenceConsumer::new(),
            target: 0,
            trace: Vec::new(),
        }
    }

    pub fn set_dynamics(&mut self, min_travel_ticks: u32, accel: f32) {
        self.planner.set_dynamics(min_travel_ticks, accel);
    }

    pub fn planner(&self) -> &MovePlanner<Q> {
        &self.planner
    }

    pub fn trace(&self) -> &[PulseSample] {
        &self.trace
    }

    pub fn move_by(&mut self, delta: i32) {
        self.target = self.planner.get_position_after_commands_completed() + delta;
        self.planner.move_by(delta);
    }

    pub fn move_to(&mut self, position: i32) {
        self.planner.move_to(position);
        self.target = position;
    }

    /// Runs exactly one `isr_fill_queue` + drain cycle, for tests that need
    /// to inspect or redirect a move partway through instead of running it
    /// to completion.
    pub fn step_once(&mut self) {
        self.planner.isr_fill_queue();
        let trace = &mut self.trace;
        self.consumer
            .drain(self.planner.queue(), |interval_ticks, position| {
                trace.push(PulseSample {
                    interval_ticks,
                    position,
                });
            });
    }

    /// Repeatedly calls `isr_fill_queue` and drains whatever it queues,
    /// as the overflow-timer and output-compare ISRs would in tandem, until
    /// the queue is empty and `pos_at_queue_end` has reached the target.
    ///
    /// Returns the total step count emitted since the harness was created
    /// (or since the last call — the trace accumulates across calls).
    pub fn run_to_completion(&mut self) -> usize {
        let start_len = self.trace.len();
        let mut iterations = 0;
        loop {
            let at_rest = self.planner.is_queue_empty()
                && self.planner.get_position_after_commands_completed() == self.target;
            if at_rest {
                break;
            }
            self.planner.isr_fill_queue();
            let trace = &mut self.trace;
            self.consumer
                .drain(self.planner.queue(), |interval_ticks, position| {
                    trace.push(PulseSample {
                        interval_ticks,
                        position,
                    });
                });
            iterations += 1;
            assert!(
                iterations < MAX_FILL_ITERATIONS,
                "isr_fill_queue never reached target {} (stuck at {})",
                self.target,
                self.planner.get_position_after_commands_completed(),
            );
        }
        debug!(
            channel = self.planner.channel_id().as_str(),
            emitted = self.trace.len() - start_len,
            "run_to_completion finished"
        );
        self.trace.len() - start_len
    }
}
