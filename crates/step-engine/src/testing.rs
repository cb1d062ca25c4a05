//! A reference step-pulse consumer for tests and simulation: drains a
//! [`step_queue::Queue`] exactly the way the hardware timer ISR would,
//! without needing real GPIO or a real timer. Grounded on the
//! `MockAtomicGpioPort`/`MockTimer` test doubles in
//! `examples/<teacher>/crates/mcu-drivers/src/stepper.rs`.

use step_queue::Queue;

/// Tracks absolute position and facing direction across repeated
/// [`ReferenceConsumer::drain`] calls, the same bookkeeping the real
/// output-compare ISR performs one step at a time.
pub struct ReferenceConsumer {
    position: i32,
    dir_high: bool,
}

impl ReferenceConsumer {
    pub const fn new() -> Self {
        Self {
            position: 0,
            dir_high: true,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn dir_high(&self) -> bool {
        self.dir_high
    }

    /// Pops every queued command and emits one `on_pulse(interval, position)`
    /// call per step, flipping direction before the first pulse of a command
    /// whose flip bit is set. `interval` is the tick count elapsed since the
    /// previous pulse (the first pulse of a command uses its start interval,
    /// every following one its running interval plus `delta_change`);
    /// `position` is the absolute position after that pulse.
    pub fn drain<const N: usize>(&mut self, queue: &Queue<N>, mut on_pulse: impl FnMut(u32, i32)) {
        while let Some(cmd) = queue.pop() {
            if cmd.flips_direction() {
                self.dir_high = !self.dir_high;
            }
            let mut interval = cmd.initial_interval() as i32;
            for _ in 0..cmd.step_count() {
                self.position += if self.dir_high { 1 } else { -1 };
                on_pulse(interval.max(0) as u32, self.position);
                interval += cmd.delta_change as i32;
            }
        }
    }
}

impl Default for ReferenceConsumer {
    fn default() -> Self {
        Self::new()
    }
}
