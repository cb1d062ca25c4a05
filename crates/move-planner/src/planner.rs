//! The trapezoidal move planner itself.
//!
//! Ground truth for the arithmetic in this file is
//! `examples/original_source/src/FastAccelStepper.cpp`'s
//! `_calculate_move`/`isr_fill_queue`/`add_queue_entry`, generalized from
//! AVR-specific globals to an owned, reusable `MovePlanner<Q>`.

use crate::channel::ChannelId;
use crate::error::AddQueueEntryError;
use crate::CLOCK_FREQ_HZ;
use step_queue::{encode_interval, Queue, StepCommand, MAX_INTERVAL_TICKS, MIN_INTERVAL_TICKS};

#[cfg(not(feature = "std"))]
use libm::{roundf, sqrtf};
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}
#[cfg(feature = "std")]
fn roundf(x: f32) -> f32 {
    x.round()
}

/// Minimum planning horizon: 4000 ticks (250 µs) so the ISR is never asked
/// to schedule a segment shorter than this, avoiding starvation.
const MIN_DTICKS: u32 = 4_000;

/// The mode `isr_fill_queue` selects for the next segment; at most one
/// holds at a time (SPEC_FULL.md §4.4 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Accelerate,
    ReduceSpeed,
    DecelerateToStop,
    Cruise,
}

/// Owns one channel's target position, kinematics, and the queue-tail state
/// needed to plan the next segment. `Q` is the ring's power-of-two
/// capacity.
pub struct MovePlanner<const Q: usize> {
    channel_id: ChannelId,
    queue: Queue<Q>,

    target_pos: i32,
    pos_at_queue_end: i32,
    dir_high_at_queue_end: bool,
    /// Interval of the last step of the last queued command; 0 means "cold
    /// start" (motor at rest, queue empty).
    ticks_at_queue_end: u32,

    min_travel_ticks: u32,
    accel: f32,
    min_steps: u32,

    deceleration_start: u32,
    dec_time_ms: f32,

    isr_control_enabled: bool,
}

impl<const Q: usize> MovePlanner<Q> {
    pub const fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            queue: Queue::new(),
            target_pos: 0,
            pos_at_queue_end: 0,
            dir_high_at_queue_end: true,
            ticks_at_queue_end: 0,
            min_travel_ticks: 0,
            accel: 0.0,
            min_steps: 0,
            deceleration_start: 0,
            dec_time_ms: 0.0,
            isr_control_enabled: false,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Stores new kinematics and recomputes `min_steps`. Does not recompute
    /// an in-flight `deceleration_start` — SPEC_FULL.md §9 documents this as
    /// an intentional limitation; reissue `move_to` after retuning
    /// mid-move if the new dynamics should govern the active stop.
    ///
    /// No failure: `accel == 0` divides by zero here exactly as the
    /// original does, and that is the caller's responsibility (§7).
    pub fn set_dynamics(&mut self, min_travel_ticks: u32, accel: f32) {
        self.min_travel_ticks = min_travel_ticks;
        self.accel = accel;
        self.min_steps = roundf(
            CLOCK_FREQ_HZ * CLOCK_FREQ_HZ
                / accel
                / min_travel_ticks as f32
                / min_travel_ticks as f32,
        ) as u32;
    }

    /// Sets `target_pos = pos_at_queue_end + delta` and recomputes the
    /// deceleration schedule.
    pub fn move_by(&mut self, delta: i32) {
        self.target_pos = self.pos_at_queue_end + delta;
        self.calculate_move(delta);
    }

    /// Sets `target_pos = position` and recomputes the deceleration
    /// schedule. `delta` is relative to `pos_at_queue_end`, i.e. the
    /// remaining distance from where the motor will be once queued
    /// commands drain — matching `moveTo`'s use of the same quantity as
    /// `move`, not the delta from the previous target.
    pub fn move_to(&mut self, position: i32) {
        let delta = position - self.pos_at_queue_end;
        self.target_pos = position;
        self.calculate_move(delta);
    }

    pub fn get_position_after_commands_completed(&self) -> i32 {
        self.pos_at_queue_end
    }

    /// Estimates the motor's real-time position by replaying queued-but-
    /// unexecuted commands backward from `pos_at_queue_end`, using each
    /// command's direction-flip bit and step count. On an empty queue this
    /// equals `pos_at_queue_end`.
    pub fn get_current_position(&self) -> i32 {
        critical_section::with(|_cs| {
            let (read, write) = self.queue.snapshot_pointers();
            let mut pos = self.pos_at_queue_end;
            let mut dir = self.dir_high_at_queue_end;
            let mut wp = write;
            while wp != read {
                wp = self.queue.prev_index(wp);
                let cmd = self.queue.peek_at(wp);
                let steps = cmd.step_count() as i32;
                if dir {
                    pos -= steps;
                } else {
                    pos += steps;
                }
                if cmd.flips_direction() {
                    dir = !dir;
                }
            }
            pos
        })
    }

    pub fn is_running(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_queue_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Gives the periodic ISR access to the queue tail interval without
    /// exposing the whole planner, for the reference SPE test double.
    pub fn ticks_at_queue_end(&self) -> u32 {
        self.ticks_at_queue_end
    }

    pub fn queue(&self) -> &Queue<Q> {
        &self.queue
    }

    /// The committed `deceleration_start` from the last `_calculate_move`,
    /// exposed for tests that check the ramp schedule directly.
    pub fn deceleration_start(&self) -> u32 {
        self.deceleration_start
    }

    /// Move precomputation (SPEC_FULL.md §4.3): given the pending signed
    /// move `delta`, decides whether this is an emergency stop, a normal
    /// acceleration, or a move starting already at/above cruise speed, and
    /// publishes `deceleration_start`/`dec_time_ms` accordingly.
    fn calculate_move(&mut self, delta: i32) {
        if delta == 0 {
            return;
        }
        let steps = delta.unsigned_abs();

        if self.ticks_at_queue_end == 0 {
            self.ticks_at_queue_end = bootstrap_interval(self.accel);
        }
        let curr_speed = CLOCK_FREQ_HZ / self.ticks_at_queue_end as f32;
        let s_stop = roundf(curr_speed * curr_speed / (2.0 * self.accel)) as u32;

        let (new_deceleration_start, new_dec_time_ms);
        if s_stop > steps {
            new_deceleration_start = steps;
            new_dec_time_ms = roundf(2000.0 * steps as f32 / curr_speed);
        } else if self.ticks_at_queue_end > self.min_travel_ticks {
            let s_full_ramp = steps + s_stop;
            let ramp_steps = s_full_ramp.min(self.min_steps);
            new_deceleration_start = ramp_steps / 2;
            new_dec_time_ms = roundf(1000.0 * sqrtf(ramp_steps as f32 / self.accel));
        } else {
            new_deceleration_start = self.min_steps / 2;
            let v_max = CLOCK_FREQ_HZ / self.min_travel_ticks as f32;
            new_dec_time_ms = roundf(1000.0 * v_max / self.accel);
        }

        critical_section::with(|_cs| {
            self.deceleration_start = new_deceleration_start;
            self.dec_time_ms = new_dec_time_ms;
        });
        self.isr_control_enabled = true;
    }

    /// The periodic planner callback (SPEC_FULL.md §4.4), invoked from the
    /// timer-overflow ISR to top up the queue with the next segment.
    pub fn isr_fill_queue(&mut self) {
        if !self.isr_control_enabled {
            return;
        }
        if self.queue.is_full() {
            return;
        }
        if self.queue.is_empty() && self.target_pos == self.pos_at_queue_end {
            self.isr_control_enabled = false;
            return;
        }
        if self.target_pos == self.pos_at_queue_end {
            return;
        }

        let remaining_steps = self.target_pos - self.pos_at_queue_end;
        if self.ticks_at_queue_end == 0 {
            self.ticks_at_queue_end = bootstrap_interval(self.accel);
        }

        let abs_remaining = remaining_steps.unsigned_abs();
        let mode = if abs_remaining <= self.deceleration_start {
            Mode::DecelerateToStop
        } else if self.ticks_at_queue_end > self.min_travel_ticks {
            Mode::Accelerate
        } else if self.ticks_at_queue_end < self.min_travel_ticks {
            Mode::ReduceSpeed
        } else {
            Mode::Cruise
        };

        let mut dticks = self.ticks_at_queue_end.max(MIN_DTICKS);
        let mut curr_speed = CLOCK_FREQ_HZ / self.ticks_at_queue_end as f32;
        let requested_speed = if self.min_travel_ticks != 0 {
            CLOCK_FREQ_HZ / self.min_travel_ticks as f32
        } else {
            0.0
        };

        match mode {
            Mode::Accelerate => {
                let dv = self.accel * dticks as f32 / CLOCK_FREQ_HZ;
                if dv < 1.0 {
                    dticks = roundf(CLOCK_FREQ_HZ / self.accel) as u32;
                }
                curr_speed = (curr_speed + dv).min(requested_speed);
            }
            Mode::ReduceSpeed => {
                curr_speed =
                    (curr_speed - self.accel * dticks as f32 / CLOCK_FREQ_HZ).max(requested_speed);
            }
            Mode::DecelerateToStop => {
                self.dec_time_ms = (self.dec_time_ms - dticks as f32 / 16_000.0).max(1.0);
                let v_envelope = 2.0 * abs_remaining as f32 * 1000.0 / self.dec_time_ms;
                curr_speed = v_envelope.min(curr_speed);
            }
            Mode::Cruise => {}
        }

        #[cfg(feature = "std")]
        tracing::debug!(
            channel = self.channel_id.as_str(),
            mode = ?mode,
            remaining_steps,
            dticks,
            curr_speed,
            "isr_fill_queue planning segment"
        );

        let ticks_after_command = roundf(CLOCK_FREQ_HZ / curr_speed) as u32;

        let cap = abs_remaining.min(127);
        let mut steps = (dticks / ticks_after_command).max(1).min(cap);

        let ticks_at_queue_end_before = self.ticks_at_queue_end;
        let (ticks_at_start, change) = if steps > 1 {
            let s2 = (steps * (steps - 1) / 2) as i32;
            let mut change = ticks_after_command as i32 - ticks_at_queue_end_before as i32;
            if change.abs() > 32768 {
                let ticks_at_start = (ticks_at_queue_end_before as i32 + change) as u32;
                steps = 1;
                (ticks_at_start, 0i32)
            } else {
                change /= s2;
                (ticks_at_queue_end_before, change)
            }
        } else {
            (ticks_after_command, 0)
        };

        let dir_high = remaining_steps > 0;
        let result = self.add_queue_entry(ticks_at_start, steps as u8, dir_high, change as i16);

        #[cfg(feature = "std")]
        if let Err(e) = result {
            tracing::trace!(channel = self.channel_id.as_str(), error = ?e, "add_queue_entry rejected segment");
        }
        let _ = result;

        if steps == abs_remaining {
            self.ticks_at_queue_end = 0;
        }
    }

    /// Validates and pushes one step command (SPEC_FULL.md §4.5). On
    /// success, updates `pos_at_queue_end`, `dir_high_at_queue_end`, and
    /// `ticks_at_queue_end` to the interval of the segment's last step.
    fn add_queue_entry(
        &mut self,
        start_delta_ticks: u32,
        steps: u8,
        dir_high: bool,
        change_ticks: i16,
    ) -> Result<(), AddQueueEntryError> {
        if steps >= 128 {
            return Err(AddQueueEntryError::StepsError);
        }
        if start_delta_ticks > MAX_INTERVAL_TICKS {
            return Err(AddQueueEntryError::TooHigh);
        }
        let c_sum = change_ticks as i32 * steps as i32;
        if change_ticks > 0 {
            if c_sum > 32768 {
                return Err(AddQueueEntryError::ChangeTooHigh);
            }
        } else if change_ticks < 0 {
            if c_sum < -32768 {
                return Err(AddQueueEntryError::ChangeTooLow);
            }
            if (start_delta_ticks as i64 + c_sum as i64) < MIN_INTERVAL_TICKS as i64 {
                return Err(AddQueueEntryError::ChangeTooLow);
            }
        }

        let (delta_msb, delta_lsw) = encode_interval(start_delta_ticks);
        let flip = dir_high != self.dir_high_at_queue_end;
        let packed_steps = (steps << 1) | (flip as u8);
        let cmd = StepCommand {
            delta_msb,
            delta_lsw,
            delta_change: change_ticks,
            steps: packed_steps,
        };
        self.queue.push(cmd).map_err(|_| AddQueueEntryError::Full)?;

        self.pos_at_queue_end += if dir_high {
            steps as i32
        } else {
            -(steps as i32)
        };
        self.ticks_at_queue_end =
            (change_ticks as i32 * (steps as i32 - 1) + start_delta_ticks as i32) as u32;
        self.dir_high_at_queue_end = dir_high;
        Ok(())
    }
}

/// `round(16e6 * sqrt(2/accel))`: the interval equivalent to one step under
/// uniform acceleration starting from rest.
fn bootstrap_interval(accel: f32) -> u32 {
    roundf(CLOCK_FREQ_HZ * sqrtf(2.0 / accel)) as u32
}
