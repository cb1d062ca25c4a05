//! # Step Command Queue
//!
//! A fixed-capacity, lock-free single-producer/single-consumer ring buffer of
//! [`StepCommand`]s. The producer is the move planner (running from the
//! overflow-timer ISR); the consumer is the hardware output-compare ISR that
//! drives the step pin. Only the producer ever writes queue slots; only the
//! consumer ever advances the read index. The two indices are published with
//! explicit `Release`/`Acquire` ordering so the consumer never observes a
//! slot's fields before it observes the write-index update that publishes
//! them.
//!
//! This plays the role that `heapless::spsc::Queue` plays for
//! `mcu-drivers::stepper::StepperController`, generalized to the bespoke
//! four-field command layout required here (see [`StepCommand`]): the
//! planner needs to write fields individually and then encode a
//! direction-flip bit into the *last* field before publishing, which a
//! queue of opaque `T` values cannot express.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU8, Ordering};

/// Ticks below this the encoder refuses to go: 16 MHz / 32 kHz.
pub const MIN_INTERVAL_TICKS: u32 = 500;

/// Largest interval representable by the two-word encoding in [`encode_interval`]:
/// `msb` tops out at 255 and the low scheme's payload at `0x3FFF`, giving
/// `(255 + 1) * 16384 + 0x3FFF`. The original firmware's `add_queue_entry`
/// instead gates on `255*16384 + 65535`, which is larger than this and lets
/// `msb` silently overflow its byte for the highest ~2700 ticks in that
/// range; this implementation tightens the bound to the value the encoding
/// can actually round-trip.
pub const MAX_INTERVAL_TICKS: u32 = 256 * 16384 + 0x3FFF;

/// A single queued ramp segment: `steps` pulses starting at the interval
/// encoded by `(delta_msb, delta_lsw)`, each subsequent interval offset by
/// `delta_change` ticks from the previous one.
///
/// The direction-flip bit is packed into bit 0 of `steps` (`steps = count<<1
/// | flip`); this is the wire-level contract with the consumer and must not
/// change independently on either side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct StepCommand {
    pub delta_msb: u8,
    pub delta_lsw: u16,
    pub delta_change: i16,
    pub steps: u8,
}

impl StepCommand {
    /// Step count with the direction-flip bit stripped off.
    pub fn step_count(&self) -> u8 {
        self.steps >> 1
    }

    /// Whether this command flips direction relative to the previous one.
    pub fn flips_direction(&self) -> bool {
        self.steps & 0x01 != 0
    }

    /// Decodes the initial inter-step interval, in ticks.
    pub fn initial_interval(&self) -> u32 {
        decode_interval(self.delta_msb, self.delta_lsw)
    }
}

/// Encodes an initial interval `ticks` (`1..=MAX_INTERVAL_TICKS`) into the
/// `(msb, lsw)` pair described in the data model: if `ticks < 2^14` the low
/// scheme is used directly; otherwise `msb = (ticks >> 14) - 1` and bit 14 of
/// `lsw` is set to flag the high scheme. The boundary `ticks == 16384` falls
/// into the high scheme (`msb = 0, lsw = 0x4000`) since `lsw = 16384` would
/// otherwise collide with the encoding flag.
pub fn encode_interval(ticks: u32) -> (u8, u16) {
    debug_assert!((1..=MAX_INTERVAL_TICKS).contains(&ticks));
    if ticks < (1 << 14) {
        (0, ticks as u16)
    } else {
        let msb = (ticks >> 14) - 1;
        let lsw = (ticks & 0x3FFF) | 0x4000;
        (msb as u8, lsw as u16)
    }
}

/// Inverse of [`encode_interval`].
pub fn decode_interval(msb: u8, lsw: u16) -> u32 {
    if lsw & 0x4000 != 0 {
        (msb as u32 + 1) * 16384 + (lsw & 0x3FFF) as u32
    } else {
        lsw as u32
    }
}

/// Error returned by [`Queue::push`] when the ring is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

/// A fixed-capacity ring of [`StepCommand`]s with power-of-two capacity `N`.
/// Usable capacity is `N - 1` (the ring always keeps one slot empty so that
/// `read == write` is an unambiguous empty marker).
pub struct Queue<const N: usize> {
    slots: [UnsafeCell<MaybeUninit<StepCommand>>; N],
    read: AtomicU8,
    write: AtomicU8,
}

// SAFETY: `slots` is only written by the single producer (before publishing
// `write`) and only read by the single consumer (after observing `write`),
// so concurrent access to a given slot never occurs.
unsafe impl<const N: usize> Sync for Queue<N> {}

impl<const N: usize> Queue<N> {
    const MASK: u8 = {
        assert!(N.is_power_of_two(), "Queue capacity must be a power of two");
        assert!(N <= 256, "Queue capacity must fit the 8-bit index");
        (N - 1) as u8
    };

    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            read: AtomicU8::new(0),
            write: AtomicU8::new(0),
        }
    }

    /// `read == write`.
    pub fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    /// `(write + 1) & mask == read`.
    pub fn is_full(&self) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let next = write.wrapping_add(1) & Self::MASK;
        next == self.read.load(Ordering::Acquire)
    }

    /// Number of queued-but-unconsumed commands.
    pub fn len(&self) -> u8 {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        write.wrapping_sub(read) & Self::MASK
    }

    /// Appends `cmd` at the write index and publishes it. Producer-only.
    ///
    /// Writes the command's fields before advancing `write` with `Release`
    /// ordering, so a consumer that observes the new `write` value with
    /// `Acquire` is guaranteed to see the fully-written slot.
    pub fn push(&self, cmd: StepCommand) -> Result<(), QueueFull> {
        let write = self.write.load(Ordering::Relaxed);
        let next = write.wrapping_add(1) & Self::MASK;
        if next == self.read.load(Ordering::Acquire) {
            return Err(QueueFull);
        }
        // SAFETY: only the producer writes this slot, and it is not yet
        // visible to the consumer until `write` is published below.
        unsafe {
            (*self.slots[write as usize].get()).write(cmd);
        }
        self.write.store(next, Ordering::Release);
        Ok(())
    }

    /// Pops the oldest command, if any. Consumer-only.
    pub fn pop(&self) -> Option<StepCommand> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: `read != write` (observed with Acquire above) means the
        // producer has published this slot via a Release store to `write`.
        let cmd = unsafe { (*self.slots[read as usize].get()).assume_init_read() };
        self.read
            .store(read.wrapping_add(1) & Self::MASK, Ordering::Release);
        Some(cmd)
    }

    /// Snapshots `(read, write)` for a backward walk, as used by
    /// `get_current_position`. Takes no lock itself; callers that need this
    /// to be consistent with a concurrent producer mask interrupts around
    /// the call, per the concurrency model.
    pub fn snapshot_pointers(&self) -> (u8, u8) {
        (
            self.read.load(Ordering::Acquire),
            self.write.load(Ordering::Acquire),
        )
    }

    /// Reads the slot at `index` (mod `N`) without consuming it. Used by
    /// `get_current_position` to walk pending, unconsumed entries; `index`
    /// must lie within `[read, write)` of a prior [`Self::snapshot_pointers`].
    pub fn peek_at(&self, index: u8) -> StepCommand {
        let idx = (index & Self::MASK) as usize;
        // SAFETY: caller guarantees `index` is within a published range
        // `[read, write)`, so the producer has already written this slot.
        unsafe { (*self.slots[idx].get()).assume_init_read() }
    }

    pub fn capacity(&self) -> u8 {
        N as u8
    }

    /// Steps `idx` backward by one slot, wrapping at the ring's mask.
    pub fn prev_index(&self, idx: u8) -> u8 {
        idx.wrapping_sub(1) & Self::MASK
    }
}

impl<const N: usize> Default for Queue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_roundtrip_low_scheme() {
        for ticks in [1u32, 2, 100, 16383] {
            let (msb, lsw) = encode_interval(ticks);
            assert_eq!(msb, 0);
            assert_eq!(decode_interval(msb, lsw), ticks);
        }
    }

    #[test]
    fn interval_roundtrip_boundary() {
        // The 16384 boundary must fall into the high scheme since lsw=16384
        // would collide with the 0x4000 encoding flag.
        let (msb, lsw) = encode_interval(16384);
        assert_eq!(msb, 0);
        assert_eq!(lsw, 0x4000);
        assert_eq!(decode_interval(msb, lsw), 16384);
    }

    #[test]
    fn interval_roundtrip_exhaustive_sample() {
        let mut ticks = 1u32;
        while ticks <= MAX_INTERVAL_TICKS {
            let (msb, lsw) = encode_interval(ticks);
            assert_eq!(decode_interval(msb, lsw), ticks, "ticks={ticks}");
            ticks += 997; // sample across the full range without 4.25M iterations
        }
        let (msb, lsw) = encode_interval(MAX_INTERVAL_TICKS);
        assert_eq!(decode_interval(msb, lsw), MAX_INTERVAL_TICKS);
    }

    #[test]
    fn empty_and_full() {
        let q: Queue<4> = Queue::new();
        assert!(q.is_empty());
        assert!(!q.is_full());
        for _ in 0..3 {
            q.push(StepCommand::default()).unwrap();
        }
        assert!(q.is_full());
        assert_eq!(q.push(StepCommand::default()), Err(QueueFull));
    }

    #[test]
    fn fifo_order() {
        let q: Queue<8> = Queue::new();
        for steps in 0..5u8 {
            q.push(StepCommand {
                steps,
                ..Default::default()
            })
            .unwrap();
        }
        for steps in 0..5u8 {
            assert_eq!(q.pop().unwrap().steps, steps);
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn usable_capacity_is_n_minus_one() {
        let q: Queue<16> = Queue::new();
        let mut pushed = 0;
        while q.push(StepCommand::default()).is_ok() {
            pushed += 1;
        }
        assert_eq!(pushed, 15);
    }
}
