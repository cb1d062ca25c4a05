//! Error types for the move planner.

/// Why [`crate::MovePlanner::add_queue_entry`] rejected a proposed segment.
///
/// These are internal indicators, not caller-visible failures (SPEC_FULL.md
/// §7): the planner reshapes the segment and retries rather than
/// propagating them. They are `pub` only so tests and `tracing`
/// instrumentation can name the rejection reason.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AddQueueEntryError {
    /// `steps >= 128`.
    StepsError,
    /// `start_delta_ticks` exceeds the two-word encoding's range.
    TooHigh,
    /// `change_ticks * steps > 32768`.
    ChangeTooHigh,
    /// `change_ticks * steps < -32768`, or the final interval would undershoot
    /// the 500-tick minimum.
    ChangeTooLow,
    /// The ring is at capacity; not an error, but back-pressure.
    Full,
}
