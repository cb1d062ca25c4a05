//! # Step Engine
//!
//! The caller-facing API (SPEC_FULL.md §6) around [`move_planner::MovePlanner`]:
//! an [`Engine`] owning two [`Channel`]s, plus the external-collaborator
//! traits that stand in for the hardware the move planner is deliberately
//! kept ignorant of — the output-compare ISR that actually drives the step
//! pin (out of scope; see SPEC_FULL.md §1), the one-time timer setup, and
//! the debug LED.
//!
//! Direction and enable pins are specified with `embedded_hal::digital::
//! OutputPin` directly (the same seam `driver-drv8825` uses for its control
//! pins) rather than bespoke wrapper traits, since `OutputPin` already is
//! the one-method-per-pin shape this needs.

#![no_std]

mod channel;
mod engine;
pub mod testing;

pub use channel::Channel;
pub use engine::{DebugLed, Engine, OverflowTimer};
pub use move_planner::{ChannelConfig, ChannelId};
