//! # Move Planner
//!
//! A deterministic trapezoidal-profile move planner, usable on both host and
//! MCU (`no_std`-friendly). It owns one channel's kinematic state and fills a
//! bounded [`step_queue::Queue`] with [`step_queue::StepCommand`]s that a
//! hardware-timer ISR consumes to drive a stepper motor through an
//! acceleration ramp, a cruise, and a deceleration back to rest at a target
//! position.
//!
//! This is the core of the system described in SPEC_FULL.md: everything
//! about *when* to accelerate, cruise, or decelerate, and how to pack that
//! into command-queue entries that respect the encoding's numeric limits,
//! lives here. Everything about *how* a command becomes a physical step
//! pulse — GPIO, the output-compare ISR, the debug LED — is out of scope and
//! lives in the `step-engine` crate as external-collaborator traits.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod channel;
pub mod error;
mod planner;

pub use channel::{ChannelConfig, ChannelId};
pub use error::AddQueueEntryError;
pub use planner::MovePlanner;
pub use step_queue::{Queue, StepCommand, MAX_INTERVAL_TICKS, MIN_INTERVAL_TICKS};

/// Hardware timer frequency this entire system is clocked from.
pub const CLOCK_FREQ_HZ: f32 = 16_000_000.0;
