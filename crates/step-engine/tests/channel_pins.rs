//! Direction/enable pin behavior of [`step_engine::Channel`], tested with
//! `embedded-hal-mock` the way `driver-drv8825`'s test module checks its
//! own enable/disable pin transitions.

use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};
use move_planner::{ChannelConfig, ChannelId};
use step_engine::Channel;

#[test]
fn set_direction_pin_drives_high_on_install() {
    let mut channel: Channel<16, PinMock, PinMock> = Channel::new(ChannelId::A);
    let mut dir = PinMock::new(&[PinTransaction::set(PinState::High)]);
    channel.set_direction_pin(dir.clone()).unwrap();
    dir.done();
}

#[test]
fn set_enable_pin_drives_high_on_install() {
    let mut channel: Channel<16, PinMock, PinMock> = Channel::new(ChannelId::A);
    let mut en = PinMock::new(&[PinTransaction::set(PinState::High)]);
    channel.set_enable_pin(en.clone()).unwrap();
    en.done();
}

#[test]
fn enable_outputs_drives_enable_pin_low() {
    let mut channel: Channel<16, PinMock, PinMock> = Channel::new(ChannelId::A);
    let en = PinMock::new(&[
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
    ]);
    channel.set_enable_pin(en.clone()).unwrap();
    channel.enable_outputs().unwrap();
    let mut en = en;
    en.done();
}

#[test]
fn disable_outputs_drives_enable_pin_high() {
    let mut channel: Channel<16, PinMock, PinMock> = Channel::new(ChannelId::A);
    let en = PinMock::new(&[
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ]);
    channel.set_enable_pin(en.clone()).unwrap();
    channel.enable_outputs().unwrap();
    channel.disable_outputs().unwrap();
    let mut en = en;
    en.done();
}

#[test]
fn enable_outputs_without_a_pin_configured_is_a_no_op() {
    let mut channel: Channel<16, PinMock, PinMock> = Channel::new(ChannelId::A);
    channel.enable_outputs().unwrap();
    channel.disable_outputs().unwrap();
}

#[test]
fn planner_surface_reflects_moves() {
    let mut channel: Channel<16, PinMock, PinMock> = Channel::new(ChannelId::A);
    channel.set_dynamics(16_000, 1000.0);
    assert!(channel.is_queue_empty());
    assert!(!channel.is_running());

    // move_to only recomputes the deceleration schedule; it does not push
    // commands itself, so the queue stays empty until isr_fill_queue runs.
    channel.move_to(100);
    assert!(channel.is_queue_empty());
    assert_eq!(channel.get_position_after_commands_completed(), 0);
}

#[test]
fn with_config_applies_kinematics_at_construction() {
    let config = ChannelConfig::new(16_000, 1000.0);
    assert_eq!(config.max_speed(), 1000.0);

    let mut channel: Channel<16, PinMock, PinMock> = Channel::with_config(ChannelId::A, config);
    // A channel built with `Channel::new` + no `set_dynamics` call has
    // accel=0, which always settles `deceleration_start` at 0 (see
    // `MovePlanner::calculate_move`); a nonzero value here is only possible
    // if `with_config` actually forwarded the kinematics.
    channel.move_to(5);
    assert_eq!(channel.planner().deceleration_start(), 2);
}
