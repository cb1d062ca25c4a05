//! Per-motor caller API: wraps a [`MovePlanner`] with the direction/enable
//! GPIO pins the core planner deliberately never touches.

use embedded_hal::digital::OutputPin;
use move_planner::{ChannelConfig, ChannelId, MovePlanner};

/// One motor channel: the move planner plus its direction and enable pins.
/// `Q` is the command queue's power-of-two capacity.
pub struct Channel<const Q: usize, DIR, EN> {
    pub(crate) planner: MovePlanner<Q>,
    direction_pin: Option<DIR>,
    enable_pin: Option<EN>,
    auto_enable: bool,
}

impl<const Q: usize, DIR, EN> Channel<Q, DIR, EN> {
    pub const fn new(channel_id: ChannelId) -> Self {
        Self {
            planner: MovePlanner::new(channel_id),
            direction_pin: None,
            enable_pin: None,
            auto_enable: false,
        }
    }

    /// Constructs a channel and immediately applies `config`'s kinematics —
    /// the typed counterpart to calling [`Self::new`] followed by
    /// [`Self::set_dynamics`] by hand.
    pub fn with_config(channel_id: ChannelId, config: ChannelConfig) -> Self {
        let mut channel = Self::new(channel_id);
        channel.set_dynamics(config.min_travel_ticks, config.accel);
        channel
    }

    pub fn channel_id(&self) -> ChannelId {
        self.planner.channel_id()
    }

    pub fn set_dynamics(&mut self, min_travel_ticks: u32, accel: f32) {
        self.planner.set_dynamics(min_travel_ticks, accel);
    }

    pub fn move_by(&mut self, delta: i32) {
        self.planner.move_by(delta);
    }

    pub fn move_to(&mut self, position: i32) {
        self.planner.move_to(position);
    }

    pub fn get_position_after_commands_completed(&self) -> i32 {
        self.planner.get_position_after_commands_completed()
    }

    pub fn get_current_position(&self) -> i32 {
        self.planner.get_current_position()
    }

    pub fn is_running(&self) -> bool {
        self.planner.is_running()
    }

    pub fn is_queue_empty(&self) -> bool {
        self.planner.is_queue_empty()
    }

    pub fn is_queue_full(&self) -> bool {
        self.planner.is_queue_full()
    }

    pub fn set_auto_enable(&mut self, auto_enable: bool) {
        self.auto_enable = auto_enable;
    }

    pub fn auto_enable(&self) -> bool {
        self.auto_enable
    }

    pub(crate) fn isr_fill_queue(&mut self) {
        self.planner.isr_fill_queue();
    }

    pub fn planner(&self) -> &MovePlanner<Q> {
        &self.planner
    }
}

impl<const Q: usize, DIR, EN> Channel<Q, DIR, EN>
where
    DIR: OutputPin,
{
    /// Installs the direction pin, driving it high as the original
    /// constructor's initial `digitalWrite(dirPin, HIGH)` does.
    pub fn set_direction_pin(&mut self, mut pin: DIR) -> Result<(), DIR::Error> {
        pin.set_high()?;
        self.direction_pin = Some(pin);
        Ok(())
    }
}

impl<const Q: usize, DIR, EN> Channel<Q, DIR, EN>
where
    EN: OutputPin,
{
    /// Installs the enable pin, driving it high (disabled; the DRV8825-style
    /// enable line is active-low) as the original constructor does.
    pub fn set_enable_pin(&mut self, mut pin: EN) -> Result<(), EN::Error> {
        pin.set_high()?;
        self.enable_pin = Some(pin);
        Ok(())
    }

    pub fn enable_outputs(&mut self) -> Result<(), EN::Error> {
        if let Some(pin) = self.enable_pin.as_mut() {
            pin.set_low()?;
        }
        Ok(())
    }

    pub fn disable_outputs(&mut self) -> Result<(), EN::Error> {
        if let Some(pin) = self.enable_pin.as_mut() {
            pin.set_high()?;
        }
        Ok(())
    }
}
