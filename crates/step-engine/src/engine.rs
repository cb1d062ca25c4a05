//! Engine API (SPEC_FULL.md §6): one-time timer setup, the two channels,
//! and the debug LED blink schedule — all driven from the timer-overflow
//! ISR, grounded on `FastAccelStepperEngine::init`/`setDebugLed` and the
//! `ISR(TIMER1_OVF_vect)` handler in
//! `examples/original_source/src/FastAccelStepper.cpp`.

use crate::channel::Channel;
use move_planner::ChannelId;

/// One-time hardware-timer configuration, owned by whatever peripheral
/// access crate the integrator links in. Out of scope for this crate per
/// SPEC_FULL.md §1; specified here only as the seam `Engine::init` calls
/// through.
pub trait OverflowTimer {
    /// Configures the shared timer to normal (free-running) mode, prescaler
    /// 1, with the overflow interrupt enabled.
    fn init(&mut self);
}

/// The optional 1 Hz debug LED, toggled by [`Engine::on_timer_overflow`].
pub trait DebugLed {
    fn set(&mut self, on: bool);
}

/// Overflow count at which the debug LED turns on.
const LED_ON_AT: u16 = 144;
/// Overflow count at which the debug LED turns off and the counter wraps.
const LED_OFF_AT: u16 = 288;

/// Owns the shared timer, the optional debug LED, and the two independent
/// motor channels. `Q` is both channels' queue capacity; `TMR`/`LED` the
/// hardware collaborator types; `DirA`/`EnA`/`DirB`/`EnB` each
/// channel's pin types.
pub struct Engine<const Q: usize, TMR, LED, DirA, EnA, DirB, EnB> {
    timer: TMR,
    led: Option<LED>,
    led_overflow_count: u16,
    channel_a: Channel<Q, DirA, EnA>,
    channel_b: Channel<Q, DirB, EnB>,
}

impl<const Q: usize, TMR, LED, DirA, EnA, DirB, EnB> Engine<Q, TMR, LED, DirA, EnA, DirB, EnB>
where
    TMR: OverflowTimer,
    LED: DebugLed,
{
    pub const fn new(timer: TMR) -> Self {
        Self {
            timer,
            led: None,
            led_overflow_count: 0,
            channel_a: Channel::new(ChannelId::A),
            channel_b: Channel::new(ChannelId::B),
        }
    }

    /// Configures the shared timer for overflow-driven operation.
    pub fn init(&mut self) {
        self.timer.init();
    }

    /// Enables the 1 Hz debug LED blink, driven by counting overflow
    /// interrupts: on at count 144, off at 288, then wraps. At 16 MHz with a
    /// 16-bit timer the overflow rate is ~244 Hz, giving a ~0.85 s cycle.
    pub fn set_debug_led(&mut self, led: LED) {
        self.led = Some(led);
        self.led_overflow_count = 0;
    }

    pub fn stepper_a(&mut self) -> &mut Channel<Q, DirA, EnA> {
        &mut self.channel_a
    }

    pub fn stepper_b(&mut self) -> &mut Channel<Q, DirB, EnB> {
        &mut self.channel_b
    }

    /// Call from the timer-overflow ISR: advances the debug LED schedule
    /// and tops up both channels' command queues.
    pub fn on_timer_overflow(&mut self) {
        if let Some(led) = self.led.as_mut() {
            self.led_overflow_count += 1;
            if self.led_overflow_count == LED_ON_AT {
                led.set(true);
            }
            if self.led_overflow_count == LED_OFF_AT {
                led.set(false);
                self.led_overflow_count = 0;
            }
        }
        self.channel_a.isr_fill_queue();
        self.channel_b.isr_fill_queue();
    }
}
