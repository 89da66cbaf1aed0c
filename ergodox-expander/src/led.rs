//! Status LEDs.
//!
//! LEDs 1-3 sit on the controller (Timer1 compare outputs) and support
//! brightness. LEDs 11-13 are on the left half, switched through expander
//! latch bits: they are on/off only, and a change only reaches the hardware
//! with the next expander register write.

use core::fmt;

use embedded_hal::blocking::delay::DelayMs;
use log::{debug, trace};

use crate::registers::{Port, PortPair};

/// Fraction of full brightness used by the ready and boot sequences.
pub const DEFAULT_LED_BRIGHTNESS: f32 = 0.5;

/// Delay between the steps of [`LedController::boot_progress`].
pub const BOOT_STEP_MS: u16 = 333;

/// Timer1 output compare channel driving a local LED.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PwmChannel {
    A,
    B,
    C,
}

/// How an LED is wired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedCapability {
    Local(PwmChannel),
    /// Active-low latch bit on the expander.
    Remote { port: Port, bit: u8 },
}

/// Indicator identities. The discriminant is the conventional LED number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LedId {
    /// Topmost controller LED.
    Top = 1,
    Middle = 2,
    Bottom = 3,
    /// Left half, red (top).
    LeftRed = 11,
    /// Left half, yellow (middle).
    LeftYellow = 12,
    /// Left half, green (bottom).
    LeftGreen = 13,
}

impl LedId {
    pub const ALL: [LedId; 6] = [
        LedId::Top,
        LedId::Middle,
        LedId::Bottom,
        LedId::LeftRed,
        LedId::LeftYellow,
        LedId::LeftGreen,
    ];

    pub const fn from_number(number: u8) -> Option<LedId> {
        match number {
            1 => Some(LedId::Top),
            2 => Some(LedId::Middle),
            3 => Some(LedId::Bottom),
            11 => Some(LedId::LeftRed),
            12 => Some(LedId::LeftYellow),
            13 => Some(LedId::LeftGreen),
            _ => None,
        }
    }

    pub const fn number(self) -> u8 {
        self as u8
    }

    pub const fn capability(self) -> LedCapability {
        match self {
            LedId::Top => LedCapability::Local(PwmChannel::A),
            LedId::Middle => LedCapability::Local(PwmChannel::B),
            LedId::Bottom => LedCapability::Local(PwmChannel::C),
            LedId::LeftRed => LedCapability::Remote { port: Port::A, bit: 7 },
            LedId::LeftYellow => LedCapability::Remote { port: Port::B, bit: 6 },
            LedId::LeftGreen => LedCapability::Remote { port: Port::B, bit: 7 },
        }
    }

    pub const fn is_remote(self) -> bool {
        matches!(self.capability(), LedCapability::Remote { .. })
    }

    const fn index(self) -> usize {
        match self {
            LedId::Top => 0,
            LedId::Middle => 1,
            LedId::Bottom => 2,
            LedId::LeftRed => 3,
            LedId::LeftYellow => 4,
            LedId::LeftGreen => 5,
        }
    }
}

impl fmt::Display for LedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LED {}", self.number())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedError {
    /// Remote LEDs are binary; brightness cannot be set.
    BrightnessUnsupported(LedId),
}

impl fmt::Display for LedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedError::BrightnessUnsupported(id) => {
                write!(f, "{} is on/off only, brightness is not supported", id)
            }
        }
    }
}

/// Held state of one LED. `brightness` stays at 0 for remote LEDs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LedState {
    pub on: bool,
    pub brightness: f32,
}

/// Held state of every LED, read by the expander when it builds latch bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedStates {
    states: [LedState; 6],
}

impl LedStates {
    pub fn get(&self, id: LedId) -> LedState {
        self.states[id.index()]
    }

    fn get_mut(&mut self, id: LedId) -> &mut LedState {
        &mut self.states[id.index()]
    }

    /// Latch bits of the remote LEDs currently held on.
    pub fn lit_remote(&self) -> PortPair {
        let mut lit = PortPair::default();
        for id in LedId::ALL {
            if let LedCapability::Remote { port, bit } = id.capability() {
                if self.get(id).on {
                    lit.set(port, lit.get(port) | (1 << bit));
                }
            }
        }
        lit
    }
}

/// Controller-side LED hardware.
pub trait LocalLedDriver {
    /// Connects or disconnects the compare output from the pin.
    fn set_output(&mut self, channel: PwmChannel, enabled: bool);

    /// Writes the compare register.
    fn set_duty(&mut self, channel: PwmChannel, duty: u8);

    /// Samples the pin.
    fn is_high(&self, channel: PwmChannel) -> bool;
}

/// Maps a brightness in `[0, 1]` to an 8-bit duty cycle, rounding to nearest.
/// Out of range values are clamped, NaN maps to 0.
pub fn brightness_to_duty(level: f32) -> u8 {
    (level.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

pub struct LedController<D> {
    driver: D,
    states: LedStates,
    remote_wired: bool,
    brightness: f32,
}

impl<D: LocalLedDriver> LedController<D> {
    /// All LEDs start off with zero brightness. Hardware is not touched until
    /// the first operation.
    pub fn new(driver: D, remote_wired: bool) -> Self {
        Self {
            driver,
            states: LedStates::default(),
            remote_wired,
            brightness: DEFAULT_LED_BRIGHTNESS,
        }
    }

    /// Overrides the brightness used by the state sequences.
    pub fn with_brightness(mut self, level: f32) -> Self {
        self.brightness = level.clamp(0.0, 1.0);
        self
    }

    pub fn states(&self) -> &LedStates {
        &self.states
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Whether `id` exists on this build: remote LEDs need expander wiring.
    pub fn is_present(&self, id: LedId) -> bool {
        !id.is_remote() || self.remote_wired
    }

    pub fn turn_on(&mut self, id: LedId) {
        self.switch(id, true);
    }

    pub fn turn_off(&mut self, id: LedId) {
        self.switch(id, false);
    }

    fn switch(&mut self, id: LedId, on: bool) {
        if !self.is_present(id) {
            return;
        }
        trace!("{} {}", id, if on { "on" } else { "off" });
        self.states.get_mut(id).on = on;
        if let LedCapability::Local(channel) = id.capability() {
            self.driver.set_output(channel, on);
        }
    }

    /// Sets the brightness of a local LED. Remote LEDs are left untouched and
    /// reported as unsupported.
    pub fn set_brightness(&mut self, id: LedId, level: f32) -> Result<(), LedError> {
        match id.capability() {
            LedCapability::Local(channel) => {
                let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
                self.states.get_mut(id).brightness = level;
                self.driver.set_duty(channel, brightness_to_duty(level));
                Ok(())
            }
            LedCapability::Remote { .. } => Err(LedError::BrightnessUnsupported(id)),
        }
    }

    /// Local LEDs are sampled from the pin. Remote LEDs report the held state,
    /// which says nothing about whether the expander is connected.
    pub fn read(&self, id: LedId) -> bool {
        match id.capability() {
            LedCapability::Local(channel) => self.driver.is_high(channel),
            LedCapability::Remote { .. } => self.is_present(id) && self.states.get(id).on,
        }
    }

    pub fn all_on(&mut self) {
        for id in LedId::ALL {
            self.turn_on(id);
        }
    }

    pub fn all_off(&mut self) {
        for id in LedId::ALL {
            self.turn_off(id);
        }
    }

    /// Sets every LED that supports brightness.
    pub fn all_set(&mut self, level: f32) {
        for id in LedId::ALL {
            if !id.is_remote() {
                // local LEDs always accept a brightness
                let _ = self.set_brightness(id, level);
            }
        }
    }

    /// Everything on, dimmed.
    pub fn power_on(&mut self) {
        debug!("leds: power on");
        self.all_set(self.brightness / 10.0);
        self.all_on();
    }

    /// Everything off, at full configured brightness for later use.
    pub fn ready(&mut self) {
        debug!("leds: ready");
        self.all_off();
        self.all_set(self.brightness);
    }

    /// Lights LEDs 1, 2 and 3 in turn, blocking for [`BOOT_STEP_MS`] after
    /// each, for about a second in total.
    pub fn boot_progress<T: DelayMs<u16>>(&mut self, delay: &mut T) {
        debug!("leds: boot progress");
        for id in [LedId::Top, LedId::Middle, LedId::Bottom] {
            let _ = self.set_brightness(id, self.brightness);
            self.turn_on(id);
            delay.delay_ms(BOOT_STEP_MS);
        }
    }
}
