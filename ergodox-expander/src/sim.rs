//! Simulated hardware for host-side tools and tests.
//!
//! [`SimulatedExpander`] models the parts of the MCP23018 the driver relies
//! on: BANK = 0 register map with sequential addressing, GPIO writes landing
//! in OLAT, pull-up inputs, and key switches joining port A bit `c` to port B
//! bit `5 - r`. It also keeps the begin/end bookkeeping needed to check that
//! every transaction is released.

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;

use crate::bus::{BusAddress, BusError, BusTransport};
use crate::expander::MCP23018_ADDRESS;
use crate::led::{LocalLedDriver, PwmChannel};
use crate::registers::{Port, PortPair, GPIOA, GPIOB, GPPUA, GPPUB, IODIRA, IODIRB, OLATA, OLATB};
use crate::{COLS_PER_HALF, ROWS};

// TWI status codes reported on failure
pub const SLA_W_NACK: u8 = 0x20;
pub const DATA_NACK: u8 = 0x30;
pub const SLA_R_NACK: u8 = 0x48;

const REGISTER_COUNT: usize = 0x16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Address,
    Pointer,
    Write,
    Read,
}

pub struct SimulatedExpander {
    address: BusAddress,
    connected: bool,
    registers: [u8; REGISTER_COUNT],
    pointer: u8,
    phase: Phase,
    pressed: [[bool; COLS_PER_HALF]; ROWS],
    open: bool,
    transactions: usize,
    ends: usize,
    stray_ends: usize,
    bytes: usize,
    fail_after: Option<usize>,
    latch_writes: Vec<(Port, u8)>,
}

impl Default for SimulatedExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExpander {
    /// A connected expander in its power-on state (all pins inputs).
    pub fn new() -> Self {
        let mut registers = [0; REGISTER_COUNT];
        registers[IODIRA as usize] = 0xFF;
        registers[IODIRB as usize] = 0xFF;
        Self {
            address: BusAddress::new(MCP23018_ADDRESS),
            connected: true,
            registers,
            pointer: 0,
            phase: Phase::Idle,
            pressed: [[false; COLS_PER_HALF]; ROWS],
            open: false,
            transactions: 0,
            ends: 0,
            stray_ends: 0,
            bytes: 0,
            fail_after: None,
            latch_writes: Vec::new(),
        }
    }

    /// Unplugging also resets the register file, as a power cycle would.
    pub fn set_connected(&mut self, connected: bool) {
        if !connected {
            self.registers = Self::new().registers;
            self.pointer = 0;
        }
        self.connected = connected;
    }

    pub fn press(&mut self, row: usize, col: usize) {
        self.pressed[row][col] = true;
    }

    pub fn release(&mut self, row: usize, col: usize) {
        self.pressed[row][col] = false;
    }

    /// Every byte transferred after the next `count` ones is NACKed.
    pub fn fail_after(&mut self, count: usize) {
        self.bytes = 0;
        self.fail_after = Some(count);
    }

    pub fn clear_fault(&mut self) {
        self.fail_after = None;
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize]
    }

    pub fn direction(&self) -> PortPair {
        PortPair::new(self.register(IODIRA), self.register(IODIRB))
    }

    pub fn pull_up(&self) -> PortPair {
        PortPair::new(self.register(GPPUA), self.register(GPPUB))
    }

    pub fn output_latch(&self) -> PortPair {
        PortPair::new(self.register(OLATA), self.register(OLATB))
    }

    /// Every value written to an output latch, in order.
    pub fn latch_writes(&self) -> &[(Port, u8)] {
        &self.latch_writes
    }

    pub fn take_latch_writes(&mut self) -> Vec<(Port, u8)> {
        std::mem::take(&mut self.latch_writes)
    }

    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// True when no transaction is open and each one was ended exactly once.
    pub fn is_balanced(&self) -> bool {
        !self.open && self.stray_ends == 0 && self.ends == self.transactions
    }

    /// Current pin levels. Outputs follow the latch, inputs float high and
    /// are pulled low through a pressed key by a low output.
    pub fn pin_levels(&self) -> PortPair {
        let dir = self.direction();
        let olat = self.output_latch();
        let mut a = (olat.a & !dir.a) | dir.a;
        let mut b = (olat.b & !dir.b) | dir.b;
        for (row, cols) in self.pressed.iter().enumerate() {
            for (col, &pressed) in cols.iter().enumerate() {
                if !pressed {
                    continue;
                }
                let a_bit = 1u8 << col;
                let b_bit = 1u8 << (ROWS - 1 - row);
                let a_driven_low = dir.a & a_bit == 0 && olat.a & a_bit == 0;
                let b_driven_low = dir.b & b_bit == 0 && olat.b & b_bit == 0;
                if b_driven_low && dir.a & a_bit != 0 {
                    a &= !a_bit;
                }
                if a_driven_low && dir.b & b_bit != 0 {
                    b &= !b_bit;
                }
            }
        }
        PortPair::new(a, b)
    }

    fn transfer(&mut self) -> Result<(), BusError> {
        if let Some(limit) = self.fail_after {
            if self.bytes >= limit {
                return Err(BusError::from_code(DATA_NACK));
            }
        }
        self.bytes += 1;
        Ok(())
    }

    fn write_register(&mut self, value: u8) -> Result<(), BusError> {
        let target = match self.pointer {
            GPIOA => OLATA,
            GPIOB => OLATB,
            other => other,
        };
        if target as usize >= REGISTER_COUNT {
            return Err(BusError::from_code(DATA_NACK));
        }
        self.registers[target as usize] = value;
        match target {
            OLATA => self.latch_writes.push((Port::A, value)),
            OLATB => self.latch_writes.push((Port::B, value)),
            _ => {}
        }
        self.pointer = self.pointer.wrapping_add(1);
        Ok(())
    }

    fn read_register(&mut self) -> Result<u8, BusError> {
        let value = match self.pointer {
            GPIOA => self.pin_levels().a,
            GPIOB => self.pin_levels().b,
            other if (other as usize) < REGISTER_COUNT => self.registers[other as usize],
            _ => return Err(BusError::UNSPECIFIED),
        };
        self.pointer = self.pointer.wrapping_add(1);
        Ok(value)
    }
}

impl BusTransport for SimulatedExpander {
    fn begin(&mut self) -> Result<(), BusError> {
        if !self.open {
            self.open = true;
            self.transactions += 1;
        }
        self.phase = Phase::Address;
        Ok(())
    }

    fn send(&mut self, byte: u8) -> Result<(), BusError> {
        if !self.open {
            return Err(BusError::UNSPECIFIED);
        }
        self.transfer()?;
        match self.phase {
            Phase::Address => {
                let reading = byte & 1 == 1;
                if !self.connected || byte >> 1 != self.address.get() {
                    self.phase = Phase::Idle;
                    let code = if reading { SLA_R_NACK } else { SLA_W_NACK };
                    return Err(BusError::from_code(code));
                }
                self.phase = if reading { Phase::Read } else { Phase::Pointer };
                Ok(())
            }
            Phase::Pointer => {
                self.pointer = byte;
                self.phase = Phase::Write;
                Ok(())
            }
            Phase::Write => self.write_register(byte),
            Phase::Read | Phase::Idle => Err(BusError::UNSPECIFIED),
        }
    }

    fn read(&mut self) -> Result<u8, BusError> {
        if !self.open || self.phase != Phase::Read {
            return Err(BusError::UNSPECIFIED);
        }
        self.transfer()?;
        self.read_register()
    }

    fn end(&mut self) {
        if self.open {
            self.open = false;
            self.ends += 1;
        } else {
            self.stray_ends += 1;
        }
        self.phase = Phase::Idle;
    }
}

/// Shared millisecond counter advanced by `delay_ms`.
#[derive(Clone, Debug, Default)]
pub struct SimClock(Rc<Cell<u32>>);

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

impl DelayMs<u16> for SimClock {
    fn delay_ms(&mut self, ms: u16) {
        self.0.set(self.0.get() + u32::from(ms));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedEvent {
    Output { at_ms: u32, channel: PwmChannel, enabled: bool },
    Duty { at_ms: u32, channel: PwmChannel, duty: u8 },
}

/// Timer1 compare outputs that record every change.
#[derive(Debug, Default)]
pub struct SimulatedLeds {
    outputs: [bool; 3],
    duty: [u8; 3],
    clock: SimClock,
    events: Vec<LedEvent>,
}

impl SimulatedLeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: SimClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    pub fn output(&self, channel: PwmChannel) -> bool {
        self.outputs[channel_index(channel)]
    }

    pub fn duty(&self, channel: PwmChannel) -> u8 {
        self.duty[channel_index(channel)]
    }

    pub fn events(&self) -> &[LedEvent] {
        &self.events
    }
}

fn channel_index(channel: PwmChannel) -> usize {
    match channel {
        PwmChannel::A => 0,
        PwmChannel::B => 1,
        PwmChannel::C => 2,
    }
}

impl LocalLedDriver for SimulatedLeds {
    fn set_output(&mut self, channel: PwmChannel, enabled: bool) {
        self.outputs[channel_index(channel)] = enabled;
        self.events.push(LedEvent::Output {
            at_ms: self.clock.now_ms(),
            channel,
            enabled,
        });
    }

    fn set_duty(&mut self, channel: PwmChannel, duty: u8) {
        self.duty[channel_index(channel)] = duty;
        self.events.push(LedEvent::Duty {
            at_ms: self.clock.now_ms(),
            channel,
            duty,
        });
    }

    /// A connected output with a non-zero duty cycle reads high.
    fn is_high(&self, channel: PwmChannel) -> bool {
        self.output(channel) && self.duty(channel) > 0
    }
}
