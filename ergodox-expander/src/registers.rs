//! MCP23018 register map and the pure byte computations behind it.
//!
//! Nothing here touches the bus. Pin roles are encoded as:
//! - unused  : input, pull-up on, latch 1
//! - input   : input, pull-up on, latch 1
//! - driving : output, pull-up off, latch 1 (0 while the line is selected)
//!
//! Physically the rows are on port B (row `r` at bit `5 - r`) and the
//! columns on port A (column `c` at bit `c`), in both drive modes.

use crate::config::{Config, DriveMode};
use crate::{Matrix, COLS_PER_HALF, ROWS};

// register addresses, IOCON.BANK = 0
pub const IODIRA: u8 = 0x00; // I/O direction register
pub const IODIRB: u8 = 0x01;
pub const GPPUA: u8 = 0x0C; // pull-up resistor register
pub const GPPUB: u8 = 0x0D;
pub const GPIOA: u8 = 0x12; // port register (writes modify OLAT)
pub const GPIOB: u8 = 0x13;
pub const OLATA: u8 = 0x14; // output latch register
pub const OLATB: u8 = 0x15;

/// One of the two 8-bit expander ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
}

impl Port {
    /// GPIO register address for this port.
    pub const fn gpio(self) -> u8 {
        match self {
            Port::A => GPIOA,
            Port::B => GPIOB,
        }
    }
}

/// A value for each of the two ports of an A/B register pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortPair {
    pub a: u8,
    pub b: u8,
}

impl PortPair {
    pub const fn new(a: u8, b: u8) -> Self {
        Self { a, b }
    }

    pub const fn get(self, port: Port) -> u8 {
        match port {
            Port::A => self.a,
            Port::B => self.b,
        }
    }

    pub fn set(&mut self, port: Port, value: u8) {
        match port {
            Port::A => self.a = value,
            Port::B => self.b = value,
        }
    }
}

/// Register contents for one electrical topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSet {
    /// IODIR: 1 = input (or unused), 0 = output.
    pub direction: PortPair,
    /// GPPU: 1 = pull-up enabled.
    pub pull_up: PortPair,
    /// Latch bits reserved for remote indicators (active low).
    pub indicators: PortPair,
}

const NO_INDICATORS: PortPair = PortPair::new(0b0000_0000, 0b0000_0000);
const LEFT_INDICATORS: PortPair = PortPair::new(0b1000_0000, 0b1100_0000);

const DRIVE_ROWS: RegisterSet = RegisterSet {
    direction: PortPair::new(0b1111_1111, 0b1100_0000),
    pull_up: PortPair::new(0b1111_1111, 0b1100_0000),
    indicators: NO_INDICATORS,
};

const DRIVE_ROWS_WITH_LEDS: RegisterSet = RegisterSet {
    direction: PortPair::new(0b0111_1111, 0b0000_0000),
    pull_up: PortPair::new(0b0111_1111, 0b0000_0000),
    indicators: LEFT_INDICATORS,
};

const DRIVE_COLUMNS: RegisterSet = RegisterSet {
    direction: PortPair::new(0b1000_0000, 0b1111_1111),
    pull_up: PortPair::new(0b1000_0000, 0b1111_1111),
    indicators: NO_INDICATORS,
};

const DRIVE_COLUMNS_WITH_LEDS: RegisterSet = RegisterSet {
    direction: PortPair::new(0b0000_0000, 0b0011_1111),
    pull_up: PortPair::new(0b0000_0000, 0b0011_1111),
    indicators: LEFT_INDICATORS,
};

/// Selects the register layout for a drive mode and LED wiring.
pub const fn resolve(mode: DriveMode, remote_leds: bool) -> RegisterSet {
    match (mode, remote_leds) {
        (DriveMode::DriveRows, false) => DRIVE_ROWS,
        (DriveMode::DriveRows, true) => DRIVE_ROWS_WITH_LEDS,
        (DriveMode::DriveColumns, false) => DRIVE_COLUMNS,
        (DriveMode::DriveColumns, true) => DRIVE_COLUMNS_WITH_LEDS,
    }
}

impl RegisterSet {
    pub const fn for_config(config: &Config) -> Self {
        resolve(config.drive_mode, config.remote_leds)
    }

    /// Output latch contents with every line released and the held
    /// indicators lit.
    pub fn output_latch(&self, lit: PortPair) -> PortPair {
        PortPair::new(
            0xFF & !(lit.a & self.indicators.a),
            0xFF & !(lit.b & self.indicators.b),
        )
    }

    /// Byte written to the drive port while `line` is selected, or with all
    /// lines released when `line` is `None`.
    pub fn scan_output(&self, mode: DriveMode, line: Option<usize>, lit: PortPair) -> u8 {
        let port = mode.drive_port();
        let mut byte = self.output_latch(lit).get(port);
        if let Some(line) = line {
            byte &= !(1 << drive_bit(mode, line));
        }
        byte
    }
}

/// Bit of the drive port wired to scan line `line`.
pub const fn drive_bit(mode: DriveMode, line: usize) -> u8 {
    match mode {
        DriveMode::DriveRows => (ROWS - 1 - line) as u8,
        DriveMode::DriveColumns => line as u8,
    }
}

/// Mask of all drive-port bits used as scan lines.
pub fn drive_mask(mode: DriveMode) -> u8 {
    (0..mode.line_count()).fold(0, |mask, line| mask | (1 << drive_bit(mode, line)))
}

/// Writes the cells belonging to scan line `line` from the sensed port byte.
///
/// Released keys read as 1 through the pull-ups, so a clear bit is a press.
pub fn decode_line(mode: DriveMode, line: usize, sensed: u8, matrix: &mut Matrix) {
    match mode {
        DriveMode::DriveRows => {
            for col in 0..COLS_PER_HALF {
                matrix[line][col] = sensed & (1 << col) == 0;
            }
        }
        DriveMode::DriveColumns => {
            for row in 0..ROWS {
                matrix[row][line] = sensed & (1 << (ROWS - 1 - row)) == 0;
            }
        }
    }
}

/// Clears the expander-owned region of the matrix.
pub fn clear_half(matrix: &mut Matrix) {
    for row in matrix.iter_mut() {
        row[..COLS_PER_HALF].fill(false);
    }
}
