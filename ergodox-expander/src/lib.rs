//! MCP23018 matrix scanning and status LED control for the ErgoDox.
//!
//! The left half of the keyboard sits behind an MCP23018 I/O expander on the
//! two-wire bus. This crate holds everything that does not depend on the
//! microcontroller: the register layouts for both diode orientations, the
//! expander driver, the scan algorithm and the LED state machine. The AVR
//! firmware only supplies a [`BusTransport`] and a [`LocalLedDriver`].
//!
//! This crate is `no_std` so it can be used by both the AVR firmware and the
//! native CLI tool.

#![cfg_attr(not(any(test, feature = "sim")), no_std)]

pub mod bus;
pub mod config;
pub mod expander;
pub mod led;
pub mod registers;
pub mod scanner;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::{BusAddress, BusError, BusTransport, Transaction};
pub use config::{Config, ConfigError, DriveMode};
pub use expander::Mcp23018;
pub use led::{LedController, LedError, LedId, LedState, LedStates, LocalLedDriver, PwmChannel};
pub use registers::{Port, PortPair, RegisterSet};
pub use scanner::MatrixScanner;

/// Number of rows in the matrix.
pub const ROWS: usize = 6;
/// Number of columns per half.
pub const COLS_PER_HALF: usize = 7;
/// Total number of columns.
pub const COLS: usize = COLS_PER_HALF * 2;

const _: () = assert!(ROWS == 6 && COLS == 14, "expecting a 6x14 ErgoDox matrix");

/// Complete matrix state, `true` = pressed.
///
/// The expander owns rows `0..ROWS` and columns `0..COLS_PER_HALF`; the other
/// half belongs to whoever scans the controller-side pins.
pub type Matrix = [[bool; COLS]; ROWS];
