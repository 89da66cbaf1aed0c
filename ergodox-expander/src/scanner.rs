//! Left-half matrix scan over the MCP23018.
//!
//! Each scan re-initializes the expander first. Skipping that is not
//! appreciably faster, and it picks the expander back up if it was not
//! plugged in (or was unplugged) at an earlier scan.

use log::{debug, warn};

use crate::bus::{BusError, BusTransport};
use crate::config::Config;
use crate::expander::Mcp23018;
use crate::led::LedStates;
use crate::registers::{clear_half, decode_line};
use crate::Matrix;

pub struct MatrixScanner<B> {
    expander: Mcp23018<B>,
}

impl<B: BusTransport> MatrixScanner<B> {
    pub fn new(bus: B, config: Config) -> Self {
        Self {
            expander: Mcp23018::new(bus, config),
        }
    }

    pub fn expander(&self) -> &Mcp23018<B> {
        &self.expander
    }

    pub fn expander_mut(&mut self) -> &mut Mcp23018<B> {
        &mut self.expander
    }

    pub fn release(self) -> B {
        self.expander.release()
    }

    /// Rewrites the expander half of `matrix` (rows `0..6`, columns `0..7`).
    ///
    /// On any bus failure that region is cleared to "nothing pressed" and the
    /// failure is returned; the other half is never touched. Held remote LED
    /// bits are kept lit in every latch write.
    pub fn scan(&mut self, matrix: &mut Matrix, leds: &LedStates) -> Result<(), BusError> {
        if let Err(err) = self.expander.initialize(leds) {
            warn!("mcp23018: init failed, left half released: {}", err);
            clear_half(matrix);
            return Err(err);
        }

        if let Err(err) = self.scan_lines(matrix, leds) {
            debug!("mcp23018: scan aborted, left half released: {}", err);
            clear_half(matrix);
            return Err(err);
        }

        Ok(())
    }

    fn scan_lines(&mut self, matrix: &mut Matrix, leds: &LedStates) -> Result<(), BusError> {
        let mode = self.expander.config().drive_mode;
        let set = *self.expander.registers();
        let lit = leds.lit_remote();
        let drive = mode.drive_port();
        let sense = mode.sense_port();

        for line in 0..mode.line_count() {
            // set active line low, others hi-Z
            self.expander.write_port(drive, set.scan_output(mode, Some(line), lit))?;
            let sensed = self.expander.read_port(sense)?;
            decode_line(mode, line, sensed, matrix);
        }

        // set all lines hi-Z
        self.expander.write_port(drive, set.scan_output(mode, None, lit))
    }
}
