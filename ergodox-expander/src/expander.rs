//! MCP23018 driver for the ErgoDox left half.
//!
//! Every register access is a complete bus transaction. Register pairs are
//! written with a single address byte, relying on the sequential address
//! pointer (IOCON.SEQOP = 0, the power-on default).

use log::trace;

use crate::bus::{BusAddress, BusError, BusTransport, Transaction};
use crate::config::Config;
use crate::led::LedStates;
use crate::registers::{Port, PortPair, RegisterSet, GPPUA, IODIRA, OLATA};

/// MCP23018 I2C address (all address pins grounded).
pub const MCP23018_ADDRESS: u8 = 0b0100000;

pub struct Mcp23018<B> {
    bus: B,
    address: BusAddress,
    config: Config,
    registers: RegisterSet,
}

impl<B: BusTransport> Mcp23018<B> {
    pub fn new(bus: B, config: Config) -> Self {
        Self {
            bus,
            address: BusAddress::new(MCP23018_ADDRESS),
            config,
            registers: RegisterSet::for_config(&config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The register layout resolved from the config.
    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// Writes direction, pull-up and output latch registers, in that order.
    ///
    /// The latches are seeded from the held remote LED state. Stops at the
    /// first failure and returns it; a missing device fails on the first
    /// address byte.
    pub fn initialize(&mut self, leds: &LedStates) -> Result<(), BusError> {
        let set = self.registers;
        self.write_pair(IODIRA, set.direction)?;
        self.write_pair(GPPUA, set.pull_up)?;
        self.write_pair(OLATA, set.output_latch(leds.lit_remote()))?;
        Ok(())
    }

    /// Writes the A then B register of a pair starting at `register`.
    fn write_pair(&mut self, register: u8, values: PortPair) -> Result<(), BusError> {
        trace!("mcp23018: [0x{:02X}] <- {:08b} {:08b}", register, values.a, values.b);
        let mut txn = Transaction::open(&mut self.bus)?;
        txn.send(self.address.write())?;
        txn.send(register)?;
        txn.send(values.a)?;
        txn.send(values.b)?;
        Ok(())
    }

    /// Writes a GPIO register, which updates that port's output latch.
    pub fn write_port(&mut self, port: Port, value: u8) -> Result<(), BusError> {
        trace!("mcp23018: GPIO{:?} <- {:08b}", port, value);
        let mut txn = Transaction::open(&mut self.bus)?;
        txn.send(self.address.write())?;
        txn.send(port.gpio())?;
        txn.send(value)?;
        Ok(())
    }

    /// Reads the pin levels of a port.
    pub fn read_port(&mut self, port: Port) -> Result<u8, BusError> {
        let mut txn = Transaction::open(&mut self.bus)?;
        txn.send(self.address.write())?;
        txn.send(port.gpio())?;
        txn.restart()?;
        txn.send(self.address.read())?;
        txn.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveMode;
    use crate::led::{LedController, LedId};
    use crate::sim::{SimulatedExpander, SimulatedLeds, SLA_W_NACK};

    fn expander(mode: DriveMode, remote_leds: bool) -> Mcp23018<SimulatedExpander> {
        Mcp23018::new(SimulatedExpander::new(), Config::new(mode, remote_leds))
    }

    #[test]
    fn test_initialize_applies_layout() {
        for mode in [DriveMode::DriveRows, DriveMode::DriveColumns] {
            for remote_leds in [false, true] {
                let mut mcp = expander(mode, remote_leds);
                mcp.initialize(&LedStates::default()).unwrap();

                let set = *mcp.registers();
                let sim = mcp.bus();
                assert_eq!(sim.direction(), set.direction);
                assert_eq!(sim.pull_up(), set.pull_up);
                assert_eq!(sim.output_latch(), PortPair::new(0xFF, 0xFF));
                assert_eq!(sim.transactions(), 3);
                assert!(sim.is_balanced());
            }
        }
    }

    #[test]
    fn test_initialize_seeds_remote_leds() {
        let mut leds = LedController::new(SimulatedLeds::new(), true);
        leds.turn_on(LedId::LeftRed);
        leds.turn_on(LedId::LeftGreen);

        let mut mcp = expander(DriveMode::DriveRows, true);
        mcp.initialize(leds.states()).unwrap();
        assert_eq!(mcp.bus().output_latch(), PortPair::new(0b0111_1111, 0b0111_1111));
    }

    #[test]
    fn test_initialize_unplugged() {
        let mut mcp = expander(DriveMode::DriveColumns, false);
        mcp.bus_mut().set_connected(false);

        let err = mcp.initialize(&LedStates::default()).unwrap_err();
        assert_eq!(err.code(), SLA_W_NACK);
        // aborted after the first transaction
        assert_eq!(mcp.bus().transactions(), 1);
        assert!(mcp.bus().is_balanced());
        assert_eq!(mcp.bus().direction(), PortPair::new(0xFF, 0xFF));
    }

    #[test]
    fn test_initialize_reports_first_failure() {
        let mut mcp = expander(DriveMode::DriveColumns, false);
        // direction pair goes through, pull-up register byte is refused
        mcp.bus_mut().fail_after(5);

        let err = mcp.initialize(&LedStates::default()).unwrap_err();
        assert_eq!(err.code(), crate::sim::DATA_NACK);
        assert_eq!(mcp.bus().transactions(), 2);
        assert!(mcp.bus().is_balanced());
        assert_eq!(mcp.bus().direction(), PortPair::new(0x80, 0xFF));
    }

    #[test]
    fn test_port_round_trip() {
        let mut mcp = expander(DriveMode::DriveColumns, false);
        mcp.initialize(&LedStates::default()).unwrap();
        mcp.bus_mut().press(0, 2);

        mcp.write_port(Port::A, 0b1111_1011).unwrap();
        assert_eq!(mcp.read_port(Port::B).unwrap(), 0b1101_1111);
        assert_eq!(mcp.read_port(Port::A).unwrap(), 0b1111_1011);
        assert!(mcp.bus().is_balanced());
    }
}
