//! TWI (I2C) master on the ATmega32U4, as a [`BusTransport`].
//!
//! Status codes from TWSR are passed up unchanged as the bus error code.

use avr_device::atmega32u4::TWI;
use ergodox_expander::{BusError, BusTransport};

/// TWI clock prescaler and bit rate for ~100kHz at 16MHz CPU.
/// SCL freq = CPU_FREQ / (16 + 2 * TWBR * prescaler)
/// 100kHz = 16MHz / (16 + 2 * 72 * 1) => TWBR = 72
const TWBR_VALUE: u8 = 72;

/// TWI status codes
const TW_START: u8 = 0x08;
const TW_REP_START: u8 = 0x10;
const TW_MT_SLA_ACK: u8 = 0x18;
const TW_MT_DATA_ACK: u8 = 0x28;
const TW_MR_SLA_ACK: u8 = 0x40;
const TW_MR_DATA_NACK: u8 = 0x58;

/// Reported when TWINT never rises.
const TW_TIMEOUT: u8 = 0xFE;

pub struct Twi {
    twi: TWI,
}

impl Twi {
    /// Configure the bit rate and enable the peripheral.
    pub fn new(twi: TWI) -> Self {
        twi.twbr.write(|w| unsafe { w.bits(TWBR_VALUE) });
        // Prescaler = 1 (TWPS = 0)
        twi.twsr.write(|w| w.twps().prescaler_1());
        twi.twcr.write(|w| w.twen().set_bit());
        Self { twi }
    }

    fn status(&self) -> u8 {
        self.twi.twsr.read().bits() & 0xF8
    }

    /// Busy-wait for the TWI interrupt flag with a timeout counter.
    fn wait_twint(&self) -> Result<(), BusError> {
        let mut timeout: u16 = 0xFFFF;
        while self.twi.twcr.read().twint().bit_is_clear() {
            timeout = timeout.wrapping_sub(1);
            if timeout == 0 {
                return Err(BusError::from_code(TW_TIMEOUT));
            }
        }
        Ok(())
    }

    fn expect(&self, accepted: &[u8]) -> Result<(), BusError> {
        let status = self.status();
        if accepted.contains(&status) {
            Ok(())
        } else {
            Err(BusError::from_code(status))
        }
    }
}

impl BusTransport for Twi {
    fn begin(&mut self) -> Result<(), BusError> {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsta().set_bit().twen().set_bit());
        self.wait_twint()?;
        self.expect(&[TW_START, TW_REP_START])
    }

    fn send(&mut self, byte: u8) -> Result<(), BusError> {
        self.twi.twdr.write(|w| unsafe { w.bits(byte) });
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.wait_twint()?;
        self.expect(&[TW_MT_SLA_ACK, TW_MT_DATA_ACK, TW_MR_SLA_ACK])
    }

    fn read(&mut self) -> Result<u8, BusError> {
        // Read one byte with NACK (last byte)
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.wait_twint()?;
        self.expect(&[TW_MR_DATA_NACK])?;
        Ok(self.twi.twdr.read().bits())
    }

    fn end(&mut self) {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsto().set_bit().twen().set_bit());
    }
}
