//! Two-wire bus transport contract and transaction bracketing.
//!
//! The transport itself (start/stop conditions, byte shifting, timeouts) lives
//! with the microcontroller. Everything in this crate goes through
//! [`Transaction`], which guarantees that every `begin()` is matched by
//! exactly one `end()`, including on early error returns.

use core::fmt;
use core::num::NonZeroU8;

/// Opaque bus failure carrying the transport's non-zero status code.
///
/// The code is never decoded here, only passed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BusError(NonZeroU8);

impl BusError {
    /// Used when the transport reports a failure whose raw status is `0`.
    pub const UNSPECIFIED: BusError = match NonZeroU8::new(0xFF) {
        Some(code) => BusError(code),
        None => unreachable!(),
    };

    /// Converts a transport status (`0` = success) into a `Result`.
    pub const fn from_status(status: u8) -> Result<(), BusError> {
        match NonZeroU8::new(status) {
            None => Ok(()),
            Some(code) => Err(BusError(code)),
        }
    }

    /// Wraps a status that is known to describe a failure.
    pub const fn from_code(code: u8) -> BusError {
        match NonZeroU8::new(code) {
            Some(code) => BusError(code),
            None => Self::UNSPECIFIED,
        }
    }

    /// The raw status as reported by the transport.
    pub const fn code(self) -> u8 {
        self.0.get()
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus error (status 0x{:02X})", self.code())
    }
}

/// 7-bit device address on the two-wire bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusAddress(u8);

impl BusAddress {
    pub const fn new(address: u8) -> Self {
        Self(address & 0x7F)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Address byte with the direction bit cleared.
    pub const fn write(self) -> u8 {
        self.0 << 1
    }

    /// Address byte with the direction bit set.
    pub const fn read(self) -> u8 {
        (self.0 << 1) | 1
    }
}

/// Synchronous two-wire bus primitives.
///
/// `begin` issues a start condition (or a repeated start while a transaction
/// is already open), `end` issues the stop condition and releases the bus.
pub trait BusTransport {
    fn begin(&mut self) -> Result<(), BusError>;

    /// Sends one byte and reports whether it was acknowledged.
    fn send(&mut self, byte: u8) -> Result<(), BusError>;

    /// Reads one byte, answering with NACK (single-byte reads only).
    fn read(&mut self) -> Result<u8, BusError>;

    fn end(&mut self);
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn begin(&mut self) -> Result<(), BusError> {
        (**self).begin()
    }

    fn send(&mut self, byte: u8) -> Result<(), BusError> {
        (**self).send(byte)
    }

    fn read(&mut self) -> Result<u8, BusError> {
        (**self).read()
    }

    fn end(&mut self) {
        (**self).end()
    }
}

/// An open bus transaction. Dropping it ends the transaction.
pub struct Transaction<'a, B: BusTransport + ?Sized> {
    bus: &'a mut B,
}

impl<'a, B: BusTransport + ?Sized> Transaction<'a, B> {
    /// Begins a transaction. If the start condition fails the bus is still
    /// released before the error is returned.
    pub fn open(bus: &'a mut B) -> Result<Self, BusError> {
        let mut txn = Self { bus };
        txn.bus.begin()?;
        Ok(txn)
    }

    pub fn send(&mut self, byte: u8) -> Result<(), BusError> {
        self.bus.send(byte)
    }

    pub fn read(&mut self) -> Result<u8, BusError> {
        self.bus.read()
    }

    /// Repeated start, keeping ownership of the bus.
    pub fn restart(&mut self) -> Result<(), BusError> {
        self.bus.begin()
    }
}

impl<B: BusTransport + ?Sized> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        self.bus.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts begin/end calls and fails `send` on a chosen byte.
    #[derive(Default)]
    struct CountingBus {
        begins: usize,
        ends: usize,
        fail_begin: bool,
        nack_on: Option<u8>,
    }

    impl BusTransport for CountingBus {
        fn begin(&mut self) -> Result<(), BusError> {
            self.begins += 1;
            if self.fail_begin {
                return Err(BusError::from_code(0x00));
            }
            Ok(())
        }

        fn send(&mut self, byte: u8) -> Result<(), BusError> {
            if self.nack_on == Some(byte) {
                return Err(BusError::from_code(0x20));
            }
            Ok(())
        }

        fn read(&mut self) -> Result<u8, BusError> {
            Ok(0xA5)
        }

        fn end(&mut self) {
            self.ends += 1;
        }
    }

    fn write_two(bus: &mut CountingBus) -> Result<(), BusError> {
        let mut txn = Transaction::open(bus)?;
        txn.send(0x40)?;
        txn.send(0x12)?;
        Ok(())
    }

    #[test]
    fn test_status_conversion() {
        assert_eq!(BusError::from_status(0), Ok(()));
        let err = BusError::from_status(0x20).unwrap_err();
        assert_eq!(err.code(), 0x20);
        assert_eq!(BusError::from_code(0), BusError::UNSPECIFIED);
        assert_eq!(BusError::UNSPECIFIED.code(), 0xFF);
    }

    #[test]
    fn test_address_bytes() {
        let addr = BusAddress::new(0b0100000);
        assert_eq!(addr.write(), 0x40);
        assert_eq!(addr.read(), 0x41);
        assert_eq!(BusAddress::new(0xFF).get(), 0x7F);
    }

    #[test]
    fn test_transaction_ends_on_success() {
        let mut bus = CountingBus::default();
        assert!(write_two(&mut bus).is_ok());
        assert_eq!(bus.begins, 1);
        assert_eq!(bus.ends, 1);
    }

    #[test]
    fn test_transaction_ends_on_nack() {
        let mut bus = CountingBus {
            nack_on: Some(0x40),
            ..Default::default()
        };
        assert_eq!(write_two(&mut bus).unwrap_err().code(), 0x20);
        assert_eq!(bus.ends, 1);
    }

    #[test]
    fn test_transaction_ends_when_start_fails() {
        let mut bus = CountingBus {
            fail_begin: true,
            ..Default::default()
        };
        assert_eq!(write_two(&mut bus), Err(BusError::UNSPECIFIED));
        assert_eq!(bus.begins, 1);
        assert_eq!(bus.ends, 1);
    }

    #[test]
    fn test_restart_keeps_single_end() {
        let mut bus = CountingBus::default();
        {
            let mut txn = Transaction::open(&mut bus).unwrap();
            txn.send(0x40).unwrap();
            txn.restart().unwrap();
            assert_eq!(txn.read().unwrap(), 0xA5);
        }
        assert_eq!(bus.begins, 2);
        assert_eq!(bus.ends, 1);
    }
}
