//! Busy-wait delays (approximate, at 16MHz).

use embedded_hal::blocking::delay::DelayMs;

/// Blocking delay for the LED sequences.
pub struct BusyDelay;

impl DelayMs<u16> for BusyDelay {
    fn delay_ms(&mut self, ms: u16) {
        delay_ms(ms);
    }
}

pub fn delay_ms(ms: u16) {
    for _ in 0..ms {
        // ~1ms at 16MHz: 16000 cycles / 4 cycles per loop iteration
        for _ in 0..4000u16 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
