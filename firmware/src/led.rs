//! Teensy-side status LEDs on PB5, PB6 and PB7 (OC1A, OC1B, OC1C).
//!
//! Timer1 runs 8-bit fast PWM on all three channels permanently; an LED is
//! switched on by making its pin an output.

use avr_device::atmega32u4::{PORTB, TC1};
use ergodox_expander::{LocalLedDriver, PwmChannel};

pub struct PwmLeds {
    tc1: TC1,
    portb: PORTB,
}

impl PwmLeds {
    pub fn new(tc1: TC1, portb: PORTB) -> Self {
        // LED pins start as inputs (off)
        portb
            .ddrb
            .modify(|r, w| unsafe { w.bits(r.bits() & !0xE0) });
        // COM1A1 | COM1B1 | COM1C1: clear on compare match; WGM10 + WGM12: 8-bit fast PWM
        tc1.tccr1a.write(|w| unsafe { w.bits(0b1010_1001) });
        // CS10: no prescaling
        tc1.tccr1b.write(|w| unsafe { w.bits(0b0000_1001) });
        Self { tc1, portb }
    }
}

fn pin_mask(channel: PwmChannel) -> u8 {
    match channel {
        PwmChannel::A => 1 << 5,
        PwmChannel::B => 1 << 6,
        PwmChannel::C => 1 << 7,
    }
}

impl LocalLedDriver for PwmLeds {
    fn set_output(&mut self, channel: PwmChannel, enabled: bool) {
        let mask = pin_mask(channel);
        self.portb.ddrb.modify(|r, w| unsafe {
            if enabled {
                w.bits(r.bits() | mask)
            } else {
                w.bits(r.bits() & !mask)
            }
        });
    }

    fn set_duty(&mut self, channel: PwmChannel, duty: u8) {
        let duty = u16::from(duty);
        match channel {
            PwmChannel::A => self.tc1.ocr1a.write(|w| unsafe { w.bits(duty) }),
            PwmChannel::B => self.tc1.ocr1b.write(|w| unsafe { w.bits(duty) }),
            PwmChannel::C => self.tc1.ocr1c.write(|w| unsafe { w.bits(duty) }),
        }
    }

    fn is_high(&self, channel: PwmChannel) -> bool {
        self.portb.pinb.read().bits() & pin_mask(channel) != 0
    }
}
