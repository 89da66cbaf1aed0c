//! ErgoDox left-half bring-up firmware for ATmega32U4 (Teensy 2.0).
//!
//! Wires the expander driver to the hardware:
//! - MCP23018 over the TWI peripheral, rescanned every ~1ms
//! - Status LEDs 1-3 on Timer1 PWM, LEDs 11-13 on the expander (`left-leds`)
//!
//! LED 1 lights while the expander is unreachable, LED 2 (and LED 12) while
//! any left-half key is down.

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod delay;
mod led;
mod twi;

use avr_device::atmega32u4::Peripherals;
use ergodox_expander::{Config, LedController, LedId, MatrixScanner, COLS, ROWS};

use delay::BusyDelay;
use led::PwmLeds;
use twi::Twi;

/// Exactly one of `drive-rows` / `drive-columns` must be enabled.
const CONFIG: Config = match Config::from_flags(
    cfg!(feature = "drive-rows"),
    cfg!(feature = "drive-columns"),
    cfg!(feature = "left-leds"),
) {
    Ok(config) => config,
    Err(_) => panic!("MCP23018 pin drive direction incorrectly set"),
};

/// Panic handler — on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler (CLKPR), 16MHz from the Teensy fuses
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let mut delay = BusyDelay;
    let mut leds = LedController::new(PwmLeds::new(dp.TC1, dp.PORTB), CONFIG.remote_leds);
    let mut scanner = MatrixScanner::new(Twi::new(dp.TWI), CONFIG);
    let mut matrix = [[false; COLS]; ROWS];

    leds.power_on();
    // remote LEDs only change with the next register write
    let _ = scanner.scan(&mut matrix, leds.states());
    leds.boot_progress(&mut delay);
    leds.ready();

    loop {
        let status = scanner.scan(&mut matrix, leds.states());

        if status.is_err() {
            leds.turn_on(LedId::Top);
        } else {
            leds.turn_off(LedId::Top);
        }

        let any_pressed = matrix.iter().flatten().any(|&pressed| pressed);
        for id in [LedId::Middle, LedId::LeftYellow] {
            if any_pressed {
                leds.turn_on(id);
            } else {
                leds.turn_off(id);
            }
        }

        delay::delay_ms(1);
    }
}
