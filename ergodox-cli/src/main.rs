mod report;

use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use embedded_hal::blocking::delay::DelayMs;
use ergodox_expander::led::DEFAULT_LED_BRIGHTNESS;
use ergodox_expander::sim::{SimClock, SimulatedExpander, SimulatedLeds};
use ergodox_expander::{
    Config, DriveMode, LedController, LedId, MatrixScanner, RegisterSet, COLS, COLS_PER_HALF, ROWS,
};
use log::info;

#[derive(Parser)]
#[command(name = "ergodox-cli")]
#[command(about = "ErgoDox MCP23018 scan and LED diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the expander register layout for a wiring
    Registers {
        #[command(flatten)]
        wiring: Wiring,
    },
    /// Run one scan against a simulated expander
    Scan {
        #[command(flatten)]
        wiring: Wiring,
        /// Hold a key down, as `row,col` (rows 0-5, columns 0-6)
        #[arg(long = "press", value_parser = parse_key)]
        keys: Vec<(usize, usize)>,
        /// Simulate an expander that does not acknowledge its address
        #[arg(long)]
        unplugged: bool,
    },
    /// Play the power-on, boot progress and ready LED sequences
    Leds {
        /// Fraction of full brightness
        #[arg(long, default_value_t = DEFAULT_LED_BRIGHTNESS)]
        brightness: f32,
        /// Indicator LEDs 11-13 are wired to the expander
        #[arg(long)]
        remote_leds: bool,
    },
}

#[derive(Args)]
struct Wiring {
    /// Which set of matrix lines the expander drives
    #[arg(long, value_enum, default_value_t = Drive::Columns)]
    drive: Drive,
    /// Indicator LEDs 11-13 are wired to the expander
    #[arg(long)]
    remote_leds: bool,
    /// Hold an LED on (1-3, 11-13), may be repeated
    #[arg(long = "led", value_parser = parse_led)]
    leds: Vec<LedId>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Drive {
    Rows,
    Columns,
}

impl Wiring {
    fn config(&self) -> Config {
        let mode = match self.drive {
            Drive::Rows => DriveMode::DriveRows,
            Drive::Columns => DriveMode::DriveColumns,
        };
        Config::new(mode, self.remote_leds)
    }

    fn leds(&self) -> Result<LedController<SimulatedLeds>> {
        let mut leds = LedController::new(SimulatedLeds::new(), self.remote_leds);
        for &id in &self.leds {
            if !leds.is_present(id) {
                bail!("{} is on the expander, pass --remote-leds to use it", id);
            }
            leds.turn_on(id);
        }
        Ok(leds)
    }
}

fn parse_key(s: &str) -> Result<(usize, usize), String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `row,col`, got `{}`", s))?;
    let row: usize = row.trim().parse().map_err(|_| format!("invalid row `{}`", row))?;
    let col: usize = col.trim().parse().map_err(|_| format!("invalid column `{}`", col))?;
    if row >= ROWS || col >= COLS_PER_HALF {
        return Err(format!(
            "key {},{} is outside the left half ({}x{})",
            row, col, ROWS, COLS_PER_HALF
        ));
    }
    Ok((row, col))
}

fn parse_led(s: &str) -> Result<LedId, String> {
    let number: u8 = s.trim().parse().map_err(|_| format!("invalid LED `{}`", s))?;
    LedId::from_number(number).ok_or_else(|| format!("no LED {}, expected 1-3 or 11-13", number))
}

/// Sleeps for real and advances the simulated clock used for timestamps.
struct StdDelay {
    clock: SimClock,
}

impl DelayMs<u16> for StdDelay {
    fn delay_ms(&mut self, ms: u16) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
        self.clock.delay_ms(ms);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Registers { wiring } => {
            let config = wiring.config();
            let leds = wiring.leds()?;
            let set = RegisterSet::for_config(&config);
            println!(
                "{:?}, remote LEDs {}",
                config.drive_mode,
                if config.remote_leds { "wired" } else { "not wired" }
            );
            print!("{}", report::format_layout(&set, set.output_latch(leds.states().lit_remote())));
        }
        Command::Scan {
            wiring,
            keys,
            unplugged,
        } => {
            let config = wiring.config();
            let leds = wiring.leds()?;

            let mut sim = SimulatedExpander::new();
            sim.set_connected(!unplugged);
            for &(row, col) in &keys {
                sim.press(row, col);
            }

            let mut scanner = MatrixScanner::new(&mut sim, config);
            let mut matrix = [[false; COLS]; ROWS];
            let result = scanner.scan(&mut matrix, leds.states());
            drop(scanner);

            print!("{}", report::format_latch_writes(sim.latch_writes()));
            print!("{}", report::format_half(&matrix));
            match result {
                Ok(()) => println!("scan ok, {} transactions", sim.transactions()),
                Err(err) => println!("scan failed: {}", err),
            }
        }
        Command::Leds {
            brightness,
            remote_leds,
        } => {
            if !(0.0..=1.0).contains(&brightness) {
                bail!("brightness must be between 0 and 1, got {}", brightness);
            }
            let clock = SimClock::new();
            let mut delay = StdDelay {
                clock: clock.clone(),
            };
            let mut leds = LedController::new(SimulatedLeds::with_clock(clock), remote_leds)
                .with_brightness(brightness);

            info!("power on");
            leds.power_on();
            info!("boot progress");
            leds.boot_progress(&mut delay);
            info!("ready");
            leds.ready();

            print!("{}", report::format_led_events(leds.driver().events()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("0,0"), Ok((0, 0)));
        assert_eq!(parse_key(" 5 , 6 "), Ok((5, 6)));
        assert!(parse_key("6,0").is_err());
        assert!(parse_key("0,7").is_err());
        assert!(parse_key("3").is_err());
        assert!(parse_key("a,b").is_err());
    }

    #[test]
    fn test_parse_led() {
        assert_eq!(parse_led("1"), Ok(LedId::Top));
        assert_eq!(parse_led("13"), Ok(LedId::LeftGreen));
        assert!(parse_led("4").is_err());
        assert!(parse_led("x").is_err());
    }

    #[test]
    fn test_remote_led_needs_wiring() {
        let wiring = Wiring {
            drive: Drive::Rows,
            remote_leds: false,
            leds: vec![LedId::LeftRed],
        };
        assert!(wiring.leds().is_err());

        let wiring = Wiring {
            remote_leds: true,
            ..wiring
        };
        let leds = wiring.leds().unwrap();
        assert!(leds.states().get(LedId::LeftRed).on);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "ergodox-cli",
            "scan",
            "--drive",
            "rows",
            "--remote-leds",
            "--led",
            "12",
            "--press",
            "1,2",
            "--press",
            "4,6",
        ])
        .unwrap();
        match cli.command {
            Command::Scan { wiring, keys, unplugged } => {
                assert_eq!(wiring.config(), Config::new(DriveMode::DriveRows, true));
                assert_eq!(wiring.leds, vec![LedId::LeftYellow]);
                assert_eq!(keys, vec![(1, 2), (4, 6)]);
                assert!(!unplugged);
            }
            _ => panic!("expected scan"),
        }
    }
}
