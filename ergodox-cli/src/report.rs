//! Plain-text rendering of register layouts, latch traffic and scan results.

use std::fmt::Write;

use ergodox_expander::sim::LedEvent;
use ergodox_expander::{Matrix, Port, PortPair, RegisterSet, COLS_PER_HALF};

/// One line per register pair, A then B.
pub fn format_layout(set: &RegisterSet, latch: PortPair) -> String {
    let mut out = String::new();
    for (name, pair) in [
        ("IODIR", set.direction),
        ("GPPU", set.pull_up),
        ("OLAT", latch),
        ("LEDS", set.indicators),
    ] {
        let _ = writeln!(out, "{:<6} A=0b{:08b} B=0b{:08b}", name, pair.a, pair.b);
    }
    out
}

pub fn format_latch_writes(writes: &[(Port, u8)]) -> String {
    let mut out = String::new();
    for (i, (port, value)) in writes.iter().enumerate() {
        let _ = writeln!(out, "{:>3}: OLAT{:?} <- 0b{:08b}", i, port, value);
    }
    out
}

/// The left half as a grid, `X` = pressed.
pub fn format_half(matrix: &Matrix) -> String {
    let mut out = String::from("   ");
    for col in 0..COLS_PER_HALF {
        let _ = write!(out, " {}", col);
    }
    out.push('\n');
    for (row, cells) in matrix.iter().enumerate() {
        let _ = write!(out, "{:>2}:", row);
        for &pressed in &cells[..COLS_PER_HALF] {
            out.push_str(if pressed { " X" } else { " ." });
        }
        out.push('\n');
    }
    out
}

pub fn format_led_events(events: &[LedEvent]) -> String {
    let mut out = String::new();
    for event in events {
        let _ = match *event {
            LedEvent::Output {
                at_ms,
                channel,
                enabled,
            } => writeln!(
                out,
                "{:>5}ms OC1{:?} {}",
                at_ms,
                channel,
                if enabled { "on" } else { "off" }
            ),
            LedEvent::Duty {
                at_ms,
                channel,
                duty,
            } => writeln!(out, "{:>5}ms OC1{:?} duty {}", at_ms, channel, duty),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ergodox_expander::{PwmChannel, COLS, ROWS};

    #[test]
    fn test_format_layout() {
        let set = ergodox_expander::registers::resolve(ergodox_expander::DriveMode::DriveColumns, true);
        let text = format_layout(&set, PortPair::new(0x7F, 0xFF));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "IODIR  A=0b00000000 B=0b00111111");
        assert_eq!(lines[2], "OLAT   A=0b01111111 B=0b11111111");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_format_half() {
        let mut matrix = [[false; COLS]; ROWS];
        matrix[0][0] = true;
        matrix[5][6] = true;
        matrix[2][10] = true;
        let text = format_half(&matrix);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "    0 1 2 3 4 5 6");
        assert_eq!(lines[1], " 0: X . . . . . .");
        assert_eq!(lines[3], " 2: . . . . . . .");
        assert_eq!(lines[6], " 5: . . . . . . X");
    }

    #[test]
    fn test_format_latch_writes() {
        let text = format_latch_writes(&[(Port::A, 0xFE), (Port::B, 0xBF)]);
        assert_eq!(text, "  0: OLATA <- 0b11111110\n  1: OLATB <- 0b10111111\n");
    }

    #[test]
    fn test_format_led_events() {
        let text = format_led_events(&[
            LedEvent::Duty {
                at_ms: 0,
                channel: PwmChannel::A,
                duty: 128,
            },
            LedEvent::Output {
                at_ms: 333,
                channel: PwmChannel::B,
                enabled: true,
            },
        ]);
        assert_eq!(text, "    0ms OC1A duty 128\n  333ms OC1B on\n");
    }
}
