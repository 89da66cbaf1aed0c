//! Build-time configuration of the expander half.

use core::fmt;

use crate::registers::Port;
use crate::{COLS_PER_HALF, ROWS};

/// Which set of matrix lines the expander drives low, one at a time.
///
/// Internal diodes (inside the key switches), or diode cathodes towards the
/// circular pad, need [`DriveMode::DriveRows`]. Diode cathodes towards the
/// square pad need [`DriveMode::DriveColumns`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriveMode {
    DriveRows,
    DriveColumns,
}

/// Rejected drive-direction flag combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    NoDriveMode,
    BothDriveModes,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoDriveMode => f.write_str("no pin drive direction selected"),
            ConfigError::BothDriveModes => f.write_str("both pin drive directions selected"),
        }
    }
}

impl DriveMode {
    /// Resolves the two mutually exclusive drive flags. Usable in `const`
    /// context so that a bad combination fails the build.
    pub const fn from_flags(drive_rows: bool, drive_columns: bool) -> Result<Self, ConfigError> {
        match (drive_rows, drive_columns) {
            (true, false) => Ok(DriveMode::DriveRows),
            (false, true) => Ok(DriveMode::DriveColumns),
            (false, false) => Err(ConfigError::NoDriveMode),
            (true, true) => Err(ConfigError::BothDriveModes),
        }
    }

    /// Port whose output latch selects the active line.
    pub const fn drive_port(self) -> Port {
        match self {
            DriveMode::DriveRows => Port::B,
            DriveMode::DriveColumns => Port::A,
        }
    }

    /// Port read back after each line is driven.
    pub const fn sense_port(self) -> Port {
        match self {
            DriveMode::DriveRows => Port::A,
            DriveMode::DriveColumns => Port::B,
        }
    }

    /// Number of driven lines per scan.
    pub const fn line_count(self) -> usize {
        match self {
            DriveMode::DriveRows => ROWS,
            DriveMode::DriveColumns => COLS_PER_HALF,
        }
    }

    /// Number of sensed lines per driven line.
    pub const fn sense_count(self) -> usize {
        match self {
            DriveMode::DriveRows => COLS_PER_HALF,
            DriveMode::DriveColumns => ROWS,
        }
    }
}

/// Expander-half configuration, fixed when the firmware is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub drive_mode: DriveMode,
    /// Whether the left-hand indicator LEDs are wired to the expander.
    pub remote_leds: bool,
}

impl Config {
    pub const fn new(drive_mode: DriveMode, remote_leds: bool) -> Self {
        Self {
            drive_mode,
            remote_leds,
        }
    }

    /// Same as [`DriveMode::from_flags`], for building a whole config from
    /// feature flags.
    pub const fn from_flags(
        drive_rows: bool,
        drive_columns: bool,
        remote_leds: bool,
    ) -> Result<Self, ConfigError> {
        match DriveMode::from_flags(drive_rows, drive_columns) {
            Ok(drive_mode) => Ok(Self::new(drive_mode, remote_leds)),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(DriveMode::from_flags(true, false), Ok(DriveMode::DriveRows));
        assert_eq!(DriveMode::from_flags(false, true), Ok(DriveMode::DriveColumns));
        assert_eq!(DriveMode::from_flags(false, false), Err(ConfigError::NoDriveMode));
        assert_eq!(DriveMode::from_flags(true, true), Err(ConfigError::BothDriveModes));
    }

    #[test]
    fn test_config_from_flags_in_const() {
        const CONFIG: Result<Config, ConfigError> = Config::from_flags(false, true, true);
        assert_eq!(CONFIG, Ok(Config::new(DriveMode::DriveColumns, true)));
        assert!(Config::from_flags(true, true, false).is_err());
    }

    #[test]
    fn test_ports_are_complementary() {
        for mode in [DriveMode::DriveRows, DriveMode::DriveColumns] {
            assert_ne!(mode.drive_port(), mode.sense_port());
        }
        assert_eq!(DriveMode::DriveRows.line_count(), 6);
        assert_eq!(DriveMode::DriveColumns.line_count(), 7);
        assert_eq!(DriveMode::DriveRows.sense_count(), 7);
        assert_eq!(DriveMode::DriveColumns.sense_count(), 6);
    }
}
