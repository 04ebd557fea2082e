//! Strongly typed parameter enumerations for the INA3221 driver.
//!
//! These enums map directly to datasheet field encodings of the configuration
//! register and are used across [`Config`](crate::config::Config) and the
//! high-level driver APIs. Every enum covers all eight encodings of its
//! three-bit field.
//!
//! # Examples
//!
//! ```rust
//! use ina3221::params::{AveragingMode, ConversionTime, OperatingMode};
//!
//! let avg = AveragingMode::Samples1024;
//! let ct = ConversionTime::Us1100;
//! let mode = OperatingMode::ShuntAndBusTriggered;
//! let _ = (avg, ct, mode);
//! ```

use modular_bitfield::prelude::Specifier;

/// Number of samples averaged per reported value (`CONFIG.AVG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum AveragingMode {
    /// Single sample.
    Samples1 = 0b000,
    /// 4 samples.
    Samples4 = 0b001,
    /// 16 samples.
    Samples16 = 0b010,
    /// 64 samples.
    Samples64 = 0b011,
    /// 128 samples.
    Samples128 = 0b100,
    /// 256 samples.
    Samples256 = 0b101,
    /// 512 samples.
    Samples512 = 0b110,
    /// 1024 samples.
    Samples1024 = 0b111,
}

impl AveragingMode {
    /// Returns the number of averaged samples.
    pub const fn samples(self) -> u16 {
        match self {
            Self::Samples1 => 1,
            Self::Samples4 => 4,
            Self::Samples16 => 16,
            Self::Samples64 => 64,
            Self::Samples128 => 128,
            Self::Samples256 => 256,
            Self::Samples512 => 512,
            Self::Samples1024 => 1_024,
        }
    }
}

/// Conversion time of a single bus or shunt measurement (`CONFIG.VBUS_CT`, `CONFIG.VSH_CT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum ConversionTime {
    /// 140 µs.
    Us140 = 0b000,
    /// 204 µs.
    Us204 = 0b001,
    /// 332 µs.
    Us332 = 0b010,
    /// 588 µs.
    Us588 = 0b011,
    /// 1.1 ms.
    Us1100 = 0b100,
    /// 2.116 ms.
    Us2116 = 0b101,
    /// 4.156 ms.
    Us4156 = 0b110,
    /// 8.244 ms.
    Us8244 = 0b111,
}

impl ConversionTime {
    /// Returns the conversion time in microseconds.
    pub const fn micros(self) -> u32 {
        match self {
            Self::Us140 => 140,
            Self::Us204 => 204,
            Self::Us332 => 332,
            Self::Us588 => 588,
            Self::Us1100 => 1_100,
            Self::Us2116 => 2_116,
            Self::Us4156 => 4_156,
            Self::Us8244 => 8_244,
        }
    }
}

/// Operating mode selection (`CONFIG.MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum OperatingMode {
    /// Power-down.
    PowerDown = 0b000,
    /// Shunt voltage, single-shot.
    ShuntTriggered = 0b001,
    /// Bus voltage, single-shot.
    BusTriggered = 0b010,
    /// Shunt and bus voltage, single-shot.
    ShuntAndBusTriggered = 0b011,
    /// Power-down (alternate encoding).
    PowerDownAlt = 0b100,
    /// Shunt voltage, continuous.
    ShuntContinuous = 0b101,
    /// Bus voltage, continuous.
    BusContinuous = 0b110,
    /// Shunt and bus voltage, continuous.
    ShuntAndBusContinuous = 0b111,
}

impl OperatingMode {
    /// Returns `true` when the mode keeps converting without further register writes.
    pub const fn is_continuous(self) -> bool {
        matches!(
            self,
            Self::ShuntContinuous | Self::BusContinuous | Self::ShuntAndBusContinuous
        )
    }
}
