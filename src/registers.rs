//! Register map definitions for the INA3221 power monitor.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::{AveragingMode, ConversionTime, OperatingMode};

/// Register address of `CONFIG`.
pub const REG_CONFIG: u8 = 0x00;
/// Register addresses of the shunt-voltage registers, indexed by channel.
pub const REG_SHUNT_VOLTAGE: [u8; 3] = [0x01, 0x03, 0x05];
/// Register addresses of the bus-voltage registers, indexed by channel.
pub const REG_BUS_VOLTAGE: [u8; 3] = [0x02, 0x04, 0x06];
/// Register address of `MASK_ENABLE`.
pub const REG_MASK_ENABLE: u8 = 0x0F;

/// `CONFIG.RST` system reset bit.
pub const RESET: u16 = 0x8000;
/// `CONFIG.CH1EN` channel 1 (solar) enable.
pub const ENABLE_CHAN1: u16 = 0x4000;
/// `CONFIG.CH2EN` channel 2 (battery) enable.
pub const ENABLE_CHAN2: u16 = 0x2000;
/// `CONFIG.CH3EN` channel 3 (load) enable.
pub const ENABLE_CHAN3: u16 = 0x1000;
/// `CONFIG.AVG2`.
pub const AVG2: u16 = 0x0800;
/// `CONFIG.AVG1`.
pub const AVG1: u16 = 0x0400;
/// `CONFIG.AVG0`.
pub const AVG0: u16 = 0x0200;
/// `CONFIG.VBUS_CT2`.
pub const VBUS_CT2: u16 = 0x0100;
/// `CONFIG.VBUS_CT1`.
pub const VBUS_CT1: u16 = 0x0080;
/// `CONFIG.VBUS_CT0`.
pub const VBUS_CT0: u16 = 0x0040;
/// `CONFIG.VSH_CT2`.
pub const VSH_CT2: u16 = 0x0020;
/// `CONFIG.VSH_CT1`.
pub const VSH_CT1: u16 = 0x0010;
/// `CONFIG.VSH_CT0`.
pub const VSH_CT0: u16 = 0x0008;
/// `CONFIG.MODE3`.
pub const MODE_3: u16 = 0x0004;
/// `CONFIG.MODE2`.
pub const MODE_2: u16 = 0x0002;
/// `CONFIG.MODE1`.
pub const MODE_1: u16 = 0x0001;

/// Conversion-ready flag in `MASK_ENABLE`.
pub const CONVERSION_READY: u16 = 0x0001;

/// Access permissions encoded for each register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    /// Read-only register.
    ReadOnly,
    /// Write-only register.
    WriteOnly,
    /// Read/write register.
    ReadWrite,
}

/// Minimal metadata exposed by every register value type.
pub trait Register {
    /// Raw storage backing the register payload.
    type Raw: Copy;
    /// Register address as documented in the datasheet.
    const ADDRESS: u8;
    /// Access permission classification, as used by this driver.
    const ACCESS: RegisterAccess;
    /// Optional reset/default value defined by the datasheet.
    const RESET_VALUE: Option<Self::Raw>;
}

/// Bitfield representation of the `CONFIG` register (address `0x00`).
#[allow(unused_parens)]
#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    // Operating mode (bits 2:0).
    pub mode: OperatingMode,
    // Shunt voltage conversion time (bits 5:3).
    pub shunt_conversion_time: ConversionTime,
    // Bus voltage conversion time (bits 8:6).
    pub bus_conversion_time: ConversionTime,
    // Averaging mode (bits 11:9).
    pub averaging: AveragingMode,
    // Channel 3 enable (bit 12).
    pub enable_ch3: bool,
    // Channel 2 enable (bit 13).
    pub enable_ch2: bool,
    // Channel 1 enable (bit 14).
    pub enable_ch1: bool,
    // System reset (bit 15).
    pub reset: bool,
}

impl From<u16> for Configuration {
    fn from(value: u16) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

impl From<Configuration> for u16 {
    fn from(value: Configuration) -> Self {
        u16::from_le_bytes(value.into_bytes())
    }
}

/// Bitfield representation of the `MASK_ENABLE` register (address `0x0F`).
#[allow(unused_parens)]
#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskEnable {
    // Conversion-ready flag (bit 0).
    pub conversion_ready: bool,
    // Timing-control alert flag (bit 1).
    pub timing_control_alert: bool,
    // Power-valid alert flag (bit 2).
    pub power_valid_alert: bool,
    // Warning alert flags, channel 3 down to channel 1 (bits 5:3).
    pub warning_ch3: bool,
    pub warning_ch2: bool,
    pub warning_ch1: bool,
    // Summation alert flag (bit 6).
    pub summation_alert: bool,
    // Critical alert flags, channel 3 down to channel 1 (bits 9:7).
    pub critical_ch3: bool,
    pub critical_ch2: bool,
    pub critical_ch1: bool,
    // Critical alert latch enable (bit 10).
    pub critical_latch_enable: bool,
    // Warning alert latch enable (bit 11).
    pub warning_latch_enable: bool,
    // Summation control, channel 3 down to channel 1 (bits 14:12).
    pub summation_ch3: bool,
    pub summation_ch2: bool,
    pub summation_ch1: bool,
    #[skip]
    __: B1,
}

impl From<u16> for MaskEnable {
    fn from(value: u16) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

impl From<MaskEnable> for u16 {
    fn from(value: MaskEnable) -> Self {
        u16::from_le_bytes(value.into_bytes())
    }
}

impl Register for Configuration {
    type Raw = u16;
    const ADDRESS: u8 = REG_CONFIG;
    const ACCESS: RegisterAccess = RegisterAccess::WriteOnly;
    const RESET_VALUE: Option<Self::Raw> = Some(0x7127);
}

impl Register for MaskEnable {
    type Raw = u16;
    const ADDRESS: u8 = REG_MASK_ENABLE;
    const ACCESS: RegisterAccess = RegisterAccess::ReadOnly;
    const RESET_VALUE: Option<Self::Raw> = Some(0x0002);
}
