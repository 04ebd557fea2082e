//! Raw register samples and their conversion into physical quantities.

use core::fmt;

use crate::clock::DateTime;
use crate::config::Calibration;
use crate::registers::{REG_BUS_VOLTAGE, REG_SHUNT_VOLTAGE};

// Sign bit of the shunt and bus voltage registers.
const SIGN_BIT: u16 = 1 << 15;
// The three low bits of the voltage registers are not part of the payload.
const PAYLOAD_SHIFT: u16 = 3;
const MAGNITUDE_MASK: u16 = 0x0FFF;

/// One of the three monitored power rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Channel 1, the power source.
    Solar = 0,
    /// Channel 2, the storage element.
    Battery = 1,
    /// Channel 3, the consumer.
    Load = 2,
}

impl Channel {
    /// All channels in register order.
    pub const ALL: [Channel; 3] = [Channel::Solar, Channel::Battery, Channel::Load];

    /// Zero-based channel ordinal.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable rail name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solar => "Solar",
            Self::Battery => "Battery",
            Self::Load => "Load",
        }
    }

    /// Address of this channel's shunt-voltage register.
    pub const fn shunt_register(self) -> u8 {
        REG_SHUNT_VOLTAGE[self as usize]
    }

    /// Address of this channel's bus-voltage register.
    pub const fn bus_register(self) -> u8 {
        REG_BUS_VOLTAGE[self as usize]
    }
}

/// Register words captured by the latest successful fetch, in host byte order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Shunt-voltage register words, indexed by channel.
    pub shunt: [u16; 3],
    /// Bus-voltage register words, indexed by channel.
    pub bus: [u16; 3],
}

/// Physical quantities derived for a single channel.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelReading {
    /// Voltage across the sense resistor, in millivolts.
    pub shunt_voltage_mv: f64,
    /// Voltage on the bus pin, in volts.
    pub bus_voltage_v: f64,
    /// Supply-side voltage (bus plus shunt drop), in volts.
    pub load_voltage_v: f64,
    /// Current through the sense resistor, in milliamperes.
    pub current_ma: f64,
    /// Power delivered, in milliwatts.
    pub power_mw: f64,
}

impl ChannelReading {
    /// Derives load voltage, current and power from the decoded voltages.
    pub fn from_voltages(shunt_voltage_mv: f64, bus_voltage_v: f64, shunt_resistance_ohms: f64) -> Self {
        let load_voltage_v = bus_voltage_v + shunt_voltage_mv / 1000.0;
        let current_ma = shunt_voltage_mv / shunt_resistance_ohms;

        Self {
            shunt_voltage_mv,
            bus_voltage_v,
            load_voltage_v,
            current_ma,
            power_mw: load_voltage_v * current_ma,
        }
    }
}

impl fmt::Display for ChannelReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus {:.2} V, shunt {:.2} mV, load {:.2} V, current {:.2} mA, power {:.2} mW",
            self.bus_voltage_v,
            self.shunt_voltage_mv,
            self.load_voltage_v,
            self.current_ma,
            self.power_mw
        )
    }
}

/// Processed readings of all channels together with the fetch timestamp.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Time the underlying raw sample was fetched, if any fetch succeeded.
    pub timestamp: Option<DateTime>,
    /// Per-channel quantities, indexed by channel.
    pub channels: [ChannelReading; 3],
}

impl Reading {
    /// Decodes every channel of `raw` using `calibration`.
    pub fn from_raw(raw: &RawSample, calibration: &Calibration, timestamp: Option<DateTime>) -> Self {
        let mut channels = [ChannelReading::default(); 3];
        for (index, channel) in channels.iter_mut().enumerate() {
            *channel = ChannelReading::from_voltages(
                decode_voltage(raw.shunt[index], calibration.shunt_lsb_mv),
                decode_voltage(raw.bus[index], calibration.bus_lsb_v),
                calibration.shunt_resistance_ohms,
            );
        }

        Self { timestamp, channels }
    }

    /// Returns the quantities of a single channel.
    pub fn channel(&self, channel: Channel) -> &ChannelReading {
        &self.channels[channel.index()]
    }
}

/// Converts a shunt or bus register word into a physical value.
///
/// The payload sits in bits 15:3 with bit 15 as sign. Negative words are
/// decremented, shifted, complemented and masked to twelve bits, so the
/// magnitude never exceeds `0x0FFF` counts even though the field is
/// nominally 13 bits wide.
pub fn decode_voltage(raw: u16, lsb: f64) -> f64 {
    if raw & SIGN_BIT != 0 {
        let magnitude = !((raw - 1) >> PAYLOAD_SHIFT) & MAGNITUDE_MASK;
        -f64::from(magnitude) * lsb
    } else {
        f64::from((raw >> PAYLOAD_SHIFT) & MAGNITUDE_MASK) * lsb
    }
}
