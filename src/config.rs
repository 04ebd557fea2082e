//! Configuration primitives for the INA3221 driver.

use crate::params::{AveragingMode, ConversionTime, OperatingMode};
use crate::registers::Configuration;
use crate::sample::Channel;

/// Default polling interval of the conversion-ready flag (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 20;
/// Default upper bound on the conversion-ready wait (milliseconds).
pub const DEFAULT_FETCH_TIMEOUT_MS: u32 = 300_000;

/// Scaling inputs turning register counts into physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Shunt voltage per register count, in millivolts.
    pub shunt_lsb_mv: f64,
    /// Bus voltage per register count, in volts.
    pub bus_lsb_v: f64,
    /// Sense resistor value, in ohms.
    pub shunt_resistance_ohms: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            shunt_lsb_mv: 0.04,
            bus_lsb_v: 0.008,
            shunt_resistance_ohms: 0.1,
        }
    }
}

/// User-facing configuration for the INA3221 sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Request a system reset together with the configuration write.
    pub reset: bool,
    /// Per-channel enable flags, indexed by channel (solar, battery, load).
    pub channels: [bool; 3],
    /// Averaging mode selection.
    pub averaging: AveragingMode,
    /// Bus voltage conversion time.
    pub bus_conversion_time: ConversionTime,
    /// Shunt voltage conversion time.
    pub shunt_conversion_time: ConversionTime,
    /// Operating mode selection.
    pub mode: OperatingMode,
    /// Scaling inputs used when processing raw samples.
    pub calibration: Calibration,
    /// Sleep between two conversion-ready checks.
    pub poll_interval_ms: u32,
    /// Give up waiting for the conversion-ready flag after this long.
    pub fetch_timeout_ms: u32,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration can be used by the driver.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        let calibration = &self.calibration;
        if !calibration.shunt_resistance_ohms.is_finite() || calibration.shunt_resistance_ohms <= 0.0 {
            return Err(ConfigError::InvalidShuntResistance);
        }

        if !calibration.shunt_lsb_mv.is_finite() || !calibration.bus_lsb_v.is_finite() {
            return Err(ConfigError::InvalidCoefficient);
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(())
    }

    /// Encodes the register-related fields into the `CONFIG` register layout.
    pub fn register(&self) -> Configuration {
        Configuration::new()
            .with_reset(self.reset)
            .with_enable_ch1(self.channels[0])
            .with_enable_ch2(self.channels[1])
            .with_enable_ch3(self.channels[2])
            .with_averaging(self.averaging)
            .with_bus_conversion_time(self.bus_conversion_time)
            .with_shunt_conversion_time(self.shunt_conversion_time)
            .with_mode(self.mode)
    }

    /// Returns the raw configuration word written to the device.
    pub fn word(&self) -> u16 {
        u16::from(self.register())
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets or clears the reset request bit.
    pub fn reset(mut self, reset: bool) -> Self {
        self.config.reset = reset;
        self
    }

    /// Enables or disables a single channel.
    pub fn channel(mut self, channel: Channel, enabled: bool) -> Self {
        self.config.channels[channel.index()] = enabled;
        self
    }

    /// Overrides the averaging mode.
    pub fn averaging(mut self, averaging: AveragingMode) -> Self {
        self.config.averaging = averaging;
        self
    }

    /// Overrides the bus voltage conversion time.
    pub fn bus_conversion_time(mut self, time: ConversionTime) -> Self {
        self.config.bus_conversion_time = time;
        self
    }

    /// Overrides the shunt voltage conversion time.
    pub fn shunt_conversion_time(mut self, time: ConversionTime) -> Self {
        self.config.shunt_conversion_time = time;
        self
    }

    /// Overrides the operating mode.
    pub fn mode(mut self, mode: OperatingMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Replaces all calibration inputs.
    pub fn calibration(mut self, calibration: Calibration) -> Self {
        self.config.calibration = calibration;
        self
    }

    /// Overrides the sense resistor value.
    pub fn shunt_resistance_ohms(mut self, ohms: f64) -> Self {
        self.config.calibration.shunt_resistance_ohms = ohms;
        self
    }

    /// Overrides the conversion-ready polling interval.
    pub fn poll_interval_ms(mut self, interval: u32) -> Self {
        self.config.poll_interval_ms = interval;
        self
    }

    /// Overrides the conversion-ready timeout.
    pub fn fetch_timeout_ms(mut self, timeout: u32) -> Self {
        self.config.fetch_timeout_ms = timeout;
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset: true,
            channels: [true; 3],
            averaging: AveragingMode::Samples1024,
            bus_conversion_time: ConversionTime::Us1100,
            shunt_conversion_time: ConversionTime::Us1100,
            mode: OperatingMode::ShuntAndBusTriggered,
            calibration: Calibration::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Shunt resistance is zero, negative or not finite.
    InvalidShuntResistance,
    /// An LSB coefficient is not finite.
    InvalidCoefficient,
    /// The conversion-ready poll would never sleep.
    ZeroPollInterval,
}
