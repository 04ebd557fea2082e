//! High-level INA3221 device driver implementation.

use crate::clock::{Clock, DateTime};
use crate::config::{Calibration, Config, ConfigError};
use crate::error::{Error, Result};
use crate::interface::i2c::I2cInterface;
use crate::interface::Ina3221Interface;
use crate::registers::{Configuration, MaskEnable, Register};
use crate::sample::{Channel, RawSample, Reading};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// High-level synchronous driver for the INA3221 power monitor.
///
/// The driver owns the latest raw sample and its decoded [`Reading`]. Every
/// operation is caller-triggered; the only blocking wait is the
/// conversion-ready poll inside
/// [`fetch_shunt_bus_voltage_data`](Self::fetch_shunt_bus_voltage_data).
pub struct Ina3221<IFACE, CLK> {
    interface: IFACE,
    clock: CLK,
    config: Config,
    raw: RawSample,
    reading: Reading,
    fetched: bool,
    fetched_at: Option<DateTime>,
}

impl<IFACE, CLK> Ina3221<IFACE, CLK> {
    // ==================================================================
    // == Ownership & State Accessors ===================================
    // ==================================================================
    /// Consumes the driver and returns the owned interface, clock and configuration.
    pub fn release(self) -> (IFACE, CLK, Config) {
        (self.interface, self.clock, self.config)
    }

    /// Provides mutable access to the underlying interface.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        &mut self.interface
    }

    /// Returns a shared reference to the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the calibration inputs used by processing.
    pub fn calibration(&self) -> &Calibration {
        &self.config.calibration
    }

    /// Replaces the calibration inputs. Takes effect on the next processing pass.
    ///
    /// Inputs rejected by [`Config::validate`] leave the current calibration in place.
    pub fn set_calibration(&mut self, calibration: Calibration) -> core::result::Result<(), ConfigError> {
        let candidate = Config {
            calibration,
            ..self.config
        };
        candidate.validate()?;

        self.config = candidate;
        Ok(())
    }

    /// Whether the most recent fetch succeeded.
    ///
    /// `false` before the first successful fetch and after a fetch timeout.
    /// Consumers must check this before trusting [`reading`](Self::reading).
    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Register words captured by the latest successful fetch.
    pub fn raw_sample(&self) -> &RawSample {
        &self.raw
    }

    /// Result of the latest processing pass.
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    /// Time of the latest successful fetch.
    pub fn fetched_at(&self) -> Option<DateTime> {
        self.fetched_at
    }

    // ==================================================================
    // == Decoding =======================================================
    // ==================================================================
    /// Decodes the latest raw sample into physical quantities.
    ///
    /// Pure computation; never touches the bus. Running it before a
    /// successful fetch decodes the all-zero initial sample.
    pub fn process_shunt_bus_voltage_data(&mut self) -> &Reading {
        self.reading = Reading::from_raw(&self.raw, &self.config.calibration, self.fetched_at);
        &self.reading
    }

    /// Emits the latest processed reading as log events, one line per quantity.
    pub fn log_reading(&self) {
        for channel in Channel::ALL {
            let values = self.reading.channel(channel);
            info!("{} bus voltage: {} V", channel.label(), values.bus_voltage_v);
            info!("{} shunt voltage: {} mV", channel.label(), values.shunt_voltage_mv);
            info!("{} load voltage: {} V", channel.label(), values.load_voltage_v);
            info!("{} current: {} mA", channel.label(), values.current_ma);
            info!("{} power: {} mW", channel.label(), values.power_mw);
        }
    }
}

impl<I2C, CLK> Ina3221<I2cInterface<I2C>, CLK>
where
    I2C: I2c,
    CLK: Clock,
{
    // ==================================================================
    // == I2C Convenience Constructors ==================================
    // ==================================================================
    /// Convenience constructor for I2C transports.
    pub fn new_i2c(i2c: I2C, address: u8, clock: CLK, config: Config) -> Result<Self, I2C::Error> {
        Self::new(I2cInterface::new(i2c, address), clock, config)
    }

    /// Releases the driver, returning the I2C bus, clock and configuration.
    pub fn release_i2c(self) -> (I2C, CLK, Config) {
        let (iface, clock, config) = self.release();
        (iface.release(), clock, config)
    }
}

impl<IFACE, CommE, CLK> Ina3221<IFACE, CLK>
where
    IFACE: Ina3221Interface<Error = CommE>,
    CLK: Clock,
{
    // ==================================================================
    // == Initialization & Configuration ================================
    // ==================================================================
    /// Creates the driver and writes `config` to the `CONFIG` register.
    ///
    /// The write is attempted once; a bus failure aborts construction.
    pub fn new(interface: IFACE, clock: CLK, config: Config) -> Result<Self, CommE> {
        let mut device = Self {
            interface,
            clock,
            config,
            raw: RawSample::default(),
            reading: Reading::default(),
            fetched: false,
            fetched_at: None,
        };
        device.configure(config)?;
        Ok(device)
    }

    /// Validates `config` and writes its register fields to the device.
    pub fn configure(&mut self, config: Config) -> Result<(), CommE> {
        config.validate().map_err(|_| Error::InvalidConfig)?;

        let word = config.word();
        debug!("writing CONFIG {=u16:#x}", word);
        self
            .interface
            .write_register(Configuration::ADDRESS, word)
            .map_err(Error::from)?;

        self.config = config;
        Ok(())
    }

    // ==================================================================
    // == Status =========================================================
    // ==================================================================
    /// Reads the `MASK_ENABLE` register.
    pub fn read_mask_enable(&mut self) -> Result<MaskEnable, CommE> {
        let raw = self
            .interface
            .read_register(MaskEnable::ADDRESS)
            .map_err(Error::from)?;

        Ok(MaskEnable::from(raw))
    }

    /// Checks the conversion-ready flag once.
    pub fn conversion_ready(&mut self) -> Result<bool, CommE> {
        Ok(self.read_mask_enable()?.conversion_ready())
    }

    // ==================================================================
    // == Data Acquisition ==============================================
    // ==================================================================
    /// Waits for a completed conversion and captures all six voltage registers.
    ///
    /// Polls the conversion-ready flag every `poll_interval_ms` until it is set
    /// or `fetch_timeout_ms` has been spent sleeping. On timeout the fetched
    /// flag is cleared and [`Error::FetchTimeout`] is returned; the previous
    /// raw sample is kept. A bus error aborts the fetch without changing any
    /// stored state.
    pub fn fetch_shunt_bus_voltage_data(&mut self, delay: &mut impl DelayNs) -> Result<(), CommE> {
        if let Err(err) = self.wait_for_conversion(delay) {
            if matches!(err, Error::FetchTimeout) {
                warn!("conversion not ready after {=u32} ms, data not fetched", self.config.fetch_timeout_ms);
                self.fetched = false;
            }
            return Err(err);
        }

        self.raw = self.read_raw_sample()?;
        self.fetched = true;
        self.fetched_at = Some(self.clock.now());
        trace!("fetched raw sample {}", self.raw);

        Ok(())
    }

    /// Fetches a new sample and decodes it.
    pub fn measure(&mut self, delay: &mut impl DelayNs) -> Result<Reading, CommE> {
        self.fetch_shunt_bus_voltage_data(delay)?;
        Ok(*self.process_shunt_bus_voltage_data())
    }

    // ==================================================================
    // == Internal Helpers ===============================================
    // ==================================================================
    fn wait_for_conversion(&mut self, delay: &mut impl DelayNs) -> Result<(), CommE> {
        let poll_interval_ms = self.config.poll_interval_ms;
        let mut waited_ms: u32 = 0;

        loop {
            if self.conversion_ready()? {
                return Ok(());
            }

            if waited_ms >= self.config.fetch_timeout_ms {
                return Err(Error::FetchTimeout);
            }

            delay.delay_ms(poll_interval_ms);
            waited_ms = waited_ms.saturating_add(poll_interval_ms);
        }
    }

    fn read_raw_sample(&mut self) -> Result<RawSample, CommE> {
        let mut raw = RawSample::default();

        for channel in Channel::ALL {
            raw.shunt[channel.index()] = self
                .interface
                .read_register(channel.shunt_register())
                .map_err(Error::from)?;
        }

        for channel in Channel::ALL {
            raw.bus[channel.index()] = self
                .interface
                .read_register(channel.bus_register())
                .map_err(Error::from)?;
        }

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::Ina3221;
    use crate::clock::DateTime;
    use crate::config::{Calibration, Config, ConfigError};
    use crate::error::Error;
    use crate::interface::i2c::{I2cInterface, DEFAULT_ADDRESS};
    use crate::registers::{REG_CONFIG, REG_MASK_ENABLE};
    use crate::sample::{Channel, RawSample};
    use embedded_hal::delay::DelayNs;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const STAMP: DateTime = DateTime::new(2024, 6, 1, 12, 30, 15);

    type TestDriver = Ina3221<I2cInterface<I2cMock>, fn() -> DateTime>;

    /// Records how long the driver asked to sleep.
    #[derive(Default)]
    struct FakeDelay {
        elapsed_ms: u64,
        sleeps: usize,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.elapsed_ms += u64::from(ns) / 1_000_000;
            self.sleeps += 1;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.elapsed_ms += u64::from(ms);
            self.sleeps += 1;
        }
    }

    fn stamp() -> DateTime {
        STAMP
    }

    fn config_write(word: u16) -> I2cTransaction {
        let [msb, lsb] = word.to_be_bytes();
        I2cTransaction::write(DEFAULT_ADDRESS, vec![REG_CONFIG, msb, lsb])
    }

    fn register_read(register: u8, value: u16) -> I2cTransaction {
        I2cTransaction::write_read(DEFAULT_ADDRESS, vec![register], value.to_be_bytes().to_vec())
    }

    fn sample_reads(raw: &RawSample) -> Vec<I2cTransaction> {
        let mut reads = Vec::new();
        for channel in Channel::ALL {
            reads.push(register_read(channel.shunt_register(), raw.shunt[channel.index()]));
        }
        for channel in Channel::ALL {
            reads.push(register_read(channel.bus_register(), raw.bus[channel.index()]));
        }
        reads
    }

    fn driver(i2c: &I2cMock, config: Config) -> TestDriver {
        Ina3221::new_i2c(i2c.clone(), DEFAULT_ADDRESS, stamp as fn() -> DateTime, config).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    const SAMPLE: RawSample = RawSample {
        shunt: [0x1F40, 0x0008, 0xFFF8],
        bus: [0x2EE0, 0x2580, 0x0640],
    };

    #[test]
    fn construction_writes_default_configuration() {
        let mut i2c = I2cMock::new(&[config_write(0xFF23)]);
        let device = driver(&i2c, Config::default());

        assert!(!device.is_fetched());
        assert_eq!(device.fetched_at(), None);
        i2c.done();
    }

    #[test]
    fn construction_fails_on_bus_error() {
        let mut i2c = I2cMock::new(&[config_write(0xFF23).with_error(ErrorKind::Other)]);
        let result = Ina3221::new_i2c(i2c.clone(), DEFAULT_ADDRESS, stamp, Config::default());

        assert!(matches!(result, Err(Error::Bus(ErrorKind::Other))));
        i2c.done();
    }

    #[test]
    fn construction_rejects_invalid_config_without_bus_traffic() {
        let expectations: [I2cTransaction; 0] = [];
        let mut i2c = I2cMock::new(&expectations);
        let config = Config::new().shunt_resistance_ohms(0.0).build();
        let result = Ina3221::new_i2c(i2c.clone(), DEFAULT_ADDRESS, stamp, config);

        assert!(matches!(result, Err(Error::InvalidConfig)));
        i2c.done();
    }

    #[test]
    fn configure_rewrites_register_on_demand() {
        let config = Config::new().reset(false).build();
        let mut i2c = I2cMock::new(&[config_write(0xFF23), config_write(0x7F23)]);
        let mut device = driver(&i2c, Config::default());

        device.configure(config).unwrap();
        assert_eq!(device.config(), &config);
        i2c.done();
    }

    #[test]
    fn fetch_waits_for_conversion_ready_before_reading_voltages() {
        let mut expectations = vec![
            config_write(0xFF23),
            register_read(REG_MASK_ENABLE, 0x0000),
            register_read(REG_MASK_ENABLE, 0x0002),
            register_read(REG_MASK_ENABLE, 0x0003),
        ];
        expectations.extend(sample_reads(&SAMPLE));

        let mut i2c = I2cMock::new(&expectations);
        let mut device = driver(&i2c, Config::default());
        let mut delay = FakeDelay::default();

        device.fetch_shunt_bus_voltage_data(&mut delay).unwrap();

        assert!(device.is_fetched());
        assert_eq!(device.raw_sample(), &SAMPLE);
        assert_eq!(device.fetched_at(), Some(STAMP));
        assert_eq!(delay.sleeps, 2);
        assert_eq!(delay.elapsed_ms, 40);
        i2c.done();
    }

    #[test]
    fn fetch_times_out_and_keeps_previous_sample() {
        let config = Config::new().poll_interval_ms(20).fetch_timeout_ms(100).build();

        let mut expectations = vec![config_write(0xFF23), register_read(REG_MASK_ENABLE, 0x0001)];
        expectations.extend(sample_reads(&SAMPLE));
        expectations.extend((0..6).map(|_| register_read(REG_MASK_ENABLE, 0x0000)));

        let mut i2c = I2cMock::new(&expectations);
        let mut device = driver(&i2c, config);
        let mut delay = FakeDelay::default();

        device.fetch_shunt_bus_voltage_data(&mut delay).unwrap();
        assert!(device.is_fetched());

        let result = device.fetch_shunt_bus_voltage_data(&mut delay);
        assert_eq!(result, Err(Error::FetchTimeout));
        assert!(!device.is_fetched());
        assert_eq!(device.raw_sample(), &SAMPLE);
        assert!(delay.elapsed_ms >= 100);
        assert!(delay.elapsed_ms <= 100 + 20);
        i2c.done();
    }

    #[test]
    fn zero_timeout_checks_once() {
        let config = Config::new().fetch_timeout_ms(0).build();
        let mut i2c = I2cMock::new(&[config_write(0xFF23), register_read(REG_MASK_ENABLE, 0x0000)]);
        let mut device = driver(&i2c, config);
        let mut delay = FakeDelay::default();

        assert_eq!(
            device.fetch_shunt_bus_voltage_data(&mut delay),
            Err(Error::FetchTimeout)
        );
        assert_eq!(delay.sleeps, 0);
        i2c.done();
    }

    #[test]
    fn bus_error_during_fetch_commits_nothing() {
        let mut i2c = I2cMock::new(&[
            config_write(0xFF23),
            register_read(REG_MASK_ENABLE, 0x0001),
            register_read(0x01, 0x1F40),
            register_read(0x03, 0x0000).with_error(ErrorKind::Other),
        ]);
        let mut device = driver(&i2c, Config::default());
        let mut delay = FakeDelay::default();

        let result = device.fetch_shunt_bus_voltage_data(&mut delay);
        assert_eq!(result, Err(Error::Bus(ErrorKind::Other)));
        assert!(!device.is_fetched());
        assert_eq!(device.raw_sample(), &RawSample::default());
        assert_eq!(device.fetched_at(), None);
        i2c.done();
    }

    #[test]
    fn process_without_fetch_decodes_zero_sample() {
        let mut i2c = I2cMock::new(&[config_write(0xFF23)]);
        let mut device = driver(&i2c, Config::default());

        let reading = *device.process_shunt_bus_voltage_data();
        assert_eq!(reading.timestamp, None);
        for channel in reading.channels {
            assert_eq!(channel.power_mw, 0.0);
            assert_eq!(channel.load_voltage_v, 0.0);
        }
        i2c.done();
    }

    #[test]
    fn measure_fetches_and_decodes() {
        let mut expectations = vec![config_write(0xFF23), register_read(REG_MASK_ENABLE, 0x0001)];
        expectations.extend(sample_reads(&SAMPLE));

        let mut i2c = I2cMock::new(&expectations);
        let mut device = driver(&i2c, Config::default());
        let reading = device.measure(&mut FakeDelay::default()).unwrap();

        assert_eq!(reading.timestamp, Some(STAMP));
        let solar = reading.channel(Channel::Solar);
        assert_close(solar.load_voltage_v, 12.04);
        assert_close(solar.current_ma, 400.0);
        assert_close(solar.power_mw, 4816.0);

        let battery = reading.channel(Channel::Battery);
        assert_close(battery.bus_voltage_v, 9.6);
        assert_close(battery.current_ma, 0.4);

        let load = reading.channel(Channel::Load);
        assert_close(load.bus_voltage_v, 1.6);
        assert_close(load.current_ma, -0.4);

        device.log_reading();
        assert_eq!(device.reading(), &reading);
        i2c.done();
    }

    #[test]
    fn calibration_changes_apply_on_next_process() {
        let mut expectations = vec![config_write(0xFF23), register_read(REG_MASK_ENABLE, 0x0001)];
        expectations.extend(sample_reads(&SAMPLE));

        let mut i2c = I2cMock::new(&expectations);
        let mut device = driver(&i2c, Config::default());
        device.fetch_shunt_bus_voltage_data(&mut FakeDelay::default()).unwrap();

        device
            .set_calibration(Calibration {
                shunt_resistance_ohms: 0.05,
                ..Calibration::default()
            })
            .unwrap();
        let solar = *device.process_shunt_bus_voltage_data().channel(Channel::Solar);
        assert_close(solar.current_ma, 800.0);
        assert_close(solar.power_mw, 9632.0);
        i2c.done();
    }

    #[test]
    fn unusable_calibration_is_rejected_and_previous_kept() {
        let mut expectations = vec![config_write(0xFF23), register_read(REG_MASK_ENABLE, 0x0001)];
        expectations.extend(sample_reads(&SAMPLE));

        let mut i2c = I2cMock::new(&expectations);
        let mut device = driver(&i2c, Config::default());
        device.fetch_shunt_bus_voltage_data(&mut FakeDelay::default()).unwrap();

        let result = device.set_calibration(Calibration {
            shunt_resistance_ohms: 0.0,
            ..Calibration::default()
        });
        assert_eq!(result, Err(ConfigError::InvalidShuntResistance));
        assert_eq!(device.calibration(), &Calibration::default());
        assert_eq!(device.config().validate(), Ok(()));

        let solar = *device.process_shunt_bus_voltage_data().channel(Channel::Solar);
        assert_close(solar.current_ma, 400.0);
        assert_close(solar.power_mw, 4816.0);
        i2c.done();
    }
}
