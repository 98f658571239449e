//! A platform agnostic driver to interface with the TI ADS1219, a 24-bit
//! delta-sigma analog-to-digital converter on the I2C bus.
//!
//! The driver is built on the blocking [`embedded-hal`] traits and lets you:
//!
//! - detect the device and issue the reset, start/sync and power-down
//!   commands,
//! - configure gain, voltage reference, data rate and conversion mode
//!   through masked read-modify-write register updates (the configuration
//!   register is always re-read from the device, never cached host-side),
//! - run differential, single-ended and shorted-input conversions with
//!   averaging and warm-up skipping, bounded by a configurable timeout,
//! - convert raw 24-bit readings to millivolts for either voltage reference.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//!
//! ### Datasheet
//! - [ADS1219](https://www.ti.com/lit/ds/symlink/ads1219.pdf)
//!
//! # Examples
//!
//! ```
//! use ads1219::{Ads1219, Gain};
//! # use embedded_hal_mock::delay::MockNoop;
//! # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! #
//! # let expectations = [
//! #     I2cTransaction::write(0x40, vec![0x20]),
//! #     I2cTransaction::read(0x40, vec![0x00]),
//! #     I2cTransaction::write(0x40, vec![0x40, 0x10]),
//! #     I2cTransaction::write(0x40, vec![0x20]),
//! #     I2cTransaction::read(0x40, vec![0x10]),
//! # ];
//! # let i2c = I2cMock::new(&expectations);
//! # let delay = MockNoop::new();
//! let mut adc = Ads1219::new(i2c, delay);
//! adc.begin();
//!
//! adc.set_gain(Gain::X4)?;
//! assert_eq!(adc.gain()?, Gain::X4);
//! # let (mut i2c, _) = adc.free();
//! # i2c.done();
//! # Ok::<(), ads1219::Error<embedded_hal_mock::MockError>>(())
//! ```

#![cfg_attr(not(test), no_std)]

mod error;
mod registers;

pub use error::Error;
pub use registers::{decode_sample, ConversionMode, DataRate, Gain, Mux, Vref};

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write};
use registers::{
    CMD_POWERDOWN, CMD_RDATA, CMD_RESET, CMD_RREG_CONFIG, CMD_RREG_STATUS, CMD_START_SYNC,
    CMD_WREG, STATUS_DRDY,
};

/// Default I2C address, A0 and A1 both tied to DGND.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Most transports carry 32 bytes per transaction; SAMD-class ring buffers
/// take 256. Override with [`Ads1219::with_transfer_limit`].
const DEFAULT_TRANSFER_LIMIT: usize = 32;
const DEFAULT_TIMEOUT_MS: u32 = 100;

/// Millivolt span of the internal 2.048 V reference.
const INTERNAL_REF_MV: f32 = 2048.0;
/// Positive full-scale count of the 24-bit converter, 2^23.
const FULL_SCALE: f32 = 8_388_608.0;

/// ADS1219 driver.
///
/// Generic over the blocking I2C bus `I2C` and the delay provider `D`. Every
/// call owns the bus for its full duration; callers sharing one handle across
/// threads must serialize externally.
#[derive(Debug)]
pub struct Ads1219<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    data_ready_pin: Option<u8>,
    begun: bool,
    transfer_limit: usize,
    timeout_ms: u32,
    aref_n_mv: f32,
    aref_p_mv: f32,
}

impl<I2C, D> Ads1219<I2C, D> {
    /// Creates a driver for a device at [`DEFAULT_ADDRESS`].
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            data_ready_pin: None,
            begun: false,
            transfer_limit: DEFAULT_TRANSFER_LIMIT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            aref_n_mv: 0.0,
            aref_p_mv: INTERNAL_REF_MV,
        }
    }

    /// Uses a non-default I2C address (set by the A0/A1 strapping).
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Records the GPIO identifier wired to the DRDY output.
    ///
    /// The polling driver does not use the pin; it is kept for callers that
    /// route the data-ready signal themselves.
    pub fn with_data_ready_pin(mut self, pin: u8) -> Self {
        self.data_ready_pin = Some(pin);
        self
    }

    /// Caps the number of bytes per bus transaction.
    pub fn with_transfer_limit(mut self, limit: usize) -> Self {
        self.transfer_limit = limit;
        self
    }

    /// Overall time to wait for a conversion result, default 100 ms.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Marks the handle started.
    ///
    /// The I2C peripheral itself is expected to be initialized by the
    /// platform; [`Ads1219::detect`] reports `false` until this has been
    /// called.
    pub fn begin(&mut self) {
        self.begun = true;
    }

    /// The GPIO identifier recorded for the DRDY output, if any.
    pub fn data_ready_pin(&self) -> Option<u8> {
        self.data_ready_pin
    }

    /// How many bytes fit in one bus transaction.
    pub fn transfer_limit(&self) -> usize {
        self.transfer_limit
    }

    /// Destroys the driver and returns the bus and delay provider.
    pub fn free(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, D, E> Ads1219<I2C, D>
where
    I2C: Write<Error = E> + Read<Error = E>,
    D: DelayMs<u8>,
{
    /// Checks for a device acknowledge on the bus.
    ///
    /// A zero-length write probe; may give a false positive on a bus without
    /// pull-ups.
    pub fn detect(&mut self) -> bool {
        if !self.begun {
            return false;
        }
        self.i2c.write(self.address, &[]).is_ok()
    }

    /// Resets the device to its default configuration.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.command(CMD_RESET)
    }

    /// Starts (or restarts) a conversion.
    pub fn start(&mut self) -> Result<(), Error<E>> {
        self.command(CMD_START_SYNC)
    }

    /// Puts the device into power-down mode.
    ///
    /// Register values are held; the next start/sync command wakes the
    /// analog circuitry back up with the previous configuration.
    pub fn power_down(&mut self) -> Result<(), Error<E>> {
        self.command(CMD_POWERDOWN)
    }

    /// Reads the gain setting from the device.
    pub fn gain(&mut self) -> Result<Gain, Error<E>> {
        Ok(Gain::from_register(self.read_register(CMD_RREG_CONFIG)?))
    }

    /// Sets the gain, leaving all other configuration fields untouched.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<E>> {
        self.modify_config(gain.bits(), Gain::MASK)
    }

    /// Reads the voltage-reference selection from the device.
    pub fn vref(&mut self) -> Result<Vref, Error<E>> {
        Ok(Vref::from_register(self.read_register(CMD_RREG_CONFIG)?))
    }

    /// Selects the voltage reference and records the reference span.
    ///
    /// `aref_n_mv`/`aref_p_mv` describe the external reference inputs in
    /// millivolts and are only consumed by [`Ads1219::to_millivolts`]; with
    /// [`Vref::Internal`] the conversion always uses the fixed 2048 mV span.
    pub fn set_vref(&mut self, vref: Vref, aref_n_mv: f32, aref_p_mv: f32) -> Result<(), Error<E>> {
        self.modify_config(vref.bits(), Vref::MASK)?;
        self.aref_n_mv = aref_n_mv;
        self.aref_p_mv = aref_p_mv;
        Ok(())
    }

    /// Reads the data rate from the device.
    pub fn data_rate(&mut self) -> Result<DataRate, Error<E>> {
        Ok(DataRate::from_register(
            self.read_register(CMD_RREG_CONFIG)?,
        ))
    }

    /// Sets the data rate, leaving all other configuration fields untouched.
    pub fn set_data_rate(&mut self, rate: DataRate) -> Result<(), Error<E>> {
        self.modify_config(rate.bits(), DataRate::MASK)
    }

    /// Reads the conversion mode from the device.
    pub fn conversion_mode(&mut self) -> Result<ConversionMode, Error<E>> {
        Ok(ConversionMode::from_register(
            self.read_register(CMD_RREG_CONFIG)?,
        ))
    }

    /// Sets the conversion mode, leaving all other configuration fields
    /// untouched.
    pub fn set_conversion_mode(&mut self, mode: ConversionMode) -> Result<(), Error<E>> {
        self.modify_config(mode.bits(), ConversionMode::MASK)
    }

    /// Expected time in milliseconds for one conversion at the currently
    /// configured data rate.
    ///
    /// Returns the worst case (50 ms, the 20 SPS figure) if the data-rate
    /// readback fails, so a wait based on this value is never too short.
    pub fn conversion_time_ms(&mut self) -> u8 {
        match self.data_rate() {
            Ok(rate) => rate.conversion_time_ms(),
            Err(_) => DataRate::Sps20.conversion_time_ms(),
        }
    }

    /// Checks the status register for a finished conversion.
    ///
    /// The device clears the flag once the result has been read out.
    pub fn conversion_ready(&mut self) -> Result<bool, Error<E>> {
        let status = self.read_register(CMD_RREG_STATUS)?;
        Ok(status & STATUS_DRDY != 0)
    }

    /// Runs conversions on the given input selection and returns the
    /// averaged raw value.
    ///
    /// Performs `offset_skip + max(samples, 1)` conversions: the first
    /// `offset_skip` warm-up results are discarded (bias settling), the rest
    /// are averaged. Each conversion waits the expected time for the
    /// configured data rate and then polls the ready flag until the
    /// configured timeout, counted from the start command, has elapsed. The
    /// first error aborts the whole call.
    ///
    /// # Examples
    ///
    /// ```
    /// use ads1219::{Ads1219, Mux};
    /// # use embedded_hal_mock::delay::MockNoop;
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// #
    /// # let expectations = [
    /// #     I2cTransaction::write(0x40, vec![0x20]),
    /// #     I2cTransaction::read(0x40, vec![0x00]),
    /// #     I2cTransaction::write(0x40, vec![0x40, 0xE0]),
    /// #     I2cTransaction::write(0x40, vec![0x08]),
    /// #     I2cTransaction::write(0x40, vec![0x20]),
    /// #     I2cTransaction::read(0x40, vec![0xE0]),
    /// #     I2cTransaction::write(0x40, vec![0x24]),
    /// #     I2cTransaction::read(0x40, vec![0x80]),
    /// #     I2cTransaction::write(0x40, vec![0x10]),
    /// #     I2cTransaction::read(0x40, vec![0x00, 0x00, 0x2A]),
    /// # ];
    /// # let i2c = I2cMock::new(&expectations);
    /// let mut adc = Ads1219::new(i2c, MockNoop::new());
    /// adc.begin();
    ///
    /// let raw = adc.read(Mux::Shorted, 1, 0)?;
    /// assert_eq!(raw, 42);
    /// # let (mut i2c, _) = adc.free();
    /// # i2c.done();
    /// # Ok::<(), ads1219::Error<embedded_hal_mock::MockError>>(())
    /// ```
    pub fn read(&mut self, mux: Mux, samples: u16, offset_skip: u16) -> Result<i32, Error<E>> {
        self.modify_config(mux.bits(), Mux::MASK)?;

        let kept = samples.max(1);
        let total = u32::from(offset_skip) + u32::from(kept);
        let mut sum: i64 = 0;
        for n in 0..total {
            let raw = self.convert_once()?;
            if n >= u32::from(offset_skip) {
                sum += i64::from(raw);
            }
        }
        Ok((sum / i64::from(kept)) as i32)
    }

    /// Reads single-ended from channel 0-3.
    ///
    /// `offset_skip` warm-up conversions are run and discarded before the
    /// reported one. A channel outside 0-3 fails with [`Error::InvalidMux`]
    /// before any bus traffic.
    pub fn read_single_ended(&mut self, channel: u8, offset_skip: u16) -> Result<i32, Error<E>> {
        let mux = Mux::single_ended(channel).ok_or(Error::InvalidMux)?;
        self.read(mux, 1, offset_skip)
    }

    /// Reads with both inputs shorted to AVDD/2, averaged over `samples`
    /// conversions.
    ///
    /// With a noise-free device the result is the converter's zero-signal
    /// offset.
    pub fn read_shorted(&mut self, samples: u16) -> Result<i32, Error<E>> {
        self.read(Mux::Shorted, samples, 0)
    }

    /// Converts a raw reading to millivolts for the given gain.
    ///
    /// The reference span is taken from the device's voltage-reference
    /// selection: the fixed 2048 mV internal span, or the external span
    /// recorded by [`Ads1219::set_vref`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ads1219::{Ads1219, Gain};
    /// # use embedded_hal_mock::delay::MockNoop;
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// #
    /// # let expectations = [
    /// #     I2cTransaction::write(0x40, vec![0x20]),
    /// #     I2cTransaction::read(0x40, vec![0x00]),
    /// # ];
    /// # let i2c = I2cMock::new(&expectations);
    /// let mut adc = Ads1219::new(i2c, MockNoop::new());
    ///
    /// // half of positive full scale against the internal 2.048 V reference
    /// let mv = adc.to_millivolts(4_194_304, Gain::X1)?;
    /// assert_eq!(mv, 1024.0);
    /// # let (mut i2c, _) = adc.free();
    /// # i2c.done();
    /// # Ok::<(), ads1219::Error<embedded_hal_mock::MockError>>(())
    /// ```
    pub fn to_millivolts(&mut self, raw: i32, gain: Gain) -> Result<f32, Error<E>> {
        let span_mv = match self.vref()? {
            Vref::Internal => INTERNAL_REF_MV,
            Vref::External => self.aref_p_mv - self.aref_n_mv,
        };
        Ok(raw as f32 * span_mv / (f32::from(gain.factor()) * FULL_SCALE))
    }

    /// One conversion: start, wait the expected time, poll until ready or
    /// timeout, fetch and decode.
    fn convert_once(&mut self) -> Result<i32, Error<E>> {
        self.command(CMD_START_SYNC)?;

        let wait = self.conversion_time_ms();
        // 5 ms polling steps for the slow 50 ms conversion, 1 ms otherwise
        let step = if wait > 20 { 5 } else { 1 };
        self.delay.delay_ms(wait);

        // The timeout window is counted from the start command, so the
        // up-front wait consumes part of it. With no clock in embedded-hal
        // the window tracks commanded sleep time, which dominates it.
        let mut waited = u32::from(wait);
        let mut ready = false;
        while !ready && waited < self.timeout_ms {
            self.delay.delay_ms(step);
            waited += u32::from(step);
            ready = self.conversion_ready()?;
        }
        if !ready {
            return Err(Error::Timeout);
        }

        self.command(CMD_RDATA)?;
        let mut buffer = [0u8; 3];
        self.read_bytes(&mut buffer)?;
        Ok(decode_sample(buffer))
    }

    /// Read-modify-write of one configuration field: all bits outside `mask`
    /// keep their current on-device value.
    fn modify_config(&mut self, bits: u8, mask: u8) -> Result<(), Error<E>> {
        let current = self.read_register(CMD_RREG_CONFIG)?;
        self.write_config((current & !mask) | (bits & mask))
    }

    /// Writes the configuration register.
    ///
    /// Command byte and value must go out in one transaction; the device
    /// only associates the value with a write-config command it received
    /// without an intervening stop condition.
    fn write_config(&mut self, value: u8) -> Result<(), Error<E>> {
        self.write_bytes(&[CMD_WREG, value])
    }

    fn read_register(&mut self, rreg_command: u8) -> Result<u8, Error<E>> {
        self.command(rreg_command)?;
        let mut buffer = [0u8; 1];
        self.read_bytes(&mut buffer)?;
        Ok(buffer[0])
    }

    fn command(&mut self, command: u8) -> Result<(), Error<E>> {
        self.write_bytes(&[command])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        if bytes.len() > self.transfer_limit {
            return Err(Error::BufferTooLarge);
        }
        self.i2c.write(self.address, bytes).map_err(Error::I2c)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<(), Error<E>> {
        if buffer.len() > self.transfer_limit {
            return Err(Error::BufferTooLarge);
        }
        self.i2c.read(self.address, buffer).map_err(Error::I2c)
    }
}
