use core::convert::Infallible;

/// Errors returned by the driver.
///
/// `E` is the error type of the underlying I2C implementation. Validation
/// errors raised before any bus traffic (for example [`Error::InvalidGain`]
/// from a raw-value conversion) leave the default `Infallible` in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E = Infallible> {
    /// The requested transaction exceeds the transport's byte-count limit.
    BufferTooLarge,
    /// The underlying bus transaction failed.
    I2c(E),
    /// Gain factor other than 1 or 4.
    InvalidGain,
    /// Voltage-reference code other than 0 (internal) or 1 (external).
    InvalidVref,
    /// Data-rate code greater than 3.
    InvalidDataRate,
    /// Conversion-mode code greater than 1.
    InvalidConversionMode,
    /// Multiplexer selector that does not name a supported input.
    InvalidMux,
    /// The conversion did not become ready within the configured timeout.
    Timeout,
}
