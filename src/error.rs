//! Error types
//!
//! Every fallible operation in the crate returns [`Result<T>`]. The variants of
//! [`Error`] follow the lifecycle of a transmission: a command is validated
//! ([`Error::InvalidCommand`]), the hardware is claimed
//! ([`Error::HardwareUnavailable`]), the transceiver is waited on
//! ([`Error::HardwareTimeout`]) and finally driven ([`Error::TransmissionFailed`]).

use core::time::Duration;

/// The error type for all fan remote operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller supplied value is outside the protocol's valid domain.
    ///
    /// Always raised before any bus or GPIO traffic takes place.
    #[error("invalid {field}: {value} (expected {expected})")]
    InvalidCommand {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The bus device or one of the GPIO lines could not be claimed.
    ///
    /// Backend selection turns this into a fallback to the dummy backend.
    #[error("{resource} unavailable: {reason}")]
    HardwareUnavailable { resource: String, reason: String },

    /// The transceiver did not raise the expected interrupt in time.
    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    HardwareTimeout {
        waiting_for: &'static str,
        timeout: Duration,
    },

    /// A bus or GPIO operation failed while the transceiver was powered.
    #[error("transmission failed: {0}")]
    TransmissionFailed(#[from] BusError),
}

impl Error {
    pub(crate) fn invalid(
        field: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Self::InvalidCommand {
            field,
            value: value.to_string(),
            expected,
        }
    }

    pub(crate) fn unavailable(resource: impl ToString, reason: impl ToString) -> Self {
        Self::HardwareUnavailable {
            resource: resource.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Low level failure talking to the transceiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// SPI transaction failed.
    #[error("SPI error: {0}")]
    Spi(embedded_hal::spi::ErrorKind),

    /// Driving or sampling a GPIO line failed.
    #[error("GPIO error: {0}")]
    Gpio(embedded_hal::digital::ErrorKind),

    /// A register returned a value that does not map to its type.
    #[error("register 0x{register:02x} returned an undecodable value")]
    Decode { register: u8 },

    /// A register read back differently from what was written.
    #[error("register 0x{register:02x} wrote 0x{wrote:02x}, read back 0x{read:02x}")]
    Verify { register: u8, wrote: u8, read: u8 },
}

impl BusError {
    pub(crate) fn spi<E: embedded_hal::spi::Error>(err: E) -> Self {
        Self::Spi(err.kind())
    }

    pub(crate) fn gpio<E: embedded_hal::digital::Error>(err: E) -> Self {
        Self::Gpio(err.kind())
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = core::result::Result<T, Error>;
