//! Runtime configuration
//!
//! Defaults match an RFM22B on a single board computer talking to 303.8 MHz
//! fan receivers. The command line overrides individual fields.

use std::path::PathBuf;
use std::time::Duration;

use crate::registers::{carrier_for, CarrierFrequency, FrequencyBandSelect};
use crate::{Error, Result};

/// Default spidev node.
pub const DEFAULT_SPIDEV: &str = "/dev/spidev1.0";

/// Settings of the transceiver handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverConfig {
    /// Carrier frequency in kHz
    pub frequency_khz: u32,
    /// Time between releasing the shutdown line and the first SPI access
    pub power_on_delay: Duration,
    /// Upper bound for every interrupt wait
    pub ready_timeout: Duration,
    /// Sampling period of the interrupt line while waiting
    pub poll_interval: Duration,
    /// Length of the shutdown pulse used to reset the chip
    pub reset_pulse: Duration,
    /// TX FIFO almost-empty interrupt threshold in bytes
    pub fifo_threshold: u8,
}

impl Default for TransceiverConfig {
    fn default() -> Self {
        Self {
            frequency_khz: 303_800,
            power_on_delay: Duration::from_millis(20),
            ready_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_micros(100),
            reset_pulse: Duration::from_millis(1),
            fifo_threshold: 4,
        }
    }
}

impl TransceiverConfig {
    /// Reject settings the handshake cannot run with.
    ///
    /// # Errors
    /// * `Error::InvalidCommand` - carrier out of range or zero poll interval
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::invalid("poll interval", "0", "a non-zero duration"));
        }
        self.carrier().map(drop)
    }

    pub(crate) fn carrier(&self) -> Result<(FrequencyBandSelect, CarrierFrequency)> {
        carrier_for(self.frequency_khz).ok_or_else(|| {
            Error::invalid("frequency", format!("{} kHz", self.frequency_khz), "240-960 MHz")
        })
    }
}

/// Where to find the transceiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareConfig {
    pub spidev: PathBuf,
    /// SPI clock in Hz
    pub spi_speed_hz: u32,
    /// GPIO number of the nIRQ line
    pub irq_gpio: u64,
    /// GPIO number of the SDN line
    pub shutdown_gpio: u64,
    pub transceiver: TransceiverConfig,
}

impl HardwareConfig {
    pub fn new(spidev: impl Into<PathBuf>, irq_gpio: u64, shutdown_gpio: u64) -> Self {
        Self {
            spidev: spidev.into(),
            spi_speed_hz: 10_000_000,
            irq_gpio,
            shutdown_gpio,
            transceiver: TransceiverConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TransceiverConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let config = TransceiverConfig {
            poll_interval: Duration::ZERO,
            ..TransceiverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidCommand { field: "poll interval", .. })
        ));
    }

    #[test]
    fn frequency_outside_both_bands_is_invalid() {
        let config = TransceiverConfig {
            frequency_khz: 100_000,
            ..TransceiverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidCommand { field: "frequency", .. })
        ));
    }
}
