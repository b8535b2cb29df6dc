//! RF-related registers
//!
//! This module contains registers related to RF configuration and operation including:
//! - TX output power
//! - TX data rate
//! - Modulation type and data source
//! - Carrier frequency (band select, nominal carrier and offset)
//!
//! Registers spanning two addresses are accessed with a single burst, relying
//! on the address auto-increment of the SPI interface.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Crystal-derived limits of the synthesizer, in kHz.
pub const MIN_FREQUENCY_KHZ: u32 = 240_000;
pub const MAX_FREQUENCY_KHZ: u32 = 960_000;
const HIGH_BAND_KHZ: u32 = 480_000;

/// TX power register (address: 0x6D)
///
/// # Output Power
/// `level` 0..=7 selects +1 dBm to +20 dBm in roughly 3 dB steps
/// (RFM22B). The remaining bits are preserved across writes.
#[register(0x6Du8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct TxPower {
    /// TXPOW[2:0]
    pub level: u8,
    /// LNA switch controller enable
    pub lna_switch: bool,
    /// PA peak detector bits [7:4], kept verbatim
    pub pa_peak: u8,
}

/// TX data rate (addresses: 0x6E-0x6F)
///
/// `txdr = rate * 2^16 / 1 MHz`, or `rate * 2^21 / 1 MHz` when
/// [`ModulationMode::TX_DATA_RATE_SCALE`] is set, which is required below
/// 30 kbps.
#[register(0x6Eu8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct TxDataRate {
    pub txdr: u16,
}

impl TxDataRate {
    /// Rates below this need the scaled encoding.
    pub const SCALE_BELOW_HZ: u32 = 30_000;

    /// Register value for `rate_hz` and whether the scale bit is needed.
    ///
    /// Returns `None` when the rate cannot be represented.
    pub fn for_rate(rate_hz: u32) -> Option<(Self, bool)> {
        let scaled = rate_hz < Self::SCALE_BELOW_HZ;
        let exp = if scaled { 21 } else { 16 };
        let txdr = (rate_hz as u64) * (1 << exp) / 1_000_000;
        if txdr == 0 || txdr > u16::MAX as u64 {
            return None;
        }
        Some((Self { txdr: txdr as u16 }, scaled))
    }
}

bitflags! {
    /// Modulation mode control 1 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModulationMode: u8 {
        const DATA_WHITENING = 1 << 0;
        const MANCHESTER = 1 << 1;
        const MANCHESTER_INVERT = 1 << 2;
        const MANCHESTER_POLARITY = 1 << 3;
        const PACKET_HANDLER_POWER_DOWN = 1 << 4;
        const TX_DATA_RATE_SCALE = 1 << 5;
    }
}

/// Modulation mode control 1 (address: 0x70)
#[register(0x70u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct ModulationModeControl1 {
    pub flags: ModulationMode,
}

/// Modulation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationType {
    Unmodulated = 0,
    Ook = 1,
    Fsk = 2,
    Gfsk = 3,
}

/// Where the modulator takes TX data from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    DirectGpio = 0,
    DirectSdi = 1,
    Fifo = 2,
    Pn9 = 3,
}

/// Modulation mode control 2 (address: 0x71)
#[register(0x71u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct ModulationModeControl2 {
    pub modulation: ModulationType,
    pub source: DataSource,
    /// MSB of the frequency deviation
    pub fd8: bool,
    /// Invert TX and RX data
    pub invert: bool,
    /// TX data clock configuration, 2 bits
    pub tx_clock: u8,
}

/// Frequency offset (addresses: 0x73-0x74)
///
/// 10 bit two's complement offset in steps of 156.25 Hz (low band).
#[register(0x73u8)]
#[derive(Debug, Clone, Copy, Default, ReadableRegister, WritableRegister)]
pub struct FrequencyOffset {
    pub offset: u16,
}

/// Frequency band select (address: 0x75)
#[register(0x75u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FrequencyBandSelect {
    /// fb[4:0], 10 MHz (low band) or 20 MHz (high band) steps from 240/480 MHz
    pub band: u8,
    /// Select the 480-960 MHz band
    pub high_band: bool,
    /// Side band select
    pub side_band: bool,
}

/// Nominal carrier frequency (addresses: 0x76-0x77)
#[register(0x76u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct CarrierFrequency {
    pub fc: u16,
}

/// Band and carrier settings for a frequency in kHz.
///
/// ```text
/// low band:  f = 10 MHz * (fb + 24 + fc / 64000)
/// high band: f = 20 MHz * (fb + 24 + fc / 64000)
/// ```
///
/// Returns `None` outside of 240-960 MHz.
pub fn carrier_for(frequency_khz: u32) -> Option<(FrequencyBandSelect, CarrierFrequency)> {
    if !(MIN_FREQUENCY_KHZ..MAX_FREQUENCY_KHZ).contains(&frequency_khz) {
        return None;
    }
    let high_band = frequency_khz >= HIGH_BAND_KHZ;
    let (base, step) = if high_band {
        (HIGH_BAND_KHZ, 20_000)
    } else {
        (MIN_FREQUENCY_KHZ, 10_000)
    };
    let band = (frequency_khz - base) / step;
    let fc = frequency_khz as u64 * 64_000 / step as u64 - (band as u64 + 24) * 64_000;

    Some((
        FrequencyBandSelect {
            band: band as u8,
            high_band,
            side_band: false,
        },
        CarrierFrequency { fc: fc as u16 },
    ))
}

impl FromByteArray for TxPower {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            level: bytes[0] & 0x07,
            lna_switch: bytes[0] & 0x08 != 0,
            pa_peak: bytes[0] >> 4,
        })
    }
}

impl ToByteArray for TxPower {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut byte = (self.pa_peak << 4) | (self.level & 0x07);
        if self.lna_switch {
            byte |= 0x08;
        }
        Ok([byte])
    }
}

impl FromByteArray for TxDataRate {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            txdr: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for TxDataRate {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.txdr.to_be_bytes())
    }
}

impl FromByteArray for ModulationModeControl1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: ModulationMode::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for ModulationModeControl1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for ModulationModeControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let modulation = match bytes[0] & 0x03 {
            0 => ModulationType::Unmodulated,
            1 => ModulationType::Ook,
            2 => ModulationType::Fsk,
            _ => ModulationType::Gfsk,
        };
        let source = match (bytes[0] >> 4) & 0x03 {
            0 => DataSource::DirectGpio,
            1 => DataSource::DirectSdi,
            2 => DataSource::Fifo,
            _ => DataSource::Pn9,
        };
        Ok(Self {
            modulation,
            source,
            fd8: bytes[0] & 0x04 != 0,
            invert: bytes[0] & 0x08 != 0,
            tx_clock: bytes[0] >> 6,
        })
    }
}

impl ToByteArray for ModulationModeControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut byte = self.modulation as u8 | (self.source as u8) << 4 | (self.tx_clock & 0x03) << 6;
        if self.fd8 {
            byte |= 0x04;
        }
        if self.invert {
            byte |= 0x08;
        }
        Ok([byte])
    }
}

impl FromByteArray for FrequencyOffset {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            offset: u16::from(bytes[0]) | u16::from(bytes[1] & 0x03) << 8,
        })
    }
}

impl ToByteArray for FrequencyOffset {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.offset as u8, (self.offset >> 8) as u8 & 0x03])
    }
}

impl FromByteArray for FrequencyBandSelect {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            band: bytes[0] & 0x1F,
            high_band: bytes[0] & 0x20 != 0,
            side_band: bytes[0] & 0x40 != 0,
        })
    }
}

impl ToByteArray for FrequencyBandSelect {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut byte = self.band & 0x1F;
        if self.high_band {
            byte |= 0x20;
        }
        if self.side_band {
            byte |= 0x40;
        }
        Ok([byte])
    }
}

impl FromByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            fc: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.fc.to_be_bytes())
    }
}
