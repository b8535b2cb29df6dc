//! Interrupt registers
//!
//! The RFM22 reports events through two status registers and raises the
//! active-low nIRQ line whenever a status bit is set whose enable bit is also
//! set. Status registers clear on read, so callers must remember any flag
//! they observed but have not handled yet.
//!
//! Only the TX related sources are used here:
//! - [`Interrupts1::TX_FIFO_ALMOST_EMPTY`] paces FIFO refills
//! - [`Interrupts1::PACKET_SENT`] marks the end of a transmission
//! - [`Interrupts2::CHIP_READY`] signals a stable crystal after power-up

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

bitflags! {
    /// Sources reported in interrupt status/enable register 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupts1: u8 {
        const CRC_ERROR = 1 << 0;
        const PACKET_VALID = 1 << 1;
        const PACKET_SENT = 1 << 2;
        const EXTERNAL = 1 << 3;
        const RX_FIFO_ALMOST_FULL = 1 << 4;
        const TX_FIFO_ALMOST_EMPTY = 1 << 5;
        const TX_FIFO_ALMOST_FULL = 1 << 6;
        const FIFO_ERROR = 1 << 7;
    }
}

bitflags! {
    /// Sources reported in interrupt status/enable register 2
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupts2: u8 {
        const POWER_ON_RESET = 1 << 0;
        const CHIP_READY = 1 << 1;
        const LOW_BATTERY = 1 << 2;
        const WAKE_UP_TIMER = 1 << 3;
        const RSSI = 1 << 4;
        const INVALID_PREAMBLE = 1 << 5;
        const VALID_PREAMBLE = 1 << 6;
        const SYNC_WORD = 1 << 7;
    }
}

/// Interrupt status 1 (address: 0x03)
///
/// Reading clears every bit that is also enabled in [`InterruptEnable1`].
#[register(0x03u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct InterruptStatus1 {
    pub pending: Interrupts1,
}

/// Interrupt status 2 (address: 0x04)
///
/// After a power-on reset both [`Interrupts2::POWER_ON_RESET`] and
/// [`Interrupts2::CHIP_READY`] are enabled and will be reported here.
#[register(0x04u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct InterruptStatus2 {
    pub pending: Interrupts2,
}

/// Interrupt enable 1 (address: 0x05)
#[register(0x05u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct InterruptEnable1 {
    pub enabled: Interrupts1,
}

/// Interrupt enable 2 (address: 0x06)
///
/// Defaults to `POWER_ON_RESET | CHIP_READY` after reset.
#[register(0x06u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct InterruptEnable2 {
    pub enabled: Interrupts2,
}

impl FromByteArray for InterruptStatus1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pending: Interrupts1::from_bits_retain(bytes[0]),
        })
    }
}

impl FromByteArray for InterruptStatus2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pending: Interrupts2::from_bits_retain(bytes[0]),
        })
    }
}

impl FromByteArray for InterruptEnable1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: Interrupts1::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for InterruptEnable1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.enabled.bits()])
    }
}

impl FromByteArray for InterruptEnable2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: Interrupts2::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for InterruptEnable2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.enabled.bits()])
    }
}
