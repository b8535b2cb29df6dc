//! System-related registers
//!
//! This module contains registers for device identification and operating
//! mode control:
//! - Device type, useful to check that a chip answers at all
//! - Operating function control 1, selecting standby/ready/tune/TX modes
//! - Operating function control 2, holding the FIFO clear strobes

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Device type code (address: 0x00)
///
/// Reads `0x08` on RFM22/23 (Si4431/4432) transceivers.
#[register(0x00u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct DeviceType {
    pub code: u8,
}

impl DeviceType {
    pub const RX_TX: u8 = 0x08;

    pub fn is_transceiver(&self) -> bool {
        self.code == Self::RX_TX
    }
}

bitflags! {
    /// Operating mode bits
    ///
    /// - `XTON` alone = READY mode (crystal running)
    /// - `XTON | PLLON` = TUNE mode (synthesizer locked)
    /// - `TXON` starts a transmission and self clears when the packet is sent
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OperatingMode: u8 {
        const XTON = 1 << 0;
        const PLLON = 1 << 1;
        const RXON = 1 << 2;
        const TXON = 1 << 3;
        const X32KSEL = 1 << 4;
        const ENWT = 1 << 5;
        const ENLBD = 1 << 6;
        const SWRES = 1 << 7;
    }
}

bitflags! {
    /// FIFO and automatic mode control bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoControl: u8 {
        const CLEAR_TX_FIFO = 1 << 0;
        const CLEAR_RX_FIFO = 1 << 1;
        const LOW_DUTY_CYCLE = 1 << 2;
        const AUTO_TX = 1 << 3;
        const RX_MULTI_PACKET = 1 << 4;
        const ANTDIV0 = 1 << 5;
        const ANTDIV1 = 1 << 6;
        const ANTDIV2 = 1 << 7;
    }
}

/// Operating & function control 1 (address: 0x07)
#[register(0x07u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct OperatingFunctionControl1 {
    pub mode: OperatingMode,
}

/// Operating & function control 2 (address: 0x08)
///
/// The TX FIFO is cleared by setting and then clearing
/// [`FifoControl::CLEAR_TX_FIFO`].
#[register(0x08u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct OperatingFunctionControl2 {
    pub control: FifoControl,
}

impl FromByteArray for DeviceType {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            code: bytes[0] & 0x1F,
        })
    }
}

impl FromByteArray for OperatingFunctionControl1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            mode: OperatingMode::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for OperatingFunctionControl1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.mode.bits()])
    }
}

impl FromByteArray for OperatingFunctionControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            control: FifoControl::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for OperatingFunctionControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.control.bits()])
    }
}
