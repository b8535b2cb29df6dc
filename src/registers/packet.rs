//! Packet handler and FIFO registers
//!
//! The fan receivers do not understand the RFM22 packet format, so the
//! packet handler is disabled and no sync word is sent. The TX FIFO is used
//! as a raw chip buffer that the modulator fills.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// FIFO access register. Burst writes to it do not auto-increment.
pub const FIFO_ACCESS: u8 = 0x7F;

/// Size of the TX FIFO in bytes.
pub const FIFO_SIZE: usize = 64;

bitflags! {
    /// Data access control bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataAccess: u8 {
        const CRC0 = 1 << 0;
        const CRC1 = 1 << 1;
        const ENCRC = 1 << 2;
        /// Packet handler in TX
        const ENPACTX = 1 << 3;
        const SKIP2PH = 1 << 4;
        const CRCDONLY = 1 << 5;
        const LSBFIRST = 1 << 6;
        /// Packet handler in RX
        const ENPACRX = 1 << 7;
    }
}

bitflags! {
    /// Header control 2 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderControl: u8 {
        const PREALEN8 = 1 << 0;
        const SYNCLEN0 = 1 << 1;
        const SYNCLEN1 = 1 << 2;
        const FIXPKLEN = 1 << 3;
        const HDLEN0 = 1 << 4;
        const HDLEN1 = 1 << 5;
        const HDLEN2 = 1 << 6;
        /// Do not transmit the sync word
        const SKIPSYN = 1 << 7;
    }
}

/// Data access control (address: 0x30)
///
/// Default after reset has both packet handlers and CRC enabled.
#[register(0x30u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct DataAccessControl {
    pub flags: DataAccess,
}

impl DataAccessControl {
    /// Raw FIFO mode, no packet handling at all.
    pub const fn raw() -> Self {
        Self {
            flags: DataAccess::empty(),
        }
    }
}

/// Header control 2 (address: 0x33)
#[register(0x33u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct HeaderControl2 {
    pub flags: HeaderControl,
}

impl HeaderControl2 {
    /// No header, no sync word.
    pub const fn skip_sync() -> Self {
        Self {
            flags: HeaderControl::SKIPSYN,
        }
    }
}

/// TX FIFO control 2 (address: 0x7D)
///
/// The almost-empty interrupt fires when the FIFO holds this many bytes or
/// fewer. Only the low 6 bits are implemented.
#[register(0x7Du8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct TxFifoControl2 {
    pub almost_empty_threshold: u8,
}

impl FromByteArray for DataAccessControl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: DataAccess::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for DataAccessControl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for HeaderControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: HeaderControl::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for HeaderControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for TxFifoControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            almost_empty_threshold: bytes[0] & 0x3F,
        })
    }
}

impl ToByteArray for TxFifoControl2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.almost_empty_threshold & 0x3F])
    }
}
