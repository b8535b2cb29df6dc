//! RFM22 register interface
//!
//! This module provides typed register access to the RFM22/23 transceiver over
//! an `embedded-hal` [`SpiDevice`]. The SPI protocol is simple:
//!
//! - the first byte is the register address, with bit 7 set for writes
//! - following bytes are data, the address auto-increments after each byte
//! - the FIFO register (`0x7F`) does not auto-increment, so a burst write
//!   to it appends to the TX FIFO
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use fanremote::{BusError, Device, registers::TxPower};
//!
//! fn raise_power<SPI: SpiDevice>(spi: SPI) -> Result<(), BusError> {
//!     let mut device = Device::new(spi);
//!     device.modify_register_verified(|reg: &mut TxPower| reg.level = 7)
//! }
//! ```

use core::convert::Infallible;

use embedded_hal::spi::{Operation, SpiDevice};
use regiface::{ByteArray, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};
use tracing::trace;

use crate::registers::FIFO_ACCESS;
use crate::BusError;

const WRITE: u8 = 0x80;

/// Register level access to the transceiver.
///
/// Wraps the SPI device and nothing else; sequencing lives in
/// [`Transceiver`](crate::Transceiver).
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: SpiDevice,
{
    fn read_raw(&mut self, address: u8, bytes: &mut [u8]) -> Result<(), BusError> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[address & !WRITE]),
                Operation::Read(bytes),
            ])
            .map_err(BusError::spi)?;
        trace!("read  0x{:02x} = {:02x?}", address, bytes);
        Ok(())
    }

    fn write_raw(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        trace!("write 0x{:02x} = {:02x?}", address, bytes);
        self.spi
            .transaction(&mut [
                Operation::Write(&[address | WRITE]),
                Operation::Write(bytes),
            ])
            .map_err(BusError::spi)
    }

    /// Reads a register value from the device.
    ///
    /// # Errors
    /// * `BusError::Spi` - SPI communication failed
    /// * `BusError::Decode` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, BusError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = <R as FromByteArray>::Array::new();
        self.read_raw(R::id(), raw_value.as_mut())?;

        R::from_bytes(raw_value).map_err(|_| BusError::Decode { register: R::id() })
    }

    /// Writes a value to a device register.
    ///
    /// # Errors
    /// * `BusError::Spi` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), BusError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = match register.to_bytes() {
            Ok(raw) => raw,
            Err(never) => match never {},
        };
        self.write_raw(R::id(), raw_value.as_ref())
    }

    /// Writes a register and reads it back.
    ///
    /// # Errors
    /// * `BusError::Spi` - SPI communication failed
    /// * `BusError::Verify` - The register holds a different value afterwards
    pub fn write_register_verified<R>(&mut self, register: R) -> Result<(), BusError>
    where
        R: ReadableRegister<IdType = u8> + WritableRegister<IdType = u8, Error = Infallible>,
    {
        let written = match register.to_bytes() {
            Ok(raw) => raw,
            Err(never) => match never {},
        };
        self.write_raw(R::id(), written.as_ref())?;

        let mut read_back = <R as FromByteArray>::Array::new();
        self.read_raw(R::id(), read_back.as_mut())?;

        let mismatch = written
            .as_ref()
            .iter()
            .zip(read_back.as_ref())
            .enumerate()
            .find(|(_, (w, r))| w != r);
        match mismatch {
            Some((offset, (&wrote, &read))) => Err(BusError::Verify {
                register: R::id() + offset as u8,
                wrote,
                read,
            }),
            None => Ok(()),
        }
    }

    /// Read-modify-write of a register.
    pub fn modify_register<R, F>(&mut self, f: F) -> Result<(), BusError>
    where
        R: ReadableRegister<IdType = u8> + WritableRegister<IdType = u8, Error = Infallible>,
        F: FnOnce(&mut R),
    {
        let mut value = self.read_register::<R>()?;
        f(&mut value);
        self.write_register(value)
    }

    /// Read-modify-write of a register, verifying the result.
    pub fn modify_register_verified<R, F>(&mut self, f: F) -> Result<(), BusError>
    where
        R: ReadableRegister<IdType = u8> + WritableRegister<IdType = u8, Error = Infallible>,
        F: FnOnce(&mut R),
    {
        let mut value = self.read_register::<R>()?;
        f(&mut value);
        self.write_register_verified(value)
    }

    /// Appends bytes to the TX FIFO.
    ///
    /// # Errors
    /// * `BusError::Spi` - SPI communication failed
    pub fn write_fifo(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.write_raw(FIFO_ACCESS, bytes)
    }
}
