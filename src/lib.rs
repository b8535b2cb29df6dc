//! Ceiling-fan remote over an RFM22 transceiver
//!
//! This crate turns fan and light commands into the on-off keyed bursts that
//! 303.8 MHz ceiling-fan receivers listen for, and sends them with an
//! RFM22/23 (Si4431/4432) transceiver connected over SPI plus two GPIO lines.
//!
//! # Features
//! - Two receiver families:
//!   - dumb: fan speed and light toggle buttons, 13 bit packets
//!   - smart: fan speed and light level in one 20 bit packet
//! - Pulse-width OOK at 3000 chips/s, every frame repeated 20 times
//! - Interrupt driven FIFO streaming, bounded by a timeout on every wait
//! - Graceful degradation to a dry-run backend when the hardware cannot be
//!   claimed
//!
//! # Architecture
//! Data flows through the modules in order:
//!
//! - [`protocol`]: Packet codec
//!   - [`protocol::dumb`]: fan-speed-only packets
//!   - [`protocol::smart`]: combined fan and light packets with checksum
//!
//! - [`modulation`]: Bit-timing modulator
//!   - Maps each bit to a fixed chip pattern through a [`TimingTable`]
//!   - Produces a [`Waveform`] that is packed into FIFO bytes lazily
//!
//! - [`transceiver`]: Handshake driver
//!   - Explicit [`DriverState`] machine: power up, wait for ready, stream,
//!     power down
//!   - Built on [`Device`] for register access and [`registers`] for the
//!     typed register map
//!
//! - [`backend`]: Backend selector
//!   - [`select_backend`] claims the hardware or falls back to the dummy
//!   - [`backend::waveform_for`] encodes and modulates a command up front
//!
//! Bus and GPIO access goes through the `embedded-hal` 1.0 traits, so the
//! driver runs against any implementation of them. On Linux,
//! [`select_backend`] uses spidev and sysfs GPIO.
//!
//! # Important Notes
//! - The shutdown line is high (chip off) whenever no transmission is running,
//!   including after errors and when the driver is dropped
//! - Configuration registers are read back after writing; a mismatch fails
//!   the transmission
//! - Invalid commands are rejected before any hardware is touched
//!
//! # Example
//! ```no_run
//! use fanremote::protocol::{Address, FanCommand, Protocol};
//! use fanremote::{select_backend, HardwareConfig, Modulator, PowerLevel};
//!
//! fn main() -> fanremote::Result<()> {
//!     let config = HardwareConfig::new("/dev/spidev1.0", 17, 27);
//!     let mut backend = select_backend(&config)?;
//!
//!     backend.send(
//!         Address::new(14)?,
//!         Protocol::Smart,
//!         FanCommand::Medium,
//!         Some("75".parse()?),
//!         PowerLevel::default(),
//!         &Modulator::default(),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
mod device;
mod error;
pub mod modulation;
pub mod protocol;
pub mod registers;
pub mod transceiver;

pub use backend::{select_backend, Backend, DummyBackend, Outcome, Transmit};
pub use config::{HardwareConfig, TransceiverConfig};
pub use device::Device;
pub use error::{BusError, Error, Result};
pub use modulation::{Modulator, TimingTable, Waveform};
pub use transceiver::{DriverState, PowerLevel, Transceiver};
