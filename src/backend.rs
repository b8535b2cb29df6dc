//! Backend selection
//!
//! A [`Backend`] is either a real transceiver or a [`DummyBackend`] that accepts
//! every transmission without doing any I/O. The choice is made once, by
//! [`select_backend`], from whether the bus device and GPIO lines can be
//! claimed. Failing to claim them is not an error: the dummy is used instead
//! and a warning is logged, so the tool stays usable without privileges.
//! Any other failure, such as an invalid configuration, is returned.

use core::fmt;

use tracing::{debug, warn};

use crate::config::HardwareConfig;
use crate::modulation::{Modulator, Waveform};
use crate::protocol::{self, Address, FanCommand, LightCommand, Protocol};
use crate::transceiver::PowerLevel;
use crate::{Error, Result};

pub use hardware::HardwareRadio;

/// Anything that can put a [`Waveform`] on air.
pub trait Transmit {
    fn transmit(&mut self, waveform: &Waveform, power: PowerLevel) -> Result<()>;
}

/// Stand-in used when no transceiver could be claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyBackend {
    reason: String,
}

impl DummyBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the hardware was not used.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Transmit for DummyBackend {
    fn transmit(&mut self, waveform: &Waveform, power: PowerLevel) -> Result<()> {
        debug!(
            "dry run: {} data bits x {} at power {}",
            waveform.data_bits(),
            waveform.repeats(),
            power
        );
        Ok(())
    }
}

/// What a successful transmit actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Transmitted,
    /// Nothing was sent, the dummy backend is in use.
    DryRun,
}

/// The transmitter chosen for this process.
pub enum Backend<R = HardwareRadio> {
    Hardware(R),
    Dummy(DummyBackend),
}

impl<R: Transmit> Backend<R> {
    /// Claim the hardware with `open`, falling back to the dummy backend if
    /// it is unavailable.
    ///
    /// # Errors
    /// Every error from `open` other than `Error::HardwareUnavailable`.
    pub fn probe<F>(open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<R>,
    {
        match open() {
            Ok(radio) => {
                debug!("using hardware backend");
                Ok(Backend::Hardware(radio))
            }
            Err(err @ Error::HardwareUnavailable { .. }) => {
                warn!("Using dummy backend: {}", err);
                Ok(Backend::Dummy(DummyBackend::new(err.to_string())))
            }
            Err(err) => Err(err),
        }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Backend::Dummy(_))
    }

    pub fn transmit(&mut self, waveform: &Waveform, power: PowerLevel) -> Result<Outcome> {
        match self {
            Backend::Hardware(radio) => {
                radio.transmit(waveform, power)?;
                Ok(Outcome::Transmitted)
            }
            Backend::Dummy(dummy) => {
                dummy.transmit(waveform, power)?;
                Ok(Outcome::DryRun)
            }
        }
    }

    /// Encode, modulate and transmit one command.
    ///
    /// The command is encoded before anything else, so invalid input fails
    /// the same way on either backend and never reaches the hardware.
    pub fn send(
        &mut self,
        address: Address,
        protocol: Protocol,
        fan: FanCommand,
        light: Option<LightCommand>,
        power: PowerLevel,
        modulator: &Modulator,
    ) -> Result<Outcome> {
        let waveform = waveform_for(protocol, address, fan, light, modulator)?;
        self.transmit(&waveform, power)
    }
}

/// Encode and modulate one command without touching any backend.
pub fn waveform_for(
    protocol: Protocol,
    address: Address,
    fan: FanCommand,
    light: Option<LightCommand>,
    modulator: &Modulator,
) -> Result<Waveform> {
    let packet = protocol::encode(protocol, address, fan, light)?;
    debug!("{} packet for address {}: {}", protocol, address, packet);
    Ok(modulator.modulate(&packet))
}

impl<R> fmt::Debug for Backend<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Hardware(_) => f.write_str("Hardware"),
            Backend::Dummy(dummy) => f.debug_tuple("Dummy").field(&dummy.reason).finish(),
        }
    }
}

/// Claim the transceiver described by `config`, or fall back to the dummy.
///
/// # Errors
/// * `Error::InvalidCommand` - `config` fails [`TransceiverConfig::validate`],
///   checked before any device is opened
///
/// [`TransceiverConfig::validate`]: crate::TransceiverConfig::validate
pub fn select_backend(config: &HardwareConfig) -> Result<Backend> {
    config.transceiver.validate()?;
    Backend::probe(|| hardware::open(config))
}

#[cfg(target_os = "linux")]
mod hardware {
    use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
    use linux_embedded_hal::sysfs_gpio::{Direction, Pin};
    use linux_embedded_hal::{Delay, SpidevDevice, SysfsPin};
    use tracing::{debug, warn};

    use crate::config::HardwareConfig;
    use crate::{Error, Result, Transceiver};

    /// Transceiver on a Linux spidev node with sysfs GPIO lines.
    pub type HardwareRadio = Transceiver<SpidevDevice, SysfsPin, SysfsPin, Delay>;

    pub(super) fn open(config: &HardwareConfig) -> Result<HardwareRadio> {
        let path = config.spidev.display().to_string();
        let mut spi = Spidev::open(&config.spidev).map_err(|e| Error::unavailable(&path, e))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.spi_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| Error::unavailable(&path, e))?;
        debug!("opened {} at {} Hz", path, config.spi_speed_hz);

        let irq = claim(config.irq_gpio, Direction::In)?;
        let shutdown = or_release(
            claim(config.shutdown_gpio, Direction::High),
            &[config.irq_gpio],
            unexport,
        )?;

        or_release(
            Transceiver::new(
                SpidevDevice(spi),
                irq,
                shutdown,
                Delay,
                config.transceiver.clone(),
            ),
            &[config.irq_gpio, config.shutdown_gpio],
            unexport,
        )
    }

    fn claim(gpio: u64, direction: Direction) -> Result<SysfsPin> {
        let pin = SysfsPin::new(gpio);
        pin.export()
            .map_err(|e| Error::unavailable(format!("GPIO {}", gpio), e))?;
        or_release(
            pin.set_direction(direction)
                .map_err(|e| Error::unavailable(format!("GPIO {}", gpio), e)),
            &[gpio],
            unexport,
        )?;
        debug!("claimed GPIO {}", gpio);
        Ok(pin)
    }

    /// Pass `result` through, releasing `lines` first if it is an error.
    fn or_release<T>(result: Result<T>, lines: &[u64], mut release: impl FnMut(u64)) -> Result<T> {
        if result.is_err() {
            lines.iter().copied().for_each(&mut release);
        }
        result
    }

    fn unexport(gpio: u64) {
        match Pin::new(gpio).unexport() {
            Ok(()) => debug!("released GPIO {}", gpio),
            Err(e) => warn!("failed to release GPIO {}: {}", gpio, e),
        }
    }

}

#[cfg(not(target_os = "linux"))]
mod hardware {
    use super::Transmit;
    use crate::config::HardwareConfig;
    use crate::modulation::Waveform;
    use crate::transceiver::PowerLevel;
    use crate::{Error, Result};

    /// No transceiver support on this platform.
    pub enum HardwareRadio {}

    impl Transmit for HardwareRadio {
        fn transmit(&mut self, _: &Waveform, _: PowerLevel) -> Result<()> {
            match *self {}
        }
    }

    pub(super) fn open(_: &HardwareConfig) -> Result<HardwareRadio> {
        Err(Error::unavailable("transceiver", "only supported on Linux"))
    }
}
