//! Transceiver handshake driver
//!
//! Owns the SPI device and both GPIO lines of an RFM22 and sequences one
//! transmission at a time through a fixed set of states:
//!
//! ```text
//! Idle -> PoweringUp -> AwaitingReady -> Transmitting -> PoweringDown -> Idle
//!              |              |                              ^
//!              +--------------+------------------------------+  (on error)
//! ```
//!
//! - **PoweringUp** pulses the shutdown line, releases it and programs the
//!   radio (modulation, frequency, data rate, output power).
//! - **AwaitingReady** enables the crystal and synthesizer and waits for the
//!   chip-ready interrupt on the nIRQ line, bounded by
//!   [`TransceiverConfig::ready_timeout`].
//! - **Transmitting** streams the waveform through the 64 byte FIFO, refilling
//!   it on the almost-empty interrupt, until the packet-sent interrupt.
//! - **PoweringDown** asserts the shutdown line again.
//!
//! Every path out of [`Transceiver::transmit`] goes through PoweringDown, and
//! dropping the driver asserts the shutdown line as well.

use core::fmt;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use tracing::{debug, error, info, warn};

use crate::backend::Transmit;
use crate::config::TransceiverConfig;
use crate::modulation::Waveform;
use crate::registers::*;
use crate::{BusError, Device, Error, Result};

/// Bytes written per FIFO refill. Kept below the FIFO size so a refill
/// can never overflow it.
const FIFO_CHUNK: usize = FIFO_SIZE - 10;

/// Transmit output power, `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerLevel(u8);

impl PowerLevel {
    pub const MAX: u8 = 7;

    pub fn new(level: u8) -> Result<Self> {
        if level > Self::MAX {
            return Err(Error::invalid("power level", level, "0..=7"));
        }
        Ok(Self(level))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for PowerLevel {
    fn default() -> Self {
        Self(3)
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    PoweringUp,
    AwaitingReady,
    Transmitting,
    PoweringDown,
}

impl DriverState {
    /// Whether the handshake may move from `self` to `next`.
    pub fn can_enter(self, next: DriverState) -> bool {
        use DriverState::*;

        matches!(
            (self, next),
            (Idle, PoweringUp)
                | (PoweringUp, AwaitingReady)
                | (AwaitingReady, Transmitting)
                | (PoweringUp | AwaitingReady | Transmitting, PoweringDown)
                | (PoweringDown, Idle)
        )
    }
}

/// RFM22 driver owning the bus and both control lines.
///
/// # Type Parameters
/// * `SPI` - bus to the transceiver
/// * `IRQ` - nIRQ line, active low
/// * `SDN` - shutdown line, high keeps the chip powered off
/// * `D` - delay source used for every wait
pub struct Transceiver<SPI, IRQ, SDN, D>
where
    SDN: OutputPin,
{
    device: Device<SPI>,
    irq: IRQ,
    shutdown: SDN,
    delay: D,
    config: TransceiverConfig,
    band: FrequencyBandSelect,
    carrier: CarrierFrequency,
    state: DriverState,
    pending: Interrupts1,
}

impl<SPI, IRQ, SDN, D> Transceiver<SPI, IRQ, SDN, D>
where
    SPI: SpiDevice,
    IRQ: InputPin,
    SDN: OutputPin,
    D: DelayNs,
{
    /// Takes ownership of the hardware and holds the chip in shutdown.
    ///
    /// # Errors
    /// * `Error::InvalidCommand` - the configuration fails
    ///   [`TransceiverConfig::validate`]
    /// * `Error::HardwareUnavailable` - the shutdown line cannot be driven
    pub fn new(
        spi: SPI,
        irq: IRQ,
        mut shutdown: SDN,
        delay: D,
        config: TransceiverConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (band, carrier) = config.carrier()?;
        shutdown
            .set_high()
            .map_err(|e| Error::unavailable("shutdown line", BusError::gpio(e)))?;

        Ok(Self {
            device: Device::new(spi),
            irq,
            shutdown,
            delay,
            config,
            band,
            carrier,
            state: DriverState::Idle,
            pending: Interrupts1::empty(),
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Send `waveform` at the given output power.
    ///
    /// Blocks for the whole transmission. On return the driver is idle and the
    /// chip is shut down, whether or not the transmission succeeded.
    ///
    /// # Errors
    /// * `Error::InvalidCommand` - empty waveform or unsupported chip rate
    /// * `Error::HardwareTimeout` - an expected interrupt did not arrive
    /// * `Error::TransmissionFailed` - a bus or GPIO operation failed
    pub fn transmit(&mut self, waveform: &Waveform, power: PowerLevel) -> Result<()> {
        if waveform.data_bits() == 0 {
            return Err(Error::invalid("waveform", "empty", "at least one data bit"));
        }
        let (rate, scaled) = TxDataRate::for_rate(waveform.symbol_rate_hz()).ok_or_else(|| {
            Error::invalid("symbol rate", waveform.symbol_rate_hz(), "a representable TX data rate")
        })?;

        let result = self.sequence(waveform, power, rate, scaled);
        let shutdown = self.power_down();
        match (result, shutdown) {
            (Ok(()), shutdown) => shutdown,
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(shutdown_err)) => {
                error!("shutdown failed after {}: {}", err, shutdown_err);
                Err(err)
            }
        }
    }

    fn sequence(
        &mut self,
        waveform: &Waveform,
        power: PowerLevel,
        rate: TxDataRate,
        scaled: bool,
    ) -> Result<()> {
        self.enter(DriverState::PoweringUp);
        self.power_up(power, rate, scaled)?;

        self.enter(DriverState::AwaitingReady);
        self.await_ready()?;

        self.enter(DriverState::Transmitting);
        self.send(waveform)
    }

    fn enter(&mut self, next: DriverState) {
        debug_assert!(
            self.state.can_enter(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn power_up(&mut self, power: PowerLevel, rate: TxDataRate, scaled: bool) -> Result<()> {
        // Reset pulse, in case a previous run left the chip powered.
        self.shutdown.set_high().map_err(BusError::gpio)?;
        self.delay.delay_us(micros(self.config.reset_pulse));
        self.shutdown.set_low().map_err(BusError::gpio)?;
        self.delay.delay_us(micros(self.config.power_on_delay));

        let device_type: DeviceType = self.device.read_register()?;
        if device_type.is_transceiver() {
            debug!("device type 0x{:02x}", device_type.code);
        } else {
            warn!(
                "unexpected device type 0x{:02x}, expected 0x{:02x}",
                device_type.code,
                DeviceType::RX_TX
            );
        }

        let device = &mut self.device;
        device.modify_register_verified(|reg: &mut ModulationModeControl2| {
            reg.modulation = ModulationType::Ook;
            reg.source = DataSource::Fifo;
        })?;
        device.write_register_verified(DataAccessControl::raw())?;
        device.write_register_verified(HeaderControl2::skip_sync())?;

        device.write_register_verified(self.band)?;
        device.write_register_verified(FrequencyOffset::default())?;
        device.write_register_verified(self.carrier)?;

        device.modify_register_verified(|reg: &mut ModulationModeControl1| {
            reg.flags.set(ModulationMode::TX_DATA_RATE_SCALE, scaled);
        })?;
        device.write_register_verified(rate)?;

        device.write_register_verified(TxFifoControl2 {
            almost_empty_threshold: self.config.fifo_threshold,
        })?;
        device.modify_register_verified(|reg: &mut TxPower| reg.level = power.value())?;

        debug!("configured, power level {}", power);
        Ok(())
    }

    fn await_ready(&mut self) -> Result<()> {
        self.device.write_register_verified(InterruptEnable2 {
            enabled: Interrupts2::CHIP_READY,
        })?;
        self.device.write_register(OperatingFunctionControl1 {
            mode: OperatingMode::XTON | OperatingMode::PLLON,
        })?;

        self.wait_for("chip ready", |radio| {
            let status: InterruptStatus2 = radio.device.read_register()?;
            Ok(status.pending.contains(Interrupts2::CHIP_READY))
        })
    }

    fn send(&mut self, waveform: &Waveform) -> Result<()> {
        let mut bytes = waveform.bytes().peekable();
        let mut chunk = Vec::with_capacity(FIFO_CHUNK);
        chunk.extend(bytes.by_ref().take(FIFO_CHUNK));

        self.device
            .modify_register_verified(|reg: &mut OperatingFunctionControl2| {
                reg.control.insert(FifoControl::CLEAR_TX_FIFO)
            })?;
        self.device
            .modify_register_verified(|reg: &mut OperatingFunctionControl2| {
                reg.control.remove(FifoControl::CLEAR_TX_FIFO)
            })?;

        self.device.write_register_verified(InterruptEnable1 {
            enabled: Interrupts1::PACKET_SENT | Interrupts1::TX_FIFO_ALMOST_EMPTY,
        })?;
        self.device.write_register_verified(InterruptEnable2 {
            enabled: Interrupts2::empty(),
        })?;
        // Reading the status registers clears anything left from power-up.
        self.device.read_register::<InterruptStatus1>()?;
        self.device.read_register::<InterruptStatus2>()?;
        self.pending = Interrupts1::empty();

        let mut written = chunk.len();
        self.device.write_fifo(&chunk)?;
        self.device
            .modify_register(|reg: &mut OperatingFunctionControl1| {
                reg.mode.insert(OperatingMode::TXON)
            })?;

        while bytes.peek().is_some() {
            self.wait_for_irq1(Interrupts1::TX_FIFO_ALMOST_EMPTY, "TX FIFO almost empty")?;
            chunk.clear();
            chunk.extend(bytes.by_ref().take(FIFO_CHUNK));
            written += chunk.len();
            self.device.write_fifo(&chunk)?;
        }
        self.wait_for_irq1(Interrupts1::PACKET_SENT, "packet sent")?;

        info!(
            "sent {} frames ({} bytes, {:?} on air)",
            waveform.repeats(),
            written,
            waveform.airtime().unwrap_or_default()
        );
        Ok(())
    }

    fn wait_for_irq1(&mut self, wanted: Interrupts1, waiting_for: &'static str) -> Result<()> {
        self.wait_for(waiting_for, |radio| {
            let status: InterruptStatus1 = radio.device.read_register()?;
            radio.pending.insert(status.pending);
            Ok(radio.pending.contains(wanted))
        })?;
        self.pending.remove(wanted);
        Ok(())
    }

    /// Poll until `ready` reports true.
    ///
    /// The status registers are only read while nIRQ is asserted, plus once
    /// up front since the event may already be latched.
    fn wait_for<F>(&mut self, waiting_for: &'static str, mut ready: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> core::result::Result<bool, BusError>,
    {
        let timeout = self.config.ready_timeout;
        let step = self.config.poll_interval;
        let mut waited = Duration::ZERO;
        debug!("waiting for {}", waiting_for);

        loop {
            let asserted = self.irq.is_low().map_err(BusError::gpio)?;
            if (asserted || waited.is_zero()) && ready(self)? {
                debug!("{} after {:?}", waiting_for, waited);
                return Ok(());
            }
            if waited >= timeout {
                warn!("timed out waiting for {}", waiting_for);
                return Err(Error::HardwareTimeout {
                    waiting_for,
                    timeout,
                });
            }
            self.delay.delay_us(micros(step));
            waited += step;
        }
    }

    fn power_down(&mut self) -> Result<()> {
        self.enter(DriverState::PoweringDown);
        let result = self.shutdown.set_high().map_err(|e| BusError::gpio(e).into());
        self.pending = Interrupts1::empty();
        self.enter(DriverState::Idle);
        result
    }
}

impl<SPI, IRQ, SDN, D> Transmit for Transceiver<SPI, IRQ, SDN, D>
where
    SPI: SpiDevice,
    IRQ: InputPin,
    SDN: OutputPin,
    D: DelayNs,
{
    fn transmit(&mut self, waveform: &Waveform, power: PowerLevel) -> Result<()> {
        Transceiver::transmit(self, waveform, power)
    }
}

impl<SPI, IRQ, SDN, D> Drop for Transceiver<SPI, IRQ, SDN, D>
where
    SDN: OutputPin,
{
    fn drop(&mut self) {
        if let Err(e) = self.shutdown.set_high() {
            error!("failed to assert shutdown line: {}", BusError::gpio(e));
        }
    }
}

fn micros(duration: Duration) -> u32 {
    duration.as_micros().min(u32::MAX as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_level_range() {
        assert_eq!(PowerLevel::new(7).unwrap().value(), 7);
        assert_eq!(PowerLevel::default().value(), 3);
        assert!(matches!(
            PowerLevel::new(8),
            Err(Error::InvalidCommand { field: "power level", .. })
        ));
    }

    #[test]
    fn happy_path_transitions() {
        use DriverState::*;

        let path = [Idle, PoweringUp, AwaitingReady, Transmitting, PoweringDown, Idle];
        assert!(path.windows(2).all(|w| w[0].can_enter(w[1])));
    }

    #[test]
    fn every_active_state_can_power_down() {
        use DriverState::*;

        for state in [PoweringUp, AwaitingReady, Transmitting] {
            assert!(state.can_enter(PoweringDown));
        }
        assert!(!Idle.can_enter(PoweringDown));
    }

    #[test]
    fn no_shortcuts() {
        use DriverState::*;

        assert!(!Idle.can_enter(Transmitting));
        assert!(!PoweringUp.can_enter(Transmitting));
        assert!(!Transmitting.can_enter(Idle));
        assert!(!AwaitingReady.can_enter(Idle));
    }

    #[test]
    fn micros_saturates() {
        assert_eq!(micros(Duration::from_millis(20)), 20_000);
        assert_eq!(micros(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
