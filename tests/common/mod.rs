//! Fake RFM22 for driving the transceiver without hardware.
//!
//! The chip is a 128 byte register file behind an [`SpiDevice`] with just
//! enough behaviour for the transmit path: auto-incrementing addresses, a TX
//! FIFO behind 0x7F, computed interrupt status and an nIRQ line derived from
//! it. Everything is shared through `Rc<RefCell<_>>` so tests can inspect the
//! chip after handing the parts to the driver.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, ErrorKind, Operation, SpiDevice};
use fanremote::{Transceiver, TransceiverConfig};

pub const DEVICE_TYPE: u8 = 0x00;
pub const STATUS_1: u8 = 0x03;
pub const STATUS_2: u8 = 0x04;
pub const CONTROL_1: u8 = 0x07;
pub const CONTROL_2: u8 = 0x08;
pub const TX_POWER: u8 = 0x6D;
pub const FIFO: u8 = 0x7F;

const PACKET_SENT: u8 = 1 << 2;
const TX_FIFO_ALMOST_EMPTY: u8 = 1 << 5;
const CHIP_READY: u8 = 1 << 1;
const XTON_PLLON: u8 = 0b11;
const TXON: u8 = 1 << 3;

#[derive(Debug)]
pub struct Chip {
    pub regs: [u8; 128],
    pub fifo: Vec<u8>,
    /// Level of the SDN line, high means powered off.
    pub shutdown: bool,
    pub sdn_history: Vec<bool>,
    pub transactions: usize,
    pub accesses_in_shutdown: usize,
    /// Never report chip ready.
    pub never_ready: bool,
    /// Never report packet sent.
    pub never_sent: bool,
    /// Fail every FIFO write.
    pub fail_fifo: bool,
    /// Register that always reads back the given value.
    pub stuck: Option<(u8, u8)>,
}

impl Default for Chip {
    fn default() -> Self {
        let mut regs = [0u8; 128];
        regs[DEVICE_TYPE as usize] = 0x08;
        regs[CONTROL_1 as usize] = 0x01;
        regs[TX_POWER as usize] = 0x18;
        Self {
            regs,
            fifo: Vec::new(),
            shutdown: false,
            sdn_history: Vec::new(),
            transactions: 0,
            accesses_in_shutdown: 0,
            never_ready: false,
            never_sent: false,
            fail_fifo: false,
            stuck: None,
        }
    }
}

impl Chip {
    fn status1(&self) -> u8 {
        if self.regs[CONTROL_1 as usize] & TXON == 0 {
            return 0;
        }
        if self.never_sent {
            TX_FIFO_ALMOST_EMPTY
        } else {
            TX_FIFO_ALMOST_EMPTY | PACKET_SENT
        }
    }

    fn status2(&self) -> u8 {
        let tuned = self.regs[CONTROL_1 as usize] & XTON_PLLON == XTON_PLLON;
        if tuned && !self.never_ready {
            CHIP_READY
        } else {
            0
        }
    }

    fn irq_asserted(&self) -> bool {
        !self.shutdown && (self.status1() | self.status2()) != 0
    }

    fn read(&self, address: u8) -> u8 {
        match (address, self.stuck) {
            (a, Some((stuck, value))) if a == stuck => value,
            (STATUS_1, _) => self.status1(),
            (STATUS_2, _) => self.status2(),
            (a, _) => self.regs[a as usize],
        }
    }

    fn write(&mut self, address: u8, value: u8) -> Result<(), ErrorKind> {
        match address {
            FIFO if self.fail_fifo => return Err(ErrorKind::Other),
            FIFO => self.fifo.push(value),
            DEVICE_TYPE..=STATUS_2 => {}
            CONTROL_2 if value & 0x01 != 0 => {
                self.fifo.clear();
                self.regs[CONTROL_2 as usize] = value;
            }
            a => self.regs[a as usize] = value,
        }
        Ok(())
    }
}

pub type Shared = Rc<RefCell<Chip>>;

pub struct FakeSpi(pub Shared);

impl spi::ErrorType for FakeSpi {
    type Error = ErrorKind;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        let mut chip = self.0.borrow_mut();
        chip.transactions += 1;
        if chip.shutdown {
            chip.accesses_in_shutdown += 1;
        }

        let mut cursor: Option<(u8, bool)> = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let mut bytes = bytes.iter().copied();
                    let (mut address, write) = match cursor {
                        Some(c) => c,
                        None => {
                            let header = bytes.next().ok_or(ErrorKind::Other)?;
                            (header & 0x7F, header & 0x80 != 0)
                        }
                    };
                    for byte in bytes {
                        if !write {
                            return Err(ErrorKind::Other);
                        }
                        chip.write(address, byte)?;
                        if address != FIFO {
                            address += 1;
                        }
                    }
                    cursor = Some((address, write));
                }
                Operation::Read(buf) => {
                    let (mut address, write) = cursor.ok_or(ErrorKind::Other)?;
                    if write {
                        return Err(ErrorKind::Other);
                    }
                    for byte in buf.iter_mut() {
                        *byte = chip.read(address);
                        if address != FIFO {
                            address += 1;
                        }
                    }
                    cursor = Some((address, write));
                }
                _ => return Err(ErrorKind::Other),
            }
        }
        Ok(())
    }
}

/// nIRQ, low while any status bit is set.
pub struct FakeIrq(pub Shared);

impl digital::ErrorType for FakeIrq {
    type Error = Infallible;
}

impl InputPin for FakeIrq {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.borrow().irq_asserted())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.borrow().irq_asserted())
    }
}

/// SDN, records every level it is driven to.
pub struct FakeSdn(pub Shared);

impl digital::ErrorType for FakeSdn {
    type Error = Infallible;
}

impl OutputPin for FakeSdn {
    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        chip.shutdown = false;
        chip.sdn_history.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        chip.shutdown = true;
        chip.sdn_history.push(true);
        Ok(())
    }
}

/// Delay that only advances a virtual clock.
#[derive(Clone, Default)]
pub struct VirtualDelay(pub Rc<Cell<u64>>);

impl VirtualDelay {
    pub fn elapsed_ns(&self) -> u64 {
        self.0.get()
    }
}

impl DelayNs for VirtualDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns));
    }
}

pub type FakeRadio = Transceiver<FakeSpi, FakeIrq, FakeSdn, VirtualDelay>;

pub struct Rig {
    pub chip: Shared,
    pub clock: VirtualDelay,
}

/// Build a driver around `chip` with the default configuration.
pub fn rig(chip: Chip) -> (FakeRadio, Rig) {
    rig_with(chip, TransceiverConfig::default())
}

pub fn rig_with(chip: Chip, config: TransceiverConfig) -> (FakeRadio, Rig) {
    let chip = Rc::new(RefCell::new(chip));
    let clock = VirtualDelay::default();
    let radio = Transceiver::new(
        FakeSpi(chip.clone()),
        FakeIrq(chip.clone()),
        FakeSdn(chip.clone()),
        clock.clone(),
        config,
    )
    .expect("valid configuration");
    (radio, Rig { chip, clock })
}
