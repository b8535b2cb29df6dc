//! Packet codec for ceiling-fan receivers
//!
//! Two receiver families exist and each has its own fixed-length packet:
//!
//! - [`dumb`]: fan speed buttons only, 13 bits
//! - [`smart`]: fan speed and light level sent together, 20 bits
//!
//! Encoding is pure. [`encode`] turns an address and logical commands into a
//! [`Packet`], [`decode`] maps a packet back to the fields it carries. Values
//! the target family cannot represent are rejected with
//! [`Error::InvalidCommand`] before any hardware is touched.

use core::fmt;
use core::str::FromStr;

use crate::{Error, Result};

pub mod dumb;
pub mod smart;

/// Receiver family a packet is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// Fan-speed-only receivers
    Dumb,
    /// LCD remote receivers carrying fan and light state together
    Smart,
}

impl Protocol {
    /// Number of bits in every packet of this family.
    pub const fn packet_len(self) -> u8 {
        match self {
            Protocol::Dumb => dumb::PACKET_LEN,
            Protocol::Smart => smart::PACKET_LEN,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Dumb => f.write_str("dumb"),
            Protocol::Smart => f.write_str("smart"),
        }
    }
}

/// Receiver address, equal to the 4 DIP switches on the receiver unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    /// Largest address the 4 switches can express.
    pub const MAX: u8 = 0x0F;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(Error::invalid("address", value, "0..=15"));
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Address {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0b{:04b})", self.0, self.0)
    }
}

/// A button on the remote, ordered by fan intensity.
///
/// `LightToggle` only exists on dumb remotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FanCommand {
    Off,
    Low,
    Medium,
    High,
    LightToggle,
}

impl FanCommand {
    pub const ALL: [FanCommand; 5] = [
        FanCommand::Off,
        FanCommand::Low,
        FanCommand::Medium,
        FanCommand::High,
        FanCommand::LightToggle,
    ];
}

impl FromStr for FanCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(FanCommand::Off),
            "low" | "1" => Ok(FanCommand::Low),
            "medium" | "med" | "2" => Ok(FanCommand::Medium),
            "high" | "3" => Ok(FanCommand::High),
            "light" => Ok(FanCommand::LightToggle),
            _ => Err(Error::invalid("fan command", s, "off, low, medium, high or light")),
        }
    }
}

impl fmt::Display for FanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FanCommand::Off => "off",
            FanCommand::Low => "low",
            FanCommand::Medium => "medium",
            FanCommand::High => "high",
            FanCommand::LightToggle => "light",
        })
    }
}

/// Light level as understood by smart receivers.
///
/// Receiver firmware only knows steps of [`LightLevel::STEP`] percent, values
/// in between are rounded to the nearest step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightLevel(u8);

impl LightLevel {
    pub const STEP: u8 = 5;
    pub const OFF: LightLevel = LightLevel(0);
    pub const FULL: LightLevel = LightLevel(100);

    pub fn new(percent: u8) -> Result<Self> {
        if percent > 100 {
            return Err(Error::invalid("light level", percent, "0..=100"));
        }
        let step = (percent + Self::STEP / 2) / Self::STEP;
        Ok(Self(step * Self::STEP))
    }

    pub const fn percent(self) -> u8 {
        self.0
    }

    /// Index of the firmware step, `0..=20`.
    pub(crate) const fn step(self) -> u8 {
        self.0 / Self::STEP
    }

    pub(crate) fn from_step(step: u8) -> Result<Self> {
        if step > 100 / Self::STEP {
            return Err(Error::invalid("light step", step, "0..=20"));
        }
        Ok(Self(step * Self::STEP))
    }
}

impl fmt::Display for LightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Requested light state for a smart receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightCommand {
    Off,
    On,
    Level(LightLevel),
}

impl LightCommand {
    /// The level actually carried on the wire.
    pub fn level(self) -> LightLevel {
        match self {
            LightCommand::Off => LightLevel::OFF,
            LightCommand::On => LightLevel::FULL,
            LightCommand::Level(level) => level,
        }
    }
}

impl FromStr for LightCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().trim_end_matches('%') {
            "off" => Ok(LightCommand::Off),
            "on" => Ok(LightCommand::On),
            other => other
                .parse::<u8>()
                .map_err(|_| Error::invalid("light level", s, "0..=100, on or off"))
                .and_then(LightLevel::new)
                .map(LightCommand::Level),
        }
    }
}

/// Encoded packet, MSB first, ready for modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    protocol: Protocol,
    bits: u32,
}

impl Packet {
    pub(crate) const fn new(protocol: Protocol, bits: u32) -> Self {
        Self { protocol, bits }
    }

    /// Rebuild a packet from bits in transmission order.
    ///
    /// Fails unless exactly [`Protocol::packet_len`] bits are given. The
    /// fields are only checked by [`decode`].
    pub fn from_bits<I>(protocol: Protocol, bits: I) -> Result<Self>
    where
        I: IntoIterator<Item = bool>,
    {
        let len = protocol.packet_len() as usize;
        let mut raw = 0u32;
        let mut count = 0;
        for bit in bits {
            count += 1;
            if count > len {
                break;
            }
            raw = (raw << 1) | bit as u32;
        }
        if count != len {
            return Err(Error::invalid(
                "packet length",
                count,
                "the fixed length of the receiver family",
            ));
        }
        Ok(Self::new(protocol, raw))
    }

    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Number of bits on the wire, fixed per protocol.
    pub const fn len(&self) -> usize {
        self.protocol.packet_len() as usize
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Raw bits, right aligned.
    pub const fn raw(&self) -> u32 {
        self.bits
    }

    /// Bits in transmission order.
    pub fn bits(&self) -> PacketBits {
        PacketBits {
            bits: self.bits,
            remaining: self.protocol.packet_len(),
        }
    }

    /// Extract `width` bits starting `offset` bits from the start of the packet.
    pub(crate) fn field(&self, offset: u8, width: u8) -> u32 {
        let shift = self.protocol.packet_len() - offset - width;
        (self.bits >> shift) & ((1 << width) - 1)
    }
}

impl IntoIterator for &Packet {
    type Item = bool;
    type IntoIter = PacketBits;

    fn into_iter(self) -> PacketBits {
        self.bits()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Iterator over the bits of a [`Packet`], MSB first.
#[derive(Debug, Clone)]
pub struct PacketBits {
    bits: u32,
    remaining: u8,
}

impl Iterator for PacketBits {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.bits & (1 << self.remaining) != 0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for PacketBits {}

/// Collects packet bits MSB first, used by the family encoders.
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    bits: u32,
    len: u8,
}

impl BitWriter {
    pub(crate) fn push(mut self, value: u32, width: u8) -> Self {
        self.bits = (self.bits << width) | (value & ((1 << width) - 1));
        self.len += width;
        self
    }

    pub(crate) fn finish(self, protocol: Protocol) -> Packet {
        debug_assert_eq!(self.len, protocol.packet_len());
        Packet::new(protocol, self.bits)
    }
}

/// Fields recovered from a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub protocol: Protocol,
    pub address: Address,
    pub fan: FanCommand,
    /// Always `Some` for smart packets, always `None` for dumb ones.
    pub light: Option<LightLevel>,
}

/// Encode a command for the given receiver family.
///
/// `light` is required for [`Protocol::Smart`] and ignored for
/// [`Protocol::Dumb`].
pub fn encode(
    protocol: Protocol,
    address: Address,
    fan: FanCommand,
    light: Option<LightCommand>,
) -> Result<Packet> {
    match protocol {
        Protocol::Dumb => dumb::encode(address, fan),
        Protocol::Smart => {
            let light = light.ok_or_else(|| {
                Error::invalid("light command", "none", "a light level for smart receivers")
            })?;
            smart::encode(address, fan, light.level())
        }
    }
}

/// Recover the address and commands carried by a packet.
pub fn decode(packet: &Packet) -> Result<Decoded> {
    match packet.protocol() {
        Protocol::Dumb => dumb::decode(packet),
        Protocol::Smart => smart::decode(packet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_range() {
        assert_eq!(Address::new(15).unwrap().value(), 15);
        assert!(matches!(
            Address::new(16),
            Err(Error::InvalidCommand { field: "address", .. })
        ));
    }

    #[test]
    fn light_level_quantizes_to_firmware_steps() {
        assert_eq!(LightLevel::new(75).unwrap().percent(), 75);
        assert_eq!(LightLevel::new(73).unwrap().percent(), 75);
        assert_eq!(LightLevel::new(72).unwrap().percent(), 70);
        assert_eq!(LightLevel::new(100).unwrap().percent(), 100);
        assert!(LightLevel::new(101).is_err());
    }

    #[test]
    fn light_command_parsing() {
        assert_eq!("on".parse::<LightCommand>().unwrap(), LightCommand::On);
        assert_eq!("OFF".parse::<LightCommand>().unwrap(), LightCommand::Off);
        assert_eq!(
            "40%".parse::<LightCommand>().unwrap(),
            LightCommand::Level(LightLevel::new(40).unwrap())
        );
        assert!("dim".parse::<LightCommand>().is_err());
        assert!("150".parse::<LightCommand>().is_err());
    }

    #[test]
    fn fan_command_parsing() {
        assert_eq!("Medium".parse::<FanCommand>().unwrap(), FanCommand::Medium);
        assert_eq!("light".parse::<FanCommand>().unwrap(), FanCommand::LightToggle);
        assert!("turbo".parse::<FanCommand>().is_err());
    }

    #[test]
    fn smart_requires_light() {
        let addr = Address::new(3).unwrap();
        assert!(matches!(
            encode(Protocol::Smart, addr, FanCommand::Low, None),
            Err(Error::InvalidCommand { .. })
        ));
    }

    #[test]
    fn dumb_ignores_light() {
        let addr = Address::new(3).unwrap();
        let with = encode(Protocol::Dumb, addr, FanCommand::Low, Some(LightCommand::On)).unwrap();
        let without = encode(Protocol::Dumb, addr, FanCommand::Low, None).unwrap();
        assert_eq!(with, without);
        assert_eq!(decode(&with).unwrap().light, None);
    }

    #[test]
    fn families_have_distinct_lengths() {
        assert_ne!(Protocol::Dumb.packet_len(), Protocol::Smart.packet_len());
    }

    #[test]
    fn packet_bits_are_msb_first() {
        let packet = Packet::new(Protocol::Dumb, 0b0_1_1001_0001000);
        let bits: Vec<bool> = packet.bits().collect();
        assert_eq!(bits.len(), 13);
        assert_eq!(packet.to_string(), "0110010001000");
        assert_eq!(packet.field(2, 4), 0b1001);
    }

    #[test]
    fn packet_from_bits() {
        let packet = Packet::new(Protocol::Dumb, 0b0_1_1001_0001000);
        assert_eq!(Packet::from_bits(Protocol::Dumb, packet.bits()).unwrap(), packet);
        assert!(Packet::from_bits(Protocol::Smart, packet.bits()).is_err());
        assert!(Packet::from_bits(Protocol::Dumb, packet.bits().chain([true])).is_err());
    }
}
