//! Dumb receiver packets
//!
//! ```text
//!  0   1   2..5      6..12
//! +---+---+---------+---------------+
//! | 0 | 1 | address | button code   |
//! +---+---+---------+---------------+
//! ```
//!
//! Button codes are one-hot, a packet never carries light state.

use super::{Address, BitWriter, Decoded, FanCommand, Packet, Protocol};
use crate::{Error, Result};

pub const PACKET_LEN: u8 = 13;

const START: u32 = 0b01;
const ADDRESS_OFFSET: u8 = 2;
const COMMAND_OFFSET: u8 = 6;
const COMMAND_WIDTH: u8 = 7;

const fn code(command: FanCommand) -> u32 {
    match command {
        FanCommand::LightToggle => 0x01,
        FanCommand::Off => 0x02,
        FanCommand::Low => 0x08,
        FanCommand::Medium => 0x10,
        FanCommand::High => 0x20,
    }
}

fn command(code: u32) -> Option<FanCommand> {
    FanCommand::ALL.into_iter().find(|c| self::code(*c) == code)
}

pub fn encode(address: Address, fan: FanCommand) -> Result<Packet> {
    Ok(BitWriter::default()
        .push(START, 2)
        .push(address.value() as u32, 4)
        .push(code(fan), COMMAND_WIDTH)
        .finish(Protocol::Dumb))
}

pub fn decode(packet: &Packet) -> Result<Decoded> {
    if packet.field(0, 2) != START {
        return Err(Error::invalid("dumb start bits", packet, "01"));
    }
    let address = Address::new(packet.field(ADDRESS_OFFSET, 4) as u8)?;
    let raw = packet.field(COMMAND_OFFSET, COMMAND_WIDTH);
    let fan = command(raw)
        .ok_or_else(|| Error::invalid("dumb button code", format!("0x{raw:02x}"), "a known button"))?;

    Ok(Decoded {
        protocol: Protocol::Dumb,
        address,
        fan,
        light: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_toggle_at_address_9() {
        let packet = encode(Address::new(9).unwrap(), FanCommand::LightToggle).unwrap();
        assert_eq!(packet.to_string(), "0110010000001");
    }

    #[test]
    fn address_9_fan_low() {
        let packet = encode(Address::new(0b1001).unwrap(), FanCommand::Low).unwrap();
        assert_eq!(packet.len(), PACKET_LEN as usize);

        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.address.value(), 9);
        assert_eq!(decoded.fan, FanCommand::Low);
        assert_eq!(decoded.light, None);
    }

    #[test]
    fn unknown_button_is_rejected() {
        let packet = Packet::new(Protocol::Dumb, 0b0_1_0000_1111111);
        assert!(matches!(decode(&packet), Err(Error::InvalidCommand { .. })));
    }

    #[test]
    fn bad_start_bits_are_rejected() {
        let packet = Packet::new(Protocol::Dumb, 0b1_1_0000_0000010);
        assert!(decode(&packet).is_err());
    }
}
