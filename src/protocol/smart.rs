//! Smart receiver packets
//!
//! ```text
//!  0..3   4..7      8..10  11..15       16..19
//! +------+---------+------+------------+----------+
//! | 0110 | address | fan  | light step | checksum |
//! +------+---------+------+------------+----------+
//! ```
//!
//! Fan and light are always sent together; the receiver has no way to
//! change only one of them. The checksum is the XOR of the three payload
//! nibbles (address, fan and light step).

use super::{Address, BitWriter, Decoded, FanCommand, LightLevel, Packet, Protocol};
use crate::{Error, Result};

pub const PACKET_LEN: u8 = 20;

const PREAMBLE: u32 = 0b0110;
const PREAMBLE_WIDTH: u8 = 4;
const ADDRESS_OFFSET: u8 = 4;
const FAN_OFFSET: u8 = 8;
const FAN_WIDTH: u8 = 3;
const LIGHT_OFFSET: u8 = 11;
const LIGHT_WIDTH: u8 = 5;
const PAYLOAD_OFFSET: u8 = ADDRESS_OFFSET;
const PAYLOAD_WIDTH: u8 = 4 + FAN_WIDTH + LIGHT_WIDTH;
const CHECKSUM_OFFSET: u8 = 16;

fn speed(fan: FanCommand) -> Result<u32> {
    match fan {
        FanCommand::Off => Ok(0),
        FanCommand::Low => Ok(1),
        FanCommand::Medium => Ok(2),
        FanCommand::High => Ok(3),
        FanCommand::LightToggle => Err(Error::invalid(
            "smart fan command",
            fan,
            "off, low, medium or high",
        )),
    }
}

fn fan(speed: u32) -> Result<FanCommand> {
    match speed {
        0 => Ok(FanCommand::Off),
        1 => Ok(FanCommand::Low),
        2 => Ok(FanCommand::Medium),
        3 => Ok(FanCommand::High),
        other => Err(Error::invalid("smart fan speed", other, "0..=3")),
    }
}

fn checksum(payload: u32) -> u32 {
    (payload ^ (payload >> 4) ^ (payload >> 8)) & 0xF
}

pub fn encode(address: Address, fan: FanCommand, light: LightLevel) -> Result<Packet> {
    let payload = BitWriter::default()
        .push(address.value() as u32, 4)
        .push(speed(fan)?, FAN_WIDTH)
        .push(light.step() as u32, LIGHT_WIDTH);
    let sum = checksum(payload.bits);

    Ok(BitWriter::default()
        .push(PREAMBLE, PREAMBLE_WIDTH)
        .push(payload.bits, PAYLOAD_WIDTH)
        .push(sum, 4)
        .finish(Protocol::Smart))
}

pub fn decode(packet: &Packet) -> Result<Decoded> {
    if packet.field(0, PREAMBLE_WIDTH) != PREAMBLE {
        return Err(Error::invalid("smart preamble", packet, "0110"));
    }
    let payload = packet.field(PAYLOAD_OFFSET, PAYLOAD_WIDTH);
    let sum = packet.field(CHECKSUM_OFFSET, 4);
    if checksum(payload) != sum {
        return Err(Error::invalid("smart checksum", sum, "XOR of payload nibbles"));
    }

    Ok(Decoded {
        protocol: Protocol::Smart,
        address: Address::new(packet.field(ADDRESS_OFFSET, 4) as u8)?,
        fan: fan(packet.field(FAN_OFFSET, FAN_WIDTH))?,
        light: Some(LightLevel::from_step(
            packet.field(LIGHT_OFFSET, LIGHT_WIDTH) as u8,
        )?),
    })
}
