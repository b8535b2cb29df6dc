//! On-off keying modulator
//!
//! Turns packet bits into a waveform of timed carrier pulses. The transceiver
//! runs its FIFO at a fixed chip rate, so every pulse width is expressed in
//! chips (one chip = `1 / symbol_rate_hz` seconds).
//!
//! The receivers use pulse-width encoding with three chips per bit:
//!
//! ```text
//! bit 1:  ‾‾‾‾‾‾‾‾|____      (on 2, off 1)
//! bit 0:  ____|‾‾‾‾|____     (off 1, on 1, off 1)
//! ```
//!
//! A frame is the modulated packet followed by a silent gap, and the frame
//! is repeated a fixed number of times. Nothing here knows about packet
//! layouts; the same table serves both receiver families.

use core::time::Duration;

/// Carrier state during a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Off,
    On,
}

impl Level {
    pub const fn is_on(self) -> bool {
        matches!(self, Level::On)
    }
}

/// What a pulse belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// First pulse of a data bit
    BitStart,
    /// Remaining pulses of a data bit
    BitBody,
    /// Lead-in and inter-frame gap
    Framing,
}

/// A run of constant carrier level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pulse {
    pub level: Level,
    /// Width in chips
    pub chips: u16,
    pub role: Role,
}

impl Pulse {
    pub const fn on(chips: u16) -> Self {
        Self {
            level: Level::On,
            chips,
            role: Role::BitBody,
        }
    }

    pub const fn off(chips: u16) -> Self {
        Self {
            level: Level::Off,
            chips,
            role: Role::BitBody,
        }
    }

    const fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Duration of the pulse at the given chip rate, `None` at 0 Hz.
    pub fn duration(&self, symbol_rate_hz: u32) -> Option<Duration> {
        chips_to_duration(self.chips as u64, symbol_rate_hz)
    }
}

/// Timing parameters of the receivers' OOK scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingTable {
    /// Chips per second, also the transceiver TX data rate
    pub symbol_rate_hz: u32,
    pub one: &'static [Pulse],
    pub zero: &'static [Pulse],
    /// Pulses sent before the first bit of every frame
    pub lead_in: &'static [Pulse],
    /// Silence after every frame, in chips
    pub gap_chips: u16,
    /// Number of times each frame is sent
    pub repeats: u16,
}

impl TimingTable {
    /// Timing understood by both dumb and smart receivers.
    ///
    /// 1/3 ms chips, 11 ms inter-frame gap, 20 frames per command.
    pub const FAN: TimingTable = TimingTable {
        symbol_rate_hz: 3_000,
        one: &[Pulse::on(2), Pulse::off(1)],
        zero: &[Pulse::off(1), Pulse::on(1), Pulse::off(1)],
        lead_in: &[],
        gap_chips: 33,
        repeats: 20,
    };

    fn pulses_for(&self, bit: bool) -> &'static [Pulse] {
        if bit {
            self.one
        } else {
            self.zero
        }
    }
}

impl Default for TimingTable {
    fn default() -> Self {
        Self::FAN
    }
}

/// Maps bits to pulses using a [`TimingTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Modulator {
    table: TimingTable,
}

impl Modulator {
    pub fn new(table: TimingTable) -> Self {
        Self { table }
    }

    /// Lazily modulate one frame: lead-in, data bits, then the gap.
    pub fn pulses<I>(&self, bits: I) -> Pulses<I::IntoIter>
    where
        I: IntoIterator<Item = bool>,
    {
        Pulses {
            table: self.table,
            bits: bits.into_iter(),
            stage: Stage::LeadIn(0),
        }
    }

    /// Modulate one frame and keep it for repeated transmission.
    pub fn modulate<I>(&self, bits: I) -> Waveform
    where
        I: IntoIterator<Item = bool>,
    {
        Waveform {
            frame: self.pulses(bits).collect(),
            repeats: self.table.repeats,
            symbol_rate_hz: self.table.symbol_rate_hz,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    LeadIn(usize),
    Bit(&'static [Pulse], usize),
    Gap,
    Done,
}

/// Iterator returned by [`Modulator::pulses`].
#[derive(Debug, Clone)]
pub struct Pulses<I> {
    table: TimingTable,
    bits: I,
    stage: Stage,
}

impl<I: Iterator<Item = bool>> Iterator for Pulses<I> {
    type Item = Pulse;

    fn next(&mut self) -> Option<Pulse> {
        loop {
            match self.stage {
                Stage::LeadIn(idx) => match self.table.lead_in.get(idx) {
                    Some(pulse) => {
                        self.stage = Stage::LeadIn(idx + 1);
                        return Some(pulse.with_role(Role::Framing));
                    }
                    None => self.stage = self.next_bit(),
                },
                Stage::Bit(pulses, idx) => match pulses.get(idx) {
                    Some(pulse) => {
                        self.stage = Stage::Bit(pulses, idx + 1);
                        let role = if idx == 0 { Role::BitStart } else { Role::BitBody };
                        return Some(pulse.with_role(role));
                    }
                    None => self.stage = self.next_bit(),
                },
                Stage::Gap => {
                    self.stage = Stage::Done;
                    if self.table.gap_chips > 0 {
                        return Some(Pulse::off(self.table.gap_chips).with_role(Role::Framing));
                    }
                }
                Stage::Done => return None,
            }
        }
    }
}

impl<I: Iterator<Item = bool>> Pulses<I> {
    fn next_bit(&mut self) -> Stage {
        match self.bits.next() {
            Some(bit) => Stage::Bit(self.table.pulses_for(bit), 0),
            None => Stage::Gap,
        }
    }
}

/// A modulated frame together with its repetition count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    frame: Vec<Pulse>,
    repeats: u16,
    symbol_rate_hz: u32,
}

impl Waveform {
    /// Pulses of a single frame.
    pub fn pulses(&self) -> &[Pulse] {
        &self.frame
    }

    pub fn repeats(&self) -> u16 {
        self.repeats
    }

    pub fn symbol_rate_hz(&self) -> u32 {
        self.symbol_rate_hz
    }

    /// Number of data bits in one frame, framing excluded.
    pub fn data_bits(&self) -> usize {
        self.frame
            .iter()
            .filter(|p| p.role == Role::BitStart)
            .count()
    }

    /// Chips in one frame.
    pub fn frame_chips(&self) -> usize {
        self.frame.iter().map(|p| p.chips as usize).sum()
    }

    /// Time on air for all repeats, `None` if the chip rate is 0 Hz.
    pub fn airtime(&self) -> Option<Duration> {
        let chips = (self.frame_chips() * self.repeats as usize) as u64;
        chips_to_duration(chips, self.symbol_rate_hz)
    }

    /// Every chip of every repeat, in transmission order.
    pub fn chips(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.repeats).flat_map(move |_| {
            self.frame
                .iter()
                .flat_map(|p| core::iter::repeat(p.level.is_on()).take(p.chips as usize))
        })
    }

    /// Chips packed MSB first into FIFO bytes, the last byte zero padded.
    pub fn bytes(&self) -> ChipBytes<impl Iterator<Item = bool> + '_> {
        ChipBytes(self.chips())
    }
}

fn chips_to_duration(chips: u64, symbol_rate_hz: u32) -> Option<Duration> {
    let nanos = chips.checked_mul(1_000_000_000)?;
    nanos.checked_div(symbol_rate_hz as u64).map(Duration::from_nanos)
}

/// Packs a chip stream into bytes, see [`Waveform::bytes`].
#[derive(Debug, Clone)]
pub struct ChipBytes<I>(I);

impl<I: Iterator<Item = bool>> Iterator for ChipBytes<I> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let first = self.0.next()?;
        let mut byte = (first as u8) << 7;
        for idx in (0..7).rev() {
            match self.0.next() {
                Some(true) => byte |= 1 << idx,
                Some(false) => {}
                None => break,
            }
        }
        Some(byte)
    }
}
