//! MIDI message classification
//!
//! Turns a status byte plus its trailing data bytes into a [`MidiMessage`].
//! Only the four channel commands the node acts on are decoded; everything
//! else collapses into [`MidiMessage::Unknown`].

use serde::Serialize;
use std::fmt;

/// Status nibbles understood by the interpreter
pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;

/// Controller number for bank select (MSB)
pub const CC_BANK_SELECT: u8 = 0x00;

/// Classified MIDI message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note, velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note, velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), controller, value
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program
    ProgramChange { channel: u8, program: u8 },

    /// Any other status byte. Carried so it can be logged, never acted on.
    Unknown { status: u8 },
}

impl MidiMessage {
    /// Classify a message from its status byte and trailing data bytes.
    ///
    /// Returns `None` when the message is truncated: no data bytes at all, or
    /// fewer than the command needs. Data values are passed through unmasked.
    pub fn parse(status: u8, data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let channel = status & 0x0F;

        let message = match status & 0xF0 {
            NOTE_ON => {
                let [note, velocity, ..] = *data else { return None };
                MidiMessage::NoteOn { channel, note, velocity }
            }
            NOTE_OFF => {
                let [note, velocity, ..] = *data else { return None };
                MidiMessage::NoteOff { channel, note, velocity }
            }
            CONTROL_CHANGE => {
                let [cc, value, ..] = *data else { return None };
                MidiMessage::ControlChange { channel, cc, value }
            }
            PROGRAM_CHANGE => MidiMessage::ProgramChange {
                channel,
                program: data[0],
            },
            _ => MidiMessage::Unknown { status },
        };

        Some(message)
    }

    /// Parse a complete message where `bytes[0]` is the status byte
    pub fn parse_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        Self::parse(status, data)
    }

    /// Channel (0-15) for the decoded channel commands
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. } => Some(channel),
            MidiMessage::Unknown { .. } => None,
        }
    }

    /// Encode back to raw bytes. Used by tests and the console monitor.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![NOTE_OFF | (channel & 0x0F), note, velocity]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![NOTE_ON | (channel & 0x0F), note, velocity]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![CONTROL_CHANGE | (channel & 0x0F), cc, value]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![PROGRAM_CHANGE | (channel & 0x0F), program]
            }
            MidiMessage::Unknown { status } => vec![status],
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel, program)
            }
            MidiMessage::Unknown { status } => write!(f, "Unknown status:{:02X}", status),
        }
    }
}

/// Transport a message arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Uart,
    Ble,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Uart => write!(f, "uart"),
            Source::Ble => write!(f, "ble"),
        }
    }
}

/// One raw message as delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMidi {
    pub source: Source,
    /// Milliseconds, as supplied by the transport
    pub timestamp_ms: u64,
    pub status: u8,
    pub data: Vec<u8>,
}

impl RawMidi {
    pub fn new(source: Source, timestamp_ms: u64, status: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            source,
            timestamp_ms,
            status,
            data: data.into(),
        }
    }

    /// Build from a complete message whose first byte is the status byte
    pub fn from_bytes(source: Source, timestamp_ms: u64, bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        Some(Self::new(source, timestamp_ms, status, data))
    }
}

/// True for status bytes (high bit set)
pub fn is_status_byte(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// True for single-byte real-time messages (clock, start/stop, active sensing,
/// reset). These may arrive between the data bytes of another message.
pub fn is_realtime_byte(byte: u8) -> bool {
    byte >= 0xF8
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
