//! MIDI channel to mesh target mapping
//!
//! Channel 0 addresses every synth on the mesh. Channel N (1-15) addresses the
//! device booted with id N-1.

use serde::Serialize;
use std::fmt;

/// Largest device id addressable on the mesh
pub const MAX_DEVICE_ID: u16 = 255;

/// Client id the mesh reserves for "every synth"
pub const BROADCAST_CLIENT: u16 = MAX_DEVICE_ID + 1;

/// Where an event is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Broadcast,
    Device(u8),
}

impl Target {
    /// Client id on the wire; broadcast is one past the largest device id
    pub fn client_id(&self) -> u16 {
        match *self {
            Target::Broadcast => BROADCAST_CLIENT,
            Target::Device(id) => id as u16,
        }
    }

    /// Whether an event with this target should be played by device `id`
    pub fn addresses(&self, id: u8) -> bool {
        match *self {
            Target::Broadcast => true,
            Target::Device(device) => device == id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Broadcast => write!(f, "broadcast"),
            Target::Device(id) => write!(f, "device {}", id),
        }
    }
}

/// Maps MIDI channels to mesh targets
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelRouter;

impl ChannelRouter {
    pub fn new() -> Self {
        Self
    }

    /// Route a note-on by its channel
    pub fn route(&self, channel: u8) -> Target {
        match channel & 0x0F {
            0 => Target::Broadcast,
            ch => Target::Device(ch - 1),
        }
    }

    /// Note-offs are always broadcast, whatever channel they came in on
    pub fn route_note_off(&self, _channel: u8) -> Target {
        Target::Broadcast
    }
}
