//! Splitting raw byte streams into MIDI messages
//!
//! A new message starts at every status byte. Data bytes that arrive with no
//! preceding status are dropped, since running status is not supported.
//! Real-time bytes (0xF8-0xFF) can be interleaved anywhere, including between
//! a message's data bytes; they are removed without ending the current message.

use crate::midi::{
    is_realtime_byte, is_status_byte, CONTROL_CHANGE, NOTE_OFF, NOTE_ON, PROGRAM_CHANGE,
};

/// Split one buffer into messages, each starting with its status byte
pub fn frame_messages(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut messages = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    for &byte in bytes {
        if is_realtime_byte(byte) {
            continue;
        }
        if is_status_byte(byte) {
            messages.extend(current.take());
            current = Some(vec![byte]);
        } else if let Some(frame) = current.as_mut() {
            frame.push(byte);
        }
    }
    messages.extend(current);

    messages
}

/// Full length of a message with this status, if the node decodes it
fn expected_len(status: u8) -> Option<usize> {
    match status & 0xF0 {
        NOTE_ON | NOTE_OFF | CONTROL_CHANGE => Some(3),
        PROGRAM_CHANGE => Some(2),
        _ => None,
    }
}

/// Stream framer for transports that deliver arbitrary chunks
///
/// A trailing message that is still short of its length is held back until
/// the next chunk or an explicit [`Framer::flush`].
#[derive(Debug, Default)]
pub struct Framer {
    pending: Vec<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every message it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut stream = std::mem::take(&mut self.pending);
        stream.extend_from_slice(chunk);

        let mut messages = frame_messages(&stream);

        if let Some(last) = messages.last() {
            let incomplete = expected_len(last[0]).is_some_and(|len| last.len() < len);
            if incomplete {
                self.pending = messages.pop().unwrap_or_default();
            }
        }

        messages
    }

    /// Release whatever is held back, complete or not
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
