//! Mesh wire encoding
//!
//! Synths on the mesh take plain-text datagrams made of single-letter fields,
//! e.g. `t1200v0w0n60l100a0.1`. Fields the event leaves unset are omitted.

use std::fmt::Write;

use crate::event::{SynthesisEvent, Wave};
use crate::routing::Target;

/// Encode one event for `target`. Broadcast events carry no client field.
pub fn encode(event: &SynthesisEvent, target: Target) -> String {
    let mut out = String::with_capacity(48);

    // Writing to a String cannot fail
    let _ = write!(out, "t{}v{}w{}", event.time, event.voice, event.wave.wire_number());
    if let (Wave::Fm, Some(patch)) = (event.wave, event.patch) {
        let _ = write!(out, "p{}", patch);
    }
    if let Some(note) = event.note {
        let _ = write!(out, "n{}", note);
    }
    let _ = write!(out, "l{}a{}", event.velocity, event.amplitude);
    if let Target::Device(id) = target {
        let _ = write!(out, "c{}", id);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBuilder;
    use crate::program::ProgramState;

    #[test]
    fn test_encode_native_note_on_broadcast() {
        let event = EventBuilder::default().note_on(1200, 0, 60, 100, &ProgramState::new());
        assert_eq!(encode(&event, Target::Broadcast), "t1200v0w0n60l100a0.1");
    }

    #[test]
    fn test_encode_fm_note_on_for_device() {
        let mut program = ProgramState::new();
        program.apply_control_change(0, 1);
        program.apply_program_change(12);
        let event = EventBuilder::default().note_on(5, 3, 64, 90, &program);

        assert_eq!(encode(&event, Target::Device(2)), "t5v3w5p12n64l90a0.1c2");
    }

    #[test]
    fn test_encode_note_off() {
        let event = EventBuilder::default().note_off(77, 1, 0);
        assert_eq!(encode(&event, Target::Broadcast), "t77v1w0l0a0");
    }
}
