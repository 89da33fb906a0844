//! MIDI interpreter - per-message orchestration
//!
//! Classifies each raw message and either updates the program state or
//! allocates voices, builds events, routes them and hands them to the sink.
//! Bad input is dropped; nothing here returns an error.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::event::{EventBuilder, SynthesisEvent};
use crate::midi::{format_hex, MidiMessage, RawMidi, Source};
use crate::program::ProgramState;
use crate::routing::ChannelRouter;
use crate::sink::EventSink;
use crate::voice::VoiceAllocator;

/// Point-in-time view of the interpreter state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpreterSnapshot {
    pub bank: u8,
    pub program: u8,
    pub next_voice: usize,
    pub slots: Vec<Option<u8>>,
    pub processed: u64,
}

/// Owns the program state and voice table for one node
pub struct MidiInterpreter {
    program: ProgramState,
    voices: VoiceAllocator,
    builder: EventBuilder,
    router: ChannelRouter,
    sink: Arc<dyn EventSink>,
    /// Messages that classified to a command, including unknown ones
    processed: u64,
}

impl MidiInterpreter {
    pub fn new(voices: usize, template: SynthesisEvent, sink: Arc<dyn EventSink>) -> Self {
        Self {
            program: ProgramState::new(),
            voices: VoiceAllocator::new(voices),
            builder: EventBuilder::new(template),
            router: ChannelRouter::new(),
            sink,
            processed: 0,
        }
    }

    /// Transport callback entry point
    ///
    /// Returns the number of events emitted.
    pub fn handle_message(
        &mut self,
        source: Source,
        timestamp_ms: u64,
        status: u8,
        data: &[u8],
    ) -> usize {
        trace!("{} [{}] {:02X} {}", source, timestamp_ms, status, format_hex(data));

        let Some(message) = MidiMessage::parse(status, data) else {
            debug!("Dropped truncated message from {}: {:02X} {}", source, status, format_hex(data));
            return 0;
        };
        self.processed += 1;

        match message {
            MidiMessage::NoteOn { channel, note, velocity } => {
                let voice = self.voices.allocate(note);
                let event = self
                    .builder
                    .note_on(timestamp_ms, voice, note, velocity, &self.program);
                let target = self.router.route(channel);
                debug!("{} -> voice {} to {}", message, voice, target);
                self.sink.emit(event, target);
                1
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                let target = self.router.route_note_off(channel);
                let mut emitted = 0;
                for voice in self.voices.resolve_note_off(note) {
                    let event = self.builder.note_off(timestamp_ms, voice, velocity);
                    self.sink.emit(event, target);
                    emitted += 1;
                }
                debug!("{} -> released {} voice(s)", message, emitted);
                emitted
            }
            MidiMessage::ProgramChange { program, .. } => {
                self.program.apply_program_change(program);
                debug!("{} -> program {}", message, program);
                0
            }
            MidiMessage::ControlChange { cc, value, .. } => {
                if self.program.apply_control_change(cc, value) {
                    debug!("{} -> bank {}", message, self.program.bank());
                } else {
                    trace!("{} ignored", message);
                }
                0
            }
            MidiMessage::Unknown { status } => {
                trace!("Ignored status {:02X} from {}", status, source);
                0
            }
        }
    }

    /// Convenience wrapper for queued messages
    pub fn handle(&mut self, raw: &RawMidi) -> usize {
        self.handle_message(raw.source, raw.timestamp_ms, raw.status, &raw.data)
    }

    pub fn program(&self) -> &ProgramState {
        &self.program
    }

    pub fn voices(&self) -> &VoiceAllocator {
        &self.voices
    }

    pub fn snapshot(&self) -> InterpreterSnapshot {
        InterpreterSnapshot {
            bank: self.program.bank(),
            program: self.program.program(),
            next_voice: self.voices.next_voice(),
            slots: self.voices.slots().to_vec(),
            processed: self.processed,
        }
    }
}
