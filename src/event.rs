//! Synthesis events and how they are built from MIDI input

use serde::Serialize;
use std::fmt;

use crate::program::ProgramState;

/// Amplitude given to every note-on. Velocity is carried on the event but not
/// yet mapped to loudness.
pub const NOTE_ON_AMPLITUDE: f32 = 0.1;

/// Wave number the mesh uses for the FM engine
pub const FM_WAVE: u8 = 5;

/// Timbre selector of a synthesis event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Wave {
    /// Native wave set; the program number is the wave directly
    Native(u8),
    /// FM engine; the event's `patch` selects the patch
    Fm,
}

impl Wave {
    /// Number used on the mesh wire
    pub fn wire_number(&self) -> u8 {
        match *self {
            Wave::Native(wave) => wave,
            Wave::Fm => FM_WAVE,
        }
    }
}

impl Default for Wave {
    fn default() -> Self {
        Wave::Native(0)
    }
}

impl fmt::Display for Wave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wave::Native(wave) => write!(f, "wave{}", wave),
            Wave::Fm => write!(f, "fm"),
        }
    }
}

/// One command for a synth voice
///
/// Built fresh per emission from the builder's template and handed to the
/// sink by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisEvent {
    /// Milliseconds, from the timestamp the transport supplied
    pub time: u64,
    pub wave: Wave,
    /// FM patch index, only set when `wave` is [`Wave::Fm`]
    pub patch: Option<u16>,
    pub voice: usize,
    pub note: Option<u8>,
    pub velocity: u8,
    pub amplitude: f32,
}

impl Default for SynthesisEvent {
    fn default() -> Self {
        Self {
            time: 0,
            wave: Wave::default(),
            patch: None,
            voice: 0,
            note: None,
            velocity: 0,
            amplitude: 0.0,
        }
    }
}

impl SynthesisEvent {
    /// True for the silence command produced by note-offs
    pub fn is_silence(&self) -> bool {
        self.amplitude == 0.0
    }
}

/// Builds synthesis events from classified MIDI plus program state
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    template: SynthesisEvent,
}

impl EventBuilder {
    /// Create a builder whose events start from `template`
    pub fn new(template: SynthesisEvent) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &SynthesisEvent {
        &self.template
    }

    pub fn note_on(
        &self,
        time: u64,
        voice: usize,
        note: u8,
        velocity: u8,
        program: &ProgramState,
    ) -> SynthesisEvent {
        let mut event = self.template.clone();
        event.time = time;
        match program.fm_patch() {
            Some(patch) => {
                event.wave = Wave::Fm;
                event.patch = Some(patch);
            }
            None => {
                event.wave = Wave::Native(program.program());
                event.patch = None;
            }
        }
        event.voice = voice;
        event.note = Some(note);
        event.velocity = velocity;
        event.amplitude = NOTE_ON_AMPLITUDE;
        event
    }

    /// Silence command for `voice`; wave and patch stay as the template has them
    pub fn note_off(&self, time: u64, voice: usize, velocity: u8) -> SynthesisEvent {
        let mut event = self.template.clone();
        event.time = time;
        event.voice = voice;
        event.velocity = velocity;
        event.amplitude = 0.0;
        event
    }
}
