//! mesh-midi - MIDI interpreter and voice/event router for mesh synth nodes
//!
//! Raw MIDI from the serial and BLE transports is queued onto a single
//! interpreter actor, which keeps the bank/program selection and the voice
//! table, and turns note messages into synthesis events for the mesh.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod interpreter;
pub mod midi;
pub mod program;
pub mod routing;
pub mod sink;
pub mod transport;
pub mod voice;
pub mod wire;

pub use engine::{InterpreterActor, InterpreterHandle};
pub use error::MeshError;
pub use event::{EventBuilder, SynthesisEvent, Wave};
pub use interpreter::{InterpreterSnapshot, MidiInterpreter};
pub use midi::{MidiMessage, RawMidi, Source};
pub use program::ProgramState;
pub use routing::{ChannelRouter, Target};
pub use sink::EventSink;
pub use voice::VoiceAllocator;
