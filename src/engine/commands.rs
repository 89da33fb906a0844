//! Commands accepted by the interpreter actor

use tokio::sync::oneshot;

use crate::interpreter::InterpreterSnapshot;
use crate::midi::RawMidi;

/// Commands for the interpreter actor
///
/// `Midi` is the hot path and never waits for a reply. `Snapshot` answers
/// through a oneshot channel.
#[derive(Debug)]
pub enum InterpreterCommand {
    /// Process one raw message from a transport
    Midi(RawMidi),

    /// Report the current interpreter state
    Snapshot {
        response: oneshot::Sender<InterpreterSnapshot>,
    },

    /// Stop the actor after the messages already queued
    Shutdown,
}
