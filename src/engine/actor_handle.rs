//! InterpreterHandle - public API for the interpreter actor
//!
//! Cloned into every transport. Submitting never blocks, so it is safe to
//! call from an OS MIDI callback thread as well as from tokio tasks.

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use super::commands::InterpreterCommand;
use crate::error::MeshError;
use crate::interpreter::InterpreterSnapshot;
use crate::midi::{RawMidi, Source};

#[derive(Clone)]
pub struct InterpreterHandle {
    cmd_tx: mpsc::UnboundedSender<InterpreterCommand>,
}

impl InterpreterHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<InterpreterCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Queue one raw message
    ///
    /// Fails only when the actor has stopped.
    pub fn submit(&self, raw: RawMidi) -> Result<(), MeshError> {
        self.cmd_tx
            .send(InterpreterCommand::Midi(raw))
            .map_err(|_| MeshError::QueueClosed)
    }

    /// Callback-shaped entry point: `(source, timestamp, status, remaining bytes)`
    pub fn on_message(
        &self,
        source: Source,
        timestamp_ms: u64,
        status: u8,
        data: &[u8],
    ) -> Result<(), MeshError> {
        self.submit(RawMidi::new(source, timestamp_ms, status, data))
    }

    /// Current interpreter state, `None` if the actor has stopped
    pub async fn snapshot(&self) -> Option<InterpreterSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = InterpreterCommand::Snapshot {
            response: response_tx,
        };

        if self.cmd_tx.send(cmd).is_err() {
            return None;
        }

        response_rx.await.ok()
    }

    /// Ask the actor to stop once the queued messages are handled
    pub fn shutdown(&self) {
        if self.cmd_tx.send(InterpreterCommand::Shutdown).is_err() {
            trace!("Interpreter already stopped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}
