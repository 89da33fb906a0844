//! MIDI transports feeding the interpreter
//!
//! Each transport frames its byte stream into messages and submits them
//! through an [`InterpreterHandle`]. Transports never touch interpreter state.

pub mod framing;
pub mod midi_port;
pub mod uart;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::InterpreterHandle;
use crate::midi::Source;

pub use framing::{frame_messages, Framer};
pub use midi_port::MidiPortTransport;
pub use uart::UartTransport;

/// Millisecond clock shared by every transport
///
/// Event times come from here rather than from the transport: BLE packet
/// timestamps roll over every few seconds.
#[derive(Debug, Clone)]
pub struct NodeClock {
    start: Arc<Instant>,
}

impl NodeClock {
    pub fn new() -> Self {
        Self {
            start: Arc::new(Instant::now()),
        }
    }

    /// Milliseconds since the clock was created
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for NodeClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A MIDI input the node listens on
///
/// All methods take `&self`; implementations keep their connection state
/// behind a mutex.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Which source tag messages from this transport carry
    fn source(&self) -> Source;

    /// Open the input and start submitting messages
    async fn start(&self, handle: InterpreterHandle, clock: NodeClock) -> Result<()>;

    /// Stop submitting and release the input
    async fn shutdown(&self) -> Result<()>;
}
