//! Event sinks - where synthesis events go once built
//!
//! The interpreter only ever calls [`EventSink::emit`]. Emission is
//! fire-and-forget: a sink that cannot deliver logs the failure and drops
//! the event.

use anyhow::{Context, Result};
use colored::*;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::event::SynthesisEvent;
use crate::routing::Target;
use crate::wire;

/// Receiver of built events
///
/// Implementations must not block; they are called from the interpreter's
/// processing loop.
pub trait EventSink: Send + Sync {
    /// Sink name for logs
    fn name(&self) -> &str;

    /// Hand one event to the sink
    fn emit(&self, event: SynthesisEvent, target: Target);
}

/// Sends events to every synth on the mesh over UDP multicast
pub struct MeshSink {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl MeshSink {
    /// Bind an ephemeral non-blocking socket that sends to `group:port`
    pub fn bind(group: Ipv4Addr, port: u16, ttl: u32) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("Failed to bind mesh socket")?;
        socket
            .set_multicast_ttl_v4(ttl)
            .context("Failed to set multicast TTL")?;
        socket
            .set_nonblocking(true)
            .context("Failed to make mesh socket non-blocking")?;

        let group = SocketAddrV4::new(group, port);
        info!("Mesh sink sending to {}", group);

        Ok(Self { socket, group })
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.group
    }
}

impl EventSink for MeshSink {
    fn name(&self) -> &str {
        "mesh"
    }

    fn emit(&self, event: SynthesisEvent, target: Target) {
        let datagram = wire::encode(&event, target);
        trace!(%datagram, "mesh send");

        if let Err(e) = self.socket.send_to(datagram.as_bytes(), self.group) {
            warn!("Dropped mesh event for {}: {}", target, e);
        }
    }
}

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn emit(&self, event: SynthesisEvent, target: Target) {
        debug!(
            target_id = target.client_id(),
            voice = event.voice,
            note = ?event.note,
            wave = %event.wave,
            amplitude = event.amplitude,
            "event"
        );
    }
}

/// Prints events to stdout, highlighting the ones addressed to this node
pub struct ConsoleSink {
    local_id: Option<u8>,
}

impl ConsoleSink {
    pub fn new(local_id: Option<u8>) -> Self {
        Self { local_id }
    }

    fn format(&self, event: &SynthesisEvent, target: Target) -> String {
        let kind = if event.is_silence() {
            "OFF".red()
        } else {
            "ON ".green()
        };
        let target_str = match target {
            Target::Broadcast => "ALL".yellow(),
            Target::Device(id) => format!("#{:<2}", id).cyan(),
        };
        let mine = match self.local_id {
            Some(id) if target.addresses(id) => " *".bold().to_string(),
            _ => String::new(),
        };

        format!(
            "[{:>8}ms] {} {} | {}{}",
            event.time,
            kind,
            target_str,
            wire::encode(event, target),
            mine
        )
    }
}

impl EventSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn emit(&self, event: SynthesisEvent, target: Target) {
        println!("{}", self.format(&event, target));
    }
}

/// Forwards events into a tokio channel
///
/// Used to hand events to a local renderer, and by tests to observe output.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(SynthesisEvent, Target)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SynthesisEvent, Target)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn emit(&self, event: SynthesisEvent, target: Target) {
        if self.tx.send((event, target)).is_err() {
            trace!("Channel sink receiver dropped");
        }
    }
}

/// Delivers each event to several sinks in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        debug!("Registered event sink: {}", sink.name());
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn emit(&self, event: SynthesisEvent, target: Target) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone(), target);
            }
            last.emit(event, target);
        }
    }
}
