//! Serial MIDI input
//!
//! A cooperative polling loop: every poll interval it reads whatever the
//! serial device has buffered, frames it and submits the messages. A read
//! never waits longer than one interval.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::{Framer, NodeClock, Transport};
use crate::config::UartConfig;
use crate::engine::InterpreterHandle;
use crate::error::MeshError;
use crate::midi::{format_hex, RawMidi, Source};

/// Serial port transport reading from a device file
pub struct UartTransport {
    config: UartConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UartTransport {
    pub fn new(config: UartConfig) -> Self {
        Self {
            config,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[async_trait]
impl Transport for UartTransport {
    fn name(&self) -> &str {
        "uart"
    }

    fn source(&self) -> Source {
        Source::Uart
    }

    async fn start(&self, handle: InterpreterHandle, clock: NodeClock) -> Result<()> {
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .open(&self.config.path)
            .await
            .with_context(|| format!("Failed to open serial device: {}", self.config.path))?;

        info!(
            "UART MIDI reading {} every {}ms",
            self.config.path, self.config.poll_interval_ms
        );

        let task = tokio::spawn(poll_loop(
            file,
            self.config.poll_interval(),
            self.config.read_buffer,
            handle,
            clock,
        ));

        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!("UART polling task stopped");
        }
        Ok(())
    }
}

/// Submit every framed message; fails once the interpreter is gone
fn submit_all(
    handle: &InterpreterHandle,
    clock: &NodeClock,
    frames: impl IntoIterator<Item = Vec<u8>>,
) -> Result<(), MeshError> {
    let now = clock.now_ms();
    for frame in frames {
        if let Some(raw) = RawMidi::from_bytes(Source::Uart, now, &frame) {
            handle.submit(raw)?;
        }
    }
    Ok(())
}

/// Run of consecutive read failures; only the first one is worth a warning
#[derive(Debug, Default)]
struct ReadFailures {
    count: u32,
}

impl ReadFailures {
    /// Count a failure, returning `true` when it starts a new run
    fn record(&mut self) -> bool {
        self.count += 1;
        self.count == 1
    }

    /// End the run, returning how many failures it had
    fn clear(&mut self) -> u32 {
        std::mem::take(&mut self.count)
    }
}

/// Poll `reader` every `poll_interval` until it ends or the interpreter stops
pub async fn poll_loop<R>(
    mut reader: R,
    poll_interval: Duration,
    buffer_size: usize,
    handle: InterpreterHandle,
    clock: NodeClock,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut framer = Framer::new();
    let mut failures = ReadFailures::default();
    let mut buf = vec![0u8; buffer_size.max(2)];

    loop {
        ticker.tick().await;

        let read = timeout(poll_interval, reader.read(&mut buf)).await;
        if !matches!(read, Ok(Err(_))) {
            let failed = failures.clear();
            if failed > 0 {
                info!("UART reads recovered after {} failures", failed);
            }
        }

        let submitted = match read {
            // Nothing buffered this cycle; a held-back partial message won't complete
            Err(_) => submit_all(&handle, &clock, framer.flush()),
            Ok(Ok(0)) => {
                info!("UART stream closed");
                let _ = submit_all(&handle, &clock, framer.flush());
                break;
            }
            Ok(Ok(n)) => {
                trace!("UART read {}", format_hex(&buf[..n]));
                submit_all(&handle, &clock, framer.push(&buf[..n]))
            }
            Ok(Err(e)) => {
                if failures.record() {
                    warn!("UART read failed: {}", e);
                } else {
                    trace!("UART read failed again: {}", e);
                }
                Ok(())
            }
        };

        if submitted.is_err() {
            debug!("Interpreter stopped, leaving UART loop");
            break;
        }
    }
}
