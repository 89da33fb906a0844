//! InterpreterActor - single consumer for every transport
//!
//! Both producers push into one unbounded queue. The actor owns the
//! [`MidiInterpreter`] and handles one command at a time, so a message is
//! always applied in full before the next one is looked at.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::actor_handle::InterpreterHandle;
use super::commands::InterpreterCommand;
use crate::interpreter::MidiInterpreter;

pub struct InterpreterActor {
    interpreter: MidiInterpreter,
    command_rx: mpsc::UnboundedReceiver<InterpreterCommand>,
    /// Events emitted since spawn
    emitted: u64,
}

impl InterpreterActor {
    /// Spawn the actor on the current tokio runtime
    ///
    /// Returns the handle producers submit through and the task handle, which
    /// resolves to the interpreter once the actor stops.
    pub fn spawn(interpreter: MidiInterpreter) -> (InterpreterHandle, JoinHandle<MidiInterpreter>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = InterpreterActor {
            interpreter,
            command_rx: cmd_rx,
            emitted: 0,
        };

        let task = tokio::spawn(actor.run());
        info!("InterpreterActor spawned");

        (InterpreterHandle::new(cmd_tx), task)
    }

    /// Runs until a `Shutdown` arrives or every handle is dropped
    async fn run(mut self) -> MidiInterpreter {
        debug!("InterpreterActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                InterpreterCommand::Midi(raw) => {
                    trace!(source = %raw.source, status = raw.status, "Processing message");
                    self.emitted += self.interpreter.handle(&raw) as u64;
                }
                InterpreterCommand::Snapshot { response } => {
                    let _ = response.send(self.interpreter.snapshot());
                }
                InterpreterCommand::Shutdown => {
                    debug!("InterpreterActor received shutdown");
                    break;
                }
            }
        }

        info!(
            processed = self.interpreter.snapshot().processed,
            emitted = self.emitted,
            "InterpreterActor stopped"
        );
        self.interpreter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SynthesisEvent;
    use crate::midi::{RawMidi, Source};
    use crate::routing::Target;
    use crate::sink::ChannelSink;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_actor(
        voices: usize,
    ) -> (
        InterpreterHandle,
        JoinHandle<MidiInterpreter>,
        mpsc::UnboundedReceiver<(SynthesisEvent, Target)>,
    ) {
        let (sink, rx) = ChannelSink::new();
        let interpreter = MidiInterpreter::new(voices, SynthesisEvent::default(), Arc::new(sink));
        let (handle, task) = InterpreterActor::spawn(interpreter);
        (handle, task, rx)
    }

    #[tokio::test]
    async fn test_actor_processes_in_order() {
        let (handle, _task, mut rx) = spawn_actor(4);

        handle.submit(RawMidi::new(Source::Uart, 1, 0xB0, [0, 1])).unwrap();
        handle.submit(RawMidi::new(Source::Ble, 2, 0xC0, [9])).unwrap();
        handle.submit(RawMidi::new(Source::Uart, 3, 0x90, [60, 100])).unwrap();

        let (event, target) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(target, Target::Broadcast);
        assert_eq!(event.patch, Some(9));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.bank, 1);
        assert_eq!(snapshot.program, 9);
        assert_eq!(snapshot.next_voice, 1);
    }

    #[tokio::test]
    async fn test_concurrent_producers_keep_round_robin() {
        let (handle, task, mut rx) = spawn_actor(4);

        let mut producers = Vec::new();
        for source in [Source::Uart, Source::Ble] {
            let handle = handle.clone();
            producers.push(tokio::spawn(async move {
                for note in 0..50u8 {
                    handle.submit(RawMidi::new(source, 0, 0x90, [note, 100])).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        handle.shutdown();
        let interpreter = task.await.unwrap();
        assert_eq!(interpreter.snapshot().processed, 100);

        let mut voices = Vec::new();
        while let Ok((event, _)) = rx.try_recv() {
            voices.push(event.voice);
        }
        let expected: Vec<usize> = (0..100).map(|k| k % 4).collect();
        assert_eq!(voices, expected);
    }

    #[tokio::test]
    async fn test_actor_stops_when_handles_dropped() {
        let (handle, task, _rx) = spawn_actor(2);
        handle.submit(RawMidi::new(Source::Uart, 0, 0x90, [1, 1])).unwrap();
        drop(handle);

        let interpreter = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(interpreter.voices().slots(), &[Some(1), None]);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let (handle, task, _rx) = spawn_actor(2);
        handle.shutdown();
        task.await.unwrap();

        assert!(handle.submit(RawMidi::new(Source::Uart, 0, 0x90, [1, 1])).is_err());
        assert!(handle.snapshot().await.is_none());
    }
}
