//! Message boundary between the simulation thread and the render thread.
//!
//! Commands flow in, frame events flow out. Both directions are unbounded
//! FIFO queues: the simulation never waits on the renderer, and commands are
//! applied in exactly the order they were sent.

use crate::simulation::snapshot::EntityState;
use crate::simulation::worker;
use crate::simulation::SimulationEngine;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::thread::JoinHandle;

/// Controller → engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Start {
        n: usize,
        fps: u32,
        /// Identifier echoed by every frame of this run.
        #[serde(default)]
        run: u64,
    },
    Stop,
}

/// Engine → consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Frame {
        entities: Vec<EntityState>,
        #[serde(default)]
        run: u64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("simulation thread is no longer receiving commands")]
    Disconnected,
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Asynchronous transport between the controller and a simulation engine.
pub trait FrameChannel {
    /// Queue a command. Never blocks.
    fn send(&self, command: Command) -> Result<(), ChannelError>;

    /// Hand every event received so far to `sink`, oldest first.
    /// Returns the number of events delivered.
    fn drain(&self, sink: &mut dyn FnMut(Event)) -> usize;
}

/// [`FrameChannel`] backed by a dedicated simulation thread.
pub struct ThreadChannel {
    commands: Option<Sender<Command>>,
    events: Receiver<Event>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadChannel {
    /// Spawn a simulation thread with a freshly seeded engine.
    pub fn spawn() -> Result<Self, ChannelError> {
        Self::spawn_with(SimulationEngine::new())
    }

    pub fn spawn_with(engine: SimulationEngine) -> Result<Self, ChannelError> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let thread = std::thread::Builder::new()
            .name("box-simulation".into())
            .spawn(move || worker::run(engine, command_rx, event_tx))?;

        Ok(Self {
            commands: Some(command_tx),
            events: event_rx,
            thread: Some(thread),
        })
    }

    /// Stop the run, disconnect the command queue and join the thread.
    pub fn shutdown(&mut self) {
        if let Some(commands) = self.commands.take() {
            // The thread may already be gone; nothing to stop in that case.
            let _ = commands.send(Command::Stop);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Simulation thread panicked during shutdown");
            }
        }
    }
}

impl FrameChannel for ThreadChannel {
    fn send(&self, command: Command) -> Result<(), ChannelError> {
        let commands = self.commands.as_ref().ok_or(ChannelError::Disconnected)?;
        commands.send(command).map_err(|_| ChannelError::Disconnected)
    }

    fn drain(&self, sink: &mut dyn FnMut(Event)) -> usize {
        let mut delivered = 0;
        for event in self.events.try_iter() {
            sink(event);
            delivered += 1;
        }
        delivered
    }
}

impl Drop for ThreadChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
