//! Lifecycle owner for one simulation session.
//!
//! The controller sits on the render thread. It turns operator parameter
//! changes into `clear → start` sequences, forwards frame events into the
//! [`StateStore`], and drops frames that belong to a superseded run.

use super::channel::{ChannelError, Command, Event, FrameChannel, ThreadChannel};
use super::state_store::StateStore;
use crate::simulation::SimulationConfig;

pub struct ConfigController {
    channel: Option<Box<dyn FrameChannel>>,
    config: SimulationConfig,
    /// Run id of the last `start` sent; frames from any other run are stale.
    run: u64,
    stale_frames: u64,
}

impl ConfigController {
    /// Spawn a simulation thread and start it with `config`.
    pub fn activate(config: SimulationConfig, store: &mut StateStore) -> Result<Self, ChannelError> {
        let channel = ThreadChannel::spawn()?;
        Ok(Self::with_channel(Box::new(channel), config, store))
    }

    /// Start a session over an existing channel.
    pub fn with_channel(
        channel: Box<dyn FrameChannel>,
        config: SimulationConfig,
        store: &mut StateStore,
    ) -> Self {
        let mut controller = Self {
            channel: Some(channel),
            config: config.clamped(),
            run: 0,
            stale_frames: 0,
        };
        controller.restart(store);
        controller
    }

    pub fn config(&self) -> SimulationConfig {
        self.config
    }

    pub fn is_active(&self) -> bool {
        self.channel.is_some()
    }

    /// Frames discarded because they belonged to an earlier run.
    pub fn stale_frames(&self) -> u64 {
        self.stale_frames
    }

    /// Apply new operator parameters. Out-of-range values are clamped.
    pub fn set_params(&mut self, config: SimulationConfig, store: &mut StateStore) {
        self.config = config.clamped();
        self.restart(store);
    }

    pub fn set_count(&mut self, count: usize, store: &mut StateStore) {
        self.set_params(SimulationConfig { count, ..self.config }, store);
    }

    pub fn set_fps(&mut self, fps: u32, store: &mut StateStore) {
        self.set_params(SimulationConfig { fps, ..self.config }, store);
    }

    /// Clear the store, then start a fresh run with the current parameters.
    pub fn restart(&mut self, store: &mut StateStore) {
        store.clear();
        self.run += 1;
        self.send(Command::Start {
            n: self.config.count,
            fps: self.config.fps,
            run: self.run,
        });
    }

    fn send(&self, command: Command) {
        let Some(channel) = &self.channel else {
            log::debug!("Dropping {:?}: controller is deactivated", command);
            return;
        };
        if let Err(e) = channel.send(command) {
            log::debug!("Dropping command: {}", e);
        }
    }

    /// Forward pending frame events of the current run into `store`.
    /// Returns how many frames were stored.
    pub fn pump(&mut self, store: &mut StateStore) -> usize {
        let Some(channel) = &self.channel else {
            return 0;
        };

        let current_run = self.run;
        let mut stored = 0;
        let mut stale = 0;
        channel.drain(&mut |event| match event {
            Event::Frame { entities, run } if run == current_run => {
                store.update(entities);
                stored += 1;
            }
            Event::Frame { .. } => stale += 1,
        });

        if stale > 0 {
            log::debug!("Dropped {} frames from superseded runs", stale);
            self.stale_frames += stale;
        }
        stored
    }

    /// Stop the simulation, release the channel and clear the store.
    pub fn deactivate(&mut self, store: &mut StateStore) {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.send(Command::Stop) {
                log::debug!("Simulation already gone at deactivation: {}", e);
            }
            log::info!("Simulation session deactivated");
        }
        store.clear();
    }
}
