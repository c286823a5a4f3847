//! # Simulation Engine
//!
//! [`SimulationEngine`] owns the particle set and the tick timer of one
//! simulation run. It is a plain value: tests construct and step it directly,
//! while the [`super::worker`] loop drives it from its own thread.
//!
//! ## Runs
//!
//! `start(n, fps)` replaces the whole particle set and the timer in one call,
//! so a restart can never leave two timers alive or interleave the particles
//! of two runs. `stop()` drops both. A run with `n == 0` never arms the timer.
//!
//! ## Tick
//!
//! Each tick advances every particle in id order (see
//! [`Particle::advance`]) and then produces the full public snapshot.

use super::particle::Particle;
use super::snapshot::Snapshot;
use crossbeam_channel::Receiver;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// Highest supported tick rate.
pub const MAX_TICK_RATE: u32 = 60;

/// Errors raised by a single tick. None of them end the run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TickError {
    #[error("tick requested while the engine is stopped")]
    NotRunning,
    #[error("particle {id} produced a non-finite state and was resampled")]
    NonFiniteState { id: u32 },
    #[error("tick panicked")]
    Panicked,
}

pub struct SimulationEngine {
    particles: Vec<Particle>,
    rng: SmallRng,
    /// Fires once per tick while running; `never()` otherwise.
    timer: Receiver<Instant>,
    interval: Option<Duration>,
    ticks: u64,
    #[cfg(test)]
    panic_at_tick: Option<u64>,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Engine with a reproducible random stream.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            particles: Vec::new(),
            rng,
            timer: crossbeam_channel::never(),
            interval: None,
            ticks: 0,
            #[cfg(test)]
            panic_at_tick: None,
        }
    }

    /// Tick period for a rate in frames per second.
    pub fn tick_interval_for(fps: u32) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(fps.clamp(1, MAX_TICK_RATE)))
    }

    /// Begin a new run of `n` particles ticking at `fps`.
    ///
    /// Inputs are expected to be validated by the caller.
    pub fn start(&mut self, n: usize, fps: u32) {
        self.cancel_timer();

        self.particles.clear();
        self.particles.reserve(n);
        for id in 0..n {
            let particle = Particle::spawn(id as u32, &mut self.rng);
            self.particles.push(particle);
        }
        self.ticks = 0;

        if n == 0 {
            log::debug!("Empty run requested; tick timer not armed");
            return;
        }

        let interval = Self::tick_interval_for(fps);
        self.timer = crossbeam_channel::tick(interval);
        self.interval = Some(interval);
    }

    /// Cancel the timer and discard the particle set. Idempotent.
    pub fn stop(&mut self) {
        self.cancel_timer();
        self.particles.clear();
    }

    fn cancel_timer(&mut self) {
        if self.interval.take().is_some() {
            log::debug!("Cancelled tick timer after {} ticks", self.ticks);
        }
        self.timer = crossbeam_channel::never();
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Timer receiver to wait on between ticks.
    pub fn timer(&self) -> &Receiver<Instant> {
        &self.timer
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Advance every particle by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> Result<Snapshot, TickError> {
        if !self.is_running() {
            return Err(TickError::NotRunning);
        }
        #[cfg(test)]
        if self.panic_at_tick == Some(self.ticks) {
            self.panic_at_tick = None;
            panic!("injected failure at tick {}", self.ticks);
        }

        let mut first_bad = None;
        for particle in &mut self.particles {
            particle.advance(&mut self.rng);
            if !particle.is_finite() {
                particle.respawn(&mut self.rng);
                first_bad.get_or_insert(particle.id);
            }
        }
        self.ticks += 1;

        if let Some(id) = first_bad {
            return Err(TickError::NonFiniteState { id });
        }

        Ok(self.snapshot())
    }

    /// Public view of the current particle set.
    pub fn snapshot(&self) -> Snapshot {
        self.particles.iter().map(Particle::entity).collect()
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Panic once, on the tick numbered `tick` of the current run.
    #[cfg(test)]
    pub(crate) fn inject_panic_at(&mut self, tick: u64) {
        self.panic_at_tick = Some(tick);
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}
