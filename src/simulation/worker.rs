//! Tick loop run on the simulation thread.
//!
//! The loop waits on two sources at once: the command queue and the engine's
//! tick timer. Commands are applied one at a time in arrival order. A failed
//! tick is logged and skipped; the run continues with the next tick.

use super::engine::{SimulationEngine, TickError};
use super::snapshot::Snapshot;
use crate::pipeline::channel::{Command, Event};
use crossbeam_channel::{select, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};

/// Drive `engine` until the command queue disconnects or the event consumer
/// goes away.
pub fn run(mut engine: SimulationEngine, commands: Receiver<Command>, events: Sender<Event>) {
    let mut run_id = 0u64;

    loop {
        // Clone so the engine can replace its timer while handling a command.
        let timer = engine.timer().clone();

        select! {
            recv(commands) -> command => match command {
                Ok(command) => apply(&mut engine, &mut run_id, command),
                Err(_) => break,
            },
            recv(timer) -> _ => {
                if !engine.is_running() {
                    continue;
                }
                match tick_guarded(&mut engine) {
                    Ok(entities) => {
                        if events.send(Event::Frame { entities, run: run_id }).is_err() {
                            log::debug!("Frame consumer disconnected; ending simulation thread");
                            break;
                        }
                    }
                    Err(e) => log::warn!("Skipping tick {}: {}", engine.ticks(), e),
                }
            }
        }
    }

    engine.stop();
    log::debug!("Simulation thread exiting");
}

fn apply(engine: &mut SimulationEngine, run_id: &mut u64, command: Command) {
    match command {
        Command::Start { n, fps, run } => {
            engine.start(n, fps);
            *run_id = run;
            log::info!("Simulation started: n={}, fps={}, run={}", n, fps, run);
        }
        Command::Stop => {
            if engine.is_running() || engine.particle_count() > 0 {
                log::info!("Simulation stopped after {} ticks", engine.ticks());
            }
            engine.stop();
        }
    }
}

/// Run one tick, turning a panic into a logged, skipped tick.
fn tick_guarded(engine: &mut SimulationEngine) -> Result<Snapshot, TickError> {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.tick())) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Tick panicked: {}", message);
            Err(TickError::Panicked)
        }
    }
}
