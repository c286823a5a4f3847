pub mod engine;
pub mod particle;
pub mod sim_config;
pub mod snapshot;
pub mod worker;

pub use engine::{SimulationEngine, TickError};
pub use particle::{Particle, LAP_LENGTH, ROTATION_DELTA};
pub use sim_config::SimulationConfig;
pub use snapshot::{Dimensions, EntityState, Snapshot};
