//! Scene abstraction and the box swarm scene.

pub mod box_scene;
pub mod traits;

pub use box_scene::{BoxScene, OperatorInput, SwarmSession};
pub use traits::Scene;
