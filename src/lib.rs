//! # Box Swarm: Threaded Box Particle Simulation
//!
//! Box Swarm animates thousands of randomly sized, spinning boxes that drift
//! through a 3D volume and respawn at the end of each lap. Simulation runs on
//! its own thread; the render thread only ever draws the latest snapshot.
//!
//! ## Architecture Overview
//!
//! ### 1. Simulation ([`simulation`])
//! - [`simulation::SimulationEngine`] - particle set, integration and lap resets
//! - [`simulation::worker`] - timer-driven actor loop on the simulation thread
//! - [`simulation::SimulationConfig`] - box count and tick rate, loaded from `box_swarm.ron`
//!
//! ### 2. Pipeline ([`pipeline`])
//! - [`pipeline::FrameChannel`] - `start`/`stop` commands in, frame events out
//! - [`pipeline::StateStore`] - last-write-wins snapshot holder with subscribers
//! - [`pipeline::ConfigController`] - session lifecycle, run ids, stale frame filtering
//!
//! ### 3. Rendering ([`rendering`])
//! - [`rendering::InstanceRenderer`] - per-entity model matrices into a fixed-capacity buffer
//! - [`rendering::BoxRenderer`] - instanced wgpu draw of translucent boxes
//!
//! ## Data Flow
//!
//! ```text
//! timer tick -> SimulationEngine::tick -> Event::Frame -> ConfigController::pump
//!            -> StateStore::update -> InstanceRenderer::render_frame -> BoxRenderer
//! ```
//!
//! ## Dependencies
//!
//! - **Graphics**: `wgpu` (GPU abstraction), `winit` (windowing)
//! - **Math**: `glam` (SIMD math types), `bytemuck` (safe transmutation)
//! - **Concurrency**: `crossbeam-channel` (messaging and timers)
//! - **Serialization**: `serde` + `ron` (human-readable config files)

pub mod app;
pub mod pipeline;
pub mod rendering;
pub mod scene;
pub mod simulation;
