pub mod box_renderer;
pub mod instance_renderer;

pub use box_renderer::BoxRenderer;
pub use instance_renderer::{compose_transform, InstanceBuffer, InstanceRenderer, RenderError};

/// Maximum number of simultaneously drawn boxes.
pub const CAPACITY: usize = 10_000;
