//! Scene trait definition.
//!
//! The App drives whatever scene is active through this interface: one
//! `update` and one `render` per display refresh.

/// Common interface for displayable scenes.
pub trait Scene {
    /// Per-refresh bookkeeping before rendering (event pumping, transforms).
    fn update(&mut self, dt: f32);

    /// Render the scene to the given texture view.
    fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
    );

    /// Handle window resize.
    fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32);

    /// Number of boxes currently drawn.
    fn entity_count(&self) -> usize;
}
