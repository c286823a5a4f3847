use crate::pipeline::ChannelError;
use crate::scene::{BoxScene, OperatorInput, Scene};
use crate::simulation::SimulationConfig;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("surface reports no supported {0}")]
    UnsupportedSurface(&'static str),
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("failed to start simulation: {0}")]
    Simulation(#[from] ChannelError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Key bindings for operator parameter changes.
pub fn operator_input(key: &Key) -> Option<OperatorInput> {
    match key {
        Key::Named(NamedKey::ArrowUp) => Some(OperatorInput::MoreBoxes),
        Key::Named(NamedKey::ArrowDown) => Some(OperatorInput::FewerBoxes),
        Key::Named(NamedKey::ArrowRight) => Some(OperatorInput::FasterTicks),
        Key::Named(NamedKey::ArrowLeft) => Some(OperatorInput::SlowerTicks),
        Key::Character(c) if c.as_str().eq_ignore_ascii_case("r") => Some(OperatorInput::Restart),
        _ => None,
    }
}

/// Prefer an sRGB format; otherwise the first one the surface offers.
fn pick_surface_format(
    caps: &wgpu::SurfaceCapabilities,
) -> Result<(wgpu::TextureFormat, wgpu::CompositeAlphaMode), AppError> {
    let format = caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first())
        .copied()
        .ok_or(AppError::UnsupportedSurface("texture formats"))?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .ok_or(AppError::UnsupportedSurface("alpha modes"))?;
    Ok((format, alpha_mode))
}

pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    scene: BoxScene,
    last_render_time: Instant,
    frame_count: u32,
    fps_timer: Instant,
}

impl App {
    pub fn new(
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: wgpu::SurfaceConfiguration,
        scene: BoxScene,
    ) -> Self {
        Self {
            window,
            surface,
            device,
            queue,
            config,
            scene,
            last_render_time: Instant::now(),
            frame_count: 0,
            fps_timer: Instant::now(),
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.scene.session.deactivate();
                return false;
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    self.config.width = physical_size.width;
                    self.config.height = physical_size.height;
                    self.surface.configure(&self.device, &self.config);
                    self.scene
                        .resize(&self.device, physical_size.width, physical_size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let Some(input) = operator_input(&event.logical_key) {
                        self.scene.apply_input(input);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.render();
            }
            _ => {}
        }
        true
    }

    fn render(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_render_time).as_secs_f32();
        self.last_render_time = now;

        self.scene.update(dt);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.scene.render(&self.device, &self.queue, &view);

        output.present();

        // FPS counter
        self.frame_count += 1;
        if self.fps_timer.elapsed().as_secs_f32() >= 1.0 {
            let params = self.scene.session.config();
            log::info!(
                "FPS: {} | sim frames: {} | boxes: {} ({} requested @ {} fps)",
                self.frame_count,
                self.scene.session.take_received_frames(),
                self.scene.entity_count(),
                params.count,
                params.fps
            );
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

fn create_app(event_loop: &ActiveEventLoop) -> Result<App, AppError> {
    let window_attributes = Window::default_attributes()
        .with_title("Box Swarm")
        .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let surface = instance.create_surface(window.clone())?;

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .ok_or(AppError::NoAdapter)?;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
        },
        None,
    ))?;

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let (surface_format, alpha_mode) = pick_surface_format(&surface_caps)?;

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };

    surface.configure(&device, &config);

    let scene = BoxScene::new(&device, &config, SimulationConfig::load())?;

    Ok(App::new(window, surface, device, queue, config, scene))
}

struct AppState {
    app: Option<App>,
    error: Option<AppError>,
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        match create_app(event_loop) {
            Ok(app) => self.app = Some(app),
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(app) = &mut self.app else { return };

        if window_id != app.window().id() {
            return;
        }

        if !app.handle_event(&event) {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(app) = &self.app {
            app.request_redraw();
        }
    }
}

pub fn run() -> Result<(), AppError> {
    env_logger::init();

    let event_loop = EventLoop::new()?;
    let mut state = AppState { app: None, error: None };

    event_loop.run_app(&mut state)?;

    match state.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            operator_input(&Key::Named(NamedKey::ArrowUp)),
            Some(OperatorInput::MoreBoxes)
        );
        assert_eq!(
            operator_input(&Key::Named(NamedKey::ArrowLeft)),
            Some(OperatorInput::SlowerTicks)
        );
        assert_eq!(operator_input(&Key::Character("R".into())), Some(OperatorInput::Restart));
        assert_eq!(operator_input(&Key::Character("r".into())), Some(OperatorInput::Restart));
        assert_eq!(operator_input(&Key::Character("q".into())), None);
        assert_eq!(operator_input(&Key::Named(NamedKey::Space)), None);
    }

    fn caps(formats: Vec<wgpu::TextureFormat>, alpha_modes: Vec<wgpu::CompositeAlphaMode>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes,
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn test_surface_format_prefers_srgb() {
        let (format, alpha) = pick_surface_format(&caps(
            vec![wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Bgra8UnormSrgb],
            vec![wgpu::CompositeAlphaMode::Opaque],
        ))
        .unwrap();
        assert_eq!(format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(alpha, wgpu::CompositeAlphaMode::Opaque);

        let (format, _) = pick_surface_format(&caps(
            vec![wgpu::TextureFormat::Rgba16Float],
            vec![wgpu::CompositeAlphaMode::Auto],
        ))
        .unwrap();
        assert_eq!(format, wgpu::TextureFormat::Rgba16Float);
    }

    #[test]
    fn test_empty_surface_caps_are_an_error() {
        assert!(matches!(
            pick_surface_format(&caps(vec![], vec![wgpu::CompositeAlphaMode::Opaque])),
            Err(AppError::UnsupportedSurface("texture formats"))
        ));
        assert!(matches!(
            pick_surface_format(&caps(vec![wgpu::TextureFormat::Bgra8UnormSrgb], vec![])),
            Err(AppError::UnsupportedSurface("alpha modes"))
        ));
    }
}
