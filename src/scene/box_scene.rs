//! The box swarm scene.
//!
//! [`SwarmSession`] is the GPU-free half: it owns the snapshot store, the
//! session controller and the instance transform pass. [`BoxScene`] adds the
//! wgpu renderer on top and is what the App drives.

use super::traits::Scene;
use crate::pipeline::{ChannelError, ConfigController, FrameChannel, StateStore};
use crate::rendering::{BoxRenderer, InstanceRenderer, RenderError, CAPACITY};
use crate::simulation::sim_config::COUNT_STEP;
use crate::simulation::SimulationConfig;
use std::cell::Cell;
use std::rc::Rc;

/// Operator parameter changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    MoreBoxes,
    FewerBoxes,
    FasterTicks,
    SlowerTicks,
    Restart,
}

pub struct SwarmSession {
    store: StateStore,
    controller: ConfigController,
    instances: InstanceRenderer,
    /// Snapshots received by the store since the last `take_received_frames`.
    received: Rc<Cell<u64>>,
    last_error: Option<RenderError>,
}

impl SwarmSession {
    /// Start a session on its own simulation thread.
    pub fn activate(config: SimulationConfig) -> Result<Self, ChannelError> {
        let mut store = StateStore::new();
        let controller = ConfigController::activate(config, &mut store)?;
        Ok(Self::assemble(store, controller))
    }

    pub fn with_channel(channel: Box<dyn FrameChannel>, config: SimulationConfig) -> Self {
        let mut store = StateStore::new();
        let controller = ConfigController::with_channel(channel, config, &mut store);
        Self::assemble(store, controller)
    }

    fn assemble(mut store: StateStore, controller: ConfigController) -> Self {
        let received = Rc::new(Cell::new(0));
        let counter = Rc::clone(&received);
        store.subscribe(move |entities| {
            if !entities.is_empty() {
                counter.set(counter.get() + 1);
            }
        });

        Self {
            store,
            controller,
            instances: InstanceRenderer::new(),
            received,
            last_error: None,
        }
    }

    pub fn instances(&self) -> &InstanceRenderer {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut InstanceRenderer {
        &mut self.instances
    }

    pub fn config(&self) -> SimulationConfig {
        self.controller.config()
    }

    pub fn apply_input(&mut self, input: OperatorInput) {
        let config = self.config();
        let next = match input {
            OperatorInput::MoreBoxes => config.with_count_delta(COUNT_STEP as isize),
            OperatorInput::FewerBoxes => config.with_count_delta(-(COUNT_STEP as isize)),
            OperatorInput::FasterTicks => config.with_fps_delta(1),
            OperatorInput::SlowerTicks => config.with_fps_delta(-1),
            OperatorInput::Restart => config,
        };

        if next == config && input != OperatorInput::Restart {
            return;
        }
        log::info!("Operator parameters: count={}, fps={}", next.count, next.fps);
        self.controller.set_params(next, &mut self.store);
    }

    /// One display refresh: pull the latest frames, rebuild the transforms.
    /// Returns the number of instances to draw.
    pub fn frame(&mut self) -> usize {
        self.controller.pump(&mut self.store);

        match self.instances.render_frame(&self.store) {
            Ok(count) => {
                self.last_error = None;
                count
            }
            Err(e) => {
                if self.last_error.as_ref() != Some(&e) {
                    log::error!("Keeping previous frame: {}", e);
                }
                self.last_error = Some(e);
                self.instances.buffer().count()
            }
        }
    }

    /// Render-side error of the last frame, if any.
    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    pub fn take_received_frames(&self) -> u64 {
        self.received.replace(0)
    }

    pub fn deactivate(&mut self) {
        self.controller.deactivate(&mut self.store);
    }
}

impl Drop for SwarmSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}

pub struct BoxScene {
    pub session: SwarmSession,
    pub renderer: BoxRenderer,
}

impl BoxScene {
    pub fn new(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        config: SimulationConfig,
    ) -> Result<Self, ChannelError> {
        let session = SwarmSession::activate(config)?;
        let renderer = BoxRenderer::new(device, surface_config, CAPACITY);
        Ok(Self { session, renderer })
    }

    pub fn apply_input(&mut self, input: OperatorInput) {
        self.session.apply_input(input);
    }
}

impl Scene for BoxScene {
    fn update(&mut self, _dt: f32) {
        self.session.frame();
    }

    fn render(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, view: &wgpu::TextureView) {
        self.renderer.upload(queue, self.session.instances_mut().buffer_mut());
        self.renderer.render(device, queue, view);
    }

    fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.renderer.resize(device, width, height);
    }

    fn entity_count(&self) -> usize {
        self.session.instances().buffer().count()
    }
}
