mod egui_pass;
mod mesh_pass;
mod window_surface;

use crate::config::WindowConfig;
use crate::mesh::Model;
use crate::scene_host::SceneHost;
use anyhow::Result;
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

pub use mesh_pass::GpuStats;
pub use window_surface::{SurfaceFrame, WindowSurface};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Window, GPU device and the two passes drawn each frame: the model with
/// its selection outline, then egui on top.
pub struct Renderer {
    surface: WindowSurface,
    mesh_pass: mesh_pass::MeshPass,
}

impl Renderer {
    pub fn new(window_cfg: &WindowConfig) -> Self {
        Self { surface: WindowSurface::new(window_cfg), mesh_pass: mesh_pass::MeshPass::new() }
    }

    pub fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.surface.ensure_window(event_loop)?;
        let format = self.surface.surface_format()?;
        let (device, queue) = self.surface.device_and_queue()?;
        self.mesh_pass.ensure_pipelines(device, queue, format)
    }

    pub fn window(&self) -> Option<&Window> {
        self.surface.window()
    }

    pub fn device(&self) -> Result<&wgpu::Device> {
        self.surface.device()
    }

    pub fn queue(&self) -> Result<&wgpu::Queue> {
        self.surface.queue()
    }

    pub fn surface_format(&self) -> Result<wgpu::TextureFormat> {
        self.surface.surface_format()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.surface.pixels_per_point()
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.surface.resize(new_size);
    }

    pub fn gpu_stats(&self) -> GpuStats {
        self.mesh_pass.stats()
    }

    /// Draws the attached model (if any) and the UI, then presents.
    pub fn render_frame(
        &mut self,
        scene: &SceneHost,
        model: Option<&Model>,
        painter: &mut EguiRenderer,
        paint_jobs: &[egui::ClippedPrimitive],
        screen: &ScreenDescriptor,
    ) -> Result<()> {
        let frame = self.surface.acquire_surface_frame()?;
        let (device, queue) = self.surface.device_and_queue()?;
        let depth_view = self.surface.depth_view()?;
        self.mesh_pass.prepare(device, queue, scene, model)?;
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Scene Encoder") });
        self.mesh_pass.record(&mut encoder, frame.view(), depth_view, scene, model);
        queue.submit(std::iter::once(encoder.finish()));
        egui_pass::render(device, queue, painter, paint_jobs, screen, frame)
    }
}
