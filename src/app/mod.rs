use crate::config::{ViewerConfig, DEFAULT_CONFIG_PATH};
use crate::events::ViewerEvent;
use crate::progress::LoadingIndicator;
use crate::renderer::Renderer;
use crate::upload::{ImportOutcome, ImportWorker, UploadQueue};
use crate::viewer::Viewer;

mod pointer;
mod viewer_ui;

use pointer::{PointerRelease, PointerTracker};
use viewer_ui::{UiActions, UiParams};

use anyhow::{Context, Result};
use glam::Vec2;
use std::collections::VecDeque;
use std::path::PathBuf;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};

// egui
use egui::Context as EguiCtx;
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions, ScreenDescriptor};
use egui_winit::State as EguiWinit;

/// Wheel pixels per zoom step on touchpads that report pixel deltas.
const PIXELS_PER_ZOOM_STEP: f32 = 50.0;

pub async fn run() -> Result<()> {
    let config = ViewerConfig::load_or_default(DEFAULT_CONFIG_PATH);
    run_with_overrides(config, Vec::new()).await
}

/// Runs the viewer with an already resolved configuration, importing `open`
/// in order once the window is up.
pub async fn run_with_overrides(config: ViewerConfig, open: Vec<PathBuf>) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config);
    app.queue_imports(open);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

/// Model imports run on the background worker; if the thread cannot be
/// spawned (or dies) the same queue is drained on the UI thread instead,
/// one file per frame.
enum ImportRunner {
    Worker(ImportWorker),
    Inline(UploadQueue),
}

impl ImportRunner {
    fn new(indicator: LoadingIndicator) -> Self {
        match ImportWorker::new(indicator) {
            Some(worker) => Self::Worker(worker),
            None => {
                log::warn!("[app] import worker unavailable; importing on the UI thread");
                Self::Inline(UploadQueue::new())
            }
        }
    }

    fn submit(&mut self, batch: Vec<PathBuf>) {
        let refused = match self {
            Self::Worker(worker) => match worker.submit(batch) {
                Ok(()) => return,
                Err(refused) => refused,
            },
            Self::Inline(queue) => {
                queue.enqueue(batch);
                return;
            }
        };
        log::error!("[app] import worker stopped; {} file(s) moved to the UI thread", refused.len());
        let mut queue = UploadQueue::new();
        queue.enqueue(refused);
        *self = Self::Inline(queue);
    }

    fn poll(&mut self, indicator: &LoadingIndicator) -> Vec<ImportOutcome> {
        match self {
            Self::Worker(worker) => worker.drain(),
            Self::Inline(queue) => queue.process_next(indicator).into_iter().collect(),
        }
    }

    fn pending(&self) -> usize {
        match self {
            Self::Worker(worker) => worker.pending(),
            Self::Inline(queue) => queue.len(),
        }
    }
}

pub struct App {
    renderer: Renderer,
    viewer: Viewer,
    imports: ImportRunner,
    pointer: PointerTracker,
    hovered_files: u32,
    notices: VecDeque<String>,
    should_close: bool,

    // egui
    egui_ctx: EguiCtx,
    egui_winit: Option<EguiWinit>,
    egui_renderer: Option<EguiRenderer>,
    egui_screen: Option<ScreenDescriptor>,
}

impl App {
    pub fn new(config: ViewerConfig) -> Self {
        let renderer = Renderer::new(&config.window);
        let viewer = Viewer::new(config);
        let imports = ImportRunner::new(viewer.scene.loading().clone());
        Self {
            renderer,
            viewer,
            imports,
            pointer: PointerTracker::default(),
            hovered_files: 0,
            notices: VecDeque::new(),
            should_close: false,
            egui_ctx: EguiCtx::default(),
            egui_winit: None,
            egui_renderer: None,
            egui_screen: None,
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Appends a batch of candidate model files to the import queue.
    pub fn queue_imports(&mut self, batch: Vec<PathBuf>) {
        if batch.is_empty() {
            return;
        }
        log::info!("[app] queued {} file(s) for import", batch.len());
        self.imports.submit(batch);
    }

    fn scale_factor(&self) -> f32 {
        self.renderer.pixels_per_point()
    }

    fn apply_finished_imports(&mut self) {
        let indicator = self.viewer.scene.loading().clone();
        for outcome in self.imports.poll(&indicator) {
            self.viewer.apply_import(outcome);
        }
    }

    fn collect_notices(&mut self) {
        for event in self.viewer.drain_events() {
            match event {
                ViewerEvent::Notice { message } => self.notices.push_back(message),
                other => log::debug!("[app] {other}"),
            }
        }
    }

    fn handle_pointer_button(&mut self, state: ElementState, over_ui: bool) {
        match state {
            ElementState::Pressed if !over_ui => self.pointer.press(),
            ElementState::Pressed => {}
            ElementState::Released => {
                if let PointerRelease::Click(position) = self.pointer.release(self.scale_factor()) {
                    self.viewer.select_at(position);
                }
            }
        }
    }

    fn handle_cursor_moved(&mut self, position: Vec2) {
        let Some(delta) = self.pointer.moved(position) else {
            return;
        };
        let height = self.viewer.scene.viewport().height.max(1) as f32;
        self.viewer.scene.controls.orbit(delta * (std::f32::consts::TAU / height));
    }

    fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_ZOOM_STEP,
        };
        self.viewer.scene.controls.zoom(steps);
    }

    fn apply_ui_actions(&mut self, actions: UiActions) {
        if actions.dismiss_notice {
            self.notices.pop_front();
        }
        if let Some(index) = actions.remove_tab {
            self.viewer.remove(index);
        } else if let Some(index) = actions.switch_tab {
            self.viewer.switch_to(index);
        }
        for (mesh, visible) in actions.visibility {
            self.viewer.set_mesh_visible(mesh, visible);
        }
        if let Some(mesh) = actions.select_mesh {
            self.viewer.select_mesh(mesh);
        }
        if let Some(name) = actions.texture {
            self.viewer.apply_texture(&name);
        }
        if let Some(factor) = actions.tiling {
            self.viewer.set_tiling(factor);
        }
        if let Some(name) = actions.environment {
            self.viewer.set_environment(&name);
        }
        if actions.toggle_theme {
            let theme = self.viewer.toggle_theme();
            log::info!("[app] theme {}", theme.label());
        }
        if actions.pick_models {
            if let Some(paths) =
                rfd::FileDialog::new().add_filter("FBX", &["fbx"]).add_filter("All files", &["*"]).pick_files()
            {
                self.queue_imports(paths);
            }
        }
        if actions.pick_texture {
            if let Some(path) = rfd::FileDialog::new().add_filter("Images", &["png", "jpg", "jpeg"]).pick_file() {
                self.viewer.upload_texture(&path);
            }
        }
        if actions.refresh_catalogues {
            self.viewer.refresh_catalogues();
        }
    }

    fn frame(&mut self) {
        self.apply_finished_imports();
        self.viewer.update();
        self.collect_notices();

        let Some(window) = self.renderer.window() else {
            return;
        };
        let Some(egui_winit) = self.egui_winit.as_mut() else {
            return;
        };
        let raw_input = egui_winit.take_egui_input(window);
        let mut actions = UiActions::default();
        let params = UiParams {
            viewer: &self.viewer,
            notice: self.notices.front().map(String::as_str),
            drop_hint: self.hovered_files > 0,
            pending_imports: self.imports.pending(),
            gpu: self.renderer.gpu_stats(),
        };
        let ctx = self.egui_ctx.clone();
        let full_output = ctx.run(raw_input, |ctx| viewer_ui::draw(ctx, &params, &mut actions));
        let egui::FullOutput { platform_output, textures_delta, shapes, pixels_per_point, .. } = full_output;
        egui_winit.handle_platform_output(window, platform_output);

        self.apply_ui_actions(actions);
        self.collect_notices();

        let (Some(painter), Some(screen)) = (self.egui_renderer.as_mut(), self.egui_screen.as_mut()) else {
            return;
        };
        screen.pixels_per_point = pixels_per_point;
        if let (Ok(device), Ok(queue)) = (self.renderer.device(), self.renderer.queue()) {
            for (id, delta) in &textures_delta.set {
                painter.update_texture(device, queue, *id, delta);
            }
        }
        let paint_jobs = self.egui_ctx.tessellate(shapes, pixels_per_point);
        let model = self.viewer.scene.attached().and_then(|index| self.viewer.store.model(index));
        if let Err(err) = self.renderer.render_frame(&self.viewer.scene, model, painter, &paint_jobs, screen) {
            log::warn!("[app] render error: {err:#}");
        }
        for id in &textures_delta.free {
            painter.free_texture(id);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.renderer.ensure_window(event_loop) {
            log::error!("Renderer initialization error: {err:?}");
            self.should_close = true;
            return;
        }
        self.viewer.scene.resize(self.renderer.size());
        if let Ok(device) = self.renderer.device() {
            self.viewer.set_max_texture_dimension(device.limits().max_texture_dimension_2d);
        }

        if self.egui_winit.is_none() {
            if let Some(window) = self.renderer.window() {
                let state = EguiWinit::new(
                    self.egui_ctx.clone(),
                    egui::ViewportId::ROOT,
                    window,
                    Some(self.renderer.pixels_per_point()),
                    window.theme(),
                    None,
                );
                self.egui_winit = Some(state);
            }
        }

        if self.egui_renderer.is_none() {
            let egui_renderer = match (self.renderer.device(), self.renderer.surface_format()) {
                (Ok(device), Ok(format)) => EguiRenderer::new(device, format, RendererOptions::default()),
                (Err(err), _) | (_, Err(err)) => {
                    log::error!("Unable to initialize egui renderer: {err:?}");
                    self.should_close = true;
                    return;
                }
            };
            self.egui_renderer = Some(egui_renderer);
        }
        let size = self.renderer.size();
        self.egui_screen = Some(ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: self.renderer.pixels_per_point(),
        });
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, id: winit::window::WindowId, event: WindowEvent) {
        let mut consumed = false;
        if let (Some(window), Some(state)) = (self.renderer.window(), self.egui_winit.as_mut()) {
            if id == window.id() {
                consumed = state.on_window_event(window, &event).consumed;
            }
        }
        let over_ui = self.egui_ctx.is_pointer_over_area();

        match event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => {
                self.renderer.resize(size);
                self.viewer.scene.resize(size);
                if let Some(screen) = &mut self.egui_screen {
                    screen.size_in_pixels = [size.width, size.height];
                }
            }
            WindowEvent::RedrawRequested => self.frame(),
            WindowEvent::HoveredFile(_) => self.hovered_files = self.hovered_files.saturating_add(1),
            WindowEvent::HoveredFileCancelled => self.hovered_files = 0,
            WindowEvent::DroppedFile(path) => {
                self.hovered_files = 0;
                self.queue_imports(vec![path]);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.pointer.cancel(),
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.handle_pointer_button(state, consumed || over_ui);
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed && !over_ui => self.handle_wheel(delta),
            WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key: Key::Named(NamedKey::Escape), state: ElementState::Pressed, .. },
                ..
            } if !consumed => self.should_close = true,
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        if let Some(window) = self.renderer.window() {
            window.request_redraw();
        }
    }
}
