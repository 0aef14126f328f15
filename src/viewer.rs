//! Composition layer. Owns every stateful component and keeps the tab strip
//! and the model list index-aligned across every operation.

use crate::config::{Theme, ViewerConfig};
use crate::environment::{EnvironmentLoader, NO_ENVIRONMENT};
use crate::events::{EventBus, ViewerEvent};
use crate::mesh::{MeshKey, Model};
use crate::model_store::{ControlState, InfoPanel, ModelStore, TextureTarget};
use crate::scene_host::SceneHost;
use crate::tabs::TabManager;
use crate::texture::TextureEngine;
use crate::upload::ImportOutcome;
use glam::Vec2;
use std::path::Path;

pub struct Viewer {
    pub config: ViewerConfig,
    pub scene: SceneHost,
    pub store: ModelStore,
    pub textures: TextureEngine,
    pub environments: EnvironmentLoader,
    pub tabs: TabManager,
    pub events: EventBus,
    texture_catalogue: Vec<String>,
    environment_catalogue: Vec<String>,
    environment: String,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let scene = SceneHost::new(&config.camera, config.theme);
        let textures = TextureEngine::new(&config.assets, &config.cache);
        let environments = EnvironmentLoader::from_config(&config.assets, &config.cache);
        let mut viewer = Self {
            config,
            scene,
            store: ModelStore::new(),
            textures,
            environments,
            tabs: TabManager::new(),
            events: EventBus::default(),
            texture_catalogue: Vec::new(),
            environment_catalogue: vec![NO_ENVIRONMENT.to_string()],
            environment: NO_ENVIRONMENT.to_string(),
        };
        viewer.refresh_catalogues();
        viewer
    }

    /// Rescans the texture and environment directories.
    pub fn refresh_catalogues(&mut self) {
        match self.textures.catalogue() {
            Ok(names) => self.texture_catalogue = names,
            Err(err) => log::warn!("[viewer] texture catalogue unavailable: {err:#}"),
        }
        match self.environments.catalogue() {
            Ok(names) => self.environment_catalogue = names,
            Err(err) => log::warn!("[viewer] environment catalogue unavailable: {err:#}"),
        }
    }

    pub fn texture_catalogue(&self) -> &[String] {
        &self.texture_catalogue
    }

    pub fn environment_catalogue(&self) -> &[String] {
        &self.environment_catalogue
    }

    pub fn current_environment(&self) -> &str {
        &self.environment
    }

    pub fn controls(&self) -> &ControlState {
        self.store.controls()
    }

    pub fn info(&self) -> InfoPanel {
        self.store.info()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.store.active_index()
    }

    pub fn selected(&self) -> Option<MeshKey> {
        self.store.selected()
    }

    /// Applies one finished import: inserts the model and its tab, or raises
    /// the error as a notice.
    pub fn apply_import(&mut self, outcome: ImportOutcome) -> Option<usize> {
        match outcome {
            ImportOutcome::Imported { name, model, .. } => Some(self.open_model(*model, &name)),
            ImportOutcome::Rejected { path, error } => {
                log::warn!("[viewer] {} not imported: {error}", path.display());
                self.events.notice(error.to_string());
                None
            }
        }
    }

    pub fn open_model(&mut self, model: Model, name: &str) -> usize {
        let index = self.store.insert(model, name, &mut self.scene, &mut self.textures, &mut self.events);
        let tab = self.tabs.create(name);
        debug_assert_eq!(index, tab, "tab strip out of step with model list");
        index
    }

    pub fn switch_to(&mut self, index: usize) -> bool {
        if !self.tabs.switch_to(index) {
            return false;
        }
        self.store.switch_to(index, &mut self.scene, &mut self.events)
    }

    /// Removes model and tab `index` together, then activates the clamped
    /// position if any tabs remain.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.store.remove(index, &mut self.scene, &mut self.textures, &mut self.events).is_none() {
            return false;
        }
        if let Some(Some(next)) = self.tabs.remove(index) {
            self.store.switch_to(next, &mut self.scene, &mut self.events);
        }
        debug_assert_eq!(self.tabs.len(), self.store.len());
        true
    }

    pub fn select_at(&mut self, screen: Vec2) -> Option<MeshKey> {
        self.store.select_at(screen, &mut self.scene, &self.textures, &mut self.events)
    }

    /// Mesh-list selection: like a ray hit, then re-applies the mesh's texture.
    pub fn select_mesh(&mut self, mesh: MeshKey) -> bool {
        if !self.store.select_mesh(mesh, &mut self.scene, &self.textures, &mut self.events) {
            return false;
        }
        let name = self.store.controls().texture.clone().unwrap_or_default();
        let targets = self.store.texture_targets(TextureTarget::Mesh(mesh));
        self.textures.apply(&name, targets, self.scene.loading(), &mut self.events);
        true
    }

    /// Applies a selector value to the selection, or the whole active model
    /// when nothing is selected.
    pub fn apply_texture(&mut self, name: &str) -> bool {
        let target = self.store.current_target();
        let targets = self.store.texture_targets(target);
        let applied = self.textures.apply(name, targets, self.scene.loading(), &mut self.events);
        if applied {
            self.store.sync_controls(target, &self.textures);
        }
        applied
    }

    pub fn set_tiling(&mut self, factor: f32) -> bool {
        let target = self.store.current_target();
        let targets = self.store.texture_targets(target);
        let applied = self.textures.set_tiling(factor, targets, &mut self.events);
        if applied {
            self.store.sync_controls(target, &self.textures);
        }
        applied
    }

    /// Reads an image from disk and applies it as an uploaded texture.
    pub fn upload_texture(&mut self, path: &Path) -> Option<String> {
        let target = self.store.current_target();
        let targets = self.store.texture_targets(target);
        match self.textures.upload_from_path(path, targets, self.scene.loading(), &mut self.events) {
            Ok(name) => {
                self.store.sync_controls(target, &self.textures);
                Some(name)
            }
            Err(err) => {
                log::error!("[viewer] {err}");
                self.events.notice(err.to_string());
                None
            }
        }
    }

    pub fn set_environment(&mut self, name: &str) -> bool {
        let changed = self.environments.set_environment(name, &mut self.scene, &mut self.events);
        if changed {
            self.environment = name.to_string();
        }
        changed
    }

    /// Caps texture and panorama sizes at what the GPU device accepts.
    pub fn set_max_texture_dimension(&mut self, limit: u32) {
        log::info!("[viewer] max texture dimension {limit}px");
        self.textures.set_max_dimension(limit);
        self.environments.set_max_dimension(limit);
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.scene.toggle_theme()
    }

    pub fn set_mesh_visible(&mut self, mesh: MeshKey, visible: bool) -> bool {
        self.store.set_mesh_visible(mesh, visible)
    }

    /// Per-frame step. Returns true while the camera is still easing.
    pub fn update(&mut self) -> bool {
        self.scene.update()
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        self.events.drain()
    }
}
