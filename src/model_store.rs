use crate::events::{EventBus, ViewerEvent};
use crate::material::MaterialSlots;
use crate::mesh::{MeshKey, Model};
use crate::scene_host::SceneHost;
use crate::texture::{MaterialTargets, TextureEngine, DEFAULT_TEXTURE, DEFAULT_TILING};
use glam::Vec2;
use std::collections::HashMap;

/// Load-time materials per mesh, written once on insert and only read afterwards.
pub type MaterialBackups = HashMap<MeshKey, MaterialSlots>;

/// Which meshes a texture or tiling operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    Mesh(MeshKey),
    ActiveModel,
}

/// Values shown by the texture selector and tiling control.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    /// `None` means no texture is selected in the selector.
    pub texture: Option<String>,
    pub tiling: f32,
}

impl ControlState {
    pub fn defaults() -> Self {
        Self { texture: Some(DEFAULT_TEXTURE.to_string()), tiling: DEFAULT_TILING }
    }

    pub fn cleared() -> Self {
        Self { texture: None, tiling: DEFAULT_TILING }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoPanel {
    pub name: String,
    pub dimensions: String,
}

pub struct ModelStore {
    models: Vec<Model>,
    active: Option<usize>,
    backups: MaterialBackups,
    selected: Option<MeshKey>,
    controls: ControlState,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelStore {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            active: None,
            backups: MaterialBackups::new(),
            selected: None,
            controls: ControlState::defaults(),
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_model(&self) -> Option<&Model> {
        self.active.and_then(|index| self.models.get(index))
    }

    pub fn selected(&self) -> Option<MeshKey> {
        self.selected
    }

    pub fn controls(&self) -> &ControlState {
        &self.controls
    }

    pub fn backup(&self, mesh: MeshKey) -> Option<&MaterialSlots> {
        self.backups.get(&mesh)
    }

    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }

    /// Selected mesh if any, otherwise every mesh of the active model.
    pub fn current_target(&self) -> TextureTarget {
        self.selected.map_or(TextureTarget::ActiveModel, TextureTarget::Mesh)
    }

    /// Adds a parsed model, snapshots its materials, makes it active and frames it.
    pub fn insert(
        &mut self,
        mut model: Model,
        display_name: &str,
        scene: &mut SceneHost,
        textures: &mut TextureEngine,
        events: &mut EventBus,
    ) -> usize {
        model.name = display_name.to_string();
        for mesh in &mut model.meshes {
            for material in mesh.materials.iter_mut() {
                material.emissive = [0.0; 3];
                if let Some(map) = material.map.as_mut() {
                    map.repeat = Vec2::ONE;
                }
                material.mark_dirty();
            }
            self.backups.insert(mesh.key, mesh.materials.clone());
        }
        let bounds = model.recompute_bounds();
        textures.reset_for_model(model.meshes.iter().map(|mesh| mesh.key));

        scene.detach();
        self.models.push(model);
        let index = self.models.len() - 1;
        self.active = Some(index);
        scene.attach(index);
        scene.frame_bounds(&bounds);
        self.clear_selection(scene, ControlState::defaults(), events);

        log::info!("[models] inserted '{display_name}' at {index} ({})", bounds.dimensions_label());
        events.push(ViewerEvent::ModelInserted { index, name: display_name.to_string() });
        events.push(ViewerEvent::ActiveModelChanged { index: Some(index) });
        index
    }

    /// Makes `index` the active model. Out-of-range indices are ignored.
    pub fn switch_to(&mut self, index: usize, scene: &mut SceneHost, events: &mut EventBus) -> bool {
        let Some(model) = self.models.get(index) else {
            return false;
        };
        let bounds = model.bounds();
        log::info!("[models] switching to {index} '{}'", model.name);
        scene.detach();
        scene.attach(index);
        self.active = Some(index);
        self.clear_selection(scene, ControlState::defaults(), events);
        scene.frame_bounds(&bounds);
        events.push(ViewerEvent::ActiveModelChanged { index: Some(index) });
        true
    }

    /// Drops the model at `index` along with its backups and texture state.
    /// Out-of-range indices are ignored.
    pub fn remove(
        &mut self,
        index: usize,
        scene: &mut SceneHost,
        textures: &mut TextureEngine,
        events: &mut EventBus,
    ) -> Option<Model> {
        if index >= self.models.len() {
            return None;
        }
        let model = self.models.remove(index);
        let keys: Vec<MeshKey> = model.meshes.iter().map(|mesh| mesh.key).collect();
        for key in &keys {
            self.backups.remove(key);
        }
        textures.forget(keys.iter().copied());
        if self.selected.is_some_and(|selected| keys.contains(&selected)) {
            self.clear_selection(scene, ControlState::defaults(), events);
        }

        match self.active {
            Some(active) if active == index => {
                scene.detach();
                self.active = None;
                events.push(ViewerEvent::ActiveModelChanged { index: None });
            }
            Some(active) if active > index => {
                self.active = Some(active - 1);
                scene.attach(active - 1);
            }
            _ => {}
        }
        log::info!("[models] removed '{}' from {index}", model.name);
        events.push(ViewerEvent::ModelRemoved { index });
        Some(model)
    }

    /// Ray-casts the active model at a viewport position. A hit selects the
    /// nearest visible mesh; a miss clears the selection.
    pub fn select_at(
        &mut self,
        screen: Vec2,
        scene: &mut SceneHost,
        textures: &TextureEngine,
        events: &mut EventBus,
    ) -> Option<MeshKey> {
        let model = self.active_model()?;
        let hit = scene.screen_ray(screen).and_then(|(origin, dir)| model.raycast(origin, dir).first().copied());
        match hit {
            Some(hit) => {
                self.mark_selected(hit.mesh, scene, textures, events);
                Some(hit.mesh)
            }
            None => {
                self.clear_selection(scene, ControlState::cleared(), events);
                None
            }
        }
    }

    /// Selects a mesh of the active model directly (mesh list click).
    pub fn select_mesh(
        &mut self,
        mesh: MeshKey,
        scene: &mut SceneHost,
        textures: &TextureEngine,
        events: &mut EventBus,
    ) -> bool {
        if !self.active_model().is_some_and(|model| model.contains(mesh)) {
            return false;
        }
        self.mark_selected(mesh, scene, textures, events);
        true
    }

    fn mark_selected(
        &mut self,
        mesh: MeshKey,
        scene: &mut SceneHost,
        textures: &TextureEngine,
        events: &mut EventBus,
    ) {
        let previous = self.selected.replace(mesh);
        if let Some(model) = self.active.and_then(|index| self.models.get_mut(index)) {
            for key in previous.into_iter().chain(Some(mesh)) {
                if let Some(node) = model.mesh_mut(key) {
                    clear_emissive(&mut node.materials);
                }
            }
        }
        scene.set_outline(vec![mesh]);
        self.controls = ControlState {
            texture: Some(textures.texture_for(mesh).unwrap_or(DEFAULT_TEXTURE).to_string()),
            tiling: textures.tiling_for(mesh),
        };
        events.push(ViewerEvent::SelectionChanged { mesh: Some(mesh) });
    }

    fn clear_selection(&mut self, scene: &mut SceneHost, controls: ControlState, events: &mut EventBus) {
        scene.clear_outline();
        self.controls = controls;
        if self.selected.take().is_some() {
            events.push(ViewerEvent::SelectionChanged { mesh: None });
        }
    }

    /// Borrows the targeted meshes of the active model with the backups.
    /// Empty when there is no active model or the mesh is not part of it.
    pub fn texture_targets(&mut self, target: TextureTarget) -> MaterialTargets<'_> {
        let backups = &self.backups;
        let meshes = match self.active.and_then(|index| self.models.get_mut(index)) {
            Some(model) => match target {
                TextureTarget::Mesh(key) => model.meshes.iter_mut().filter(|mesh| mesh.key == key).collect(),
                TextureTarget::ActiveModel => model.meshes.iter_mut().collect(),
            },
            None => Vec::new(),
        };
        MaterialTargets { meshes, backups }
    }

    /// Keeps the selector and tiling display in step with an edit on `target`.
    pub fn sync_controls(&mut self, target: TextureTarget, textures: &TextureEngine) {
        let key = match target {
            TextureTarget::Mesh(key) => Some(key),
            TextureTarget::ActiveModel => {
                self.active_model().and_then(|model| model.meshes.first()).map(|mesh| mesh.key)
            }
        };
        if let Some(key) = key {
            self.controls = ControlState {
                texture: Some(textures.texture_for(key).unwrap_or(DEFAULT_TEXTURE).to_string()),
                tiling: textures.tiling_for(key),
            };
        }
    }

    pub fn set_mesh_visible(&mut self, mesh: MeshKey, visible: bool) -> bool {
        let Some(node) = self.active.and_then(|index| self.models.get_mut(index)).and_then(|m| m.mesh_mut(mesh))
        else {
            return false;
        };
        node.visible = visible;
        true
    }

    /// Selected mesh name and size, else the active model's; empty without a model.
    pub fn info(&self) -> InfoPanel {
        let Some(model) = self.active_model() else {
            return InfoPanel::default();
        };
        match self.selected.and_then(|key| model.mesh(key)) {
            Some(mesh) => InfoPanel { name: mesh.name.clone(), dimensions: mesh.bounds().dimensions_label() },
            None => InfoPanel {
                name: format!("Model: {}", model.name),
                dimensions: model.bounds().dimensions_label(),
            },
        }
    }
}

fn clear_emissive(materials: &mut MaterialSlots) {
    for material in materials.iter_mut() {
        if material.emissive != [0.0; 3] {
            material.emissive = [0.0; 3];
            material.mark_dirty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetConfig, CacheConfig, CameraConfig, Theme};
    use crate::material::Material;
    use crate::mesh::{MeshGeometry, MeshNode};
    use glam::Vec3;
    use winit::dpi::PhysicalSize;

    struct Fixture {
        store: ModelStore,
        scene: SceneHost,
        textures: TextureEngine,
        events: EventBus,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneHost::new(&CameraConfig::default(), Theme::Light);
        scene.resize(PhysicalSize::new(800, 600));
        Fixture {
            store: ModelStore::new(),
            scene,
            textures: TextureEngine::new(&AssetConfig::default(), &CacheConfig::default()),
            events: EventBus::default(),
        }
    }

    fn glowing_box(name: &str) -> MeshNode {
        let material = Material::new("glow").with_emissive([1.0, 0.0, 0.0]);
        MeshNode::new(
            name,
            MeshGeometry::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5)),
            MaterialSlots::from_elem(material, 1),
        )
    }

    fn insert(f: &mut Fixture, name: &str) -> usize {
        let model = Model::from_meshes("parsed", vec![glowing_box("body")]);
        f.store.insert(model, name, &mut f.scene, &mut f.textures, &mut f.events)
    }

    #[test]
    fn insert_zeroes_emissive_and_snapshots_backup() {
        let mut f = fixture();
        let index = insert(&mut f, "chair.fbx");
        let model = f.store.model(index).expect("model");
        let mesh = &model.meshes[0];
        assert_eq!(model.name, "chair.fbx");
        assert_eq!(mesh.materials[0].emissive, [0.0; 3]);
        assert_eq!(f.store.backup(mesh.key), Some(&mesh.materials));
        assert_eq!(f.scene.attached(), Some(index));
        assert_eq!(f.store.controls(), &ControlState::defaults());
    }

    #[test]
    fn centre_click_selects_and_empty_click_clears() {
        let mut f = fixture();
        insert(&mut f, "chair.fbx");
        let key = f.store.active_model().expect("active").meshes[0].key;
        let centre = Vec2::new(400.0, 300.0);
        assert_eq!(f.store.select_at(centre, &mut f.scene, &f.textures, &mut f.events), Some(key));
        assert_eq!(f.scene.outline(), &[key]);
        assert_eq!(f.store.info().name, "body");

        assert_eq!(f.store.select_at(Vec2::new(1.0, 1.0), &mut f.scene, &f.textures, &mut f.events), None);
        assert!(f.scene.outline().is_empty());
        assert_eq!(f.store.controls(), &ControlState::cleared());
        assert_eq!(f.store.info().name, "Model: chair.fbx");
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut f = fixture();
        insert(&mut f, "a.fbx");
        assert!(!f.store.switch_to(3, &mut f.scene, &mut f.events));
        assert!(f.store.remove(3, &mut f.scene, &mut f.textures, &mut f.events).is_none());
        assert_eq!(f.store.len(), 1);
        assert_eq!(f.store.active_index(), Some(0));
    }

    #[test]
    fn removing_before_active_shifts_the_active_index() {
        let mut f = fixture();
        insert(&mut f, "a.fbx");
        insert(&mut f, "b.fbx");
        let removed = f.store.remove(0, &mut f.scene, &mut f.textures, &mut f.events).expect("removed");
        assert_eq!(removed.name, "a.fbx");
        assert_eq!(f.store.active_index(), Some(0));
        assert_eq!(f.scene.attached(), Some(0));
        assert_eq!(f.store.backup_count(), 1);
    }

    #[test]
    fn hidden_mesh_cannot_be_clicked() {
        let mut f = fixture();
        insert(&mut f, "a.fbx");
        let key = f.store.active_model().expect("active").meshes[0].key;
        assert!(f.store.set_mesh_visible(key, false));
        assert_eq!(f.store.select_at(Vec2::new(400.0, 300.0), &mut f.scene, &f.textures, &mut f.events), None);
    }

    #[test]
    fn info_is_empty_without_models() {
        assert_eq!(ModelStore::new().info(), InfoPanel::default());
    }
}
