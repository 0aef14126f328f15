use crate::cache::AssetCache;
use crate::config::{AssetConfig, CacheConfig};
use crate::error::ViewerError;
use crate::events::{EventBus, ViewerEvent};
use crate::material::{
    check_texture_size, Material, MaterialSlots, TextureImage, TextureMap, WrapMode, DEFAULT_MAX_TEXTURE_DIMENSION,
};
use crate::mesh::{MeshKey, MeshNode};
use crate::model_store::MaterialBackups;
use crate::progress::{read_with_progress, LoadingIndicator};
use anyhow::{Context, Result};
use glam::Vec2;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Selector value that restores the load-time material.
pub const DEFAULT_TEXTURE: &str = "default";
pub const DEFAULT_TILING: f32 = 1.0;

/// The meshes an operation touches, borrowed from the model store together
/// with the load-time backups needed to restore them.
pub struct MaterialTargets<'a> {
    pub meshes: Vec<&'a mut MeshNode>,
    pub backups: &'a MaterialBackups,
}

#[derive(Debug, Clone)]
pub enum TextureSource {
    Default,
    Image(Arc<TextureImage>),
    /// Uploaded handle that is not (or no longer) registered.
    Missing,
}

#[derive(Debug, Clone)]
pub struct UploadedTexture {
    pub name: String,
    /// Original file name, shown in the selector.
    pub label: String,
    pub image: Arc<TextureImage>,
}

pub struct TextureEngine {
    textures_dir: PathBuf,
    extension: String,
    uploaded_prefix: String,
    assignments: HashMap<MeshKey, String>,
    tiling: HashMap<MeshKey, f32>,
    cache: AssetCache<Arc<TextureImage>>,
    uploaded: Vec<UploadedTexture>,
    max_dimension: u32,
}

impl TextureEngine {
    pub fn new(assets: &AssetConfig, cache: &CacheConfig) -> Self {
        Self {
            textures_dir: assets.textures_dir.clone(),
            extension: assets.texture_extension.clone(),
            uploaded_prefix: assets.uploaded_texture_prefix.clone(),
            assignments: HashMap::new(),
            tiling: HashMap::new(),
            cache: AssetCache::new(cache.texture_limit),
            uploaded: Vec::new(),
            max_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
        }
    }

    /// Images with a side above `limit` are rejected before they reach a material.
    pub fn set_max_dimension(&mut self, limit: u32) {
        self.max_dimension = limit;
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.textures_dir.join(format!("{name}.{}", self.extension))
    }

    /// Named textures available on disk (file stems), sorted.
    pub fn catalogue(&self) -> Result<Vec<String>> {
        if !self.textures_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.textures_dir)
            .with_context(|| format!("reading texture directory '{}'", self.textures_dir.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || !has_extension(&path, &self.extension) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn uploaded(&self) -> &[UploadedTexture] {
        &self.uploaded
    }

    pub fn is_uploaded_name(&self, name: &str) -> bool {
        name.starts_with(&self.uploaded_prefix)
    }

    pub fn texture_for(&self, mesh: MeshKey) -> Option<&str> {
        self.assignments.get(&mesh).map(String::as_str)
    }

    pub fn tiling_for(&self, mesh: MeshKey) -> f32 {
        self.tiling.get(&mesh).copied().unwrap_or(DEFAULT_TILING)
    }

    /// Maps a selector value to pixels, reading `{textures_dir}/{name}.{ext}`
    /// on a cache miss.
    pub fn resolve(&mut self, name: &str, indicator: &LoadingIndicator) -> Result<TextureSource, ViewerError> {
        if name == DEFAULT_TEXTURE {
            return Ok(TextureSource::Default);
        }
        if self.is_uploaded_name(name) {
            return Ok(self
                .uploaded
                .iter()
                .find(|texture| texture.name == name)
                .map_or(TextureSource::Missing, |texture| TextureSource::Image(texture.image.clone())));
        }
        if let Some(image) = self.cache.get(name) {
            log::debug!("[texture] '{name}' served from cache");
            return Ok(TextureSource::Image(image));
        }
        let path = self.path_for(name);
        let guard = indicator.begin();
        let bytes = read_with_progress(&path, |percent| guard.report(percent))?;
        let image = TextureImage::decode(name, &bytes).map_err(|err| ViewerError::decode(&path, err))?;
        check_texture_size(image.width, image.height, self.max_dimension)
            .map_err(|err| ViewerError::decode(&path, err))?;
        let image = Arc::new(image);
        log::info!("[texture] loaded '{name}' ({}x{})", image.width, image.height);
        if let Some(evicted) = self.cache.insert(name, image.clone()) {
            log::debug!("[texture] evicted '{evicted}' from cache");
        }
        Ok(TextureSource::Image(image))
    }

    /// Applies a selector value to `targets`. Load failures are logged and
    /// reported as a notice; the meshes keep their current material.
    pub fn apply(
        &mut self,
        name: &str,
        targets: MaterialTargets<'_>,
        indicator: &LoadingIndicator,
        events: &mut EventBus,
    ) -> bool {
        match self.resolve(name, indicator) {
            Ok(TextureSource::Default) => {
                self.restore_default(targets, events);
                true
            }
            Ok(TextureSource::Image(image)) => {
                self.apply_image(name, image, targets, events);
                true
            }
            Ok(TextureSource::Missing) => {
                log::warn!("[texture] uploaded texture '{name}' is not registered");
                false
            }
            Err(err) => {
                log::error!("[texture] {err}");
                events.notice(format!("Failed to load texture '{name}'. ({err})"));
                false
            }
        }
    }

    fn apply_image(
        &mut self,
        name: &str,
        image: Arc<TextureImage>,
        targets: MaterialTargets<'_>,
        events: &mut EventBus,
    ) {
        for mesh in targets.meshes {
            for material in mesh.materials.iter_mut() {
                material.map = Some(TextureMap::new(name, image.clone()));
                material.mark_dirty();
            }
            self.assignments.insert(mesh.key, name.to_string());
            let factor = self.tiling_for(mesh.key);
            self.apply_tiling(mesh, factor);
            events.push(ViewerEvent::TextureApplied { mesh: mesh.key, texture: Some(name.to_string()) });
        }
    }

    fn restore_default(&mut self, targets: MaterialTargets<'_>, events: &mut EventBus) {
        for mesh in targets.meshes {
            let mut restored = targets
                .backups
                .get(&mesh.key)
                .cloned()
                .unwrap_or_else(|| MaterialSlots::from_elem(Material::new(DEFAULT_TEXTURE), 1));
            for material in restored.iter_mut() {
                material.mark_dirty();
            }
            mesh.materials = restored;
            self.assignments.remove(&mesh.key);
            events.push(ViewerEvent::TextureApplied { mesh: mesh.key, texture: None });
        }
    }

    /// Records `factor` per mesh and applies it to any texture map present.
    /// Non-positive or non-finite factors are ignored.
    pub fn set_tiling(&mut self, factor: f32, targets: MaterialTargets<'_>, events: &mut EventBus) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            log::debug!("[texture] ignoring tiling factor {factor}");
            return false;
        }
        for mesh in targets.meshes {
            self.tiling.insert(mesh.key, factor);
            self.apply_tiling(mesh, factor);
        }
        events.push(ViewerEvent::TilingChanged { factor });
        true
    }

    fn apply_tiling(&self, mesh: &mut MeshNode, factor: f32) {
        for material in mesh.materials.iter_mut() {
            if let Some(map) = material.map.as_mut() {
                map.repeat = Vec2::splat(factor);
                map.wrap = WrapMode::Repeat;
                material.mark_dirty();
            }
        }
    }

    /// Decodes user-supplied image bytes, registers them under a fresh
    /// `{prefix}{timestamp}` name and applies the result to `targets`.
    pub fn upload_as_texture(
        &mut self,
        label: &str,
        bytes: &[u8],
        targets: MaterialTargets<'_>,
        events: &mut EventBus,
    ) -> Result<String, ViewerError> {
        let name = self.unique_upload_name();
        let image = TextureImage::decode(label, bytes).map_err(|err| ViewerError::decode(label, err))?;
        check_texture_size(image.width, image.height, self.max_dimension)
            .map_err(|err| ViewerError::decode(label, err))?;
        let image = Arc::new(image);
        log::info!("[texture] uploaded '{label}' as '{name}' ({}x{})", image.width, image.height);
        self.uploaded.push(UploadedTexture { name: name.clone(), label: label.to_string(), image: image.clone() });
        self.apply_image(&name, image, targets, events);
        Ok(name)
    }

    pub fn upload_from_path(
        &mut self,
        path: &Path,
        targets: MaterialTargets<'_>,
        indicator: &LoadingIndicator,
        events: &mut EventBus,
    ) -> Result<String, ViewerError> {
        let bytes = {
            let guard = indicator.begin();
            read_with_progress(path, |percent| guard.report(percent))?
        };
        let label = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.upload_as_texture(&label, &bytes, targets, events)
    }

    fn unique_upload_name(&self) -> String {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis());
        let base = format!("{}{millis}", self.uploaded_prefix);
        if !self.uploaded.iter().any(|texture| texture.name == base) {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{base}-{suffix}");
            if !self.uploaded.iter().any(|texture| texture.name == candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Fresh model: no assignments and tiling back to 1 for every mesh.
    pub fn reset_for_model(&mut self, meshes: impl IntoIterator<Item = MeshKey>) {
        for key in meshes {
            self.assignments.remove(&key);
            self.tiling.insert(key, DEFAULT_TILING);
        }
    }

    /// Drops side-table entries of meshes that no longer exist.
    pub fn forget(&mut self, meshes: impl IntoIterator<Item = MeshKey>) {
        for key in meshes {
            self.assignments.remove(&key);
            self.tiling.remove(&key);
        }
    }

    pub fn tracked_meshes(&self) -> usize {
        self.tiling.len().max(self.assignments.len())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
