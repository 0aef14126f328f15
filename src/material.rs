use glam::Vec2;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest side every wgpu backend accepts; replaced by the device limit once
/// the renderer is up.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Decoded RGBA8 pixels shared between every texture map cloned from the same source.
#[derive(Debug)]
pub struct TextureImage {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    pub fn new(label: impl Into<String>, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self { label: label.into(), width, height, rgba }
    }

    pub fn from_dynamic(label: impl Into<String>, image: image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(label, width, height, rgba.into_raw())
    }

    /// Decodes an encoded image (PNG/JPEG) from memory.
    pub fn decode(label: impl Into<String>, bytes: &[u8]) -> image::ImageResult<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(label, image))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{width}x{height} exceeds the {limit}px texture limit")]
pub struct TextureTooLarge {
    pub width: u32,
    pub height: u32,
    pub limit: u32,
}

/// Rejects images that would not fit in a single 2D GPU texture.
pub fn check_texture_size(width: u32, height: u32, limit: u32) -> Result<(), TextureTooLarge> {
    if width > limit || height > limit {
        return Err(TextureTooLarge { width, height, limit });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// A per-mesh instance of a texture: the pixels are shared, repeat and wrap are not.
#[derive(Debug, Clone)]
pub struct TextureMap {
    pub name: String,
    pub image: Arc<TextureImage>,
    pub repeat: Vec2,
    pub wrap: WrapMode,
}

impl TextureMap {
    pub fn new(name: impl Into<String>, image: Arc<TextureImage>) -> Self {
        Self { name: name.into(), image, repeat: Vec2::ONE, wrap: WrapMode::default() }
    }
}

impl PartialEq for TextureMap {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && Arc::ptr_eq(&self.image, &other.image)
            && self.repeat == other.repeat
            && self.wrap == other.wrap
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub label: String,
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub map: Option<TextureMap>,
    revision: u64,
}

impl Material {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), base_color: [1.0; 4], emissive: [0.0; 3], map: None, revision: next_revision() }
    }

    pub fn with_base_color(mut self, color: [f32; 4]) -> Self {
        self.base_color = color;
        self
    }

    pub fn with_emissive(mut self, emissive: [f32; 3]) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn with_map(mut self, map: TextureMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Process-wide unique stamp, replaced whenever GPU-visible state changes.
    /// The renderer re-uploads on mismatch, so a restored clone never aliases
    /// the stamp of the material it replaces.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn mark_dirty(&mut self) {
        self.revision = next_revision();
    }
}

/// Revision is bookkeeping and does not take part in comparison.
impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.base_color == other.base_color
            && self.emissive == other.emissive
            && self.map == other.map
    }
}

/// Most meshes carry one material; multi-material meshes spill to the heap.
pub type MaterialSlots = SmallVec<[Material; 1]>;
