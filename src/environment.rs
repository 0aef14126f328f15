use crate::cache::AssetCache;
use crate::config::{AssetConfig, CacheConfig};
use crate::error::ViewerError;
use crate::events::{EventBus, ViewerEvent};
use crate::material::{check_texture_size, DEFAULT_MAX_TEXTURE_DIMENSION};
use crate::progress::{read_with_progress, LoadingIndicator};
use crate::scene_host::SceneHost;
use anyhow::{Context, Result};
use half::f16;
use image::{DynamicImage, ImageReader};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Selector value that clears the scene environment.
pub const NO_ENVIRONMENT: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvironmentMapping {
    #[default]
    EquirectangularReflection,
}

/// Decoded HDR panorama, linear RGBA32F rows top to bottom.
#[derive(Debug)]
pub struct EnvironmentMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
    pub mapping: EnvironmentMapping,
}

impl EnvironmentMap {
    pub fn from_dynamic(name: impl Into<String>, image: &DynamicImage) -> Self {
        let rgba = image.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|pixel| pixel.0).collect();
        Self { name: name.into(), width, height, pixels, mapping: EnvironmentMapping::EquirectangularReflection }
    }

    /// Half-float texels for an `Rgba16Float` upload.
    pub fn to_f16_bits(&self) -> Vec<u16> {
        self.pixels.iter().flatten().map(|value| f16::from_f32(*value).to_bits()).collect()
    }
}

pub struct EnvironmentLoader {
    base_dir: PathBuf,
    cache: AssetCache<Arc<EnvironmentMap>>,
    max_dimension: u32,
}

impl EnvironmentLoader {
    pub fn new(base_dir: impl Into<PathBuf>, cache_limit: Option<usize>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: AssetCache::new(cache_limit),
            max_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
        }
    }

    pub fn set_max_dimension(&mut self, limit: u32) {
        self.max_dimension = limit;
    }

    pub fn from_config(assets: &AssetConfig, cache: &CacheConfig) -> Self {
        Self::new(assets.environments_dir.clone(), cache.environment_limit)
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Selector entries: `none` followed by the `.hdr` files of the base directory.
    pub fn catalogue(&self) -> Result<Vec<String>> {
        let mut names = vec![NO_ENVIRONMENT.to_string()];
        if !self.base_dir.exists() {
            return Ok(names);
        }
        let entries = fs::read_dir(&self.base_dir)
            .with_context(|| format!("reading environment directory '{}'", self.base_dir.display()))?;
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() || !is_hdr_file(&entry.path()) {
                continue;
            }
            found.push(entry.file_name().to_string_lossy().into_owned());
        }
        found.sort();
        names.extend(found);
        Ok(names)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    /// Returns the cached map or reads and decodes `{base_dir}/{name}`,
    /// reporting progress to `indicator` while reading.
    pub fn load(&mut self, name: &str, indicator: &LoadingIndicator) -> Result<Arc<EnvironmentMap>, ViewerError> {
        if let Some(map) = self.cache.get(name) {
            log::info!("[environment] '{name}' served from cache");
            return Ok(map);
        }
        let path = self.path_for(name);
        let guard = indicator.begin();
        let bytes = read_with_progress(&path, |percent| guard.report(percent))?;
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| ViewerError::decode(&path, err))?
            .decode()
            .map_err(|err| ViewerError::decode(&path, err))?;
        check_texture_size(image.width(), image.height(), self.max_dimension)
            .map_err(|err| ViewerError::decode(&path, err))?;
        let map = Arc::new(EnvironmentMap::from_dynamic(name, &image));
        log::info!("[environment] loaded '{name}' ({}x{})", map.width, map.height);
        if let Some(evicted) = self.cache.insert(name, map.clone()) {
            log::debug!("[environment] evicted '{evicted}' from cache");
        }
        Ok(map)
    }

    /// Assigns the named environment to the scene, or clears it for `none`.
    /// Failures leave the current environment in place and raise a notice.
    pub fn set_environment(&mut self, name: &str, scene: &mut SceneHost, events: &mut EventBus) -> bool {
        if name == NO_ENVIRONMENT {
            scene.set_environment(None);
            events.push(ViewerEvent::EnvironmentChanged { name: None });
            return true;
        }
        let indicator = scene.loading().clone();
        match self.load(name, &indicator) {
            Ok(map) => {
                scene.set_environment(Some(map));
                events.push(ViewerEvent::EnvironmentChanged { name: Some(name.to_string()) });
                true
            }
            Err(err) => {
                log::error!("[environment] {err}");
                events.notice(format!("Failed to load HDRI '{name}'. Check the file format and path. ({err})"));
                false
            }
        }
    }
}

fn is_hdr_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("hdr"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, Theme};
    use image::{ImageFormat, Rgb32FImage};

    fn write_hdr(dir: &Path, name: &str) {
        write_hdr_sized(dir, name, 4, 2);
    }

    fn write_hdr_sized(dir: &Path, name: &str, width: u32, height: u32) {
        let image = Rgb32FImage::from_pixel(width, height, image::Rgb([2.0, 0.5, 0.25]));
        DynamicImage::ImageRgb32F(image).save_with_format(dir.join(name), ImageFormat::Hdr).expect("write hdr");
    }

    #[test]
    fn catalogue_lists_none_first_then_sorted_hdr_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_hdr(dir.path(), "studio.hdr");
        write_hdr(dir.path(), "forest.hdr");
        fs::write(dir.path().join("notes.txt"), "ignore").expect("write");
        let loader = EnvironmentLoader::new(dir.path(), None);
        assert_eq!(loader.catalogue().expect("catalogue"), vec!["none", "forest.hdr", "studio.hdr"]);
    }

    #[test]
    fn missing_directory_still_offers_none() {
        let loader = EnvironmentLoader::new("does/not/exist", None);
        assert_eq!(loader.catalogue().expect("catalogue"), vec!["none"]);
    }

    #[test]
    fn load_decodes_and_caches() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_hdr(dir.path(), "studio.hdr");
        let mut loader = EnvironmentLoader::new(dir.path(), None);
        let indicator = LoadingIndicator::new();
        let map = loader.load("studio.hdr", &indicator).expect("load hdr");
        assert_eq!((map.width, map.height), (4, 2));
        assert_eq!(map.mapping, EnvironmentMapping::EquirectangularReflection);
        assert!((map.pixels[0][0] - 2.0).abs() < 0.05);
        assert!(!indicator.snapshot().visible);
        assert!(loader.is_cached("studio.hdr"));
        let again = loader.load("studio.hdr", &indicator).expect("cached");
        assert!(Arc::ptr_eq(&map, &again));
    }

    #[test]
    fn half_float_upload_has_four_channels_per_texel() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_hdr(dir.path(), "studio.hdr");
        let mut loader = EnvironmentLoader::new(dir.path(), None);
        let map = loader.load("studio.hdr", &LoadingIndicator::new()).expect("load hdr");
        assert_eq!(map.to_f16_bits().len(), 4 * 2 * 4);
    }

    #[test]
    fn missing_file_is_an_asset_fetch_error() {
        let mut loader = EnvironmentLoader::new("does/not/exist", None);
        let indicator = LoadingIndicator::new();
        let err = loader.load("studio.hdr", &indicator).unwrap_err();
        assert!(matches!(err, ViewerError::AssetFetch { .. }));
        assert!(!indicator.snapshot().visible);
    }

    #[test]
    fn oversized_panorama_keeps_current_environment() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_hdr(dir.path(), "studio.hdr");
        write_hdr_sized(dir.path(), "sky.hdr", 16, 8);
        let mut loader = EnvironmentLoader::new(dir.path(), None);
        loader.set_max_dimension(4);
        let mut scene = SceneHost::new(&CameraConfig::default(), Theme::Light);
        let mut events = EventBus::default();
        assert!(loader.set_environment("studio.hdr", &mut scene, &mut events));
        events.drain();

        assert!(!loader.set_environment("sky.hdr", &mut scene, &mut events));
        assert_eq!(scene.environment().map(|map| map.name.as_str()), Some("studio.hdr"));
        assert!(!loader.is_cached("sky.hdr"));
        let drained = events.drain();
        assert_eq!(drained.len(), 1);
        let ViewerEvent::Notice { message } = &drained[0] else {
            panic!("expected a notice, got {drained:?}");
        };
        assert!(message.contains("16x8 exceeds the 4px texture limit"), "{message}");
    }
}
