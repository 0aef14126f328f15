use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/viewer.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
    #[serde(default = "WindowConfig::default_vsync")]
    pub vsync: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "AssetConfig::default_textures_dir")]
    pub textures_dir: PathBuf,
    #[serde(default = "AssetConfig::default_texture_extension")]
    pub texture_extension: String,
    #[serde(default = "AssetConfig::default_environments_dir")]
    pub environments_dir: PathBuf,
    #[serde(default = "AssetConfig::default_uploaded_prefix")]
    pub uploaded_texture_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    /// Camera offset along each axis, in multiples of the largest model dimension.
    #[serde(default = "CameraConfig::default_framing_scale")]
    pub framing_scale: f32,
    #[serde(default = "CameraConfig::default_damping")]
    pub damping: f32,
}

/// `None` means unbounded; otherwise least-recently-used entries are evicted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub texture_limit: Option<usize>,
    #[serde(default)]
    pub environment_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug, Clone, Default)]
pub struct ViewerConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
    pub theme: Option<Theme>,
}

impl WindowConfig {
    fn default_title() -> String {
        "FBX Viewer".to_string()
    }

    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }

    const fn default_vsync() -> bool {
        true
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            width: Self::default_width(),
            height: Self::default_height(),
            vsync: Self::default_vsync(),
        }
    }
}

impl AssetConfig {
    fn default_textures_dir() -> PathBuf {
        PathBuf::from("assets/textures")
    }

    fn default_texture_extension() -> String {
        "png".to_string()
    }

    fn default_environments_dir() -> PathBuf {
        PathBuf::from("assets/textures/equirectangular")
    }

    fn default_uploaded_prefix() -> String {
        "uploaded-texture-".to_string()
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            textures_dir: Self::default_textures_dir(),
            texture_extension: Self::default_texture_extension(),
            environments_dir: Self::default_environments_dir(),
            uploaded_texture_prefix: Self::default_uploaded_prefix(),
        }
    }
}

impl CameraConfig {
    const fn default_fov_degrees() -> f32 {
        45.0
    }

    const fn default_framing_scale() -> f32 {
        1.5
    }

    const fn default_damping() -> f32 {
        0.1
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            framing_scale: Self::default_framing_scale(),
            damping: Self::default_damping(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("[config] {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] {err:#}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ViewerConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
        if let Some(theme) = overrides.theme {
            self.theme = theme;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        write!(file, r#"{{ "theme": "dark", "cache": {{ "texture_limit": 8 }}, "window": {{ "width": 800 }} }}"#)
            .expect("write config");
        let cfg = ViewerConfig::load(file.path()).expect("parse config");
        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.cache.texture_limit, Some(8));
        assert_eq!(cfg.cache.environment_limit, None);
        assert_eq!(cfg.window.width, 800);
        assert_eq!(cfg.window.height, 720);
        assert_eq!(cfg.camera.framing_scale, 1.5);
        assert_eq!(cfg.assets.texture_extension, "png");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        write!(file, "not json").expect("write config");
        let cfg = ViewerConfig::load_or_default(file.path());
        assert_eq!(cfg.theme, Theme::Light);
        assert_eq!(cfg.window.title, "FBX Viewer");
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut cfg = ViewerConfig::default();
        cfg.apply_overrides(&ViewerConfigOverrides { height: Some(900), theme: Some(Theme::Dark), ..Default::default() });
        assert_eq!(cfg.window.width, 1280);
        assert_eq!(cfg.window.height, 900);
        assert_eq!(cfg.theme, Theme::Dark);
    }
}
