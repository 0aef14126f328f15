use crate::camera3d::{Camera3D, OrbitControls};
use crate::config::{CameraConfig, Theme};
use crate::environment::EnvironmentMap;
use crate::mesh::{Aabb, MeshKey};
use crate::progress::LoadingIndicator;
use glam::{Vec2, Vec3};
use std::sync::Arc;
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional { position: Vec3 },
    Point { position: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Fixed studio rig: white ambient, two soft key lights and a top point light.
pub fn default_light_rig() -> Vec<Light> {
    let grey = rgb(0x3e3e3e);
    vec![
        Light { kind: LightKind::Ambient, color: [1.0, 1.0, 1.0], intensity: 1.0 },
        Light { kind: LightKind::Directional { position: Vec3::new(5.0, 10.0, 7.5) }, color: grey, intensity: 0.8 },
        Light { kind: LightKind::Directional { position: Vec3::new(-5.0, 10.0, -7.5) }, color: grey, intensity: 0.6 },
        Light { kind: LightKind::Point { position: Vec3::new(0.0, 15.0, 0.0) }, color: grey, intensity: 1.0 },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineSettings {
    pub edge_strength: f32,
    pub edge_thickness: f32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self { edge_strength: 20.0, edge_thickness: 2.0 }
    }
}

/// `0xRRGGBB` to a float triple in 0..1.
pub fn rgb(hex: u32) -> [f32; 3] {
    [((hex >> 16) & 0xff) as f32 / 255.0, ((hex >> 8) & 0xff) as f32 / 255.0, (hex & 0xff) as f32 / 255.0]
}

pub fn clear_color(theme: Theme) -> [f32; 3] {
    match theme {
        Theme::Light => rgb(0xe3e3e3),
        Theme::Dark => rgb(0x303030),
    }
}

pub fn outline_color(theme: Theme) -> [f32; 3] {
    match theme {
        Theme::Light => rgb(0xeda7a7),
        Theme::Dark => rgb(0xffff00),
    }
}

/// Camera placement for a bounding box: offset along (1,1,1) by
/// `scale * max_dimension`, clip planes from the diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub position: Vec3,
    pub target: Vec3,
    pub near: f32,
    pub far: f32,
    pub max_distance: f32,
}

impl Framing {
    const MIN_EXTENT: f32 = 1e-3;

    pub fn for_bounds(bounds: &Aabb, scale: f32) -> Self {
        let center = bounds.center();
        let max_dim = bounds.max_dimension().max(Self::MIN_EXTENT);
        let diagonal = bounds.diagonal().max(Self::MIN_EXTENT);
        Self {
            position: center + Vec3::splat(max_dim * scale),
            target: center,
            near: diagonal / 100.0,
            far: diagonal * 10.0,
            max_distance: diagonal * 10.0,
        }
    }
}

/// Owns everything drawn around a model: camera and controls, theme colours,
/// lights, the outline list and the environment slot. The renderer reads it
/// each frame; the model store and engines mutate it from the UI thread.
pub struct SceneHost {
    pub camera: Camera3D,
    pub controls: OrbitControls,
    pub lights: Vec<Light>,
    pub outline_settings: OutlineSettings,
    theme: Theme,
    outline: Vec<MeshKey>,
    environment: Option<Arc<EnvironmentMap>>,
    attached: Option<usize>,
    viewport: PhysicalSize<u32>,
    framing_scale: f32,
    loading: LoadingIndicator,
}

impl SceneHost {
    pub fn new(camera_config: &CameraConfig, theme: Theme) -> Self {
        let camera = Camera3D::new(
            Vec3::new(3.0, 3.0, 3.0),
            Vec3::ZERO,
            camera_config.fov_degrees.to_radians(),
            0.1,
            1000.0,
        );
        Self {
            camera,
            controls: OrbitControls::new(Vec3::ZERO, camera_config.damping),
            lights: default_light_rig(),
            outline_settings: OutlineSettings::default(),
            theme,
            outline: Vec::new(),
            environment: None,
            attached: None,
            viewport: PhysicalSize::new(1, 1),
            framing_scale: camera_config.framing_scale,
            loading: LoadingIndicator::new(),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        log::info!("[scene] theme {}", self.theme.label());
        self.theme
    }

    pub fn clear_color(&self) -> [f32; 3] {
        clear_color(self.theme)
    }

    pub fn outline_color(&self) -> [f32; 3] {
        outline_color(self.theme)
    }

    pub fn outline(&self) -> &[MeshKey] {
        &self.outline
    }

    pub fn set_outline(&mut self, meshes: Vec<MeshKey>) {
        self.outline = meshes;
    }

    pub fn clear_outline(&mut self) {
        self.outline.clear();
    }

    pub fn environment(&self) -> Option<&Arc<EnvironmentMap>> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, environment: Option<Arc<EnvironmentMap>>) {
        log::info!(
            "[scene] environment {}",
            environment.as_ref().map_or("none", |map| map.name.as_str())
        );
        self.environment = environment;
    }

    /// Index of the model currently in the render graph.
    pub fn attached(&self) -> Option<usize> {
        self.attached
    }

    pub fn attach(&mut self, index: usize) {
        self.attached = Some(index);
    }

    pub fn detach(&mut self) -> Option<usize> {
        self.attached.take()
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.viewport = size;
        }
    }

    /// Places the camera for `bounds` and re-targets the controls.
    pub fn frame_bounds(&mut self, bounds: &Aabb) -> Framing {
        let framing = Framing::for_bounds(bounds, self.framing_scale);
        self.camera.position = framing.position;
        self.camera.target = framing.target;
        self.camera.near = framing.near;
        self.camera.far = framing.far;
        self.controls.target = framing.target;
        self.controls.max_distance = framing.max_distance;
        self.controls.reset_motion();
        log::debug!("[scene] framed {} from {:?}", bounds.dimensions_label(), framing.position);
        framing
    }

    pub fn screen_ray(&self, screen: Vec2) -> Option<(Vec3, Vec3)> {
        self.camera.screen_ray(screen, self.viewport)
    }

    /// Per-frame step: advances control damping. Returns true while the camera moves.
    pub fn update(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> SceneHost {
        SceneHost::new(&CameraConfig::default(), Theme::Light)
    }

    #[test]
    fn framing_offsets_by_one_and_a_half_max_dimension() {
        let mut host = host();
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, -0.5), Vec3::new(1.0, 4.0, 0.5));
        let framing = host.frame_bounds(&bounds);
        assert_eq!(framing.target, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(host.camera.position, Vec3::new(6.0, 8.0, 6.0));
        let diagonal = bounds.diagonal();
        assert!((host.camera.near - diagonal / 100.0).abs() < 1e-6);
        assert!((host.camera.far - diagonal * 10.0).abs() < 1e-4);
        assert_eq!(host.controls.target, framing.target);
    }

    #[test]
    fn degenerate_bounds_still_give_valid_planes() {
        let framing = Framing::for_bounds(&Aabb::EMPTY, 1.5);
        assert!(framing.near > 0.0);
        assert!(framing.far > framing.near);
        assert!(framing.position.is_finite());
    }

    #[test]
    fn theme_colours_follow_toggle() {
        let mut host = host();
        assert_eq!(host.clear_color(), rgb(0xe3e3e3));
        assert_eq!(host.toggle_theme(), Theme::Dark);
        assert_eq!(host.clear_color(), rgb(0x303030));
        assert_eq!(host.outline_color(), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn light_rig_matches_studio_setup() {
        let rig = default_light_rig();
        assert_eq!(rig.len(), 4);
        assert_eq!(rig[0].kind, LightKind::Ambient);
        assert_eq!(rig[1].intensity, 0.8);
        assert_eq!(rig[3].kind, LightKind::Point { position: Vec3::new(0.0, 15.0, 0.0) });
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut host = host();
        host.resize(PhysicalSize::new(800, 600));
        host.resize(PhysicalSize::new(0, 0));
        assert_eq!(host.viewport(), PhysicalSize::new(800, 600));
    }
}
