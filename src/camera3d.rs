use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera used by the viewport and for pick rays.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, viewport: PhysicalSize<u32>) -> Mat4 {
        let aspect = if viewport.height > 0 { viewport.width as f32 / viewport.height as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Generates a world-space ray originating from the camera through a screen-space position.
    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let ndc_x = (2.0 * screen.x / viewport.width as f32) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y / viewport.height as f32);
        let inv_view_proj = self.view_projection(viewport).inverse();
        let far = inv_view_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        if far.w.abs() < f32::EPSILON {
            return None;
        }
        let dir = ((far.truncate() / far.w) - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        Some((self.position, dir))
    }
}

/// Orbit controls with exponential damping, modelled on the usual viewer
/// behaviour: drag orbits around `target`, wheel dollies, motion eases out.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub max_distance: f32,
    pub damping: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
}

impl OrbitControls {
    const MIN_DISTANCE: f32 = 0.01;
    const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

    pub fn new(target: Vec3, damping: f32) -> Self {
        Self {
            target,
            max_distance: f32::INFINITY,
            damping: damping.clamp(0.0, 1.0),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 0.0,
        }
    }

    /// Queues a rotation in radians; applied over the next frames by `update`.
    pub fn orbit(&mut self, delta: Vec2) {
        self.pending_yaw += delta.x;
        self.pending_pitch += delta.y;
    }

    /// Positive steps move closer, negative steps move away.
    pub fn zoom(&mut self, steps: f32) {
        self.pending_zoom += steps;
    }

    /// Drops queued motion; used when the camera is re-framed.
    pub fn reset_motion(&mut self) {
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_zoom = 0.0;
    }

    /// Advances damping by one frame and moves `camera` accordingly.
    /// Returns true while there is still motion to apply.
    pub fn update(&mut self, camera: &mut Camera3D) -> bool {
        let factor = if self.damping > 0.0 { self.damping } else { 1.0 };
        let yaw = self.pending_yaw * factor;
        let pitch = self.pending_pitch * factor;
        let zoom = self.pending_zoom * factor;
        self.pending_yaw -= yaw;
        self.pending_pitch -= pitch;
        self.pending_zoom -= zoom;

        let offset = camera.position - self.target;
        let radius = offset.length().max(Self::MIN_DISTANCE);
        let current_yaw = offset.x.atan2(offset.z);
        let current_pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();
        let new_yaw = current_yaw - yaw;
        let new_pitch = (current_pitch + pitch).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        let new_radius = (radius * 0.95_f32.powf(zoom))
            .clamp(Self::MIN_DISTANCE, self.max_distance.max(Self::MIN_DISTANCE));
        let direction =
            Vec3::new(new_pitch.cos() * new_yaw.sin(), new_pitch.sin(), new_pitch.cos() * new_yaw.cos());
        camera.position = self.target + direction * new_radius;
        camera.target = self.target;

        const SETTLED: f32 = 1e-4;
        self.pending_yaw.abs() > SETTLED || self.pending_pitch.abs() > SETTLED || self.pending_zoom.abs() > SETTLED
    }
}
