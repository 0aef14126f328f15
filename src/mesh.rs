use crate::material::{Material, MaterialSlots};
use glam::{Vec2, Vec3};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable identity of a mesh node. Keys every per-mesh side table (backups,
/// texture assignments, tiling) and survives material/texture cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshKey(Uuid);

impl MeshKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MeshKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position: position.to_array(), normal: normal.to_array(), uv: uv.to_array() }
    }

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x2 },
            ],
        }
    }
}

/// Axis-aligned bounding box. `Aabb::EMPTY` absorbs any point it is grown by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb { min: Vec3::splat(f32::INFINITY), max: Vec3::splat(f32::NEG_INFINITY) };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min: min.min(max), max: max.max(min) }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, point| acc.grown(point))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn grown(self, point: Vec3) -> Self {
        Self { min: self.min.min(point), max: self.max.max(point) }
    }

    pub fn union(self, other: Aabb) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// `W x H x D` with two decimals, as shown in the info panel and mesh list.
    pub fn dimensions_label(&self) -> String {
        let size = self.size();
        format!("{:.2} x {:.2} x {:.2}", size.x, size.y, size.z)
    }

    /// Slab test; returns the entry distance (0 when the origin is inside).
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let mut t_min: f32 = 0.0;
        let mut t_max: f32 = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-8 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv_d = 1.0 / d;
            let mut t1 = (self.min[axis] - o) * inv_d;
            let mut t2 = (self.max[axis] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshSubset {
    pub index_offset: u32,
    pub index_count: u32,
    pub material_slot: usize,
}

/// Triangle list in model space. Shared between a mesh and its GPU upload.
#[derive(Clone, Debug)]
pub struct MeshGeometry {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub subsets: Vec<MeshSubset>,
}

impl MeshGeometry {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let subset = MeshSubset { index_offset: 0, index_count: indices.len() as u32, material_slot: 0 };
        Self { vertices, indices, subsets: vec![subset] }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| Vec3::from_array(v.position)))
    }

    /// Axis-aligned box between `min` and `max` with outward normals and unit UVs per face.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let corners = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        let faces: [([usize; 4], Vec3); 6] = [
            ([0, 3, 2, 1], Vec3::NEG_Z),
            ([4, 5, 6, 7], Vec3::Z),
            ([0, 4, 7, 3], Vec3::NEG_X),
            ([1, 2, 6, 5], Vec3::X),
            ([3, 7, 6, 2], Vec3::Y),
            ([0, 1, 5, 4], Vec3::NEG_Y),
        ];
        let uv_quad = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, normal) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in face.iter().zip(uv_quad) {
                vertices.push(MeshVertex::new(corners[*corner], normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(vertices, indices)
    }

    /// Nearest triangle hit along the ray, Möller–Trumbore.
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let mut nearest: Option<f32> = None;
        for tri in self.indices.chunks_exact(3) {
            let fetch = |i: u32| self.vertices.get(i as usize).map(|v| Vec3::from_array(v.position));
            let (Some(a), Some(b), Some(c)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2])) else {
                continue;
            };
            if let Some(t) = ray_triangle(origin, dir, a, b, c) {
                nearest = Some(nearest.map_or(t, |best| best.min(t)));
            }
        }
        nearest
    }
}

fn ray_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = dir.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > 1e-6).then_some(t)
}

#[derive(Clone, Debug)]
pub struct MeshNode {
    pub key: MeshKey,
    pub name: String,
    pub visible: bool,
    pub materials: MaterialSlots,
    pub geometry: Arc<MeshGeometry>,
    bounds: Aabb,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, geometry: MeshGeometry, materials: MaterialSlots) -> Self {
        let bounds = geometry.bounds();
        let materials =
            if materials.is_empty() { MaterialSlots::from_elem(Material::new("default"), 1) } else { materials };
        Self { key: MeshKey::new(), name: name.into(), visible: true, materials, geometry: Arc::new(geometry), bounds }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Label for lists; empty names get a placeholder.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<unnamed>"
        } else {
            &self.name
        }
    }

    pub fn ray_distance(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        self.bounds.ray_distance(origin, dir)?;
        self.geometry.ray_distance(origin, dir)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub mesh: MeshKey,
    pub distance: f32,
}

/// An imported model: the ordered mesh nodes of one file.
#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<MeshNode>,
    bounds: Aabb,
}

impl Model {
    pub fn from_meshes(name: impl Into<String>, meshes: Vec<MeshNode>) -> Self {
        let mut model = Self { name: name.into(), meshes, bounds: Aabb::EMPTY };
        model.recompute_bounds();
        model
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn recompute_bounds(&mut self) -> Aabb {
        self.bounds = self.meshes.iter().fold(Aabb::EMPTY, |acc, mesh| acc.union(mesh.bounds()));
        self.bounds
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&MeshNode> {
        self.meshes.iter().find(|mesh| mesh.key == key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut MeshNode> {
        self.meshes.iter_mut().find(|mesh| mesh.key == key)
    }

    pub fn contains(&self, key: MeshKey) -> bool {
        self.mesh(key).is_some()
    }

    /// Visible meshes hit by the ray, nearest first. Equal distances keep mesh order.
    pub fn raycast(&self, origin: Vec3, dir: Vec3) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = self
            .meshes
            .iter()
            .filter(|mesh| mesh.visible)
            .filter_map(|mesh| mesh.ray_distance(origin, dir).map(|distance| RayHit { mesh: mesh.key, distance }))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(name: &str, offset: Vec3) -> MeshNode {
        MeshNode::new(
            name,
            MeshGeometry::cuboid(offset - Vec3::splat(0.5), offset + Vec3::splat(0.5)),
            MaterialSlots::new(),
        )
    }

    #[test]
    fn model_bounds_cover_all_meshes() {
        let model = Model::from_meshes("pair", vec![unit_box("a", Vec3::ZERO), unit_box("b", Vec3::X * 3.0)]);
        assert_eq!(model.bounds().min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(model.bounds().max, Vec3::new(3.5, 0.5, 0.5));
        assert_eq!(model.bounds().dimensions_label(), "4.00 x 1.00 x 1.00");
    }

    #[test]
    fn empty_box_reports_zero_size() {
        let empty = Aabb::EMPTY;
        assert!(empty.is_empty());
        assert_eq!(empty.size(), Vec3::ZERO);
        assert_eq!(empty.union(Aabb::new(Vec3::ONE, Vec3::ZERO)).size(), Vec3::ONE);
    }

    #[test]
    fn raycast_orders_hits_by_distance() {
        let near = unit_box("near", Vec3::new(0.0, 0.0, 2.0));
        let far = unit_box("far", Vec3::ZERO);
        let near_key = near.key;
        let far_key = far.key;
        let model = Model::from_meshes("stack", vec![far, near]);
        let hits = model.raycast(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].mesh, near_key);
        assert_eq!(hits[1].mesh, far_key);
        assert!((hits[0].distance - 7.5).abs() < 1e-4);
    }

    #[test]
    fn hidden_meshes_are_not_hit() {
        let mut mesh = unit_box("hidden", Vec3::ZERO);
        mesh.visible = false;
        let model = Model::from_meshes("m", vec![mesh]);
        assert!(model.raycast(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z).is_empty());
    }

    #[test]
    fn ray_missing_the_box_returns_none() {
        let mesh = unit_box("a", Vec3::ZERO);
        assert!(mesh.ray_distance(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z).is_none());
    }

    #[test]
    fn meshes_without_materials_get_a_default_slot() {
        let mesh = unit_box("a", Vec3::ZERO);
        assert_eq!(mesh.materials.len(), 1);
        assert_eq!(mesh.display_name(), "a");
        assert_eq!(unit_box("", Vec3::ZERO).display_name(), "<unnamed>");
    }
}
