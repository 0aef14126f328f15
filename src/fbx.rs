//! FBX 7.x binary import.
//!
//! Reads the node tree with `fbxcel`, then walks `Objects`/`Connections` to
//! build one [`MeshNode`] per `Model::Mesh`. Polygons are fan-triangulated,
//! split per material slot and baked into world space so the rest of the
//! viewer only deals with plain triangle lists.

use crate::error::ViewerError;
use crate::material::{Material, MaterialSlots};
use crate::mesh::{MeshGeometry, MeshNode, MeshSubset, MeshVertex, Model};
use anyhow::{anyhow, bail, Context, Result};
use fbxcel::low::v7400::AttributeValue;
use fbxcel::tree::any::AnyTree;
use fbxcel::tree::v7400::NodeHandle;
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use std::collections::HashMap;
use std::io::Cursor;

const MAX_HIERARCHY_DEPTH: usize = 64;

/// Parses a binary FBX document into a [`Model`] named `name`.
pub fn load_model(bytes: &[u8], name: &str) -> Result<Model, ViewerError> {
    parse_model(bytes, name).map_err(|err| ViewerError::parse(name, &err))
}

pub fn parse_model(bytes: &[u8], name: &str) -> Result<Model> {
    let tree = AnyTree::from_seekable_reader(Cursor::new(bytes))
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| format!("Failed to read FBX node tree from {name}"))?;
    let tree = match tree {
        AnyTree::V7400(_, tree, _) => tree,
        _ => bail!("Unsupported FBX version in {name}"),
    };
    let root = tree.root();
    let objects = child(&root, "Objects").ok_or_else(|| anyhow!("No Objects section in {name}"))?;
    let scene = SceneObjects::collect(&objects, root.children().find(|node| node.name() == "Connections"));

    let mut meshes = Vec::new();
    for model in scene.models.iter().filter(|model| model.is_mesh) {
        let Some(geometry_id) = scene.geometry_of.get(&model.id) else {
            continue;
        };
        let Some(geometry) = scene.geometries.get(geometry_id) else {
            continue;
        };
        let materials: MaterialSlots = scene
            .materials_of
            .get(&model.id)
            .map(|ids| ids.iter().filter_map(|id| scene.materials.get(id).cloned()).collect())
            .unwrap_or_default();
        let transform = scene.world_transform(model.id);
        let slot_count = materials.len().max(1);
        match geometry.triangulate(transform, slot_count) {
            Ok(Some(mesh_geometry)) => meshes.push(MeshNode::new(model.name.clone(), mesh_geometry, materials)),
            Ok(None) => log::debug!("[fbx] {name}: '{}' has no polygons, skipped", model.name),
            Err(err) => return Err(err.context(format!("Invalid geometry for '{}' in {name}", model.name))),
        }
    }
    if meshes.is_empty() {
        bail!("No meshes found in {name}");
    }
    let model = Model::from_meshes(name, meshes);
    log::info!(
        "[fbx] {name}: {} mesh(es), bounds {}",
        model.meshes.len(),
        model.bounds().dimensions_label()
    );
    Ok(model)
}

/// Strips the class suffix of binary names (`Name\0\x01Model`) or the class
/// prefix of ASCII ones (`Model::Name`).
pub fn object_name(raw: &str) -> &str {
    if let Some((name, _class)) = raw.split_once("\u{0}\u{1}") {
        return name;
    }
    raw.split_once("::").map_or(raw, |(_class, name)| name)
}

/// Any `Model` node. Only meshes are imported, but null and transform nodes
/// still place their children.
struct ModelObject {
    id: i64,
    name: String,
    local: Mat4,
    is_mesh: bool,
}

struct SceneObjects {
    models: Vec<ModelObject>,
    geometries: HashMap<i64, GeometryData>,
    materials: HashMap<i64, Material>,
    geometry_of: HashMap<i64, i64>,
    materials_of: HashMap<i64, Vec<i64>>,
    parent_of: HashMap<i64, i64>,
}

impl SceneObjects {
    fn collect(objects: &NodeHandle<'_>, connections: Option<NodeHandle<'_>>) -> Self {
        let mut scene = SceneObjects {
            models: Vec::new(),
            geometries: HashMap::new(),
            materials: HashMap::new(),
            geometry_of: HashMap::new(),
            materials_of: HashMap::new(),
            parent_of: HashMap::new(),
        };
        for node in objects.children() {
            let Some(id) = attr_i64(&node, 0) else {
                continue;
            };
            let raw_name = attr_str(&node, 1).unwrap_or_default();
            match node.name() {
                "Model" => scene.models.push(ModelObject {
                    id,
                    name: object_name(raw_name).to_string(),
                    local: local_transform(&node),
                    is_mesh: attr_str(&node, 2) == Some("Mesh"),
                }),
                "Geometry" if attr_str(&node, 2) == Some("Mesh") => {
                    scene.geometries.insert(id, GeometryData::read(&node));
                }
                "Material" => {
                    scene.materials.insert(id, read_material(&node, object_name(raw_name)));
                }
                _ => {}
            }
        }

        if let Some(connections) = connections {
            for connection in connections.children().filter(|node| node.name() == "C") {
                if attr_str(&connection, 0) != Some("OO") {
                    continue;
                }
                let (Some(child_id), Some(parent_id)) = (attr_i64(&connection, 1), attr_i64(&connection, 2)) else {
                    continue;
                };
                if scene.geometries.contains_key(&child_id) {
                    scene.geometry_of.insert(parent_id, child_id);
                } else if scene.materials.contains_key(&child_id) {
                    scene.materials_of.entry(parent_id).or_default().push(child_id);
                } else if scene.local(child_id).is_some() && scene.local(parent_id).is_some() {
                    scene.parent_of.insert(child_id, parent_id);
                }
            }
        }
        scene
    }

    fn local(&self, id: i64) -> Option<Mat4> {
        self.models.iter().find(|model| model.id == id).map(|model| model.local)
    }

    fn world_transform(&self, id: i64) -> Mat4 {
        let mut transform = self.local(id).unwrap_or(Mat4::IDENTITY);
        let mut current = id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(parent) = self.parent_of.get(&current).copied() else {
                break;
            };
            transform = self.local(parent).unwrap_or(Mat4::IDENTITY) * transform;
            current = parent;
        }
        transform
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mapping {
    ByPolygonVertex,
    ByControlPoint,
    ByPolygon,
    AllSame,
}

impl Mapping {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "ByPolygonVertex" => Some(Mapping::ByPolygonVertex),
            "ByVertice" | "ByVertex" | "ByControlPoint" => Some(Mapping::ByControlPoint),
            "ByPolygon" => Some(Mapping::ByPolygon),
            "AllSame" => Some(Mapping::AllSame),
            _ => None,
        }
    }
}

/// One `LayerElement*` channel: values plus how they map onto polygon corners.
#[derive(Debug, Clone)]
struct LayerElement<T> {
    mapping: Mapping,
    direct: Vec<T>,
    index: Option<Vec<i32>>,
}

impl<T: Copy> LayerElement<T> {
    fn get(&self, polygon_vertex: usize, control_point: usize, polygon: usize) -> Option<T> {
        let slot = match self.mapping {
            Mapping::ByPolygonVertex => polygon_vertex,
            Mapping::ByControlPoint => control_point,
            Mapping::ByPolygon => polygon,
            Mapping::AllSame => 0,
        };
        let direct_index = match &self.index {
            Some(index) => usize::try_from(*index.get(slot)?).ok()?,
            None => slot,
        };
        self.direct.get(direct_index).copied()
    }
}

#[derive(Debug, Default)]
struct GeometryData {
    control_points: Vec<Vec3>,
    polygon_vertices: Vec<i32>,
    normals: Option<LayerElement<Vec3>>,
    uvs: Option<LayerElement<Vec2>>,
    material_slots: Option<LayerElement<i32>>,
}

impl GeometryData {
    fn read(node: &NodeHandle<'_>) -> Self {
        let control_points = child(node, "Vertices")
            .map(|vertices| attr_f64_array(&vertices, 0))
            .unwrap_or_default()
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
            .collect();
        let polygon_vertices =
            child(node, "PolygonVertexIndex").map(|indices| attr_i32_array(&indices, 0)).unwrap_or_default();
        let normals = read_layer(node, "LayerElementNormal", "Normals", "NormalsIndex", |values| {
            values.chunks_exact(3).map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)).collect()
        });
        let uvs = read_layer(node, "LayerElementUV", "UV", "UVIndex", |values| {
            values.chunks_exact(2).map(|c| Vec2::new(c[0] as f32, c[1] as f32)).collect()
        });
        let material_slots = child(node, "LayerElementMaterial").and_then(|layer| {
            let mapping = child(&layer, "MappingInformationType")
                .and_then(|m| attr_str(&m, 0).and_then(Mapping::parse))?;
            let direct = child(&layer, "Materials").map(|m| attr_i32_array(&m, 0))?;
            Some(LayerElement { mapping, direct, index: None })
        });
        Self { control_points, polygon_vertices, normals, uvs, material_slots }
    }

    /// Fan-triangulates every polygon into world space. Returns `None` when the
    /// geometry has no polygon with at least three corners.
    fn triangulate(&self, transform: Mat4, slot_count: usize) -> Result<Option<MeshGeometry>> {
        let normal_matrix = transform.inverse().transpose();
        let mut vertices = Vec::with_capacity(self.polygon_vertices.len());
        let mut per_slot: Vec<Vec<u32>> = vec![Vec::new(); slot_count];
        let mut corners: Vec<(usize, usize)> = Vec::new();
        let mut polygon = 0usize;

        for (polygon_vertex, &raw) in self.polygon_vertices.iter().enumerate() {
            let closes = raw < 0;
            let control_point = usize::try_from(if closes { !raw } else { raw }).unwrap_or(usize::MAX);
            if control_point >= self.control_points.len() {
                bail!("Polygon index {control_point} out of range ({} control points)", self.control_points.len());
            }
            corners.push((polygon_vertex, control_point));
            if !closes {
                continue;
            }
            if corners.len() >= 3 {
                let slot = self
                    .material_slots
                    .as_ref()
                    .and_then(|layer| layer.get(corners[0].0, corners[0].1, polygon))
                    .map_or(0, |slot| (slot.max(0) as usize).min(slot_count - 1));
                let positions: Vec<Vec3> =
                    corners.iter().map(|&(_, cp)| transform.transform_point3(self.control_points[cp])).collect();
                let face_normal = newell_normal(&positions);
                let base = vertices.len() as u32;
                for (&(pv, cp), position) in corners.iter().zip(&positions) {
                    let normal = self
                        .normals
                        .as_ref()
                        .and_then(|layer| layer.get(pv, cp, polygon))
                        .map(|n| normal_matrix.transform_vector3(n).normalize_or_zero())
                        .filter(|n| *n != Vec3::ZERO)
                        .unwrap_or(face_normal);
                    let uv = self.uvs.as_ref().and_then(|layer| layer.get(pv, cp, polygon)).unwrap_or(Vec2::ZERO);
                    // FBX stores V bottom-up.
                    vertices.push(MeshVertex::new(*position, normal, Vec2::new(uv.x, 1.0 - uv.y)));
                }
                for i in 1..corners.len() as u32 - 1 {
                    per_slot[slot].extend_from_slice(&[base, base + i, base + i + 1]);
                }
            }
            corners.clear();
            polygon += 1;
        }

        let mut indices = Vec::new();
        let mut subsets = Vec::new();
        for (material_slot, slot_indices) in per_slot.into_iter().enumerate() {
            if slot_indices.is_empty() {
                continue;
            }
            subsets.push(MeshSubset {
                index_offset: indices.len() as u32,
                index_count: slot_indices.len() as u32,
                material_slot,
            });
            indices.extend(slot_indices);
        }
        if indices.is_empty() {
            return Ok(None);
        }
        Ok(Some(MeshGeometry { vertices, indices, subsets }))
    }
}

fn newell_normal(positions: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (i, current) in positions.iter().enumerate() {
        let next = positions[(i + 1) % positions.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        Vec3::Y
    } else {
        normal
    }
}

fn read_layer<T>(
    geometry: &NodeHandle<'_>,
    layer_name: &str,
    values_name: &str,
    index_name: &str,
    convert: impl Fn(&[f64]) -> Vec<T>,
) -> Option<LayerElement<T>> {
    let layer = child(geometry, layer_name)?;
    let mapping = child(&layer, "MappingInformationType").and_then(|m| attr_str(&m, 0).and_then(Mapping::parse))?;
    let indexed = child(&layer, "ReferenceInformationType")
        .and_then(|r| attr_str(&r, 0))
        .is_some_and(|reference| reference == "IndexToDirect" || reference == "Index");
    let direct = convert(&child(&layer, values_name).map(|v| attr_f64_array(&v, 0))?);
    let index = if indexed { child(&layer, index_name).map(|i| attr_i32_array(&i, 0)) } else { None };
    Some(LayerElement { mapping, direct, index })
}

fn read_material(node: &NodeHandle<'_>, label: &str) -> Material {
    let diffuse = property_vec3(node, "DiffuseColor").or_else(|| property_vec3(node, "Diffuse")).unwrap_or(Vec3::ONE);
    let emissive_factor = property_f64(node, "EmissiveFactor").unwrap_or(1.0) as f32;
    let emissive = property_vec3(node, "EmissiveColor").unwrap_or(Vec3::ZERO) * emissive_factor;
    Material::new(label).with_base_color([diffuse.x, diffuse.y, diffuse.z, 1.0]).with_emissive(emissive.to_array())
}

fn local_transform(node: &NodeHandle<'_>) -> Mat4 {
    let translation = property_vec3(node, "Lcl Translation").unwrap_or(Vec3::ZERO);
    let rotation = property_vec3(node, "Lcl Rotation").unwrap_or(Vec3::ZERO);
    let scaling = property_vec3(node, "Lcl Scaling").unwrap_or(Vec3::ONE);
    let rotation = Quat::from_euler(
        EulerRot::ZYX,
        rotation.z.to_radians(),
        rotation.y.to_radians(),
        rotation.x.to_radians(),
    );
    Mat4::from_scale_rotation_translation(scaling, rotation, translation)
}

/// `P` entries are `[name, type, label, flags, values...]`.
fn property<'a>(node: &NodeHandle<'a>, name: &str) -> Option<NodeHandle<'a>> {
    child(node, "Properties70")?.children().find(|p| p.name() == "P" && attr_str(p, 0) == Some(name))
}

fn property_vec3(node: &NodeHandle<'_>, name: &str) -> Option<Vec3> {
    let p = property(node, name)?;
    Some(Vec3::new(attr_f64(&p, 4)? as f32, attr_f64(&p, 5)? as f32, attr_f64(&p, 6)? as f32))
}

fn property_f64(node: &NodeHandle<'_>, name: &str) -> Option<f64> {
    attr_f64(&property(node, name)?, 4)
}

fn child<'a>(node: &NodeHandle<'a>, name: &str) -> Option<NodeHandle<'a>> {
    node.children().find(|candidate| candidate.name() == name)
}

fn attr_i64(node: &NodeHandle<'_>, index: usize) -> Option<i64> {
    match node.attributes().get(index)? {
        AttributeValue::I64(v) => Some(*v),
        AttributeValue::I32(v) => Some(i64::from(*v)),
        AttributeValue::I16(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn attr_f64(node: &NodeHandle<'_>, index: usize) -> Option<f64> {
    match node.attributes().get(index)? {
        AttributeValue::F64(v) => Some(*v),
        AttributeValue::F32(v) => Some(f64::from(*v)),
        AttributeValue::I64(v) => Some(*v as f64),
        AttributeValue::I32(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn attr_str<'a>(node: &NodeHandle<'a>, index: usize) -> Option<&'a str> {
    match node.attributes().get(index)? {
        AttributeValue::String(v) => Some(v.as_str()),
        _ => None,
    }
}

fn attr_f64_array(node: &NodeHandle<'_>, index: usize) -> Vec<f64> {
    match node.attributes().get(index) {
        Some(AttributeValue::ArrF64(values)) => values.clone(),
        Some(AttributeValue::ArrF32(values)) => values.iter().map(|v| f64::from(*v)).collect(),
        _ => Vec::new(),
    }
}

fn attr_i32_array(node: &NodeHandle<'_>, index: usize) -> Vec<i32> {
    match node.attributes().get(index) {
        Some(AttributeValue::ArrI32(values)) => values.clone(),
        Some(AttributeValue::ArrI64(values)) => values.iter().map(|v| *v as i32).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_drop_class_markers() {
        assert_eq!(object_name("Chair\u{0}\u{1}Model"), "Chair");
        assert_eq!(object_name("Model::Chair"), "Chair");
        assert_eq!(object_name("Chair"), "Chair");
        assert_eq!(object_name("\u{0}\u{1}Model"), "");
    }

    #[test]
    fn indexed_layers_resolve_through_the_index_array() {
        let layer = LayerElement { mapping: Mapping::ByPolygonVertex, direct: vec![10, 20, 30], index: Some(vec![2, 0]) };
        assert_eq!(layer.get(0, 5, 5), Some(30));
        assert_eq!(layer.get(1, 5, 5), Some(10));
        assert_eq!(layer.get(2, 5, 5), None);

        let all_same = LayerElement { mapping: Mapping::AllSame, direct: vec![7], index: None };
        assert_eq!(all_same.get(9, 9, 9), Some(7));
    }

    #[test]
    fn quads_split_into_two_triangles_per_material() {
        let geometry = GeometryData {
            control_points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            polygon_vertices: vec![0, 1, 2, !3, 0, 2, !3],
            material_slots: Some(LayerElement { mapping: Mapping::ByPolygon, direct: vec![1, 0], index: None }),
            ..Default::default()
        };
        let mesh = geometry.triangulate(Mat4::IDENTITY, 2).expect("valid").expect("has polygons");
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.subsets.len(), 2);
        assert_eq!(mesh.subsets[0], MeshSubset { index_offset: 0, index_count: 3, material_slot: 0 });
        assert_eq!(mesh.subsets[1], MeshSubset { index_offset: 3, index_count: 6, material_slot: 1 });
        assert!((Vec3::from_array(mesh.vertices[0].normal) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn out_of_range_polygon_index_is_an_error() {
        let geometry = GeometryData {
            control_points: vec![Vec3::ZERO; 3],
            polygon_vertices: vec![0, 1, !7],
            ..Default::default()
        };
        assert!(geometry.triangulate(Mat4::IDENTITY, 1).is_err());
    }

    #[test]
    fn ascii_documents_are_rejected() {
        let err = load_model(b"; FBX 7.4.0 project file\nFBXHeaderExtension: {\n}\n", "scene.fbx").unwrap_err();
        assert!(matches!(err, ViewerError::Parse { ref name, .. } if name == "scene.fbx"));
    }
}
