#![allow(dead_code)]

use fbx_viewer::config::ViewerConfig;
use fbx_viewer::material::{Material, MaterialSlots};
use fbx_viewer::mesh::{MeshGeometry, MeshNode, Model};
use glam::Vec3;
use std::fs;
use std::path::{Path, PathBuf};

const MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const VERSION: u32 = 7400;
const NULL_RECORD: [u8; 13] = [0; 13];
const FOOTER_ID: [u8; 16] =
    [0xfa, 0xbc, 0xab, 0x09, 0xd0, 0xc8, 0xd4, 0x66, 0xb1, 0x76, 0xfb, 0x83, 0x1c, 0xf7, 0x26, 0x7e];
const FOOTER_MAGIC: [u8; 16] =
    [0xf8, 0x5a, 0x8c, 0x6a, 0xde, 0xf5, 0xd9, 0x7e, 0xec, 0xe9, 0x0c, 0xe3, 0x75, 0x8f, 0x29, 0x0b];

pub enum Prop {
    I64(i64),
    F64(f64),
    Str(String),
    F64Array(Vec<f64>),
    I32Array(Vec<i32>),
}

pub struct Node {
    name: &'static str,
    props: Vec<Prop>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(name: &'static str) -> Self {
        Self { name, props: Vec::new(), children: Vec::new() }
    }

    pub fn prop(mut self, prop: Prop) -> Self {
        self.props.push(prop);
        self
    }

    pub fn text(self, value: &str) -> Self {
        self.prop(Prop::Str(value.to_string()))
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }
}

/// Serializes top-level nodes as a binary FBX 7.4 document.
pub fn write_fbx(nodes: &[Node]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[0x1a, 0x00]);
    out.extend_from_slice(&VERSION.to_le_bytes());
    for node in nodes {
        write_node(&mut out, node);
    }
    out.extend_from_slice(&NULL_RECORD);

    out.extend_from_slice(&FOOTER_ID);
    let padding = (16 - out.len() % 16) % 16;
    out.extend(std::iter::repeat(0u8).take(padding));
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&[0; 120]);
    out.extend_from_slice(&FOOTER_MAGIC);
    out
}

fn write_node(out: &mut Vec<u8>, node: &Node) {
    let start = out.len();
    out.extend_from_slice(&[0; 12]);
    out.push(node.name.len() as u8);
    out.extend_from_slice(node.name.as_bytes());
    let props_start = out.len();
    for prop in &node.props {
        write_prop(out, prop);
    }
    let props_len = (out.len() - props_start) as u32;
    if !node.children.is_empty() {
        for child in &node.children {
            write_node(out, child);
        }
        out.extend_from_slice(&NULL_RECORD);
    }
    let end = out.len() as u32;
    out[start..start + 4].copy_from_slice(&end.to_le_bytes());
    out[start + 4..start + 8].copy_from_slice(&(node.props.len() as u32).to_le_bytes());
    out[start + 8..start + 12].copy_from_slice(&props_len.to_le_bytes());
}

fn write_prop(out: &mut Vec<u8>, prop: &Prop) {
    match prop {
        Prop::I64(value) => {
            out.push(b'L');
            out.extend_from_slice(&value.to_le_bytes());
        }
        Prop::F64(value) => {
            out.push(b'D');
            out.extend_from_slice(&value.to_le_bytes());
        }
        Prop::Str(value) => {
            out.push(b'S');
            out.extend_from_slice(&(value.len() as u32).to_le_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        Prop::F64Array(values) => {
            out.push(b'd');
            write_array_header(out, values.len(), values.len() * 8);
            for value in values {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        Prop::I32Array(values) => {
            out.push(b'i');
            write_array_header(out, values.len(), values.len() * 4);
            for value in values {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
}

fn write_array_header(out: &mut Vec<u8>, count: usize, byte_len: usize) {
    out.extend_from_slice(&(count as u32).to_le_bytes());
    // Encoding 0: uncompressed.
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(byte_len as u32).to_le_bytes());
}

fn vec3_property(name: &str, kind: &str, value: [f64; 3]) -> Node {
    Node::new("P")
        .text(name)
        .text(kind)
        .text("")
        .text("A")
        .prop(Prop::F64(value[0]))
        .prop(Prop::F64(value[1]))
        .prop(Prop::F64(value[2]))
}

const CUBE_CORNERS: [f64; 24] = [
    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];

/// Six quads; the last corner of each polygon is stored as `!index`.
const CUBE_POLYGONS: [i32; 24] = [
    0, 3, 2, !1, 4, 5, 6, !7, 0, 1, 5, !4, 2, 3, 7, !6, 1, 2, 6, !5, 0, 4, 7, !3,
];

/// A unit cube named `Cube`, translated to `translation` and bound to a
/// single material called `Paint` with the given diffuse colour.
pub fn cube_document(translation: [f64; 3], diffuse: [f64; 3]) -> Vec<u8> {
    let geometry = Node::new("Geometry")
        .prop(Prop::I64(100))
        .text("Cube\0\u{1}Geometry")
        .text("Mesh")
        .child(Node::new("Vertices").prop(Prop::F64Array(CUBE_CORNERS.to_vec())))
        .child(Node::new("PolygonVertexIndex").prop(Prop::I32Array(CUBE_POLYGONS.to_vec())))
        .child(
            Node::new("LayerElementMaterial")
                .child(Node::new("MappingInformationType").text("AllSame"))
                .child(Node::new("ReferenceInformationType").text("IndexToDirect"))
                .child(Node::new("Materials").prop(Prop::I32Array(vec![0]))),
        );
    let model = Node::new("Model")
        .prop(Prop::I64(200))
        .text("Cube\0\u{1}Model")
        .text("Mesh")
        .child(Node::new("Properties70").child(vec3_property("Lcl Translation", "Lcl Translation", translation)));
    let material = Node::new("Material")
        .prop(Prop::I64(300))
        .text("Paint\0\u{1}Material")
        .text("")
        .child(Node::new("Properties70").child(vec3_property("DiffuseColor", "Color", diffuse)));
    let objects = Node::new("Objects").child(geometry).child(model).child(material);
    let connections = Node::new("Connections")
        .child(connection(100, 200))
        .child(connection(300, 200))
        .child(connection(200, 0));
    write_fbx(&[objects, connections])
}

/// A document with a valid header and no `Objects` section.
pub fn empty_document() -> Vec<u8> {
    write_fbx(&[Node::new("Documents").child(Node::new("Count").prop(Prop::I64(0)))])
}

fn connection(child: i64, parent: i64) -> Node {
    Node::new("C").text("OO").prop(Prop::I64(child)).prop(Prop::I64(parent))
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}

/// Writes a solid-colour PNG to `{dir}/{name}.png`.
pub fn write_png(dir: &Path, name: &str, rgba: [u8; 4]) -> PathBuf {
    let path = dir.join(format!("{name}.png"));
    image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba)).save(&path).expect("write png");
    path
}

/// Config whose asset directories live under `dir`.
pub fn config_in(dir: &Path) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    config.assets.textures_dir = dir.join("textures");
    config.assets.environments_dir = dir.join("textures").join("equirectangular");
    fs::create_dir_all(&config.assets.environments_dir).expect("asset dirs");
    config
}

/// Model of axis-aligned boxes, one mesh per `(name, min, max)` entry, each
/// with a single coloured material.
pub fn box_model(name: &str, boxes: &[(&str, Vec3, Vec3)]) -> Model {
    let meshes = boxes
        .iter()
        .map(|(mesh_name, min, max)| {
            let material = Material::new(format!("{mesh_name}-paint")).with_base_color([0.2, 0.4, 0.6, 1.0]);
            MeshNode::new(*mesh_name, MeshGeometry::cuboid(*min, *max), MaterialSlots::from_elem(material, 1))
        })
        .collect();
    Model::from_meshes(name, meshes)
}
