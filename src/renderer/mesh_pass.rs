use crate::environment::EnvironmentMap;
use crate::material::{Material, TextureImage, WrapMode};
use crate::mesh::{MeshGeometry, MeshKey, MeshVertex, Model};
use crate::scene_host::{LightKind, SceneHost};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;

const MAX_LIGHTS: usize = 3;
const ENVIRONMENT_REFLECTANCE: f32 = 0.35;

const MESH_SHADER: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    ambient: vec4<f32>,
    light_pos: array<vec4<f32>, 3>,
    light_color: array<vec4<f32>, 3>,
    outline: vec4<f32>,
    viewport: vec4<f32>,
};

struct MaterialParams {
    base_color: vec4<f32>,
    emissive: vec4<f32>,
    uv: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;
@group(0) @binding(1) var env_tex: texture_2d<f32>;
@group(0) @binding(2) var env_sampler: sampler;

@group(1) @binding(0) var<uniform> material: MaterialParams;
@group(1) @binding(1) var base_tex: texture_2d<f32>;
@group(1) @binding(2) var base_sampler: sampler;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

const PI: f32 = 3.14159265;

@vertex
fn vs_main(input: VertexIn) -> VertexOut {
    var out: VertexOut;
    out.clip = frame.view_proj * vec4<f32>(input.position, 1.0);
    out.world = input.position;
    out.normal = input.normal;
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOut) -> @location(0) vec4<f32> {
    let n = normalize(input.normal);
    var light = frame.ambient.rgb * frame.ambient.w;
    for (var i = 0u; i < 3u; i = i + 1u) {
        let lp = frame.light_pos[i];
        let lc = frame.light_color[i];
        if (lc.w <= 0.0) {
            continue;
        }
        let to_light = select(normalize(lp.xyz), normalize(lp.xyz - input.world), lp.w > 0.5);
        light = light + lc.rgb * lc.w * max(dot(n, to_light), 0.0);
    }
    let texel = textureSample(base_tex, base_sampler, input.uv * material.uv.xy);
    let albedo = material.base_color.rgb * texel.rgb;

    let view_dir = normalize(frame.camera_pos.xyz - input.world);
    let r = reflect(-view_dir, n);
    let env_uv = vec2<f32>(atan2(r.z, r.x) / (2.0 * PI) + 0.5, acos(clamp(r.y, -1.0, 1.0)) / PI);
    let env = textureSample(env_tex, env_sampler, env_uv).rgb * frame.viewport.z;

    let color = albedo * light + env * albedo + material.emissive.rgb;
    return vec4<f32>(color, material.base_color.a * texel.a);
}

@vertex
fn vs_outline(input: VertexIn) -> @builtin(position) vec4<f32> {
    var clip = frame.view_proj * vec4<f32>(input.position, 1.0);
    let projected = (frame.view_proj * vec4<f32>(input.normal, 0.0)).xy;
    let len = length(projected);
    if (len > 0.00001) {
        let offset = projected / len * frame.outline.w * 2.0 / frame.viewport.xy;
        clip = vec4<f32>(clip.xy + offset * clip.w, clip.zw);
    }
    return clip;
}

@fragment
fn fs_outline() -> @location(0) vec4<f32> {
    return vec4<f32>(frame.outline.rgb, 1.0);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameData {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    light_pos: [[f32; 4]; MAX_LIGHTS],
    light_color: [[f32; 4]; MAX_LIGHTS],
    outline: [f32; 4],
    /// width, height, environment strength, unused
    viewport: [f32; 4],
}

impl FrameData {
    fn from_scene(scene: &SceneHost, has_environment: bool) -> Self {
        let viewport = scene.viewport();
        let mut data = Self {
            view_proj: scene.camera.view_projection(viewport).to_cols_array_2d(),
            camera_pos: scene.camera.position.extend(1.0).to_array(),
            ambient: [0.0; 4],
            light_pos: [[0.0; 4]; MAX_LIGHTS],
            light_color: [[0.0; 4]; MAX_LIGHTS],
            outline: [0.0; 4],
            viewport: [
                viewport.width.max(1) as f32,
                viewport.height.max(1) as f32,
                if has_environment { ENVIRONMENT_REFLECTANCE } else { 0.0 },
                0.0,
            ],
        };
        let mut slot = 0;
        for light in &scene.lights {
            let color = light.color.map(srgb_to_linear);
            match light.kind {
                LightKind::Ambient => {
                    data.ambient = [color[0], color[1], color[2], light.intensity];
                }
                LightKind::Directional { position } | LightKind::Point { position } if slot < MAX_LIGHTS => {
                    let kind = if matches!(light.kind, LightKind::Point { .. }) { 1.0 } else { 0.0 };
                    data.light_pos[slot] = position.extend(kind).to_array();
                    data.light_color[slot] = [color[0], color[1], color[2], light.intensity];
                    slot += 1;
                }
                _ => log::trace!("[mesh_pass] light rig exceeds {MAX_LIGHTS} slots"),
            }
        }
        let outline = scene.outline_color().map(srgb_to_linear);
        data.outline = [outline[0], outline[1], outline[2], scene.outline_settings.edge_thickness];
        data
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialData {
    base_color: [f32; 4],
    emissive: [f32; 4],
    uv: [f32; 4],
}

impl MaterialData {
    fn from_material(material: &Material) -> Self {
        let repeat = material.map.as_ref().map_or([1.0, 1.0], |map| map.repeat.to_array());
        let [r, g, b] = material.emissive;
        Self { base_color: material.base_color, emissive: [r, g, b, 0.0], uv: [repeat[0], repeat[1], 0.0, 0.0] }
    }
}

pub(super) fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

/// Resource counts for the GPU caches; they shrink when models are removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStats {
    pub meshes: usize,
    pub materials: usize,
    pub textures: usize,
}

struct PipelineResources {
    pipeline: wgpu::RenderPipeline,
    outline_pipeline: wgpu::RenderPipeline,
    frame_bgl: wgpu::BindGroupLayout,
    material_bgl: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    clamp_sampler: wgpu::Sampler,
    repeat_sampler: wgpu::Sampler,
    white: wgpu::TextureView,
    black_environment: wgpu::TextureView,
}

struct GpuMaterial {
    revision: u64,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuMesh {
    geometry: Arc<MeshGeometry>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    materials: Vec<GpuMaterial>,
}

/// Holds the image alive so its address cannot be reused while cached.
struct GpuTexture {
    image: Arc<TextureImage>,
    view: wgpu::TextureView,
}

struct GpuEnvironment {
    map: Arc<EnvironmentMap>,
    view: wgpu::TextureView,
}

/// Scene pass: lit model meshes followed by an inverted-hull outline for the
/// meshes in the scene's outline list. GPU copies follow the CPU model and are
/// released when their mesh leaves the attached model.
#[derive(Default)]
pub(super) struct MeshPass {
    resources: Option<PipelineResources>,
    frame_bind_group: Option<wgpu::BindGroup>,
    environment: Option<GpuEnvironment>,
    meshes: HashMap<MeshKey, GpuMesh>,
    textures: HashMap<usize, GpuTexture>,
}

impl MeshPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> GpuStats {
        GpuStats {
            meshes: self.meshes.len(),
            materials: self.meshes.values().map(|mesh| mesh.materials.len()).sum(),
            textures: self.textures.len(),
        }
    }

    pub fn ensure_pipelines(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Result<()> {
        if self.resources.is_some() {
            return Ok(());
        }
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER.into()),
        });
        let float_texture = wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        };
        let uniform = wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        };
        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: uniform,
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: float_texture,
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let material_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: uniform,
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: float_texture,
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let outline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Outline Pipeline Layout"),
            bind_group_layouts: &[&frame_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = create_pipeline(
            device,
            &shader,
            &mesh_layout,
            format,
            PipelineVariant { label: "Mesh Pipeline", vertex: "vs_main", fragment: "fs_main", cull: None },
        );
        let outline_pipeline = create_pipeline(
            device,
            &shader,
            &outline_layout,
            format,
            PipelineVariant {
                label: "Outline Pipeline",
                vertex: "vs_outline",
                fragment: "fs_outline",
                cull: Some(wgpu::Face::Front),
            },
        );
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform"),
            size: std::mem::size_of::<FrameData>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.resources = Some(PipelineResources {
            pipeline,
            outline_pipeline,
            frame_bgl,
            material_bgl,
            frame_buffer,
            clamp_sampler: create_sampler(device, WrapMode::ClampToEdge),
            repeat_sampler: create_sampler(device, WrapMode::Repeat),
            white: create_solid_texture(
                device,
                queue,
                wgpu::TextureFormat::Rgba8UnormSrgb,
                &[255; 4],
                "White Texture",
            ),
            black_environment: create_solid_texture(
                device,
                queue,
                wgpu::TextureFormat::Rgba16Float,
                bytemuck::cast_slice(&[half::f16::ZERO.to_bits(); 4]),
                "Empty Environment",
            ),
        });
        self.frame_bind_group = None;
        log::info!("[mesh_pass] pipelines ready ({format:?})");
        Ok(())
    }

    /// Uploads whatever changed since the last frame and drops GPU copies of
    /// meshes no longer in `model`.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneHost,
        model: Option<&Model>,
    ) -> Result<()> {
        self.sync_environment(device, queue, scene.environment());
        let has_environment = self.environment.is_some();
        let resources = self.resources.as_ref().context("Mesh pipelines not initialized")?;
        let frame = FrameData::from_scene(scene, has_environment);
        queue.write_buffer(&resources.frame_buffer, 0, bytemuck::bytes_of(&frame));

        match model {
            Some(model) => {
                self.meshes.retain(|key, _| model.contains(*key));
                for node in &model.meshes {
                    self.sync_mesh(device, queue, node.key, &node.geometry, &node.materials);
                }
            }
            None => self.meshes.clear(),
        }
        self.textures.retain(|_, texture| Arc::strong_count(&texture.image) > 1);
        Ok(())
    }

    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        scene: &SceneHost,
        model: Option<&Model>,
    ) {
        let [r, g, b] = scene.clear_color().map(srgb_to_linear);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let (Some(resources), Some(frame_bind_group), Some(model)) =
            (self.resources.as_ref(), self.frame_bind_group.as_ref(), model)
        else {
            return;
        };

        pass.set_pipeline(&resources.pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        for node in model.meshes.iter().filter(|node| node.visible) {
            let Some(gpu) = self.meshes.get(&node.key) else {
                continue;
            };
            pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            for subset in &gpu.geometry.subsets {
                let slot = subset.material_slot.min(gpu.materials.len().saturating_sub(1));
                let Some(material) = gpu.materials.get(slot) else {
                    continue;
                };
                pass.set_bind_group(1, &material.bind_group, &[]);
                pass.draw_indexed(subset.index_offset..subset.index_offset + subset.index_count, 0, 0..1);
            }
        }

        let outlined: Vec<&GpuMesh> = scene
            .outline()
            .iter()
            .filter(|key| model.mesh(**key).is_some_and(|node| node.visible))
            .filter_map(|key| self.meshes.get(key))
            .collect();
        if outlined.is_empty() {
            return;
        }
        pass.set_pipeline(&resources.outline_pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        for gpu in outlined {
            pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..gpu.geometry.indices.len() as u32, 0, 0..1);
        }
    }

    fn sync_environment(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, current: Option<&Arc<EnvironmentMap>>) {
        let unchanged = match (self.environment.as_ref(), current) {
            (Some(cached), Some(map)) => Arc::ptr_eq(&cached.map, map),
            (None, None) => true,
            _ => false,
        };
        if unchanged && self.frame_bind_group.is_some() {
            return;
        }
        let Some(resources) = self.resources.as_ref() else {
            return;
        };
        self.environment = current.map(|map| {
            log::debug!("[mesh_pass] uploading environment '{}' {}x{}", map.name, map.width, map.height);
            let texture = device.create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("Environment Texture"),
                    size: wgpu::Extent3d { width: map.width, height: map.height, depth_or_array_layers: 1 },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba16Float,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                bytemuck::cast_slice(&map.to_f16_bits()),
            );
            GpuEnvironment {
                map: Arc::clone(map),
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            }
        });
        let env_view = self.environment.as_ref().map_or(&resources.black_environment, |env| &env.view);
        self.frame_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &resources.frame_bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: resources.frame_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(env_view) },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&resources.repeat_sampler),
                },
            ],
        }));
    }

    fn sync_mesh(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: MeshKey,
        geometry: &Arc<MeshGeometry>,
        materials: &[Material],
    ) {
        for map in materials.iter().filter_map(|material| material.map.as_ref()) {
            self.ensure_texture(device, queue, &map.image);
        }
        let Self { resources, meshes, textures, .. } = self;
        let Some(resources) = resources.as_ref() else {
            return;
        };

        let stale = meshes.get(&key).map_or(true, |gpu| !Arc::ptr_eq(&gpu.geometry, geometry));
        if stale {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice::<MeshVertex, u8>(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            meshes.insert(
                key,
                GpuMesh { geometry: Arc::clone(geometry), vertex_buffer, index_buffer, materials: Vec::new() },
            );
        }
        let Some(gpu) = meshes.get_mut(&key) else {
            return;
        };

        gpu.materials.truncate(materials.len());
        for (slot, material) in materials.iter().enumerate() {
            let data = MaterialData::from_material(material);
            match gpu.materials.get_mut(slot) {
                Some(existing) if existing.revision == material.revision() => {}
                Some(existing) => {
                    queue.write_buffer(&existing.uniform, 0, bytemuck::bytes_of(&data));
                    existing.bind_group = material_bind_group(device, resources, textures, &existing.uniform, material);
                    existing.revision = material.revision();
                }
                None => {
                    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Material Uniform"),
                        contents: bytemuck::bytes_of(&data),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });
                    let bind_group = material_bind_group(device, resources, textures, &uniform, material);
                    gpu.materials.push(GpuMaterial { revision: material.revision(), uniform, bind_group });
                }
            }
        }
    }

    fn ensure_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, image: &Arc<TextureImage>) {
        let key = Arc::as_ptr(image) as usize;
        if self.textures.contains_key(&key) {
            return;
        }
        let limit = device.limits().max_texture_dimension_2d;
        if image.width > limit || image.height > limit {
            // Loaders reject these first; the material samples white instead.
            log::debug!("[mesh_pass] skipping texture '{}' above {limit}px", image.label);
            return;
        }
        log::debug!("[mesh_pass] uploading texture '{}' {}x{}", image.label, image.width, image.height);
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Material Texture"),
                size: wgpu::Extent3d { width: image.width, height: image.height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.insert(key, GpuTexture { image: Arc::clone(image), view });
    }
}

/// Slots without a map bind the white texture so the shader samples unconditionally.
fn material_bind_group(
    device: &wgpu::Device,
    resources: &PipelineResources,
    textures: &HashMap<usize, GpuTexture>,
    uniform: &wgpu::Buffer,
    material: &Material,
) -> wgpu::BindGroup {
    let (view, sampler) = match material.map.as_ref() {
        Some(map) => {
            let view = textures.get(&(Arc::as_ptr(&map.image) as usize)).map_or(&resources.white, |gpu| &gpu.view);
            let sampler = match map.wrap {
                WrapMode::Repeat => &resources.repeat_sampler,
                WrapMode::ClampToEdge => &resources.clamp_sampler,
            };
            (view, sampler)
        }
        None => (&resources.white, &resources.clamp_sampler),
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Bind Group"),
        layout: &resources.material_bgl,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(view) },
            wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(sampler) },
        ],
    })
}

struct PipelineVariant {
    label: &'static str,
    vertex: &'static str,
    fragment: &'static str,
    cull: Option<wgpu::Face>,
}

fn create_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    variant: PipelineVariant,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(variant.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(variant.vertex),
            buffers: &[MeshVertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(variant.fragment),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: variant.cull,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_sampler(device: &wgpu::Device, wrap: WrapMode) -> wgpu::Sampler {
    let address_mode = match wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Material Sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: wgpu::TextureFormat,
    texel: &[u8],
    label: &'static str,
) -> wgpu::TextureView {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        texel,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
