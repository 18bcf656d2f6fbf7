//! Forward renderer for the desk scene graph.
//!
//! One frame is two passes: a depth-only shadow pass from the key light, then
//! the main pass drawing opaque meshes in graph order followed by blended
//! meshes sorted back to front. Per-draw data lives in one dynamic uniform
//! buffer that is fully written before either pass is encoded.
//!
//! GPU resources for geometries, textures and materials are created lazily
//! the first time an `Arc` is seen and cached by pointer identity. The cache
//! keeps the `Arc` alive so the pointer cannot be reused while cached.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::backend::{FrameInputs, RenderInfo};
use crate::geometry::{Geometry, Topology};
use crate::gpu::mesh::GpuGeometry;
use crate::gpu::pipeline::{self, PipelineKey, DEPTH_FORMAT, SHADOW_FORMAT};
use crate::lighting::{GpuLight, LightingUniforms, MAX_LIGHTS};
use crate::material::{Material, Shading};
use crate::texture::{Texture, TextureKind, WrapMode};

/// Maximum number of meshes that can be rendered per frame.
/// Each mesh needs its own uniform slot in the dynamic uniform buffer.
const MAX_MESHES_PER_FRAME: usize = 256;

/// Uniform buffer alignment (WebGPU minUniformBufferOffsetAlignment is typically 256 bytes)
const UNIFORM_ALIGNMENT: usize = 256;

/// Hemisphere light tag in `GpuLight::position.w`.
const HEMISPHERE_TAG: f32 = 1.0;

// ============================================================================
// Uniforms
// ============================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GlobalUniforms {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    /// xyz = eye, w = 1 when a shadow map is bound
    camera_position: [f32; 4],
    /// rgb = fog colour, a = exposure
    background: [f32; 4],
    /// near, far, shadow map size, light count
    fog: [f32; 4],
    lights: [GpuLight; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ShadowGlobals {
    light_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    /// roughness, metalness, shading kind, point size
    surface: [f32; 4],
    /// has map, has normal map, vertex colours, receives shadow
    flags: [f32; 4],
    uv_repeat: [f32; 4],
    // Padding to reach 256-byte alignment (208 bytes of data + 48 bytes padding)
    _padding: [f32; 12],
}

impl DrawUniforms {
    fn new(material: &Material, world: Mat4, receive_shadow: bool) -> Self {
        let (roughness, metalness, kind, point_size) = match material.shading {
            Shading::Standard { roughness, metalness } => (roughness, metalness, 0.0, 0.0),
            Shading::Lambert => (1.0, 0.0, 1.0, 0.0),
            Shading::Points { size } => (1.0, 0.0, 2.0, size),
        };
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let repeat = material
            .map
            .as_ref()
            .or(material.normal_map.as_ref())
            .map(|t| t.repeat)
            .unwrap_or([1.0, 1.0]);

        Self {
            model: world.to_cols_array_2d(),
            normal_matrix: world.inverse().transpose().to_cols_array_2d(),
            color: material.color.to_linear().to_rgba(material.opacity),
            emissive: material.emissive_radiance().to_linear().to_rgba(0.0),
            surface: [roughness, metalness, kind, point_size],
            flags: [
                flag(material.map.is_some()),
                flag(material.normal_map.is_some()),
                flag(material.vertex_colors),
                flag(receive_shadow),
            ],
            uv_repeat: [repeat[0], repeat[1], 0.0, 0.0],
            _padding: [0.0; 12],
        }
    }
}

/// Colours in the lighting block are authored in sRGB.
fn linearize_lights(mut uniforms: LightingUniforms) -> LightingUniforms {
    let decode = |rgb: [f32; 3]| crate::color::Color::rgb(rgb[0], rgb[1], rgb[2]).to_linear().to_array();
    for light in uniforms.lights.iter_mut().take(uniforms.count as usize) {
        let c = decode([light.color[0], light.color[1], light.color[2]]);
        light.color[..3].copy_from_slice(&c);
        if light.position[3] == HEMISPHERE_TAG {
            let g = decode([light.params[0], light.params[1], light.params[2]]);
            light.params[..3].copy_from_slice(&g);
        }
    }
    uniforms
}

fn arc_key<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as usize
}

// ============================================================================
// Cached resources
// ============================================================================

struct CachedGeometry {
    _source: Arc<Geometry>,
    gpu: GpuGeometry,
}

struct CachedTexture {
    _source: Arc<Texture>,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct CachedMaterial {
    _source: Arc<Material>,
    bind_group: wgpu::BindGroup,
}

struct ShadowTarget {
    size: u32,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    globals_bind_group: wgpu::BindGroup,
}

struct DepthTarget {
    size: (u32, u32),
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// One scheduled draw, in submission order.
struct DrawItem {
    geometry: usize,
    material: usize,
    key: PipelineKey,
    cast_shadow: bool,
    slot: usize,
}

pub struct SceneRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,

    shader: wgpu::ShaderModule,
    scene_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    shadow_pipeline: wgpu::RenderPipeline,

    globals_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,

    globals_buffer: wgpu::Buffer,
    shadow_globals_buffer: wgpu::Buffer,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,

    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    white_view: wgpu::TextureView,
    flat_normal_view: wgpu::TextureView,
    _fallback_textures: [wgpu::Texture; 2],

    globals_bind_group: Option<(u32, wgpu::BindGroup)>,
    shadow_target: Option<ShadowTarget>,
    shadow_globals_layout: wgpu::BindGroupLayout,
    depth_target: Option<DepthTarget>,

    geometries: HashMap<usize, CachedGeometry>,
    textures: HashMap<usize, CachedTexture>,
    materials: HashMap<usize, CachedMaterial>,
}

impl SceneRenderer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));

        // === Bind group layouts ===

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<GlobalUniforms>() as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                },
                count: None,
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shadow_globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_globals_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ShadowGlobals>() as u64),
                },
                count: None,
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &draw_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&shadow_globals_layout, &draw_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline = pipeline::create_shadow_pipeline(&device, &shadow_layout);

        // === Buffers ===

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Uniform Buffer"),
            size: std::mem::size_of::<GlobalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Globals Uniform Buffer"),
            size: std::mem::size_of::<ShadowGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Create a large uniform buffer for dynamic uniform binding (one slot per mesh)
        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer (Dynamic)"),
            size: (UNIFORM_ALIGNMENT * MAX_MESHES_PER_FRAME) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout: &draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });

        // === Samplers and fallbacks ===

        let sampler = |label: &str, mode: wgpu::AddressMode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: mode,
                address_mode_v: mode,
                address_mode_w: mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            })
        };
        let repeat_sampler = sampler("Repeat Sampler", wgpu::AddressMode::Repeat);
        let clamp_sampler = sampler("Clamp Sampler", wgpu::AddressMode::ClampToEdge);
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let white = solid_texture(&device, &queue, "White Texture", [255, 255, 255, 255], true);
        let flat_normal = solid_texture(&device, &queue, "Flat Normal Texture", [128, 128, 255, 255], false);
        let white_view = white.create_view(&wgpu::TextureViewDescriptor::default());
        let flat_normal_view = flat_normal.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            device,
            queue,
            color_format,
            shader,
            scene_layout,
            pipelines: HashMap::new(),
            shadow_pipeline,
            globals_layout,
            material_layout,
            globals_buffer,
            shadow_globals_buffer,
            draw_buffer,
            draw_bind_group,
            repeat_sampler,
            clamp_sampler,
            shadow_sampler,
            white_view,
            flat_normal_view,
            _fallback_textures: [white, flat_normal],
            globals_bind_group: None,
            shadow_target: None,
            shadow_globals_layout,
            depth_target: None,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Number of cached GPU geometries, textures and material bind groups.
    pub fn cached_resources(&self) -> (usize, usize, usize) {
        (self.geometries.len(), self.textures.len(), self.materials.len())
    }

    /// Drop every cached GPU resource. The renderer stays usable.
    pub fn clear_caches(&mut self) {
        self.geometries.clear();
        self.materials.clear();
        self.textures.clear();
        self.globals_bind_group = None;
        self.shadow_target = None;
        self.depth_target = None;
    }

    // ========================================================================
    // Lazy resources
    // ========================================================================

    fn ensure_depth_target(&mut self, width: u32, height: u32) {
        if self.depth_target.as_ref().map(|d| d.size) == Some((width, height)) {
            return;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth_target = Some(DepthTarget { size: (width, height), _texture: texture, view });
    }

    fn ensure_shadow_target(&mut self, size: u32) {
        let size = size.clamp(1, self.max_texture_size());
        if self.shadow_target.as_ref().map(|s| s.size) == Some(size) {
            return;
        }
        log::debug!("Allocating {}x{} shadow map", size, size);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d { width: size, height: size, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let globals_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_globals_bind_group"),
            layout: &self.shadow_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.shadow_globals_buffer.as_entire_binding(),
            }],
        });
        self.shadow_target = Some(ShadowTarget { size, _texture: texture, view, globals_bind_group });
        // The scene globals bind group samples the shadow map and must be rebuilt.
        self.globals_bind_group = None;
    }

    fn ensure_globals_bind_group(&mut self) {
        let Some(shadow) = &self.shadow_target else {
            return;
        };
        if self.globals_bind_group.as_ref().map(|(size, _)| *size) == Some(shadow.size) {
            return;
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &self.globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
        });
        self.globals_bind_group = Some((shadow.size, bind_group));
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let pipeline =
            pipeline::create_scene_pipeline(&self.device, &self.scene_layout, &self.shader, self.color_format, key);
        self.pipelines.insert(key, pipeline);
    }

    fn ensure_geometry(&mut self, geometry: &Arc<Geometry>) -> usize {
        let key = arc_key(geometry);
        self.geometries.entry(key).or_insert_with(|| CachedGeometry {
            _source: Arc::clone(geometry),
            gpu: GpuGeometry::upload(&self.device, "Scene Geometry", geometry),
        });
        key
    }

    fn ensure_texture(&mut self, texture: &Arc<Texture>) -> usize {
        let key = arc_key(texture);
        if !self.textures.contains_key(&key) {
            let uploaded = upload_texture(&self.device, &self.queue, texture);
            let view = uploaded.create_view(&wgpu::TextureViewDescriptor::default());
            self.textures.insert(
                key,
                CachedTexture {
                    _source: Arc::clone(texture),
                    _texture: uploaded,
                    view,
                },
            );
        }
        key
    }

    fn ensure_material(&mut self, material: &Arc<Material>) -> usize {
        let key = arc_key(material);
        if self.materials.contains_key(&key) {
            return key;
        }

        let map = material.map.as_ref().map(|t| self.ensure_texture(t));
        let normal = material.normal_map.as_ref().map(|t| self.ensure_texture(t));
        let wrap = material
            .map
            .as_ref()
            .or(material.normal_map.as_ref())
            .map(|t| t.wrap)
            .unwrap_or(WrapMode::Repeat);

        let map_view = map.and_then(|k| self.textures.get(&k)).map_or(&self.white_view, |t| &t.view);
        let normal_view = normal
            .and_then(|k| self.textures.get(&k))
            .map_or(&self.flat_normal_view, |t| &t.view);
        let sampler = match wrap {
            WrapMode::Repeat => &self.repeat_sampler,
            WrapMode::ClampToEdge => &self.clamp_sampler,
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normal_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        self.materials.insert(
            key,
            CachedMaterial {
                _source: Arc::clone(material),
                bind_group,
            },
        );
        key
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Render one frame into `view`, which must be `width` x `height` physical pixels.
    pub fn render(&mut self, view: &wgpu::TextureView, width: u32, height: u32, frame: &FrameInputs<'_>) -> RenderInfo {
        let width = width.max(1);
        let height = height.max(1);
        self.ensure_depth_target(width, height);

        let shadow_size = frame.lights.shadow_caster().and_then(|l| l.shadow()).map(|s| s.map_size).unwrap_or(1);
        self.ensure_shadow_target(shadow_size);
        self.ensure_globals_bind_group();
        let light_view_proj = frame.lights.shadow_view_projection();

        // === Collect draws ===

        let renderables = frame.scene.renderables();
        if renderables.len() > MAX_MESHES_PER_FRAME {
            log::warn!(
                "Too many meshes ({} > {}), some will not be rendered",
                renderables.len(),
                MAX_MESHES_PER_FRAME
            );
        }

        let view_matrix = frame.camera.view_matrix();
        let mut info = RenderInfo::default();
        let mut opaque = Vec::new();
        let mut blended = Vec::new();
        let mut uniforms = Vec::new();

        for item in renderables.iter().take(MAX_MESHES_PER_FRAME) {
            let mesh = item.mesh;
            let geometry = self.ensure_geometry(&mesh.geometry);
            let material = self.ensure_material(&mesh.material);
            let key = PipelineKey {
                blend: mesh.material.blend_mode,
                side: mesh.material.side,
                topology: mesh.geometry.topology,
            };
            self.ensure_pipeline(key);

            let draw = DrawItem {
                geometry,
                material,
                key,
                cast_shadow: mesh.cast_shadow && mesh.geometry.topology == Topology::Triangles,
                slot: 0,
            };
            let uniform = DrawUniforms::new(&mesh.material, item.world, mesh.receive_shadow);
            if mesh.material.is_transparent() {
                let depth = view_matrix.transform_point3(item.world.transform_point3(Vec3::ZERO)).z;
                blended.push((depth, draw, uniform));
            } else {
                opaque.push((draw, uniform));
            }

            info.triangles += mesh.geometry.triangle_count() as u64;
            info.points += mesh.geometry.point_count() as u64;
            info.draw_calls += 1;
        }

        // View space looks down -Z: most negative is farthest.
        blended.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut draws = Vec::with_capacity(opaque.len() + blended.len());
        for (mut draw, uniform) in opaque.into_iter().chain(blended.into_iter().map(|(_, d, u)| (d, u))) {
            draw.slot = draws.len();
            uniforms.push(uniform);
            draws.push(draw);
        }

        // === Write uniforms ===

        // queue.write_buffer() is immediate, not recorded in the command stream,
        // so every slot is written before any pass is encoded.
        for (slot, uniform) in uniforms.iter().enumerate() {
            self.queue.write_buffer(
                &self.draw_buffer,
                (slot * UNIFORM_ALIGNMENT) as u64,
                bytemuck::cast_slice(&[*uniform]),
            );
        }

        let lighting = linearize_lights(frame.lights.to_uniforms());
        let env = frame.environment;
        let fog_color = env.fog_color.to_linear();
        let globals = GlobalUniforms {
            view_proj: frame.camera.view_projection_matrix().to_cols_array_2d(),
            light_view_proj: light_view_proj.unwrap_or(Mat4::IDENTITY).to_cols_array_2d(),
            camera_position: frame
                .camera
                .position
                .extend(if light_view_proj.is_some() { 1.0 } else { 0.0 })
                .to_array(),
            background: fog_color.to_rgba(env.exposure),
            fog: [env.fog_near, env.fog_far, shadow_size as f32, lighting.count as f32],
            lights: lighting.lights,
        };
        self.queue.write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));
        if let Some(matrix) = light_view_proj {
            let shadow_globals = ShadowGlobals {
                light_view_proj: matrix.to_cols_array_2d(),
            };
            self.queue.write_buffer(&self.shadow_globals_buffer, 0, bytemuck::cast_slice(&[shadow_globals]));
        }

        let (Some(shadow), Some(depth), Some((_, globals_bind_group))) =
            (&self.shadow_target, &self.depth_target, &self.globals_bind_group)
        else {
            return info;
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });

        // === Shadow pass ===
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &shadow.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if light_view_proj.is_some() {
                pass.set_pipeline(&self.shadow_pipeline);
                pass.set_bind_group(0, &shadow.globals_bind_group, &[]);
                for draw in draws.iter().filter(|d| d.cast_shadow) {
                    let Some(geometry) = self.geometries.get(&draw.geometry) else {
                        continue;
                    };
                    pass.set_bind_group(1, &self.draw_bind_group, &[(draw.slot * UNIFORM_ALIGNMENT) as u32]);
                    geometry.gpu.draw(&mut pass);
                }
            }
        }

        // === Main pass ===
        {
            let bg = env.background.to_linear();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.r as f64,
                            g: bg.g as f64,
                            b: bg.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, globals_bind_group, &[]);
            let mut bound: Option<PipelineKey> = None;
            for draw in &draws {
                let (Some(pipeline), Some(geometry), Some(material)) = (
                    self.pipelines.get(&draw.key),
                    self.geometries.get(&draw.geometry),
                    self.materials.get(&draw.material),
                ) else {
                    continue;
                };
                if bound != Some(draw.key) {
                    pass.set_pipeline(pipeline);
                    bound = Some(draw.key);
                }
                pass.set_bind_group(1, &self.draw_bind_group, &[(draw.slot * UNIFORM_ALIGNMENT) as u32]);
                pass.set_bind_group(2, &material.bind_group, &[]);
                geometry.gpu.draw(&mut pass);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        info
    }
}

// ============================================================================
// Texture helpers
// ============================================================================

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn write_rgba(queue: &wgpu::Queue, texture: &wgpu::Texture, pixels: &[u8], width: u32, height: u32) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
    );
}

fn solid_texture(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, rgba: [u8; 4], srgb: bool) -> wgpu::Texture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        },
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_rgba(queue, &texture, &rgba, 1, 1);
    texture
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, source: &Texture) -> wgpu::Texture {
    let format = match source.kind {
        TextureKind::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureKind::Normal => wgpu::TextureFormat::Rgba8Unorm,
    };
    let (width, height) = (source.width(), source.height());
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(source.label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_rgba(queue, &texture, source.pixels(), width, height);
    texture
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::lighting::LightingRig;

    #[test]
    fn test_draw_uniforms_fill_one_slot() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), UNIFORM_ALIGNMENT);
    }

    #[test]
    fn test_globals_layout_matches_shader() {
        // 2 matrices + 3 vec4 + 8 lights of 4 vec4 each
        assert_eq!(std::mem::size_of::<GlobalUniforms>(), 128 + 48 + MAX_LIGHTS * 64);
        assert_eq!(std::mem::size_of::<GlobalUniforms>() % 16, 0);
    }

    #[test]
    fn test_draw_uniforms_flags() {
        let texture = Arc::new(Texture::blank("t", TextureKind::Color, WrapMode::Repeat, [4.0, 2.0]));
        let material = Material::standard(Color::WHITE, 0.4, 0.6).with_map(texture);
        let u = DrawUniforms::new(&material, Mat4::IDENTITY, true);
        assert_eq!(u.flags, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(u.surface, [0.4, 0.6, 0.0, 0.0]);
        assert_eq!(u.uv_repeat, [4.0, 2.0, 0.0, 0.0]);
        assert_eq!(u.color[3], 1.0);
    }

    #[test]
    fn test_points_uniforms_carry_size() {
        let material = Material::points(0.02).with_opacity(0.6);
        let u = DrawUniforms::new(&material, Mat4::IDENTITY, false);
        assert_eq!(u.surface[2], 2.0);
        assert!((u.surface[3] - 0.02).abs() < 1e-6);
        assert_eq!(u.flags[2], 1.0);
        assert!((u.color[3] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_linearize_lights_keeps_intensity() {
        let rig = LightingRig::install(1024);
        let raw = rig.to_uniforms();
        let linear = linearize_lights(raw);
        assert_eq!(linear.count, raw.count);
        for (a, b) in raw.lights.iter().zip(&linear.lights).take(raw.count as usize) {
            assert_eq!(a.color[3], b.color[3]);
            assert!(b.color[0] <= a.color[0] + 1e-6);
            assert_eq!(a.position, b.position);
        }
    }
}
