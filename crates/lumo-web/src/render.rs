use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use web_sys as web;
use wgpu::util::DeviceExt;

use lumo_core::constants::{BAR_TEX_SIZE, BIN_COUNT, P_COUNT};
use lumo_core::session::Session;
use lumo_core::spectrum::RingVertex;
use lumo_core::starfield::generate_stars;
use lumo_core::{BLOB_WGSL, PARTICLES_WGSL, PICK_WGSL, SKY_WGSL, SPECTRUM_WGSL, STARS_WGSL};

use crate::media::MEDIA_TEX_SIZE;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const SPHERE_RINGS: u32 = 32;
const SPHERE_SEGMENTS: u32 = 48;
// Room for the two default attractor dots plus a few user-added ones.
const MAX_ATTRACTOR_DOTS: usize = 16;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    time: f32,
    point_scale: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlobUniforms {
    noise_freq: f32,
    amp: f32,
    tex_strength: f32,
    use_tex: f32,
    rainbow_phase: f32,
    rainbow_active: f32,
    audio_level: f32,
    rotation: f32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct StarUniforms {
    view_proj: [[f32; 4]; 4],
    appearance: [f32; 4],
    anim: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyUniforms {
    inv_view_proj: [[f32; 4]; 4],
    color_a: [f32; 4],
    color_b: [f32; 4],
    shape: [f32; 4],
    misc: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlobVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ParticleInstance {
    center: [f32; 3],
    size: f32,
    tint: [f32; 3],
    boost: f32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct StarInstance {
    center: [f32; 3],
    jitter: f32,
    phase: f32,
    tint: [f32; 3],
}

/// Which texture the blob samples this frame.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BlobTexture {
    Media,
    Bars,
}

fn sphere_mesh() -> (Vec<BlobVertex>, Vec<u32>) {
    let rings = SPHERE_RINGS;
    let segs = SPHERE_SEGMENTS;
    let mut verts = Vec::with_capacity(((rings + 1) * (segs + 1)) as usize);
    for r in 0..=rings {
        let v = r as f32 / rings as f32;
        let phi = std::f32::consts::PI * v;
        for s in 0..=segs {
            let u = s as f32 / segs as f32;
            let theta = std::f32::consts::TAU * u;
            let n = [
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ];
            verts.push(BlobVertex {
                position: n,
                normal: n,
            });
        }
    }
    let mut indices = Vec::with_capacity((rings * segs * 6) as usize);
    for r in 0..rings {
        for s in 0..segs {
            let a = r * (segs + 1) + s;
            let b = a + segs + 1;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    (verts, indices)
}

fn create_texture_2d(
    device: &wgpu::Device,
    label: &str,
    size: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
    (tex, view)
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn uniform_bgl(device: &wgpu::Device, label: &str, count: u32) -> wgpu::BindGroupLayout {
    let entries: Vec<_> = (0..count)
        .map(|i| wgpu::BindGroupLayoutEntry {
            binding: i,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

pub struct GpuState<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,

    scene_uniforms: wgpu::Buffer,
    blob_uniforms: wgpu::Buffer,
    star_uniforms: wgpu::Buffer,
    sky_uniforms: wgpu::Buffer,
    bg_scene: wgpu::BindGroup,
    bg_blob: wgpu::BindGroup,
    bg_stars: wgpu::BindGroup,
    bg_sky: wgpu::BindGroup,

    media_tex: wgpu::Texture,
    bar_tex: wgpu::Texture,
    bg_media: wgpu::BindGroup,
    bg_bars: wgpu::BindGroup,
    pub blob_texture: BlobTexture,

    sky_pipeline: wgpu::RenderPipeline,
    star_pipeline: wgpu::RenderPipeline,
    blob_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,
    spectrum_pipeline: wgpu::RenderPipeline,
    pick_pipeline: wgpu::RenderPipeline,

    blob_vertices: wgpu::Buffer,
    blob_indices: wgpu::Buffer,
    blob_index_count: u32,
    particle_instances: wgpu::Buffer,
    particle_count: u32,
    star_instances: Option<wgpu::Buffer>,
    star_count: u32,
    star_geometry_version: u64,
    ring_vertices: wgpu::Buffer,
    ring_count: u32,

    pick_tex: wgpu::Texture,
    pick_view: wgpu::TextureView,
    pick_buf: wgpu::Buffer,
    pick_pending: Rc<Cell<bool>>,
    pick_result: Rc<Cell<u32>>,

    width: u32,
    height: u32,
    instance_scratch: Vec<ParticleInstance>,
}

impl<'a> GpuState<'a> {
    pub async fn new(canvas: &'a web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // Default limits keep older WebGPU implementations happy
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .unwrap_or(caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = Self::create_depth(&device, width, height);

        // Uniforms and bind groups
        let scene_uniforms = uniform_buffer(
            &device,
            "scene_uniforms",
            std::mem::size_of::<SceneUniforms>() as u64,
        );
        let blob_uniforms = uniform_buffer(
            &device,
            "blob_uniforms",
            std::mem::size_of::<BlobUniforms>() as u64,
        );
        let star_uniforms = uniform_buffer(
            &device,
            "star_uniforms",
            std::mem::size_of::<StarUniforms>() as u64,
        );
        let sky_uniforms = uniform_buffer(
            &device,
            "sky_uniforms",
            std::mem::size_of::<SkyUniforms>() as u64,
        );

        let scene_bgl = uniform_bgl(&device, "scene_bgl", 1);
        let blob_bgl = uniform_bgl(&device, "blob_bgl", 2);
        let star_bgl = uniform_bgl(&device, "star_bgl", 1);
        let sky_bgl = uniform_bgl(&device, "sky_bgl", 1);

        let bg_scene = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_scene"),
            layout: &scene_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_uniforms.as_entire_binding(),
            }],
        });
        let bg_blob = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_blob"),
            layout: &blob_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: blob_uniforms.as_entire_binding(),
                },
            ],
        });
        let bg_stars = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_stars"),
            layout: &star_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: star_uniforms.as_entire_binding(),
            }],
        });
        let bg_sky = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_sky"),
            layout: &sky_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sky_uniforms.as_entire_binding(),
            }],
        });

        // Blob textures: one from the media sampler, one for spectrum bars
        let tex_usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        let (media_tex, media_view) = create_texture_2d(
            &device,
            "media_tex",
            MEDIA_TEX_SIZE,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            tex_usage,
        );
        let (bar_tex, bar_view) = create_texture_2d(
            &device,
            "bar_tex",
            BAR_TEX_SIZE as u32,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            tex_usage,
        );
        let media_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("media_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let media_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("media_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let bg_media = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_media"),
            layout: &media_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&media_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&media_sampler),
                },
            ],
        });
        let bg_bars = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg_bars"),
            layout: &media_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&bar_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&media_sampler),
                },
            ],
        });

        // Shaders
        let make_shader = |label: &str, src: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(src.into()),
            })
        };
        let sky_shader = make_shader("sky_shader", SKY_WGSL);
        let star_shader = make_shader("star_shader", STARS_WGSL);
        let blob_shader = make_shader("blob_shader", BLOB_WGSL);
        let particle_shader = make_shader("particle_shader", PARTICLES_WGSL);
        let spectrum_shader = make_shader("spectrum_shader", SPECTRUM_WGSL);
        let pick_shader = make_shader("pick_shader", PICK_WGSL);

        let depth_read = wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };
        let depth_write = wgpu::DepthStencilState {
            depth_write_enabled: true,
            ..depth_read.clone()
        };

        let particle_instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x3, 3 => Float32],
        };
        let pick_instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32],
        };
        let star_instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32, 3 => Float32x3],
        };
        let blob_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BlobVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };
        let ring_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RingVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };

        let make_pipeline = |label: &str,
                             layout: &wgpu::PipelineLayout,
                             shader: &wgpu::ShaderModule,
                             vs: &str,
                             fs: &str,
                             buffers: &[wgpu::VertexBufferLayout],
                             topology: wgpu::PrimitiveTopology,
                             blend: Option<wgpu::BlendState>,
                             depth: Option<wgpu::DepthStencilState>,
                             target_format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some(vs),
                    buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology,
                    ..Default::default()
                },
                depth_stencil: depth,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                cache: None,
                multiview: None,
            })
        };

        let pl_scene = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_scene"),
            bind_group_layouts: &[&scene_bgl],
            push_constant_ranges: &[],
        });
        let pl_blob = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_blob"),
            bind_group_layouts: &[&blob_bgl, &media_bgl],
            push_constant_ranges: &[],
        });
        let pl_stars = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_stars"),
            bind_group_layouts: &[&star_bgl],
            push_constant_ranges: &[],
        });
        let pl_sky = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_sky"),
            bind_group_layouts: &[&sky_bgl],
            push_constant_ranges: &[],
        });

        let sky_pipeline = make_pipeline(
            "sky_pipeline",
            &pl_sky,
            &sky_shader,
            "vs_fullscreen",
            "fs_sky",
            &[],
            wgpu::PrimitiveTopology::TriangleList,
            None,
            Some(depth_read.clone()),
            format,
        );
        let star_pipeline = make_pipeline(
            "star_pipeline",
            &pl_stars,
            &star_shader,
            "vs_stars",
            "fs_stars",
            std::slice::from_ref(&star_instance_layout),
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some(depth_read.clone()),
            format,
        );
        let blob_pipeline = make_pipeline(
            "blob_pipeline",
            &pl_blob,
            &blob_shader,
            "vs_blob",
            "fs_blob",
            std::slice::from_ref(&blob_vertex_layout),
            wgpu::PrimitiveTopology::TriangleList,
            None,
            Some(depth_write),
            format,
        );
        let particle_pipeline = make_pipeline(
            "particle_pipeline",
            &pl_scene,
            &particle_shader,
            "vs_particles",
            "fs_particles",
            std::slice::from_ref(&particle_instance_layout),
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some(depth_read.clone()),
            format,
        );
        let spectrum_pipeline = make_pipeline(
            "spectrum_pipeline",
            &pl_scene,
            &spectrum_shader,
            "vs_spectrum",
            "fs_spectrum",
            std::slice::from_ref(&ring_vertex_layout),
            wgpu::PrimitiveTopology::LineStrip,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some(depth_read),
            format,
        );
        // Pick target stays Rgba8Unorm so the readback bytes are the raw id
        let pick_pipeline = make_pipeline(
            "pick_pipeline",
            &pl_scene,
            &pick_shader,
            "vs_pick",
            "fs_pick",
            std::slice::from_ref(&pick_instance_layout),
            wgpu::PrimitiveTopology::TriangleList,
            None,
            None,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        // Geometry
        let (verts, indices) = sphere_mesh();
        let blob_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blob_vertices"),
            contents: bytemuck::cast_slice(&verts),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let blob_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blob_indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let particle_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle_instances"),
            size: ((P_COUNT + MAX_ATTRACTOR_DOTS) * std::mem::size_of::<ParticleInstance>())
                as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let ring_vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ring_vertices"),
            size: ((BIN_COUNT + 1) * std::mem::size_of::<RingVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (pick_tex, pick_view) = Self::create_pick_target(&device, width, height);
        let pick_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pick_readback"),
            size: 4,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            scene_uniforms,
            blob_uniforms,
            star_uniforms,
            sky_uniforms,
            bg_scene,
            bg_blob,
            bg_stars,
            bg_sky,
            media_tex,
            bar_tex,
            bg_media,
            bg_bars,
            blob_texture: BlobTexture::Media,
            sky_pipeline,
            star_pipeline,
            blob_pipeline,
            particle_pipeline,
            spectrum_pipeline,
            pick_pipeline,
            blob_vertices,
            blob_indices,
            blob_index_count: indices.len() as u32,
            particle_instances,
            particle_count: 0,
            star_instances: None,
            star_count: 0,
            star_geometry_version: u64::MAX,
            ring_vertices,
            ring_count: 0,
            pick_tex,
            pick_view,
            pick_buf,
            pick_pending: Rc::new(Cell::new(false)),
            pick_result: Rc::new(Cell::new(0)),
            width,
            height,
            instance_scratch: Vec::with_capacity(P_COUNT + MAX_ATTRACTOR_DOTS),
        })
    }

    fn create_depth(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let (_, view) = create_texture_2d_rect(
            device,
            "depth",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        view
    }

    fn create_pick_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        create_texture_2d_rect(
            device,
            "pick_target",
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        )
    }

    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = Self::create_depth(&self.device, width, height);
            let (tex, view) = Self::create_pick_target(&self.device, width, height);
            self.pick_tex = tex;
            self.pick_view = view;
        }
    }

    pub fn upload_media_texture(&self, rgba: &[u8]) {
        self.write_square_texture(&self.media_tex, MEDIA_TEX_SIZE, rgba);
    }

    pub fn upload_bar_texture(&self, rgba: &[u8]) {
        self.write_square_texture(&self.bar_tex, BAR_TEX_SIZE as u32, rgba);
    }

    fn write_square_texture(&self, tex: &wgpu::Texture, size: u32, rgba: &[u8]) {
        if rgba.len() != (size * size * 4) as usize {
            log::warn!("[gpu] texture upload size mismatch: {}", rgba.len());
            return;
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * 4),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Regenerate the star instance buffer when the layout changed.
    pub fn sync_stars(&mut self, session: &Session) {
        let version = session.starfield.geometry_version();
        if self.star_instances.is_some() && version == self.star_geometry_version {
            return;
        }
        let geo = generate_stars(&session.starfield.layout);
        let instances: Vec<StarInstance> = (0..geo.placed())
            .map(|i| StarInstance {
                center: geo.positions[i].to_array(),
                jitter: geo.jitters[i],
                phase: geo.phases[i],
                tint: geo.tints[i].to_array(),
            })
            .collect();
        self.star_count = instances.len() as u32;
        self.star_instances = if instances.is_empty() {
            None
        } else {
            Some(
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("star_instances"),
                        contents: bytemuck::cast_slice(&instances),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
            )
        };
        self.star_geometry_version = version;
    }

    fn upload_frame_data(
        &mut self,
        session: &Session,
        view_proj: Mat4,
        camera_pos: Vec3,
        rainbow_active: bool,
    ) {
        let params = &session.params;
        let scene = SceneUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: [camera_pos.x, camera_pos.y, camera_pos.z, 1.0],
            time: session.time(),
            point_scale: lumo_core::spectrum::reactive_point_size(params, session.audio_level()),
            _pad: [0.0; 2],
        };
        self.queue
            .write_buffer(&self.scene_uniforms, 0, bytemuck::bytes_of(&scene));

        let surface = &session.surface;
        let blob = BlobUniforms {
            noise_freq: surface.noise_freq,
            amp: surface.amp,
            tex_strength: surface.tex_strength,
            use_tex: if surface.use_texture { 1.0 } else { 0.0 },
            rainbow_phase: session.rainbow_phase(),
            rainbow_active: if rainbow_active { 1.0 } else { 0.0 },
            audio_level: session.audio_level(),
            rotation: session.time() * params.rotation_speed,
        };
        self.queue
            .write_buffer(&self.blob_uniforms, 0, bytemuck::bytes_of(&blob));

        let ap = &session.starfield.appearance;
        let star = StarUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            appearance: [ap.size, ap.size_jitter, ap.opacity, ap.twinkle_amount],
            anim: [
                session.starfield.twinkle_time(),
                session.starfield.drift_angle,
                0.0,
                0.0,
            ],
        };
        self.queue
            .write_buffer(&self.star_uniforms, 0, bytemuck::bytes_of(&star));

        let sky = &session.starfield.sky;
        let sky_u = SkyUniforms {
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            color_a: [sky.color_a[0], sky.color_a[1], sky.color_a[2], 1.0],
            color_b: [sky.color_b[0], sky.color_b[1], sky.color_b[2], 1.0],
            shape: [sky.scale, sky.threshold, sky.falloff, sky.power],
            misc: [sky.vignette, if sky.enabled { 1.0 } else { 0.0 }, 0.0, 0.0],
        };
        self.queue
            .write_buffer(&self.sky_uniforms, 0, bytemuck::bytes_of(&sky_u));

        // Particles plus attractor dots share one instance buffer
        let arena = &session.arena;
        self.instance_scratch.clear();
        for i in 0..arena.len() {
            self.instance_scratch.push(ParticleInstance {
                center: arena.positions[i].to_array(),
                size: arena.sizes[i],
                tint: arena.tints[i].to_array(),
                boost: arena.boosts[i],
            });
        }
        for (pos, color, size) in session.attractors.dots() {
            if self.instance_scratch.len() >= P_COUNT + MAX_ATTRACTOR_DOTS {
                break;
            }
            self.instance_scratch.push(ParticleInstance {
                center: pos.to_array(),
                size,
                tint: color.to_array(),
                boost: 60.0,
            });
        }
        self.particle_count = self.instance_scratch.len() as u32;
        self.queue.write_buffer(
            &self.particle_instances,
            0,
            bytemuck::cast_slice(&self.instance_scratch),
        );

        let ring = session.ring_vertices();
        self.ring_count = ring.len() as u32;
        if !ring.is_empty() {
            self.queue
                .write_buffer(&self.ring_vertices, 0, bytemuck::cast_slice(ring));
        }
    }

    pub fn render(
        &mut self,
        session: &Session,
        view_proj: Mat4,
        camera_pos: Vec3,
        rainbow_active: bool,
        ring_visible: bool,
    ) -> Result<(), wgpu::SurfaceError> {
        self.sync_stars(session);
        self.upload_frame_data(session, view_proj, camera_pos, rainbow_active);

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.sky_pipeline);
            rpass.set_bind_group(0, &self.bg_sky, &[]);
            rpass.draw(0..3, 0..1);

            if let Some(stars) = &self.star_instances {
                rpass.set_pipeline(&self.star_pipeline);
                rpass.set_bind_group(0, &self.bg_stars, &[]);
                rpass.set_vertex_buffer(0, stars.slice(..));
                rpass.draw(0..6, 0..self.star_count);
            }

            rpass.set_pipeline(&self.blob_pipeline);
            rpass.set_bind_group(0, &self.bg_blob, &[]);
            let media_bg = match self.blob_texture {
                BlobTexture::Media => &self.bg_media,
                BlobTexture::Bars => &self.bg_bars,
            };
            rpass.set_bind_group(1, media_bg, &[]);
            rpass.set_vertex_buffer(0, self.blob_vertices.slice(..));
            rpass.set_index_buffer(self.blob_indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..self.blob_index_count, 0, 0..1);

            rpass.set_pipeline(&self.particle_pipeline);
            rpass.set_bind_group(0, &self.bg_scene, &[]);
            rpass.set_vertex_buffer(0, self.particle_instances.slice(..));
            rpass.draw(0..6, 0..self.particle_count);

            if ring_visible && self.ring_count > 1 {
                rpass.set_pipeline(&self.spectrum_pipeline);
                rpass.set_bind_group(0, &self.bg_scene, &[]);
                rpass.set_vertex_buffer(0, self.ring_vertices.slice(..));
                rpass.draw(0..self.ring_count, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Render the id pass and kick off an async one-pixel readback under the
    /// pointer. The result lands in `take_pick` a frame or two later.
    pub fn pick_at(&mut self, x: f32, y: f32) {
        if self.pick_pending.get() {
            return;
        }
        let px = (x.max(0.0) as u32).min(self.width.saturating_sub(1));
        let py = (y.max(0.0) as u32).min(self.height.saturating_sub(1));
        // Only the ambient particles are pickable, attractor dots excluded
        let count = self.particle_count.min(P_COUNT as u32);
        if count == 0 {
            return;
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pick_encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pick_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.pick_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.pick_pipeline);
            rpass.set_bind_group(0, &self.bg_scene, &[]);
            rpass.set_vertex_buffer(0, self.particle_instances.slice(..));
            rpass.draw(0..6, 0..count);
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.pick_tex,
                mip_level: 0,
                origin: wgpu::Origin3d { x: px, y: py, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.pick_buf,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: None,
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        self.pick_pending.set(true);
        let buf = self.pick_buf.clone();
        let pending = self.pick_pending.clone();
        let result = self.pick_result.clone();
        self.pick_buf
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |res| {
                if res.is_ok() {
                    let id = {
                        let data = buf.slice(..).get_mapped_range();
                        u32::from(data[0])
                            | (u32::from(data[1]) << 8)
                            | (u32::from(data[2]) << 16)
                    };
                    result.set(id);
                }
                buf.unmap();
                pending.set(false);
            });
    }

    /// Latest completed readback: `Some(index)` when a particle is under the
    /// pointer, `None` otherwise.
    pub fn take_pick(&self) -> Option<u32> {
        let id = self.pick_result.get();
        if id == 0 {
            None
        } else {
            Some(id - 1)
        }
    }

    pub fn clear_pick(&self) {
        self.pick_result.set(0);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn create_texture_2d_rect(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
    (tex, view)
}
