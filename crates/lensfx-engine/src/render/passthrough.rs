use std::time::Duration;

use bytemuck::{Pod, Zeroable};

use crate::capture::CameraFrame;
use crate::device::WgpuBackend;
use crate::render::{Effect, EffectError, RenderTarget};
use crate::surface::Viewport;

// ── uniform ───────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniform {
    transform: [f32; 16], // column-major
    scale: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

/// NDC scale that letterboxes a `frame_w x frame_h` image into `viewport`.
///
/// A transform that rotates by a quarter turn swaps the frame's axes.
fn fit_scale(frame_w: u32, frame_h: u32, transform: &[f32; 16], viewport: Viewport) -> [f32; 2] {
    let quarter_turn = transform[0].abs() < 0.5;
    let (w, h) = if quarter_turn {
        (frame_h as f32, frame_w as f32)
    } else {
        (frame_w as f32, frame_h as f32)
    };

    let frame_aspect = w / h;
    let view_aspect = viewport.aspect_ratio();

    if frame_aspect > view_aspect {
        [1.0, view_aspect / frame_aspect]
    } else {
        [frame_aspect / view_aspect, 1.0]
    }
}

/// `a * b` for column-major 4x4 matrices; `b` applies first.
fn compose(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// Camera "copy" effect: uploads the RGBA frame and draws it across the
/// viewport through the frame's texture transform, followed by the target's
/// own transform.
///
/// GPU resources are created lazily and rebuilt when the swap-chain format or
/// the frame size changes. A frame shared by several targets is uploaded once.
pub struct PassthroughEffect {
    clear_color: wgpu::Color,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
    uniform_ubo: Option<wgpu::Buffer>,

    frame_texture: Option<wgpu::Texture>,
    frame_view: Option<wgpu::TextureView>,
    frame_key: Option<(u32, u32, wgpu::TextureFormat)>,
    texture_generation: u64,

    bind_group: Option<wgpu::BindGroup>,
    bind_group_generation: u64,

    uploaded: Option<Duration>,
}

impl Default for PassthroughEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl PassthroughEffect {
    pub fn new() -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            sampler: None,
            uniform_ubo: None,
            frame_texture: None,
            frame_view: None,
            frame_key: None,
            texture_generation: 0,
            bind_group: None,
            bind_group_generation: u64::MAX,
            uploaded: None,
        }
    }

    /// Color of the letterbox bars.
    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lensfx passthrough shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/passthrough.wgsl").into()),
        });

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lensfx passthrough bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FrameUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lensfx passthrough pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lensfx passthrough pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built passthrough pipeline for {format:?}");

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bgl);
        self.bind_group = None;
        self.bind_group_generation = u64::MAX;
    }

    fn ensure_frame_texture(
        &mut self,
        device: &wgpu::Device,
        frame: &CameraFrame,
        surface_format: wgpu::TextureFormat,
    ) {
        // Sample in the same color space the swap chain encodes to.
        let format = if surface_format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let key = (frame.width(), frame.height(), format);
        if self.frame_key == Some(key) && self.frame_texture.is_some() {
            return;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lensfx camera frame"),
            size: wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.frame_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.frame_texture = Some(texture);
        self.frame_key = Some(key);
        self.texture_generation += 1;
        self.uploaded = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device) {
        if self.sampler.is_none() {
            self.sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("lensfx passthrough sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            }));
        }

        if self.uniform_ubo.is_none() {
            self.uniform_ubo = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("lensfx passthrough ubo"),
                size: std::mem::size_of::<FrameUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        if self.bind_group.is_some() && self.bind_group_generation == self.texture_generation {
            return;
        }

        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(ubo) = self.uniform_ubo.as_ref() else { return };
        let Some(view) = self.frame_view.as_ref() else { return };
        let Some(sampler) = self.sampler.as_ref() else { return };

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lensfx passthrough bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }));
        self.bind_group_generation = self.texture_generation;
    }

    fn upload(&mut self, queue: &wgpu::Queue, frame: &CameraFrame) {
        if self.uploaded == Some(frame.timestamp()) {
            return;
        }
        let Some(texture) = self.frame_texture.as_ref() else { return };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.width() * 4),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
        );
        self.uploaded = Some(frame.timestamp());
    }

    fn write_uniform(
        &self,
        queue: &wgpu::Queue,
        frame: &CameraFrame,
        target_transform: &[f32; 16],
        viewport: Viewport,
    ) {
        let Some(ubo) = self.uniform_ubo.as_ref() else { return };
        let transform = compose(target_transform, frame.transform());
        let u = FrameUniform {
            transform,
            scale: fit_scale(frame.width(), frame.height(), &transform, viewport),
            _pad: [0.0; 2],
        };
        queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }
}

impl Effect<WgpuBackend> for PassthroughEffect {
    fn apply(
        &mut self,
        frame: &CameraFrame,
        target: &mut RenderTarget<'_, WgpuBackend>,
    ) -> Result<(), EffectError> {
        let viewport = target.viewport();
        let target_transform = *target.transform();
        let (backend, pass) = target.parts();
        let device = backend.device();
        let queue = backend.queue();

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Mutating methods must happen before borrowing pipeline/bind group immutably.
        self.ensure_pipeline(device, pass.format);
        self.ensure_frame_texture(device, frame, pass.format);
        self.ensure_bindings(device);
        self.upload(queue, frame);
        self.write_uniform(queue, frame, &target_transform, viewport);

        let (Some(pipeline), Some(bind_group)) = (self.pipeline.as_ref(), self.bind_group.as_ref()) else {
            return Err(EffectError::new("passthrough resources unavailable"));
        };

        {
            let mut rpass = pass.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lensfx passthrough pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &pass.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_viewport(0.0, 0.0, viewport.width as f32, viewport.height as f32, 0.0, 1.0);
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.draw(0..6, 0..1);
        }

        match pollster::block_on(scope.pop()) {
            Some(err) => Err(EffectError::new(err.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::IDENTITY_TRANSFORM;
    use crate::surface::MIRROR_HORIZONTAL;

    const QUARTER_TURN: [f32; 16] = [
        0.0, 1.0, 0.0, 0.0, //
        -1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        1.0, 0.0, 0.0, 1.0,
    ];

    fn viewport(w: i32, h: i32) -> Viewport {
        Viewport::from_dimensions(w, h).unwrap()
    }

    #[test]
    fn matching_aspect_fills_viewport() {
        assert_eq!(fit_scale(1920, 1080, &IDENTITY_TRANSFORM, viewport(1280, 720)), [1.0, 1.0]);
    }

    #[test]
    fn wide_frame_in_portrait_viewport_is_letterboxed() {
        let [sx, sy] = fit_scale(1920, 1080, &IDENTITY_TRANSFORM, viewport(1080, 1920));
        assert_eq!(sx, 1.0);
        assert!(sy < 0.33 && sy > 0.31);
    }

    #[test]
    fn quarter_turn_swaps_frame_axes() {
        assert_eq!(fit_scale(1920, 1080, &QUARTER_TURN, viewport(1080, 1920)), [1.0, 1.0]);
    }

    #[test]
    fn target_transform_applies_after_frame_transform() {
        // A point at texture s=1 ends up at s=0 once mirrored.
        let m = compose(&MIRROR_HORIZONTAL, &IDENTITY_TRANSFORM);
        assert_eq!(m[0] * 1.0 + m[12], 0.0);

        assert_eq!(compose(&MIRROR_HORIZONTAL, &MIRROR_HORIZONTAL), IDENTITY_TRANSFORM);
        assert_eq!(compose(&IDENTITY_TRANSFORM, &QUARTER_TURN), QUARTER_TURN);

        // Quarter turn first, then mirror: (s, t) -> (1 - t, s) -> (t, s).
        let m = compose(&MIRROR_HORIZONTAL, &QUARTER_TURN);
        let (s, t) = (0.25, 0.75);
        let x = m[0] * s + m[4] * t + m[12];
        let y = m[1] * s + m[5] * t + m[13];
        assert_eq!((x, y), (t, s));
    }

    #[test]
    fn mirrored_target_keeps_letterboxing() {
        let mirrored = compose(&MIRROR_HORIZONTAL, &QUARTER_TURN);
        assert_eq!(fit_scale(1920, 1080, &mirrored, viewport(1080, 1920)), [1.0, 1.0]);
    }

    #[test]
    fn uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
    }
}
