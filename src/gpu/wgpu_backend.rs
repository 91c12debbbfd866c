//! wgpu implementation of [`GpuBackend`].
//!
//! The adjustor program is one render pipeline whose bind group holds every
//! texture unit, a shared sampler and the uniform block. Uniform pushes land
//! in a CPU-side [`UniformBlock`] that is written to the GPU once per draw,
//! and only when something changed. The bind group is rebuilt per draw from
//! the current unit bindings; unbound units sample a transparent 1×1
//! placeholder.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::decode::DecodedImage;
use crate::error::PhotoTuneError;
use crate::gpu::backend::{
    GpuBackend, GpuError, QuadVertex, ShaderDefines, TextureId,
};
use crate::gpu::pipeline_helpers::{
    create_quad_pipeline, filtering_sampler, linear_sampler, texture_2d,
    uniform_buffer,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{
    ShaderComposer, ADJUSTOR_PATH, ADJUSTOR_SOURCE,
};
use crate::gpu::texture::{LayerTexture, RenderTarget};
use crate::gpu::uniform::{
    UniformBlock, UniformLayout, UniformLocation, UniformValue,
};
use crate::probe::DeviceCapabilities;

/// Texture bindings declared by the adjustor shader.
pub const TEXTURE_UNITS: usize = 16;
const SAMPLER_BINDING: u32 = TEXTURE_UNITS as u32;
const UNIFORM_BINDING: u32 = SAMPLER_BINDING + 1;

/// Derive the compositor's limits from a wgpu device.
#[must_use]
pub fn capabilities_from_limits(limits: &wgpu::Limits) -> DeviceCapabilities {
    let per_stage = limits.max_sampled_textures_per_shader_stage;
    DeviceCapabilities {
        max_texture_units: per_stage.min(TEXTURE_UNITS as u32),
        max_combined_texture_units: per_stage.saturating_mul(2),
        max_texture_size: limits.max_texture_dimension_2d,
    }
}

/// Viewport rectangle clamped into a render target, never empty.
fn clamp_viewport(viewport: (u32, u32), target: (u32, u32)) -> (f32, f32) {
    (
        viewport.0.clamp(1, target.0.max(1)) as f32,
        viewport.1.clamp(1, target.1.max(1)) as f32,
    )
}

/// Program-dependent GPU state, rebuilt by `build_program`.
struct Program {
    pipeline: wgpu::RenderPipeline,
    layout: UniformLayout,
    block: UniformBlock,
    buffer: wgpu::Buffer,
}

/// Quad vertex buffer and its vertex count.
struct Quad {
    buffer: wgpu::Buffer,
    vertices: u32,
}

/// [`GpuBackend`] that renders through wgpu.
pub struct WgpuBackend {
    context: RenderContext,
    composer: ShaderComposer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholder: LayerTexture,
    program: Option<Program>,
    quad: Option<Quad>,
    textures: FxHashMap<TextureId, LayerTexture>,
    next_texture: u32,
    units: [Option<TextureId>; TEXTURE_UNITS],
    viewport: (u32, u32),
    clear_color: [f32; 4],
    offscreen: Option<RenderTarget>,
}

impl WgpuBackend {
    /// Wrap a render context. Without a surface, frames go to an off-screen
    /// target sized like the context.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ProgramBuild`] if the device cannot sample
    /// [`TEXTURE_UNITS`] textures per stage or a shared shader module fails
    /// to register.
    pub fn new(context: RenderContext) -> Result<Self, GpuError> {
        let limits = context.limits();
        if (limits.max_sampled_textures_per_shader_stage as usize)
            < TEXTURE_UNITS
        {
            return Err(GpuError::ProgramBuild(format!(
                "device samples {} textures per stage, {TEXTURE_UNITS} required",
                limits.max_sampled_textures_per_shader_stage
            )));
        }
        let composer = ShaderComposer::new()?;
        let device = &context.device;

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> =
            (0..SAMPLER_BINDING).map(texture_2d).collect();
        entries.push(filtering_sampler(SAMPLER_BINDING));
        entries.push(uniform_buffer(UNIFORM_BINDING));
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Adjustor Layout"),
                entries: &entries,
            });

        let sampler = linear_sampler(device, "Layer Sampler");
        let placeholder = LayerTexture::solid(
            device,
            &context.queue,
            "Unbound Unit",
            [0, 0, 0, 0],
        );
        let viewport = context.size();
        let offscreen = (!context.has_surface()).then(|| {
            RenderTarget::new(device, viewport.0, viewport.1, context.format())
        });

        Ok(Self {
            context,
            composer,
            bind_group_layout,
            sampler,
            placeholder,
            program: None,
            quad: None,
            textures: FxHashMap::default(),
            next_texture: 0,
            units: [None; TEXTURE_UNITS],
            viewport,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            offscreen,
        })
    }

    /// Backend on a surfaceless device rendering into a `width`×`height`
    /// off-screen target.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::Context`] when no adapter or device is
    /// available, or [`PhotoTuneError::Gpu`] as for [`WgpuBackend::new`].
    pub async fn offscreen(
        width: u32,
        height: u32,
    ) -> Result<Self, PhotoTuneError> {
        let context = RenderContext::headless(width, height).await?;
        Ok(Self::new(context)?)
    }

    /// The underlying render context.
    #[must_use]
    pub const fn context(&self) -> &RenderContext {
        &self.context
    }

    /// The off-screen target, when rendering without a surface.
    #[must_use]
    pub const fn offscreen_target(&self) -> Option<&RenderTarget> {
        self.offscreen.as_ref()
    }

    /// Resize the presentation surface (or the off-screen target).
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context.resize(width, height);
        if self.offscreen.is_some() {
            self.offscreen = Some(RenderTarget::new(
                &self.context.device,
                width,
                height,
                self.context.format(),
            ));
        }
    }

    fn create_bind_group(&self, program: &Program) -> wgpu::BindGroup {
        let views: Vec<&wgpu::TextureView> = self
            .units
            .iter()
            .map(|unit| {
                unit.and_then(|id| self.textures.get(&id))
                    .map_or(&self.placeholder.view, |t| &t.view)
            })
            .collect();
        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: SAMPLER_BINDING,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: program.buffer.as_entire_binding(),
        });
        self.context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Adjustor Bind Group"),
                layout: &self.bind_group_layout,
                entries: &entries,
            })
    }

    fn acquire_frame(&mut self) -> Option<wgpu::SurfaceTexture> {
        match self.context.get_next_frame() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = self.context.size();
                self.context.resize(width, height);
                log::debug!("surface reconfigured, frame skipped");
                None
            }
            Err(e) => {
                log::warn!("failed to acquire frame: {e}");
                None
            }
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn capabilities(&self) -> DeviceCapabilities {
        capabilities_from_limits(&self.context.limits())
    }

    fn build_program(
        &mut self,
        defines: &ShaderDefines,
    ) -> Result<(), GpuError> {
        log::debug!("building adjustor program ({defines})");
        let shader = self.composer.compose(
            &self.context.device,
            "Adjustor Shader",
            ADJUSTOR_SOURCE,
            ADJUSTOR_PATH,
            defines,
        )?;
        let pipeline = create_quad_pipeline(
            &self.context.device,
            "Adjustor",
            &shader,
            self.context.format(),
            &[&self.bind_group_layout],
        );
        let layout = UniformLayout::new(defines.max_layers as usize);
        let block = UniformBlock::new(&layout);
        let buffer =
            self.context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Adjustor Uniforms"),
                size: layout.size() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        self.program = Some(Program {
            pipeline,
            layout,
            block,
            buffer,
        });
        Ok(())
    }

    fn upload_quad(&mut self, vertices: &[QuadVertex]) -> Result<(), GpuError> {
        if self.program.is_none() {
            return Err(GpuError::Geometry("no program bound".to_owned()));
        }
        let buffer = self.context.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );
        self.quad = Some(Quad {
            buffer,
            vertices: vertices.len() as u32,
        });
        Ok(())
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.program.as_ref()?.layout.locate(name)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if let Some(program) = self.program.as_mut() {
            let _ = program.block.write(location, value);
        }
    }

    fn create_texture(&mut self, placeholder: [u8; 4]) -> TextureId {
        let id = TextureId::new(self.next_texture);
        self.next_texture += 1;
        let texture = LayerTexture::solid(
            &self.context.device,
            &self.context.queue,
            "Layer Placeholder",
            placeholder,
        );
        let _ = self.textures.insert(id, texture);
        id
    }

    fn upload_texture(
        &mut self,
        texture: TextureId,
        image: &DecodedImage,
    ) -> Result<(), GpuError> {
        let max = self.context.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(GpuError::TextureTooLarge {
                width: image.width,
                height: image.height,
                max,
            });
        }
        if !self.textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        if image.width == 0 || image.height == 0 {
            return Err(GpuError::TextureUpload(format!(
                "{} has no pixels",
                image.name
            )));
        }
        let rgba = image.to_rgba8_flipped();
        let expected = image.width as usize * image.height as usize * 4;
        if rgba.len() != expected {
            return Err(GpuError::TextureUpload(format!(
                "{}: expected {expected} bytes, got {}",
                image.name,
                rgba.len()
            )));
        }
        let layer = LayerTexture::new(
            &self.context.device,
            &self.context.queue,
            &image.name,
            image.width,
            image.height,
            &rgba,
        );
        let _ = self.textures.insert(texture, layer);
        log::debug!(
            "uploaded {} ({}x{}) into texture {}",
            image.name,
            image.width,
            image.height,
            texture.raw()
        );
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => log::warn!("texture unit {unit} out of range"),
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        let _ = self.textures.remove(&texture);
        for unit in &mut self.units {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn draw_arrays(&mut self, vertex_count: u32) {
        let vertices = self.quad.as_ref().map_or(0, |q| q.vertices);
        if self.program.is_none() || vertex_count > vertices {
            log::warn!("draw of {vertex_count} vertices without geometry");
            return;
        }
        let frame = if self.context.has_surface() {
            match self.acquire_frame() {
                Some(frame) => Some(frame),
                None => return,
            }
        } else {
            None
        };
        if let Some(program) = self.program.as_mut() {
            if program.block.take_dirty() {
                self.context.queue.write_buffer(
                    &program.buffer,
                    0,
                    program.block.as_bytes(),
                );
            }
        }
        let (Some(program), Some(quad)) =
            (self.program.as_ref(), self.quad.as_ref())
        else {
            return;
        };

        let surface_view = frame.as_ref().map(|f| {
            f.texture
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        let (target, target_size) = match (&surface_view, &self.offscreen) {
            (Some(view), _) => (view, self.context.size()),
            (None, Some(offscreen)) => (&offscreen.view, offscreen.size()),
            (None, None) => return,
        };
        let bind_group = self.create_bind_group(program);
        let (width, height) = clamp_viewport(self.viewport, target_size);
        let [r, g, b, a] = self.clear_color.map(f64::from);

        let mut encoder = self.context.create_encoder();
        {
            let mut pass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Adjustor Pass"),
                    color_attachments: &[Some(
                        wgpu::RenderPassColorAttachment {
                            view: target,
                            depth_slice: None,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color {
                                    r,
                                    g,
                                    b,
                                    a,
                                }),
                                store: wgpu::StoreOp::Store,
                            },
                        },
                    )],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
            pass.set_viewport(0.0, 0.0, width, height, 0.0, 1.0);
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, quad.buffer.slice(..));
            pass.draw(0..vertex_count, 0..1);
        }
        self.context.submit(encoder);
        if let Some(frame) = frame {
            frame.present();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_cap_units_at_binding_count() {
        let limits = wgpu::Limits {
            max_sampled_textures_per_shader_stage: 32,
            max_texture_dimension_2d: 8192,
            ..wgpu::Limits::default()
        };
        let caps = capabilities_from_limits(&limits);
        assert_eq!(caps.max_texture_units, 16);
        assert_eq!(caps.max_combined_texture_units, 64);
        assert_eq!(caps.max_texture_size, 8192);
    }

    #[test]
    fn webgl2_limits_leave_fourteen_layers() {
        let caps =
            capabilities_from_limits(&wgpu::Limits::downlevel_webgl2_defaults());
        assert_eq!(caps.max_texture_units, 16);
        assert_eq!(
            caps.max_texture_units - crate::probe::RESERVED_TEXTURE_UNITS,
            14
        );
    }

    #[test]
    fn viewport_is_clamped_to_target() {
        assert_eq!(clamp_viewport((800, 400), (1024, 768)), (800.0, 400.0));
        assert_eq!(clamp_viewport((2000, 0), (1024, 768)), (1024.0, 1.0));
    }

    #[test]
    fn offscreen_backend_tracks_target_size() {
        // Machines without an adapter have nothing to exercise.
        let Ok(mut gpu) = pollster::block_on(WgpuBackend::offscreen(64, 32))
        else {
            return;
        };
        let target =
            |gpu: &WgpuBackend| gpu.offscreen_target().map(RenderTarget::size);
        assert_eq!(target(&gpu), Some((64, 32)));
        assert!(!gpu.context().has_surface());

        gpu.resize_surface(0, 10);
        assert_eq!(target(&gpu), Some((64, 32)));
        gpu.resize_surface(128, 96);
        assert_eq!(target(&gpu), Some((128, 96)));
        assert_eq!(gpu.context().size(), (128, 96));
    }
}
