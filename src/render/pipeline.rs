//! The shared adjustor program and the per-frame draw.

use crate::gpu::backend::{GpuBackend, GpuError, QuadVertex, ShaderDefines};
use crate::gpu::uniform::{
    UniformLocation, UniformValue, ACTIVE_LAYER, LAYERS_LOADED,
};
use crate::layer::Layer;

/// Background color behind transparent regions of the composite.
pub const CLEAR_COLOR: [f32; 4] = [0.62, 0.85, 1.0, 1.0];

/// Two triangles covering clip space, UV origin at the bottom-left.
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
];

/// Lifecycle of the pipeline. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Program not yet built.
    Uninitialized,
    /// Program linked and geometry uploaded.
    Ready,
    /// Initialization failed; the pipeline never draws.
    Failed,
}

/// Owns the compositing program and issues frame draws.
#[derive(Debug)]
pub struct RenderPipeline {
    state: PipelineState,
    defines: ShaderDefines,
    clear_color: [f32; 4],
    active_layer: Option<UniformLocation>,
    layers_loaded: Option<UniformLocation>,
}

impl RenderPipeline {
    /// An uninitialized pipeline for the given shader constants.
    #[must_use]
    pub const fn new(defines: ShaderDefines, clear_color: [f32; 4]) -> Self {
        Self {
            state: PipelineState::Uninitialized,
            defines,
            clear_color,
            active_layer: None,
            layers_loaded: None,
        }
    }

    /// Build the program and upload the quad. Calling this on a ready
    /// pipeline is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError`] when the program or geometry cannot be created,
    /// and on every call after a failed initialization.
    pub fn initialize<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
    ) -> Result<(), GpuError> {
        match self.state {
            PipelineState::Ready => return Ok(()),
            PipelineState::Failed => {
                return Err(GpuError::ProgramBuild(
                    "pipeline initialization previously failed".to_owned(),
                ))
            }
            PipelineState::Uninitialized => {}
        }

        let result = gpu
            .build_program(&self.defines)
            .and_then(|()| gpu.upload_quad(&QUAD_VERTICES));
        if let Err(e) = result {
            log::error!("render pipeline initialization failed: {e}");
            self.state = PipelineState::Failed;
            return Err(e);
        }

        self.active_layer = gpu.uniform_location(ACTIVE_LAYER);
        self.layers_loaded = gpu.uniform_location(LAYERS_LOADED);
        self.state = PipelineState::Ready;
        log::info!("render pipeline ready ({})", self.defines);
        Ok(())
    }

    /// Push `u_ActiveLayer` (`-1` when no layer is active).
    pub fn push_active_layer<B: GpuBackend>(
        &self,
        gpu: &mut B,
        active: Option<usize>,
    ) {
        let index = active.map_or(-1, |i| i as i32);
        gpu.push_uniform(self.active_layer, UniformValue::Int(index));
    }

    /// Push `u_LayersLoaded`.
    pub fn push_layer_count<B: GpuBackend>(&self, gpu: &mut B, count: usize) {
        gpu.push_uniform(self.layers_loaded, UniformValue::Int(count as i32));
    }

    /// Push both globals.
    pub fn push_globals<B: GpuBackend>(
        &self,
        gpu: &mut B,
        active: Option<usize>,
        count: usize,
    ) {
        self.push_active_layer(gpu, active);
        self.push_layer_count(gpu, count);
    }

    /// Bind every layer, clear, and draw the quad. Returns `false` when the
    /// pipeline is not ready.
    pub fn draw<B: GpuBackend>(&self, gpu: &mut B, layers: &[Layer]) -> bool {
        if self.state != PipelineState::Ready {
            log::warn!("draw skipped: pipeline is {:?}", self.state);
            return false;
        }
        for layer in layers {
            layer.bind_for_render(gpu);
        }
        gpu.clear(self.clear_color);
        gpu.draw_arrays(QUAD_VERTICES.len() as u32);
        log::trace!("Image rendered ({} layers)", layers.len());
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Shader constants the program was built with.
    #[must_use]
    pub const fn defines(&self) -> &ShaderDefines {
        &self.defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessBackend;

    fn defines() -> ShaderDefines {
        ShaderDefines {
            max_layers: 2,
            gauss_blur_max_radius: 5,
            checker_tile_width: 8,
        }
    }

    #[test]
    fn draw_requires_initialization() {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        let mut pipeline = RenderPipeline::new(defines(), CLEAR_COLOR);
        assert!(!pipeline.draw(&mut gpu, &[]));
        pipeline.initialize(&mut gpu).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert!(pipeline.draw(&mut gpu, &[]));
        assert!(pipeline.draw(&mut gpu, &[]));
        assert_eq!(gpu.draw_count(), 2);
        assert_eq!(gpu.clear_color(), CLEAR_COLOR);
        assert_eq!(gpu.defines(), Some(&defines()));
    }

    #[test]
    fn failed_initialization_is_terminal() {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        gpu.fail_program_build(true);
        let mut pipeline = RenderPipeline::new(defines(), CLEAR_COLOR);
        assert!(pipeline.initialize(&mut gpu).is_err());
        gpu.fail_program_build(false);
        assert!(pipeline.initialize(&mut gpu).is_err());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(!pipeline.draw(&mut gpu, &[]));
    }

    #[test]
    fn globals_push_active_and_count() {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        let mut pipeline = RenderPipeline::new(defines(), CLEAR_COLOR);
        pipeline.initialize(&mut gpu).unwrap();
        pipeline.push_globals(&mut gpu, Some(1), 2);
        assert_eq!(gpu.uniform("u_ActiveLayer"), Some(UniformValue::Int(1)));
        assert_eq!(gpu.uniform("u_LayersLoaded"), Some(UniformValue::Int(2)));
        pipeline.push_active_layer(&mut gpu, None);
        assert_eq!(gpu.uniform("u_ActiveLayer"), Some(UniformValue::Int(-1)));
    }
}
