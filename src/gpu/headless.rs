//! In-memory backend.
//!
//! Implements [`GpuBackend`] without a device: uniform pushes, texture
//! bindings and draws are recorded so tests (and surface-less hosts) can
//! inspect exactly what the compositor asked for.

use rustc_hash::FxHashMap;

use crate::decode::DecodedImage;
use crate::gpu::backend::{
    GpuBackend, GpuError, QuadVertex, ShaderDefines, TextureId,
};
use crate::gpu::uniform::{UniformLayout, UniformLocation, UniformValue};
use crate::probe::DeviceCapabilities;

/// Contents of a recorded texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTexture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 rows, bottom row first.
    pub rgba: Vec<u8>,
}

/// Recording backend.
#[derive(Debug)]
pub struct HeadlessBackend {
    capabilities: DeviceCapabilities,
    layout: Option<UniformLayout>,
    defines: Option<ShaderDefines>,
    quad_vertices: usize,
    uniforms: FxHashMap<UniformLocation, UniformValue>,
    pushes: usize,
    kind_mismatches: usize,
    textures: FxHashMap<TextureId, HeadlessTexture>,
    next_texture: u32,
    units: FxHashMap<u32, TextureId>,
    viewport: (u32, u32),
    clear_color: [f32; 4],
    draws: usize,
    fail_program: bool,
    fail_uploads: bool,
}

impl HeadlessBackend {
    /// Backend reporting the given limits.
    #[must_use]
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            layout: None,
            defines: None,
            quad_vertices: 0,
            uniforms: FxHashMap::default(),
            pushes: 0,
            kind_mismatches: 0,
            textures: FxHashMap::default(),
            next_texture: 1,
            units: FxHashMap::default(),
            viewport: (0, 0),
            clear_color: [0.0; 4],
            draws: 0,
            fail_program: false,
            fail_uploads: false,
        }
    }

    /// Backend with `units` texture units and a 4096 maximum texture size.
    #[must_use]
    pub fn with_texture_units(units: u32) -> Self {
        Self::new(DeviceCapabilities {
            max_texture_units: units,
            max_combined_texture_units: units * 2,
            max_texture_size: 4096,
        })
    }

    /// Make the next [`GpuBackend::build_program`] fail.
    pub fn fail_program_build(&mut self, fail: bool) {
        self.fail_program = fail;
    }

    /// Make every [`GpuBackend::upload_texture`] fail.
    pub fn fail_texture_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    /// Last value pushed to a named uniform.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        let location = self.layout.as_ref()?.locate(name)?;
        self.uniforms.get(&location).copied()
    }

    /// Number of accepted uniform pushes.
    #[must_use]
    pub const fn push_count(&self) -> usize {
        self.pushes
    }

    /// Pushes rejected because the value kind did not match the uniform.
    #[must_use]
    pub const fn kind_mismatches(&self) -> usize {
        self.kind_mismatches
    }

    /// Texture bound to a unit.
    #[must_use]
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.units.get(&unit).copied()
    }

    /// Contents of a live texture.
    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&id)
    }

    /// Number of textures not yet deleted.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Current viewport.
    #[must_use]
    pub const fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Last clear color.
    #[must_use]
    pub const fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Number of draw calls issued.
    #[must_use]
    pub const fn draw_count(&self) -> usize {
        self.draws
    }

    /// Constants of the built program.
    #[must_use]
    pub const fn defines(&self) -> Option<&ShaderDefines> {
        self.defines.as_ref()
    }
}

impl GpuBackend for HeadlessBackend {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn build_program(
        &mut self,
        defines: &ShaderDefines,
    ) -> Result<(), GpuError> {
        if self.fail_program {
            return Err(GpuError::ProgramBuild(
                "headless program build disabled".to_owned(),
            ));
        }
        self.layout = Some(UniformLayout::new(defines.max_layers as usize));
        self.defines = Some(*defines);
        self.uniforms.clear();
        Ok(())
    }

    fn upload_quad(&mut self, vertices: &[QuadVertex]) -> Result<(), GpuError> {
        if self.layout.is_none() {
            return Err(GpuError::Geometry("no program bound".to_owned()));
        }
        self.quad_vertices = vertices.len();
        Ok(())
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.layout.as_ref()?.locate(name)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if value.kind() != location.kind() {
            self.kind_mismatches += 1;
            log::warn!(
                "uniform kind mismatch: declared {:?}, got {:?}",
                location.kind(),
                value.kind()
            );
            return;
        }
        self.pushes += 1;
        let _ = self.uniforms.insert(location, value);
    }

    fn create_texture(&mut self, placeholder: [u8; 4]) -> TextureId {
        let id = TextureId::new(self.next_texture);
        self.next_texture += 1;
        let _ = self.textures.insert(
            id,
            HeadlessTexture {
                width: 1,
                height: 1,
                rgba: placeholder.to_vec(),
            },
        );
        id
    }

    fn upload_texture(
        &mut self,
        texture: TextureId,
        image: &DecodedImage,
    ) -> Result<(), GpuError> {
        if !self.capabilities.supports_size(image.width, image.height) {
            return Err(GpuError::TextureTooLarge {
                width: image.width,
                height: image.height,
                max: self.capabilities.max_texture_size,
            });
        }
        if self.fail_uploads {
            return Err(GpuError::TextureUpload(
                "headless texture uploads disabled".to_owned(),
            ));
        }
        let slot = self
            .textures
            .get_mut(&texture)
            .ok_or(GpuError::UnknownTexture(texture))?;
        *slot = HeadlessTexture {
            width: image.width,
            height: image.height,
            rgba: image.to_rgba8_flipped(),
        };
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        let _ = self.units.insert(unit, texture);
    }

    fn delete_texture(&mut self, texture: TextureId) {
        let _ = self.textures.remove(&texture);
        self.units.retain(|_, bound| *bound != texture);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn draw_arrays(&mut self, vertex_count: u32) {
        if self.layout.is_none() || vertex_count as usize > self.quad_vertices {
            log::warn!("draw of {vertex_count} vertices without geometry");
            return;
        }
        self.draws += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::fixtures;

    fn defines() -> ShaderDefines {
        ShaderDefines {
            max_layers: 2,
            gauss_blur_max_radius: 5,
            checker_tile_width: 8,
        }
    }

    #[test]
    fn lookups_fail_before_program_build() {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        assert!(gpu.uniform_location("u_Hue[0]").is_none());
        assert!(gpu.upload_quad(&[]).is_err());
        gpu.build_program(&defines()).unwrap();
        assert!(gpu.uniform_location("u_Hue[0]").is_some());
        assert!(gpu.uniform_location("u_Hue[2]").is_none());
    }

    #[test]
    fn mismatched_kinds_are_counted_not_stored() {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        gpu.build_program(&defines()).unwrap();
        let loc = gpu.uniform_location("u_BlendMode[0]").unwrap();
        gpu.set_uniform(loc, UniformValue::Float(1.0));
        assert_eq!(gpu.kind_mismatches(), 1);
        assert_eq!(gpu.uniform("u_BlendMode[0]"), None);
        gpu.push_uniform(None, UniformValue::Int(1));
        assert_eq!(gpu.push_count(), 0);
    }

    #[test]
    fn oversized_upload_keeps_placeholder() {
        let mut gpu = HeadlessBackend::new(DeviceCapabilities {
            max_texture_units: 4,
            max_combined_texture_units: 8,
            max_texture_size: 2,
        });
        let tex = gpu.create_texture([45, 45, 45, 255]);
        let err = gpu
            .upload_texture(tex, &fixtures::rgba("big", 3, 1))
            .unwrap_err();
        assert_eq!(
            err,
            GpuError::TextureTooLarge {
                width: 3,
                height: 1,
                max: 2
            }
        );
        assert_eq!(gpu.texture(tex).unwrap().rgba, vec![45, 45, 45, 255]);
    }

    #[test]
    fn delete_unbinds_units() {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        let tex = gpu.create_texture([0; 4]);
        gpu.bind_texture(3, tex);
        assert_eq!(gpu.bound_texture(3), Some(tex));
        gpu.delete_texture(tex);
        assert_eq!(gpu.bound_texture(3), None);
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(
            gpu.upload_texture(tex, &fixtures::rgba("gone", 1, 1)),
            Err(GpuError::UnknownTexture(tex))
        );
    }
}
