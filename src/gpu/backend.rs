//! The rendering-context seam.
//!
//! Every component that touches GPU state receives an explicit
//! `&mut impl GpuBackend`. The trait mirrors the small immediate-mode
//! vocabulary the compositor needs: named uniform lookup, uniform pushes,
//! texture units, and a single full-screen draw. Lookups of names the
//! program does not declare return `None`, and pushes to a `None` location
//! are skipped, the same way a null uniform location behaves in GL.

use std::fmt;

use crate::decode::DecodedImage;
use crate::gpu::uniform::{UniformLocation, UniformValue};
use crate::probe::DeviceCapabilities;

/// Opaque handle to a texture owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

impl TextureId {
    /// Wrap a backend-assigned texture number.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The backend-assigned texture number.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// One vertex of the full-screen quad: clip-space position + UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    /// Texture coordinate, origin at the bottom-left.
    pub uv: [f32; 2],
}

/// Preprocessor constants compiled into the adjustor shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderDefines {
    /// Length of every per-layer uniform array.
    pub max_layers: u32,
    /// Upper bound of the Gaussian blur kernel radius.
    pub gauss_blur_max_radius: u32,
    /// Width in pixels of one transparency checkerboard tile.
    pub checker_tile_width: u32,
}

impl ShaderDefines {
    /// `(name, value)` pairs in the order they appear in the shader header.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, u32); 3] {
        [
            ("MAX_LAYERS", self.max_layers),
            ("GAUSS_BLUR_MAX_RADIUS", self.gauss_blur_max_radius),
            ("CHECKER_TILE_WIDTH", self.checker_tile_width),
        ]
    }
}

impl fmt::Display for ShaderDefines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.pairs().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// Failures reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Shader compilation, composition or program link failed.
    ProgramBuild(String),
    /// Geometry could not be uploaded.
    Geometry(String),
    /// The image exceeds the device's maximum texture dimension.
    TextureTooLarge {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Largest supported texture dimension.
        max: u32,
    },
    /// The texture handle is not (or no longer) owned by the backend.
    UnknownTexture(TextureId),
    /// Any other texture upload failure.
    TextureUpload(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramBuild(msg) => {
                write!(f, "shader program build failed: {msg}")
            }
            Self::Geometry(msg) => write!(f, "geometry upload failed: {msg}"),
            Self::TextureTooLarge { width, height, max } => write!(
                f,
                "image {width}x{height} exceeds maximum texture size {max}"
            ),
            Self::UnknownTexture(id) => {
                write!(f, "unknown texture handle {}", id.raw())
            }
            Self::TextureUpload(msg) => {
                write!(f, "texture upload failed: {msg}")
            }
        }
    }
}

impl std::error::Error for GpuError {}

/// Immediate-mode GPU operations used by the compositor.
pub trait GpuBackend {
    /// Hardware limits relevant to layer capacity.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Compile and link the adjustor program with the given constants and
    /// make it current.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ProgramBuild`] if compilation or linking fails.
    fn build_program(&mut self, defines: &ShaderDefines)
        -> Result<(), GpuError>;

    /// Upload the full-screen quad used by every draw.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::Geometry`] if the program has not been built.
    fn upload_quad(&mut self, vertices: &[QuadVertex]) -> Result<(), GpuError>;

    /// Resolve a uniform by its contract name in the current program.
    fn uniform_location(&self, name: &str) -> Option<UniformLocation>;

    /// Write a uniform in the current program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Push to an optional location; `None` is a silent no-op.
    fn push_uniform(
        &mut self,
        location: Option<UniformLocation>,
        value: UniformValue,
    ) {
        if let Some(location) = location {
            self.set_uniform(location, value);
        }
    }

    /// Allocate a texture whose contents are a single solid RGBA pixel.
    fn create_texture(&mut self, placeholder: [u8; 4]) -> TextureId;

    /// Replace a texture's contents with a decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError`] if the texture is unknown or the image cannot be
    /// stored (for example, it exceeds the maximum texture size). The texture
    /// keeps its previous contents on failure.
    fn upload_texture(
        &mut self,
        texture: TextureId,
        image: &DecodedImage,
    ) -> Result<(), GpuError>;

    /// Bind a texture to a texture unit.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Release a texture. Units it was bound to fall back to the placeholder.
    fn delete_texture(&mut self, texture: TextureId);

    /// Set the drawing area within the surface.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Set the color the next draw clears to.
    fn clear(&mut self, color: [f32; 4]);

    /// Draw `vertex_count` vertices of the uploaded quad with the current
    /// program and uniform state.
    fn draw_arrays(&mut self, vertex_count: u32);
}
