//! Shader uniform naming contract and its storage layout.
//!
//! Every uniform the adjustor shader declares is addressed by the name the
//! layer code uses (`u_Brightness[2]`, `u_VpImgRes`, ...). [`UniformLayout`]
//! maps those names to byte offsets inside one uniform block so that backends
//! without named uniforms (wgpu) can still honor the contract. Per-layer
//! arrays use a 16-byte element stride to satisfy uniform address-space
//! alignment; the globals are packed into one trailing 16-byte row.

use rustc_hash::FxHashMap;

/// Per-layer sampler unit index.
pub const IMAGE: &str = "u_Image";
/// Shared viewport/image resolution (vec2).
pub const VP_IMG_RES: &str = "u_VpImgRes";
/// Packed enable flags for Brightness, Contrast, Gamma, Saturation (ivec4).
pub const FLAG_BR_CO_GA_SA: &str = "u_Flag_BrCoGaSa";
/// Packed enable flags for Hue, GaussBlurRadius (ivec2).
pub const FLAG_HU_GA: &str = "u_Flag_HuGa";
/// Per-layer visibility.
pub const LAYER_ENABLED: &str = "u_LayerEnabled";
/// Per-layer blend mode selector.
pub const BLEND_MODE: &str = "u_BlendMode";
/// Index of the active layer (`-1` when none).
pub const ACTIVE_LAYER: &str = "u_ActiveLayer";
/// Number of layers currently loaded.
pub const LAYERS_LOADED: &str = "u_LayersLoaded";

/// Byte stride of one element of a per-layer uniform array.
pub const ARRAY_STRIDE: usize = 16;

/// Per-layer arrays in declaration order. Must match `AdjustUniforms` in
/// `assets/shaders/adjustor.wgsl`.
const LAYER_ARRAYS: [(&str, UniformKind); 11] = [
    ("u_Brightness", UniformKind::Float),
    ("u_Contrast", UniformKind::Float),
    ("u_Gamma", UniformKind::Float),
    ("u_Saturation", UniformKind::Float),
    ("u_Hue", UniformKind::Float),
    ("u_GaussBlurRadius", UniformKind::Int),
    (FLAG_BR_CO_GA_SA, UniformKind::IVec4),
    (FLAG_HU_GA, UniformKind::IVec2),
    (LAYER_ENABLED, UniformKind::Int),
    (BLEND_MODE, UniformKind::Int),
    (IMAGE, UniformKind::Int),
];

/// Globals and their offset within the trailing row.
const GLOBALS: [(&str, UniformKind, usize); 3] = [
    (VP_IMG_RES, UniformKind::Vec2, 0),
    (ACTIVE_LAYER, UniformKind::Int, 8),
    (LAYERS_LOADED, UniformKind::Int, 12),
];

/// Build the name of one element of a per-layer uniform array.
#[must_use]
pub fn layer_uniform(base: &str, layer: usize) -> String {
    format!("{base}[{layer}]")
}

/// Scalar/vector type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `ivec2`
    IVec2,
    /// `ivec4`
    IVec4,
    /// `vec2`
    Vec2,
}

impl UniformKind {
    /// Size in bytes of a value of this kind.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Int | Self::Float => 4,
            Self::IVec2 | Self::Vec2 => 8,
            Self::IVec4 => 16,
        }
    }
}

/// A value pushed into a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Signed integer scalar.
    Int(i32),
    /// Float scalar.
    Float(f32),
    /// Two-component integer vector.
    IVec2([i32; 2]),
    /// Four-component integer vector.
    IVec4([i32; 4]),
    /// Two-component float vector.
    Vec2([f32; 2]),
}

impl UniformValue {
    /// The kind this value writes as.
    #[must_use]
    pub const fn kind(&self) -> UniformKind {
        match self {
            Self::Int(_) => UniformKind::Int,
            Self::Float(_) => UniformKind::Float,
            Self::IVec2(_) => UniformKind::IVec2,
            Self::IVec4(_) => UniformKind::IVec4,
            Self::Vec2(_) => UniformKind::Vec2,
        }
    }

    /// Native-endian byte image of the value.
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Int(v) => bytemuck::bytes_of(v),
            Self::Float(v) => bytemuck::bytes_of(v),
            Self::IVec2(v) => bytemuck::cast_slice(v),
            Self::IVec4(v) => bytemuck::cast_slice(v),
            Self::Vec2(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Resolved location of one uniform (or one array element) in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    offset: u32,
    kind: UniformKind,
}

impl UniformLocation {
    /// Byte offset of the uniform inside the block.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Declared kind of the uniform.
    #[must_use]
    pub const fn kind(self) -> UniformKind {
        self.kind
    }
}

/// Split `u_Name[3]` into (`u_Name`, `Some(3)`), `u_Name` into
/// (`u_Name`, `None`).
fn parse_name(name: &str) -> Option<(&str, Option<usize>)> {
    match name.strip_suffix(']') {
        Some(stripped) => {
            let (base, index) = stripped.split_once('[')?;
            Some((base, Some(index.parse().ok()?)))
        }
        None => Some((name, None)),
    }
}

/// Name → offset table for the adjustor uniform block.
#[derive(Debug, Clone)]
pub struct UniformLayout {
    max_layers: usize,
    arrays: FxHashMap<&'static str, (usize, UniformKind)>,
    globals: FxHashMap<&'static str, (usize, UniformKind)>,
}

impl UniformLayout {
    /// Layout for a program compiled with `MAX_LAYERS = max_layers`.
    #[must_use]
    pub fn new(max_layers: usize) -> Self {
        let max_layers = max_layers.max(1);
        let arrays = LAYER_ARRAYS
            .iter()
            .enumerate()
            .map(|(i, &(name, kind))| {
                (name, (i * max_layers * ARRAY_STRIDE, kind))
            })
            .collect();
        let globals_base = LAYER_ARRAYS.len() * max_layers * ARRAY_STRIDE;
        let globals = GLOBALS
            .iter()
            .map(|&(name, kind, offset)| (name, (globals_base + offset, kind)))
            .collect();
        Self {
            max_layers,
            arrays,
            globals,
        }
    }

    /// Length of every per-layer array.
    #[must_use]
    pub const fn max_layers(&self) -> usize {
        self.max_layers
    }

    /// Total block size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        LAYER_ARRAYS.len() * self.max_layers * ARRAY_STRIDE + ARRAY_STRIDE
    }

    /// Resolve a uniform name. A bare array name resolves to element 0;
    /// out-of-range indices and unknown names resolve to `None`.
    #[must_use]
    pub fn locate(&self, name: &str) -> Option<UniformLocation> {
        let (base, index) = parse_name(name)?;
        if let Some(&(offset, kind)) = self.arrays.get(base) {
            let index = index.unwrap_or(0);
            if index >= self.max_layers {
                return None;
            }
            return Some(UniformLocation {
                offset: (offset + index * ARRAY_STRIDE) as u32,
                kind,
            });
        }
        match (self.globals.get(base), index) {
            (Some(&(offset, kind)), None) => Some(UniformLocation {
                offset: offset as u32,
                kind,
            }),
            _ => None,
        }
    }
}

/// CPU-side mirror of the uniform block, uploaded to the GPU when dirty.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    /// Zeroed block sized for `layout`.
    #[must_use]
    pub fn new(layout: &UniformLayout) -> Self {
        Self {
            bytes: vec![0; layout.size()],
            dirty: true,
        }
    }

    /// Write a value at a location. Returns `false` (and leaves the block
    /// untouched) when the value kind does not match the declared kind.
    pub fn write(
        &mut self,
        location: UniformLocation,
        value: UniformValue,
    ) -> bool {
        if value.kind() != location.kind {
            log::warn!(
                "uniform kind mismatch at offset {}: declared {:?}, got {:?}",
                location.offset,
                location.kind,
                value.kind()
            );
            return false;
        }
        let start = location.offset as usize;
        let src = value.bytes();
        let Some(dst) = self.bytes.get_mut(start..start + src.len()) else {
            log::warn!("uniform write past end of block at offset {start}");
            return false;
        };
        dst.copy_from_slice(src);
        self.dirty = true;
        true
    }

    /// Raw block contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns whether the block changed since the last call, and clears the
    /// flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_elements_use_sixteen_byte_stride() {
        let layout = UniformLayout::new(4);
        let first = layout.locate("u_Contrast[0]").unwrap();
        let third = layout.locate("u_Contrast[2]").unwrap();
        assert_eq!(third.offset() - first.offset(), 32);
        assert_eq!(first.offset(), 4 * 16);
        assert_eq!(first.kind(), UniformKind::Float);
    }

    #[test]
    fn globals_follow_the_arrays() {
        let layout = UniformLayout::new(3);
        let base = 11 * 3 * 16;
        assert_eq!(layout.locate(VP_IMG_RES).unwrap().offset(), base as u32);
        assert_eq!(
            layout.locate(ACTIVE_LAYER).unwrap().offset(),
            base as u32 + 8
        );
        assert_eq!(
            layout.locate(LAYERS_LOADED).unwrap().offset(),
            base as u32 + 12
        );
        assert_eq!(layout.size(), base + 16);
    }

    #[test]
    fn out_of_range_and_unknown_names_do_not_resolve() {
        let layout = UniformLayout::new(2);
        assert!(layout.locate("u_Gamma[2]").is_none());
        assert!(layout.locate("u_Sharpness[0]").is_none());
        assert!(layout.locate("u_VpImgRes[0]").is_none());
        assert!(layout.locate("u_Gamma[x]").is_none());
        assert_eq!(layout.locate("u_Gamma"), layout.locate("u_Gamma[0]"));
    }

    #[test]
    fn block_rejects_mismatched_kinds() {
        let layout = UniformLayout::new(2);
        let mut block = UniformBlock::new(&layout);
        assert!(block.take_dirty());
        let loc = layout.locate("u_GaussBlurRadius[1]").unwrap();
        assert!(!block.write(loc, UniformValue::Float(2.0)));
        assert!(!block.take_dirty());
        assert!(block.write(loc, UniformValue::Int(3)));
        assert!(block.take_dirty());
        let start = loc.offset() as usize;
        assert_eq!(
            &block.as_bytes()[start..start + 4],
            bytemuck::bytes_of(&3i32)
        );
    }

    #[test]
    fn packed_flags_write_all_components() {
        let layout = UniformLayout::new(1);
        let mut block = UniformBlock::new(&layout);
        let loc = layout.locate(&layer_uniform(FLAG_BR_CO_GA_SA, 0)).unwrap();
        assert!(block.write(loc, UniformValue::IVec4([1, 0, 1, 1])));
        let start = loc.offset() as usize;
        let expected: &[u8] = bytemuck::cast_slice(&[1i32, 0, 1, 1]);
        assert_eq!(&block.as_bytes()[start..start + 16], expected);
    }
}
