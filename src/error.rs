//! Crate-level error types.

use std::fmt;

use crate::decode::DecodeError;
use crate::gpu::backend::GpuError;
use crate::gpu::render_context::RenderContextError;

/// Errors produced by the phototune crate.
#[derive(Debug)]
pub enum PhotoTuneError {
    /// GPU context initialization failure.
    Context(RenderContextError),
    /// Shader program, geometry or texture operation failure.
    Gpu(GpuError),
    /// An uploaded image could not be decoded.
    Decode(DecodeError),
    /// The device exposes too few texture units to hold a single layer.
    InsufficientTextureUnits {
        /// Texture units reported by the device.
        available: u32,
        /// Units reserved for non-layer textures.
        reserved: u32,
    },
    /// An upload was started while a previous one had not finished.
    UploadPending,
    /// An upload was finished with a ticket the engine did not issue last.
    StaleUpload,
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for PhotoTuneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(e) => write!(f, "GPU context error: {e}"),
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::InsufficientTextureUnits {
                available,
                reserved,
            } => write!(
                f,
                "device exposes {available} texture units, {reserved} are \
                 reserved; no room for image layers"
            ),
            Self::UploadPending => {
                write!(f, "an image upload is already in progress")
            }
            Self::StaleUpload => {
                write!(f, "upload ticket does not match the pending upload")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for PhotoTuneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context(e) => Some(e),
            Self::Gpu(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for PhotoTuneError {
    fn from(e: RenderContextError) -> Self {
        Self::Context(e)
    }
}

impl From<GpuError> for PhotoTuneError {
    fn from(e: GpuError) -> Self {
        Self::Gpu(e)
    }
}

impl From<DecodeError> for PhotoTuneError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<std::io::Error> for PhotoTuneError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
