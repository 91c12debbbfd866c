//! Device capability probe.
//!
//! Queried once at startup. The layer capacity is the number of texture
//! units minus those reserved for non-layer textures.

use crate::error::PhotoTuneError;
use crate::gpu::backend::GpuBackend;

/// Texture units reserved for non-layer textures by default.
pub const RESERVED_TEXTURE_UNITS: u32 = 2;

/// Hardware limits reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Texture units available to the fragment stage.
    pub max_texture_units: u32,
    /// Texture units available across all stages.
    pub max_combined_texture_units: u32,
    /// Largest supported 2D texture dimension.
    pub max_texture_size: u32,
}

impl DeviceCapabilities {
    /// Whether an image of the given size fits in one texture.
    #[must_use]
    pub const fn supports_size(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_size && height <= self.max_texture_size
    }
}

/// Probe result consumed by the layer stack and pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Raw limits.
    pub capabilities: DeviceCapabilities,
    /// Maximum number of simultaneously loaded layers.
    pub layer_capacity: usize,
}

/// Query the backend's limits and derive the layer capacity.
///
/// # Errors
///
/// Returns [`PhotoTuneError::InsufficientTextureUnits`] when the reserved
/// units leave no room for a single layer.
pub fn probe<B: GpuBackend>(
    gpu: &B,
    reserved_units: u32,
) -> Result<DeviceProfile, PhotoTuneError> {
    let capabilities = gpu.capabilities();
    log::info!(
        "[GPU] Max. available tex. units: {} ({} combined)",
        capabilities.max_texture_units,
        capabilities.max_combined_texture_units
    );
    log::info!("[GPU] Max. tex. size: {}", capabilities.max_texture_size);

    let layer_capacity =
        capabilities.max_texture_units.saturating_sub(reserved_units) as usize;
    if layer_capacity == 0 {
        return Err(PhotoTuneError::InsufficientTextureUnits {
            available: capabilities.max_texture_units,
            reserved: reserved_units,
        });
    }
    Ok(DeviceProfile {
        capabilities,
        layer_capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessBackend;

    #[test]
    fn capacity_reserves_two_units() {
        let gpu = HeadlessBackend::new(DeviceCapabilities {
            max_texture_units: 16,
            max_combined_texture_units: 32,
            max_texture_size: 4096,
        });
        let profile = probe(&gpu, RESERVED_TEXTURE_UNITS).unwrap();
        assert_eq!(profile.layer_capacity, 14);
        assert!(profile.capabilities.supports_size(4096, 10));
        assert!(!profile.capabilities.supports_size(4097, 10));
    }

    #[test]
    fn too_few_units_is_fatal() {
        let gpu = HeadlessBackend::new(DeviceCapabilities {
            max_texture_units: 2,
            max_combined_texture_units: 2,
            max_texture_size: 1024,
        });
        assert!(matches!(
            probe(&gpu, RESERVED_TEXTURE_UNITS),
            Err(PhotoTuneError::InsufficientTextureUnits {
                available: 2,
                reserved: 2
            })
        ));
    }
}
