use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::probe::RESERVED_TEXTURE_UNITS;
use crate::render::pipeline::CLEAR_COLOR;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Render", inline)]
#[serde(default)]
/// Compositor constants.
pub struct RenderOptions {
    /// Background RGBA behind the composite.
    #[schemars(skip)]
    pub clear_color: [f32; 4],
    /// Upper bound of the Gaussian blur kernel radius.
    #[schemars(title = "Max Blur Radius", range(min = 1, max = 16))]
    pub gauss_blur_max_radius: u32,
    /// Checkerboard tile width in pixels for transparent regions.
    #[schemars(title = "Checker Tile Width", range(min = 1, max = 64))]
    pub checker_tile_width: u32,
    /// Texture units kept back from the layer capacity.
    #[schemars(skip)]
    pub reserved_texture_units: u32,
    /// Grow the surface to fill its container at the image aspect ratio.
    /// When off, images are only ever shrunk to fit.
    #[schemars(title = "Fill Container")]
    pub fill_container: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            clear_color: CLEAR_COLOR,
            gauss_blur_max_radius: 5,
            checker_tile_width: 8,
            reserved_texture_units: RESERVED_TEXTURE_UNITS,
            fill_container: true,
        }
    }
}
