use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Layer creation and adjustment defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Layers", inline)]
#[serde(default)]
pub struct LayerOptions {
    /// Prefix of generated labels (`Layer0`, `Layer1`, ...).
    #[schemars(title = "Label Prefix")]
    pub label_prefix: String,
    /// RGBA shown while an image is uploading or after an upload fails.
    #[schemars(skip)]
    pub placeholder_color: [u8; 4],
    /// Raw value change per key press in the viewer.
    #[schemars(title = "Adjust Step", range(min = 1.0, max = 50.0), extend("step" = 1.0))]
    pub adjust_step: f64,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            label_prefix: "Layer".to_owned(),
            placeholder_color: [45, 45, 45, 255],
            adjust_step: 5.0,
        }
    }
}
