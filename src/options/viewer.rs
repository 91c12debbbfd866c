use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Native viewer window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Viewer", inline)]
#[serde(default)]
pub struct ViewerOptions {
    /// Window title.
    #[schemars(skip)]
    pub title: String,
    /// Initial inner width in logical pixels.
    #[schemars(title = "Width", range(min = 200, max = 7680))]
    pub width: u32,
    /// Initial inner height in logical pixels.
    #[schemars(title = "Height", range(min = 200, max = 4320))]
    pub height: u32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "phototune".to_owned(),
            width: 1024,
            height: 768,
        }
    }
}
