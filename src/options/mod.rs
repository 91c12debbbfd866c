//! Centralized options with TOML file support.
//!
//! Render constants, layer defaults, viewer window settings and key bindings
//! are consolidated here. Every section uses `#[serde(default)]`, so a file
//! that only overrides `[layers]` leaves the rest at their defaults.

mod keybindings;
mod layers;
mod render;
mod viewer;

use std::path::Path;

pub use keybindings::KeybindingOptions;
pub use layers::LayerOptions;
pub use render::RenderOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use viewer::ViewerOptions;

use crate::error::PhotoTuneError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Compositor constants.
    pub render: RenderOptions,
    /// Layer creation and adjustment defaults.
    pub layers: LayerOptions,
    /// Viewer window settings.
    pub viewer: ViewerOptions,
    /// Keyboard binding options.
    #[schemars(skip)]
    pub keybindings: KeybindingOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::OptionsParse`] for malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, PhotoTuneError> {
        let mut opts: Self = toml::from_str(content)
            .map_err(|e| PhotoTuneError::OptionsParse(e.to_string()))?;
        opts.keybindings.rebuild_reverse_map();
        Ok(opts)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::Io`] if the file cannot be read, or
    /// [`PhotoTuneError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, PhotoTuneError> {
        let content =
            std::fs::read_to_string(path).map_err(PhotoTuneError::Io)?;
        Self::from_toml(&content)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError`] if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), PhotoTuneError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PhotoTuneError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PhotoTuneError::Io)?;
        }
        std::fs::write(path, content).map_err(PhotoTuneError::Io)
    }
}
