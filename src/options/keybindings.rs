use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::input::KeyAction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Configurable keyboard bindings mapping actions to key codes.
pub struct KeybindingOptions {
    /// Maps action → key string (e.g. `CycleLayer` → `"Tab"`).
    pub bindings: HashMap<KeyAction, String>,
    /// Reverse lookup cache (key string → action). Rebuilt on load.
    #[serde(skip)]
    key_to_action: HashMap<String, KeyAction>,
}

impl Default for KeybindingOptions {
    fn default() -> Self {
        let bindings = HashMap::from([
            (KeyAction::SelectBrightness, "Digit1".into()),
            (KeyAction::SelectContrast, "Digit2".into()),
            (KeyAction::SelectGamma, "Digit3".into()),
            (KeyAction::SelectSaturation, "Digit4".into()),
            (KeyAction::SelectHue, "Digit5".into()),
            (KeyAction::SelectBlur, "Digit6".into()),
            (KeyAction::Increase, "ArrowUp".into()),
            (KeyAction::Decrease, "ArrowDown".into()),
            (KeyAction::ToggleProperty, "Space".into()),
            (KeyAction::CycleLayer, "Tab".into()),
            (KeyAction::ToggleVisibility, "KeyV".into()),
            (KeyAction::CycleBlendMode, "KeyB".into()),
            (KeyAction::DeleteLayer, "Delete".into()),
            (KeyAction::Redraw, "KeyR".into()),
        ]);

        let mut opts = Self {
            bindings,
            key_to_action: HashMap::new(),
        };
        opts.rebuild_reverse_map();
        opts
    }
}

impl KeybindingOptions {
    /// Rebuild the reverse lookup map (key string → action).
    pub fn rebuild_reverse_map(&mut self) {
        self.key_to_action.clear();
        for (action, key) in &self.bindings {
            let _ = self.key_to_action.insert(key.clone(), *action);
        }
    }

    /// Look up the action for a key string.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<KeyAction> {
        self.key_to_action.get(key).copied()
    }
}
