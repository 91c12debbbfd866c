//! Keyboard input for the viewer.
//!
//! Key strings use the `winit::keyboard::KeyCode` debug format (`"Digit1"`,
//! `"ArrowUp"`, `"Tab"`). The [`InputProcessor`] keeps the currently
//! selected property and turns bound keys into engine calls; it has no
//! windowing dependency so it is exercised directly in tests.

use serde::{Deserialize, Serialize};

use crate::engine::PhotoEngine;
use crate::gpu::backend::GpuBackend;
use crate::layer::property::Property;
use crate::options::{KeybindingOptions, Options};

/// Discrete actions that can be bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// Select Brightness for adjustment.
    SelectBrightness,
    /// Select Contrast for adjustment.
    SelectContrast,
    /// Select Gamma for adjustment.
    SelectGamma,
    /// Select Saturation for adjustment.
    SelectSaturation,
    /// Select Hue for adjustment.
    SelectHue,
    /// Select GaussBlurRadius for adjustment.
    SelectBlur,
    /// Raise the selected property by one step.
    Increase,
    /// Lower the selected property by one step.
    Decrease,
    /// Toggle the selected property on the active layer.
    ToggleProperty,
    /// Activate the next layer.
    CycleLayer,
    /// Show or hide the active layer.
    ToggleVisibility,
    /// Advance the active layer's blend mode.
    CycleBlendMode,
    /// Remove the active layer.
    DeleteLayer,
    /// Force a redraw.
    Redraw,
}

impl KeyAction {
    const fn selects(self) -> Option<Property> {
        match self {
            Self::SelectBrightness => Some(Property::Brightness),
            Self::SelectContrast => Some(Property::Contrast),
            Self::SelectGamma => Some(Property::Gamma),
            Self::SelectSaturation => Some(Property::Saturation),
            Self::SelectHue => Some(Property::Hue),
            Self::SelectBlur => Some(Property::GaussBlurRadius),
            _ => None,
        }
    }
}

/// Converts key presses into engine calls.
#[derive(Debug, Clone)]
pub struct InputProcessor {
    selected: Property,
    step: f64,
    max_blur_radius: f64,
    bindings: KeybindingOptions,
}

impl InputProcessor {
    /// Processor using the step and bindings from `options`.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            selected: Property::Brightness,
            step: options.layers.adjust_step,
            max_blur_radius: f64::from(options.render.gauss_blur_max_radius),
            bindings: options.keybindings.clone(),
        }
    }

    /// Property the arrow keys currently adjust.
    #[must_use]
    pub const fn selected(&self) -> Property {
        self.selected
    }

    /// Look up `key` and apply its action. Returns whether the key was
    /// bound.
    pub fn handle_key_press<B: GpuBackend>(
        &mut self,
        key: &str,
        engine: &mut PhotoEngine<B>,
    ) -> bool {
        match self.bindings.lookup(key) {
            Some(action) => {
                self.apply(action, engine);
                true
            }
            None => false,
        }
    }

    /// Apply one action to the engine.
    pub fn apply<B: GpuBackend>(
        &mut self,
        action: KeyAction,
        engine: &mut PhotoEngine<B>,
    ) {
        if let Some(property) = action.selects() {
            self.selected = property;
            log::info!("adjusting {property}");
            return;
        }
        let active = engine.stack().active();
        match action {
            KeyAction::Increase => self.nudge(engine, 1.0),
            KeyAction::Decrease => self.nudge(engine, -1.0),
            KeyAction::ToggleProperty => {
                engine.toggle_property(self.selected.name());
            }
            KeyAction::CycleLayer => {
                let _ = engine.cycle_active_layer();
            }
            KeyAction::ToggleVisibility => {
                if let Some(id) = active {
                    let _ = engine.toggle_layer_visibility(id);
                }
            }
            KeyAction::CycleBlendMode => {
                if let Some(id) = active {
                    let _ = engine.cycle_blend_mode(id);
                }
            }
            KeyAction::DeleteLayer => {
                if let Some(id) = active {
                    let _ = engine.delete_layer(id);
                }
            }
            KeyAction::Redraw => {
                let _ = engine.request_redraw();
            }
            _ => {}
        }
    }

    fn nudge<B: GpuBackend>(&self, engine: &mut PhotoEngine<B>, direction: f64) {
        let Some(layer) = engine.stack().get(None) else {
            return;
        };
        let current = layer.properties().get(self.selected).value;
        let next = if self.selected == Property::GaussBlurRadius {
            (current + direction).clamp(0.0, self.max_blur_radius)
        } else {
            (current + direction * self.step).max(0.0)
        };
        engine.adjust_property(self.selected, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{engine, load};
    use crate::gpu::uniform::UniformValue;
    use crate::layer::BlendMode;

    #[test]
    fn digits_select_and_arrows_adjust() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        let mut input = InputProcessor::new(&Options::default());
        assert!(input.handle_key_press("Digit2", &mut e));
        assert_eq!(input.selected(), Property::Contrast);
        assert!(input.handle_key_press("ArrowUp", &mut e));
        assert_eq!(
            e.stack().get(None).unwrap().properties().get(Property::Contrast).value,
            105.0
        );
        assert!(!input.handle_key_press("KeyZ", &mut e));
    }

    #[test]
    fn blur_steps_by_one_within_bounds() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        let mut input = InputProcessor::new(&Options::default());
        input.apply(KeyAction::SelectBlur, &mut e);
        input.apply(KeyAction::Decrease, &mut e);
        assert_eq!(e.gpu().uniform("u_GaussBlurRadius[0]"), Some(UniformValue::Int(0)));
        for _ in 0..10 {
            input.apply(KeyAction::Increase, &mut e);
        }
        assert_eq!(e.gpu().uniform("u_GaussBlurRadius[0]"), Some(UniformValue::Int(5)));
    }

    #[test]
    fn layer_keys_act_on_active_layer() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        let _ = load(&mut e, "b", 4, 4);
        let mut input = InputProcessor::new(&Options::default());
        input.apply(KeyAction::CycleBlendMode, &mut e);
        assert_eq!(e.stack().layers()[1].blend_mode(), BlendMode::Screen);
        input.apply(KeyAction::ToggleVisibility, &mut e);
        assert!(!e.stack().layers()[1].is_visible());
        input.apply(KeyAction::DeleteLayer, &mut e);
        assert_eq!(e.stack().len(), 1);
        assert_eq!(e.stack().active(), None);
        input.apply(KeyAction::CycleLayer, &mut e);
        assert_eq!(e.stack().active(), Some(0));
    }
}
