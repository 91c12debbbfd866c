//! User-action handlers: adjustments, layer selection and layer edits.

use super::PhotoEngine;
use crate::gpu::backend::GpuBackend;
use crate::layer::property::Property;
use crate::layer::BlendMode;

impl<B: GpuBackend> PhotoEngine<B> {
    /// Set a property of the active layer by name. Unknown names and a
    /// missing active layer are logged and ignored.
    pub fn adjust(&mut self, name: &str, raw: f64) {
        let Some(layer) = self.stack.get_mut(None) else {
            log::warn!("adjust {name}: no active layer");
            return;
        };
        if layer
            .set_value_by_name(&mut self.gpu, &mut self.notifier, name, raw)
            .is_some()
        {
            let _ = self.notifier.request_redraw();
        }
    }

    /// Typed form of [`PhotoEngine::adjust`].
    pub fn adjust_property(&mut self, property: Property, raw: f64) {
        self.adjust(property.name(), raw);
    }

    /// Toggle a property of the active layer by name.
    pub fn toggle_property(&mut self, name: &str) {
        self.set_property_enabled(name, None);
    }

    /// Set (or toggle, with `None`) a property's enabled flag on the active
    /// layer.
    pub fn set_property_enabled(&mut self, name: &str, enabled: Option<bool>) {
        let Some(layer) = self.stack.get_mut(None) else {
            log::warn!("toggle {name}: no active layer");
            return;
        };
        if layer
            .set_enabled_by_name(&mut self.gpu, &mut self.notifier, name, enabled)
            .is_some()
        {
            let _ = self.notifier.request_redraw();
        }
    }

    /// Make `id` the active layer. Returns `false` if it does not exist.
    pub fn select_layer(&mut self, id: usize) -> bool {
        if !self.stack.set_active(&mut self.notifier, id) {
            return false;
        }
        self.pipeline.push_active_layer(&mut self.gpu, Some(id));
        let _ = self.notifier.request_redraw();
        true
    }

    /// Activate the layer above the active one, wrapping to the bottom.
    /// Selects the bottom layer when none is active.
    pub fn cycle_active_layer(&mut self) -> Option<usize> {
        if self.stack.is_empty() {
            return None;
        }
        let next = self
            .stack
            .active()
            .map_or(0, |active| (active + 1) % self.stack.len());
        self.select_layer(next).then_some(next)
    }

    /// Toggle a layer's visibility. Returns the new state.
    pub fn toggle_layer_visibility(&mut self, id: usize) -> Option<bool> {
        let layer = self.stack.get_mut(Some(id))?;
        Some(layer.set_visibility(&mut self.gpu, &mut self.notifier, None))
    }

    /// Change a layer's blend mode.
    pub fn set_blend_mode(&mut self, id: usize, mode: BlendMode) -> bool {
        let Some(layer) = self.stack.get_mut(Some(id)) else {
            return false;
        };
        layer.set_blend_mode(&mut self.gpu, &mut self.notifier, mode);
        true
    }

    /// Advance a layer to the next blend mode. Returns the new mode.
    pub fn cycle_blend_mode(&mut self, id: usize) -> Option<BlendMode> {
        let mode = self.stack.get(Some(id))?.blend_mode().next();
        self.set_blend_mode(id, mode).then_some(mode)
    }

    /// Remove a layer. Layers above it move down one slot; the active layer
    /// is cleared when it was at or above the removed slot.
    pub fn delete_layer(&mut self, id: usize) -> bool {
        if !self.stack.delete(&mut self.gpu, &mut self.notifier, id) {
            return false;
        }
        self.pipeline.push_globals(
            &mut self.gpu,
            self.stack.active(),
            self.stack.len(),
        );
        let _ = self.notifier.request_redraw();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{engine, load};
    use crate::events::UiEvent;
    use crate::gpu::uniform::UniformValue;
    use crate::layer::BlendMode;

    #[test]
    fn adjust_targets_active_layer() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        let _ = load(&mut e, "b", 4, 4);
        assert!(e.select_layer(0));
        e.adjust("Brightness", 300.0);
        assert_eq!(
            e.gpu().uniform("u_Brightness[0]"),
            Some(UniformValue::Float(1.171_875))
        );
        assert_eq!(
            e.gpu().uniform("u_Brightness[1]"),
            Some(UniformValue::Float(0.003_906_25))
        );
        assert_eq!(e.gpu().uniform("u_ActiveLayer"), Some(UniformValue::Int(0)));
    }

    #[test]
    fn unknown_property_and_missing_layer_are_ignored() {
        let mut e = engine(6);
        let _ = e.on_frame();
        e.adjust("Gamma", 50.0);
        assert!(!e.redraw_pending());
        let _ = load(&mut e, "a", 4, 4);
        let _ = e.on_frame();
        let pushes = e.gpu().push_count();
        e.adjust("Vibrance", 1.0);
        e.toggle_property("Vibrance");
        assert_eq!(e.gpu().push_count(), pushes);
        assert!(!e.redraw_pending());
    }

    #[test]
    fn toggle_property_flips_packed_flags() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        e.toggle_property("Gamma");
        assert_eq!(
            e.gpu().uniform("u_Flag_BrCoGaSa[0]"),
            Some(UniformValue::IVec4([1, 1, 0, 1]))
        );
        e.set_property_enabled("Gamma", Some(true));
        assert_eq!(
            e.gpu().uniform("u_Flag_BrCoGaSa[0]"),
            Some(UniformValue::IVec4([1, 1, 1, 1]))
        );
    }

    #[test]
    fn delete_below_active_clears_and_pushes_globals() {
        let mut e = engine(6);
        for name in ["a", "b", "c"] {
            let _ = load(&mut e, name, 4, 4);
        }
        assert_eq!(e.stack().active(), Some(2));
        assert!(e.delete_layer(0));
        assert_eq!(e.stack().active(), None);
        assert_eq!(e.gpu().uniform("u_ActiveLayer"), Some(UniformValue::Int(-1)));
        assert_eq!(e.gpu().uniform("u_LayersLoaded"), Some(UniformValue::Int(2)));
        assert!(!e.delete_layer(7));
    }

    #[test]
    fn cycling_layers_and_blend_modes() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        let _ = load(&mut e, "b", 4, 4);
        assert_eq!(e.cycle_active_layer(), Some(0));
        assert_eq!(e.cycle_active_layer(), Some(1));
        assert_eq!(e.cycle_blend_mode(1), Some(BlendMode::Screen));
        assert_eq!(e.gpu().uniform("u_BlendMode[1]"), Some(UniformValue::Int(1)));
        assert_eq!(e.cycle_blend_mode(9), None);
    }

    #[test]
    fn visibility_toggle_requests_redraw() {
        let mut e = engine(6);
        let _ = load(&mut e, "a", 4, 4);
        let _ = e.on_frame();
        let _ = e.drain_notifications();
        assert_eq!(e.toggle_layer_visibility(0), Some(false));
        assert!(e.redraw_pending());
        assert_eq!(e.toggle_layer_visibility(3), None);
        assert!(e.drain_notifications().contains(&UiEvent::LayerVisibility {
            id: 0,
            visible: false
        }));
    }
}
