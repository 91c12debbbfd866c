//! Ordered, capacity-bounded collection of layers.
//!
//! Index 0 is the bottom layer. A layer's index is also its texture unit and
//! uniform array slot, so removal compacts the stack and relocates every layer
//! above the hole.

use crate::events::{Notifier, UiEvent};
use crate::gpu::backend::{GpuBackend, TextureId};
use crate::layer::property::Property;
use crate::layer::Layer;

/// Layers loaded into the compositor.
#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<usize>,
    capacity: usize,
    label_prefix: String,
}

impl LayerStack {
    /// Empty stack holding at most `capacity` layers.
    #[must_use]
    pub fn new(capacity: usize, label_prefix: impl Into<String>) -> Self {
        Self {
            layers: Vec::with_capacity(capacity),
            active: None,
            capacity,
            label_prefix: label_prefix.into(),
        }
    }

    /// Append a layer owning `texture`, evicting the bottom layer first if
    /// the stack is full. Returns the new layer's id.
    pub fn insert<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        texture: TextureId,
        label: Option<String>,
    ) -> usize {
        if self.capacity > 0 && self.layers.len() >= self.capacity {
            log::warn!(
                "layer capacity {} reached, evicting bottom layer",
                self.capacity
            );
            self.remove_at(gpu, notifier, 0);
        }

        let id = self.layers.len();
        let label = label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| format!("{}{id}", self.label_prefix));
        let layer = Layer::new(gpu, id, label, texture);
        notifier.emit(UiEvent::LayerAdded {
            id,
            label: layer.label().to_owned(),
        });
        self.layers.push(layer);
        self.emit_count(notifier);
        id
    }

    /// The layer at `id`, or the active layer when `id` is `None`.
    /// Out-of-range ids are logged and yield nothing.
    #[must_use]
    pub fn get(&self, id: Option<usize>) -> Option<&Layer> {
        let index = self.resolve(id)?;
        self.layers.get(index)
    }

    /// Mutable form of [`LayerStack::get`].
    pub fn get_mut(&mut self, id: Option<usize>) -> Option<&mut Layer> {
        let index = self.resolve(id)?;
        self.layers.get_mut(index)
    }

    fn resolve(&self, id: Option<usize>) -> Option<usize> {
        match id {
            Some(index) if index < self.layers.len() => Some(index),
            Some(index) => {
                log::error!(
                    "layer {index} does not exist ({} loaded)",
                    self.layers.len()
                );
                None
            }
            None => self.active,
        }
    }

    /// Release and remove the layer at `id`. The active index is cleared when
    /// the removed layer was at or below it. Returns `false` if `id` is out of
    /// range.
    pub fn delete<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        id: usize,
    ) -> bool {
        if id >= self.layers.len() {
            log::error!("cannot delete layer {id}: out of range");
            return false;
        }
        self.remove_at(gpu, notifier, id);
        self.emit_count(notifier);
        true
    }

    fn remove_at<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        id: usize,
    ) {
        let layer = self.layers.remove(id);
        layer.release(gpu);
        for (index, shifted) in self.layers.iter_mut().enumerate().skip(id) {
            shifted.relocate(gpu, index);
        }
        if self.active.is_some_and(|active| id <= active) {
            self.active = None;
            notifier.emit(UiEvent::ActiveLayer { id: None });
        }
        notifier.emit(UiEvent::LayerRemoved { id });
        log::info!("Layer {id} deleted");
    }

    /// Make `id` the active layer and project its properties to the UI.
    /// No uniforms are pushed. Returns `false` if `id` is out of range.
    pub fn set_active(&mut self, notifier: &mut Notifier, id: usize) -> bool {
        let Some(layer) = self.layers.get(id) else {
            log::error!("cannot activate layer {id}: out of range");
            return false;
        };
        self.active = Some(id);
        notifier.emit(UiEvent::ActiveLayer { id: Some(id) });
        for desc in layer.properties().iter() {
            let property: Property = desc.property;
            notifier.emit(UiEvent::PropertySlider {
                property,
                value: desc.value,
            });
            notifier.emit(UiEvent::PropertyDisplay {
                property,
                text: desc.display(),
            });
            notifier.emit(UiEvent::PropertyEnabled {
                property,
                enabled: desc.enabled,
            });
        }
        true
    }

    fn emit_count(&self, notifier: &mut Notifier) {
        notifier.emit(UiEvent::LayerCount {
            count: self.layers.len(),
            capacity: self.capacity,
        });
    }

    /// Active layer index.
    #[must_use]
    pub const fn active(&self) -> Option<usize> {
        self.active
    }

    /// Maximum number of layers.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of loaded layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layers are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers bottom to top.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}
