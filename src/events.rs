//! Notifications from the domain to whatever presents it.
//!
//! Layers and the layer stack never touch widgets. They emit [`UiEvent`]s
//! into a [`Notifier`]; the viewer, the web bindings, or a test drains them.

use serde::Serialize;

use crate::layer::property::Property;
use crate::layer::BlendMode;
use crate::render::redraw::RedrawScheduler;

/// A change the presentation layer should reflect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Formatted transformed value of a property (`"1.17"`, `"3"`).
    PropertyDisplay {
        /// Property whose label changed.
        property: Property,
        /// Formatted display text.
        text: String,
    },
    /// Raw slider position of a property.
    PropertySlider {
        /// Property whose slider moved.
        property: Property,
        /// Raw (untransformed) value.
        value: f64,
    },
    /// Enabled checkbox of a property.
    PropertyEnabled {
        /// Property whose checkbox changed.
        property: Property,
        /// New state.
        enabled: bool,
    },
    /// A layer was appended to the stack.
    LayerAdded {
        /// Slot of the new layer.
        id: usize,
        /// Display label.
        label: String,
    },
    /// A layer was removed; every layer above it moved down one slot.
    LayerRemoved {
        /// Slot the layer occupied.
        id: usize,
    },
    /// Loaded layer count against capacity (`Layers 3/14`).
    LayerCount {
        /// Layers loaded.
        count: usize,
        /// Maximum layers.
        capacity: usize,
    },
    /// The active layer changed.
    ActiveLayer {
        /// New active slot, `None` when cleared.
        id: Option<usize>,
    },
    /// A layer was shown or hidden.
    LayerVisibility {
        /// Layer slot.
        id: usize,
        /// Whether the layer is drawn.
        visible: bool,
    },
    /// A layer's blend mode changed.
    LayerBlendMode {
        /// Layer slot.
        id: usize,
        /// New mode.
        mode: BlendMode,
    },
    /// Line for the on-screen console.
    Log {
        /// Message text.
        message: String,
        /// Rendered as an error.
        is_error: bool,
    },
}

/// Event sink plus the redraw scheduler that domain operations poke.
#[derive(Debug, Default)]
pub struct Notifier {
    events: Vec<UiEvent>,
    redraw: RedrawScheduler,
}

impl Notifier {
    /// Empty notifier with no pending redraw.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event.
    pub fn emit(&mut self, event: UiEvent) {
        self.events.push(event);
    }

    /// Write to the on-screen console and the log.
    pub fn console(&mut self, message: impl Into<String>, is_error: bool) {
        let message = message.into();
        if is_error {
            log::error!("{message}");
        } else {
            log::info!("{message}");
        }
        self.emit(UiEvent::Log { message, is_error });
    }

    /// Ask for a redraw on the next refresh. See [`RedrawScheduler::request`].
    pub fn request_redraw(&mut self) -> bool {
        self.redraw.request()
    }

    /// Events queued since the last drain.
    #[must_use]
    pub fn events(&self) -> &[UiEvent] {
        &self.events
    }

    /// Take all queued events.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    /// The redraw scheduler.
    #[must_use]
    pub const fn redraw(&self) -> &RedrawScheduler {
        &self.redraw
    }

    /// Mutable access to the redraw scheduler.
    pub fn redraw_mut(&mut self) -> &mut RedrawScheduler {
        &mut self.redraw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let mut n = Notifier::new();
        n.emit(UiEvent::LayerRemoved { id: 1 });
        n.console("hello", false);
        assert_eq!(n.events().len(), 2);
        let drained = n.drain();
        assert_eq!(drained.len(), 2);
        assert!(n.events().is_empty());
        assert_eq!(
            drained[1],
            UiEvent::Log {
                message: "hello".to_owned(),
                is_error: false
            }
        );
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_value(UiEvent::PropertyDisplay {
            property: Property::Brightness,
            text: "1.17".to_owned(),
        })
        .unwrap();
        assert_eq!(json["type"], "property_display");
        assert_eq!(json["property"], "Brightness");
        assert_eq!(json["text"], "1.17");

        let json =
            serde_json::to_value(UiEvent::ActiveLayer { id: None }).unwrap();
        assert!(json["id"].is_null());
    }

    #[test]
    fn redraw_requests_coalesce() {
        let mut n = Notifier::new();
        assert!(n.request_redraw());
        assert!(!n.request_redraw());
        assert!(n.redraw().is_pending());
        assert!(n.redraw_mut().take());
    }
}
