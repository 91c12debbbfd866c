//! Image layers and their shader bindings.
//!
//! A [`Layer`] owns one texture and a [`PropertySet`]. Its slot (`id`) is
//! both its texture unit and its index into every per-layer uniform array,
//! so every uniform push goes to `u_<Name>[id]`.

/// Adjustment properties and the property update protocol.
pub mod property;
/// Fixed-capacity ordered layer collection.
pub mod stack;

use std::fmt;

use serde::Serialize;

use crate::events::{Notifier, UiEvent};
use crate::gpu::backend::{GpuBackend, TextureId};
use crate::gpu::uniform::{
    layer_uniform, UniformLocation, UniformValue, BLEND_MODE, IMAGE,
    LAYER_ENABLED, VP_IMG_RES,
};
use property::{Property, PropertyDescriptor, PropertySet};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Construct from dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `width / height`, or 1.0 for a degenerate height.
    #[must_use]
    pub fn aspect_ratio(self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a layer composites onto the layers below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Source over destination.
    #[default]
    Normal,
    /// `1 - (1 - a)(1 - b)`
    Screen,
    /// `a * b`
    Multiply,
}

impl BlendMode {
    /// All modes in shader selector order.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Screen, Self::Multiply];

    /// Shader selector value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Screen => 1,
            Self::Multiply => 2,
        }
    }

    /// Mode for a shader selector value.
    #[must_use]
    pub const fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::Screen),
            2 => Some(Self::Multiply),
            _ => None,
        }
    }

    /// The next mode, wrapping around.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Normal => Self::Screen,
            Self::Screen => Self::Multiply,
            Self::Multiply => Self::Normal,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Screen => "screen",
            Self::Multiply => "multiply",
        }
    }
}

/// Per-layer uniform locations other than the property values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerBindings {
    /// `u_Image[id]`
    pub image: Option<UniformLocation>,
    /// `u_LayerEnabled[id]`
    pub enabled: Option<UniformLocation>,
    /// `u_BlendMode[id]`
    pub blend_mode: Option<UniformLocation>,
    /// `u_VpImgRes`
    pub vp_img_res: Option<UniformLocation>,
}

impl LayerBindings {
    fn resolve<B: GpuBackend>(gpu: &B, id: usize) -> Self {
        Self {
            image: gpu.uniform_location(&layer_uniform(IMAGE, id)),
            enabled: gpu.uniform_location(&layer_uniform(LAYER_ENABLED, id)),
            blend_mode: gpu.uniform_location(&layer_uniform(BLEND_MODE, id)),
            vp_img_res: gpu.uniform_location(VP_IMG_RES),
        }
    }
}

/// One loaded image and its adjustment state.
#[derive(Debug)]
pub struct Layer {
    id: usize,
    label: String,
    texture: TextureId,
    resolution: Resolution,
    aspect_ratio: f64,
    properties: PropertySet,
    enabled: bool,
    blend_mode: BlendMode,
    bindings: LayerBindings,
}

impl Layer {
    /// Create a layer in slot `id` and push its initial state.
    pub fn new<B: GpuBackend>(
        gpu: &mut B,
        id: usize,
        label: impl Into<String>,
        texture: TextureId,
    ) -> Self {
        let mut layer = Self {
            id,
            label: label.into(),
            texture,
            resolution: Resolution::default(),
            aspect_ratio: 1.0,
            properties: PropertySet::default(),
            enabled: true,
            blend_mode: BlendMode::Normal,
            bindings: LayerBindings::default(),
        };
        layer.initialize(gpu);
        log::info!("Layer {} created", layer.label);
        layer
    }

    /// Resolve binding slots for the current id and push every generic
    /// property value, the packed flags, visibility and the sampler unit.
    fn initialize<B: GpuBackend>(&mut self, gpu: &mut B) {
        self.bindings = LayerBindings::resolve(gpu, self.id);
        self.properties.resolve_slots(gpu, self.id);
        for p in Property::ALL {
            self.properties.push_value(gpu, p);
        }
        self.properties.push_flags(gpu);
        gpu.push_uniform(
            self.bindings.enabled,
            UniformValue::Int(i32::from(self.enabled)),
        );
        gpu.push_uniform(self.bindings.image, UniformValue::Int(self.id as i32));
    }

    /// Move the layer to a new slot, re-resolving bindings and re-pushing
    /// its full state (including visibility and blend mode) there.
    pub fn relocate<B: GpuBackend>(&mut self, gpu: &mut B, id: usize) {
        if id == self.id {
            return;
        }
        log::debug!("Layer {} moves from slot {} to {}", self.label, self.id, id);
        self.id = id;
        self.initialize(gpu);
        gpu.push_uniform(
            self.bindings.blend_mode,
            UniformValue::Int(self.blend_mode.as_i32()),
        );
    }

    /// Bind the layer texture to unit `id`. `u_Image[id]` is pushed when
    /// the slot is assigned.
    pub fn bind_for_render<B: GpuBackend>(&self, gpu: &mut B) {
        gpu.bind_texture(self.id as u32, self.texture);
    }

    /// Record the drawing resolution and push `u_VpImgRes`.
    pub fn set_resolution<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        resolution: Resolution,
    ) {
        self.resolution = resolution;
        self.aspect_ratio = resolution.aspect_ratio();
        gpu.push_uniform(
            self.bindings.vp_img_res,
            UniformValue::Vec2([
                resolution.width as f32,
                resolution.height as f32,
            ]),
        );
    }

    /// Change how the layer composites. Requests a redraw.
    pub fn set_blend_mode<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        mode: BlendMode,
    ) {
        self.blend_mode = mode;
        gpu.push_uniform(
            self.bindings.blend_mode,
            UniformValue::Int(mode.as_i32()),
        );
        notifier.emit(UiEvent::LayerBlendMode { id: self.id, mode });
        let _ = notifier.request_redraw();
    }

    /// Show, hide, or (with `None`) toggle the layer. Requests a redraw.
    pub fn set_visibility<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        enabled: Option<bool>,
    ) -> bool {
        self.enabled = enabled.unwrap_or(!self.enabled);
        gpu.push_uniform(
            self.bindings.enabled,
            UniformValue::Int(i32::from(self.enabled)),
        );
        notifier.emit(UiEvent::LayerVisibility {
            id: self.id,
            visible: self.enabled,
        });
        let _ = notifier.request_redraw();
        self.enabled
    }

    /// Set a property's raw value, push it, and emit its display text.
    pub fn set_value<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        property: Property,
        raw: f64,
    ) -> &PropertyDescriptor {
        let desc = self.properties.set_value(gpu, property, raw);
        notifier.emit(UiEvent::PropertyDisplay {
            property,
            text: desc.display(),
        });
        desc
    }

    /// [`Layer::set_value`] by property name. Unknown names are logged and
    /// ignored.
    pub fn set_value_by_name<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        name: &str,
        raw: f64,
    ) -> Option<&PropertyDescriptor> {
        match name.parse::<Property>() {
            Ok(property) => Some(self.set_value(gpu, notifier, property, raw)),
            Err(e) => {
                log::error!("{e}");
                None
            }
        }
    }

    /// Set or toggle a property's enabled flag and push the packed flags.
    pub fn set_enabled<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        property: Property,
        value: Option<bool>,
    ) -> bool {
        let enabled = self.properties.set_enabled(gpu, property, value);
        notifier.emit(UiEvent::PropertyEnabled { property, enabled });
        enabled
    }

    /// [`Layer::set_enabled`] by property name. Unknown names are logged and
    /// ignored.
    pub fn set_enabled_by_name<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        notifier: &mut Notifier,
        name: &str,
        value: Option<bool>,
    ) -> Option<bool> {
        match name.parse::<Property>() {
            Ok(property) => Some(self.set_enabled(gpu, notifier, property, value)),
            Err(e) => {
                log::error!("{e}");
                None
            }
        }
    }

    /// Release the layer's texture.
    pub fn release<B: GpuBackend>(self, gpu: &mut B) {
        gpu.delete_texture(self.texture);
        log::debug!("Layer {} released", self.label);
    }

    /// Current slot.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Texture handle.
    #[must_use]
    pub const fn texture(&self) -> TextureId {
        self.texture
    }

    /// Drawing resolution.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// `width / height` of [`Layer::resolution`].
    #[must_use]
    pub const fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Adjustment properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Whether the layer is drawn.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.enabled
    }

    /// Compositing mode.
    #[must_use]
    pub const fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Resolved per-layer locations.
    #[must_use]
    pub const fn bindings(&self) -> &LayerBindings {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessBackend;

    fn ready_gpu() -> HeadlessBackend {
        let mut gpu = HeadlessBackend::with_texture_units(4);
        gpu.build_program(&crate::gpu::backend::ShaderDefines {
            max_layers: 2,
            gauss_blur_max_radius: 5,
            checker_tile_width: 8,
        })
        .unwrap();
        gpu
    }

    fn layer(gpu: &mut HeadlessBackend, id: usize) -> Layer {
        let tex = gpu.create_texture([45, 45, 45, 255]);
        Layer::new(gpu, id, format!("Layer{id}"), tex)
    }

    #[test]
    fn initialize_pushes_defaults() {
        let mut gpu = ready_gpu();
        let _layer = layer(&mut gpu, 1);
        assert_eq!(
            gpu.uniform("u_Brightness[1]"),
            Some(UniformValue::Float(0.003_906_25))
        );
        assert_eq!(gpu.uniform("u_Contrast[1]"), Some(UniformValue::Float(1.0)));
        assert_eq!(
            gpu.uniform("u_GaussBlurRadius[1]"),
            Some(UniformValue::Int(0))
        );
        assert_eq!(
            gpu.uniform("u_Flag_BrCoGaSa[1]"),
            Some(UniformValue::IVec4([1, 1, 1, 1]))
        );
        assert_eq!(
            gpu.uniform("u_Flag_HuGa[1]"),
            Some(UniformValue::IVec2([1, 1]))
        );
        assert_eq!(gpu.uniform("u_LayerEnabled[1]"), Some(UniformValue::Int(1)));
        assert_eq!(gpu.uniform("u_Brightness[0]"), None);
    }

    #[test]
    fn set_value_pushes_transformed_and_displays() {
        let mut gpu = ready_gpu();
        let mut notifier = Notifier::new();
        let mut l = layer(&mut gpu, 0);

        let _ = l.set_value(&mut gpu, &mut notifier, Property::GaussBlurRadius, 3.0);
        assert_eq!(
            gpu.uniform("u_GaussBlurRadius[0]"),
            Some(UniformValue::Int(3))
        );
        let _ = l.set_value(&mut gpu, &mut notifier, Property::Brightness, 300.0);
        assert_eq!(
            gpu.uniform("u_Brightness[0]"),
            Some(UniformValue::Float(1.171_875))
        );
        assert_eq!(
            notifier.events().last(),
            Some(&UiEvent::PropertyDisplay {
                property: Property::Brightness,
                text: "1.17".to_owned()
            })
        );
    }

    #[test]
    fn unknown_property_is_a_no_op() {
        let mut gpu = ready_gpu();
        let mut notifier = Notifier::new();
        let mut l = layer(&mut gpu, 0);
        let pushes = gpu.push_count();
        assert!(l
            .set_value_by_name(&mut gpu, &mut notifier, "Sharpness", 5.0)
            .is_none());
        assert!(l
            .set_enabled_by_name(&mut gpu, &mut notifier, "Sharpness", None)
            .is_none());
        assert_eq!(gpu.push_count(), pushes);
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn toggling_hue_restores_flags() {
        let mut gpu = ready_gpu();
        let mut notifier = Notifier::new();
        let mut l = layer(&mut gpu, 0);

        assert!(!l.set_enabled(&mut gpu, &mut notifier, Property::Hue, Some(false)));
        assert_eq!(
            gpu.uniform("u_Flag_HuGa[0]"),
            Some(UniformValue::IVec2([0, 1]))
        );
        assert!(l.set_enabled(&mut gpu, &mut notifier, Property::Hue, Some(true)));
        assert_eq!(
            gpu.uniform("u_Flag_HuGa[0]"),
            Some(UniformValue::IVec2([1, 1]))
        );
        assert_eq!(
            gpu.uniform("u_Flag_BrCoGaSa[0]"),
            Some(UniformValue::IVec4([1, 1, 1, 1]))
        );
    }

    #[test]
    fn resolution_sets_aspect_without_redraw() {
        let mut gpu = ready_gpu();
        let notifier = Notifier::new();
        let mut l = layer(&mut gpu, 0);
        l.set_resolution(&mut gpu, Resolution::new(1024, 512));
        assert_eq!(l.aspect_ratio(), 2.0);
        assert_eq!(
            gpu.uniform("u_VpImgRes"),
            Some(UniformValue::Vec2([1024.0, 512.0]))
        );
        assert!(!notifier.redraw().is_pending());
    }

    #[test]
    fn visibility_and_blend_mode_request_redraw() {
        let mut gpu = ready_gpu();
        let mut notifier = Notifier::new();
        let mut l = layer(&mut gpu, 1);

        assert!(!l.set_visibility(&mut gpu, &mut notifier, None));
        assert_eq!(gpu.uniform("u_LayerEnabled[1]"), Some(UniformValue::Int(0)));
        assert!(notifier.redraw_mut().take());

        l.set_blend_mode(&mut gpu, &mut notifier, BlendMode::Multiply);
        assert_eq!(gpu.uniform("u_BlendMode[1]"), Some(UniformValue::Int(2)));
        assert!(notifier.redraw().is_pending());
    }

    #[test]
    fn bind_for_render_uses_own_unit() {
        let mut gpu = ready_gpu();
        let l = layer(&mut gpu, 1);
        assert_eq!(gpu.uniform("u_Image[1]"), Some(UniformValue::Int(1)));
        let pushes = gpu.push_count();
        l.bind_for_render(&mut gpu);
        l.bind_for_render(&mut gpu);
        assert_eq!(gpu.bound_texture(1), Some(l.texture()));
        assert_eq!(gpu.push_count(), pushes);
    }

    #[test]
    fn relocation_carries_state_to_new_slot() {
        let mut gpu = ready_gpu();
        let mut notifier = Notifier::new();
        let mut l = layer(&mut gpu, 1);
        let _ = l.set_value(&mut gpu, &mut notifier, Property::Gamma, 150.0);
        let _ = l.set_visibility(&mut gpu, &mut notifier, Some(false));
        l.set_blend_mode(&mut gpu, &mut notifier, BlendMode::Screen);

        l.relocate(&mut gpu, 0);
        assert_eq!(l.id(), 0);
        assert_eq!(gpu.uniform("u_Gamma[0]"), Some(UniformValue::Float(1.5)));
        assert_eq!(gpu.uniform("u_LayerEnabled[0]"), Some(UniformValue::Int(0)));
        assert_eq!(gpu.uniform("u_BlendMode[0]"), Some(UniformValue::Int(1)));
    }

    #[test]
    fn blend_mode_selectors() {
        for mode in BlendMode::ALL {
            assert_eq!(BlendMode::from_i32(mode.as_i32()), Some(mode));
        }
        assert_eq!(BlendMode::from_i32(3), None);
        assert_eq!(BlendMode::Multiply.next(), BlendMode::Normal);
    }
}
