//! Per-layer adjustment properties.
//!
//! Each property carries a raw value (slider position), a transform that
//! scales it before it reaches the shader or the display, an enabled flag,
//! and its resolved uniform location for the owning layer's slot.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::gpu::backend::GpuBackend;
use crate::gpu::uniform::{
    layer_uniform, UniformLocation, UniformValue, FLAG_BR_CO_GA_SA,
    FLAG_HU_GA,
};

/// A generic adjustment channel, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Property {
    /// Additive brightness.
    Brightness,
    /// Contrast around mid-grey.
    Contrast,
    /// Gamma correction.
    Gamma,
    /// Saturation.
    Saturation,
    /// Hue rotation.
    Hue,
    /// Gaussian blur kernel radius in pixels.
    GaussBlurRadius,
}

impl Property {
    /// Number of generic properties.
    pub const COUNT: usize = 6;

    /// All generic properties in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Brightness,
        Self::Contrast,
        Self::Gamma,
        Self::Saturation,
        Self::Hue,
        Self::GaussBlurRadius,
    ];

    /// Property name as used in the uniform contract.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Gamma => "Gamma",
            Self::Saturation => "Saturation",
            Self::Hue => "Hue",
            Self::GaussBlurRadius => "GaussBlurRadius",
        }
    }

    /// Initial raw value.
    #[must_use]
    pub const fn default_value(self) -> f64 {
        match self {
            Self::Brightness => 1.0,
            Self::GaussBlurRadius => 0.0,
            Self::Contrast | Self::Gamma | Self::Saturation | Self::Hue => {
                100.0
            }
        }
    }

    /// Scale applied to the raw value.
    #[must_use]
    pub const fn transform(self) -> f64 {
        match self {
            Self::Brightness => 0.003_906_25,
            Self::GaussBlurRadius => 1.0,
            Self::Contrast | Self::Gamma | Self::Saturation | Self::Hue => {
                0.01
            }
        }
    }

    /// Uniform array base name (`u_Brightness`).
    #[must_use]
    pub fn uniform_name(self) -> String {
        format!("u_{}", self.name())
    }

    /// Position in [`Property::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property name that is not one of the generic properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProperty(pub String);

impl fmt::Display for UnknownProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property {} does not exist!", self.0)
    }
}

impl std::error::Error for UnknownProperty {}

impl FromStr for Property {
    type Err = UnknownProperty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownProperty(s.to_owned()))
    }
}

/// Whether a number has no fractional part.
#[must_use]
pub fn is_integral(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0
}

/// Display text for a transformed value: integers verbatim, everything else
/// with two decimals.
#[must_use]
pub fn format_display(v: f64) -> String {
    if is_integral(v) {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

/// One adjustment channel of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyDescriptor {
    /// Which channel this is.
    pub property: Property,
    /// Whether the shader applies the channel.
    pub enabled: bool,
    /// Raw value.
    pub value: f64,
    /// Scale applied to `value`.
    pub transform: f64,
    /// Resolved `u_<Property>[id]` location, `None` until resolved or when
    /// the program does not declare it.
    pub slot: Option<UniformLocation>,
}

impl PropertyDescriptor {
    /// Defaults for a property, unbound.
    #[must_use]
    pub const fn new(property: Property) -> Self {
        Self {
            property,
            enabled: true,
            value: property.default_value(),
            transform: property.transform(),
            slot: None,
        }
    }

    /// `value * transform`.
    #[must_use]
    pub fn transformed(&self) -> f64 {
        self.value * self.transform
    }

    /// Store a raw value. Truncated toward zero when the transform is
    /// integral.
    pub fn set_value(&mut self, raw: f64) {
        self.value = if is_integral(self.transform) {
            raw.trunc()
        } else {
            raw
        };
    }

    /// The value as pushed to the shader: an integer iff both the value and
    /// the transform are integral.
    #[must_use]
    pub fn uniform_value(&self) -> UniformValue {
        let v = self.transformed();
        if is_integral(self.value) && is_integral(self.transform) {
            UniformValue::Int(v as i32)
        } else {
            UniformValue::Float(v as f32)
        }
    }

    /// Formatted transformed value.
    #[must_use]
    pub fn display(&self) -> String {
        format_display(self.transformed())
    }
}

/// Enable flags in shader packing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedFlags {
    /// Brightness, Contrast, Gamma, Saturation.
    pub br_co_ga_sa: [i32; 4],
    /// Hue, GaussBlurRadius.
    pub hu_ga: [i32; 2],
}

/// Flag uniform locations for one layer slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagSlots {
    /// `u_Flag_BrCoGaSa[id]`
    pub br_co_ga_sa: Option<UniformLocation>,
    /// `u_Flag_HuGa[id]`
    pub hu_ga: Option<UniformLocation>,
}

/// The six generic properties of a layer, indexed by [`Property`].
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySet {
    props: [PropertyDescriptor; Property::COUNT],
    flags: FlagSlots,
}

impl Default for PropertySet {
    fn default() -> Self {
        Self {
            props: Property::ALL.map(PropertyDescriptor::new),
            flags: FlagSlots::default(),
        }
    }
}

impl PropertySet {
    /// One channel.
    #[must_use]
    pub const fn get(&self, property: Property) -> &PropertyDescriptor {
        &self.props[property.index()]
    }

    /// All channels in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.props.iter()
    }

    /// Resolve every binding slot for layer `id`, replacing any previous
    /// resolution.
    pub fn resolve_slots<B: GpuBackend>(&mut self, gpu: &B, id: usize) {
        for desc in &mut self.props {
            desc.slot = gpu
                .uniform_location(&layer_uniform(&desc.property.uniform_name(), id));
        }
        self.flags = FlagSlots {
            br_co_ga_sa: gpu
                .uniform_location(&layer_uniform(FLAG_BR_CO_GA_SA, id)),
            hu_ga: gpu.uniform_location(&layer_uniform(FLAG_HU_GA, id)),
        };
    }

    /// Store a raw value and push the transformed value to its slot.
    pub fn set_value<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        property: Property,
        raw: f64,
    ) -> &PropertyDescriptor {
        let desc = &mut self.props[property.index()];
        desc.set_value(raw);
        gpu.push_uniform(desc.slot, desc.uniform_value());
        desc
    }

    /// Re-push a property's current value.
    pub fn push_value<B: GpuBackend>(&self, gpu: &mut B, property: Property) {
        let desc = self.get(property);
        gpu.push_uniform(desc.slot, desc.uniform_value());
    }

    /// Set (or toggle, when `value` is `None`) a property's enabled flag and
    /// push both packed flag vectors. Returns the new state.
    pub fn set_enabled<B: GpuBackend>(
        &mut self,
        gpu: &mut B,
        property: Property,
        value: Option<bool>,
    ) -> bool {
        let desc = &mut self.props[property.index()];
        desc.enabled = value.unwrap_or(!desc.enabled);
        let enabled = desc.enabled;
        self.push_flags(gpu);
        enabled
    }

    /// Enable flags packed in shader order.
    #[must_use]
    pub fn packed_flags(&self) -> PackedFlags {
        let flag = |p: Property| i32::from(self.get(p).enabled);
        PackedFlags {
            br_co_ga_sa: [
                flag(Property::Brightness),
                flag(Property::Contrast),
                flag(Property::Gamma),
                flag(Property::Saturation),
            ],
            hu_ga: [flag(Property::Hue), flag(Property::GaussBlurRadius)],
        }
    }

    /// Push both packed flag vectors.
    pub fn push_flags<B: GpuBackend>(&self, gpu: &mut B) {
        let packed = self.packed_flags();
        gpu.push_uniform(
            self.flags.br_co_ga_sa,
            UniformValue::IVec4(packed.br_co_ga_sa),
        );
        gpu.push_uniform(self.flags.hu_ga, UniformValue::IVec2(packed.hu_ga));
    }
}
