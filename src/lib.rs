// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![cfg_attr(not(test), deny(clippy::wildcard_imports))]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]

//! Layered photo adjustment with real-time GPU compositing.
//!
//! Images are loaded as layers, each with its own brightness, contrast,
//! gamma, saturation, hue and blur settings, visibility and blend mode. A
//! single shader program samples every loaded layer and composites them over
//! a transparency checkerboard in one full-screen pass.
//!
//! # Key entry points
//!
//! - [`engine::PhotoEngine`] - one method per user action; owns the layer
//!   stack, the compositing pipeline and the notification queue
//! - [`gpu::backend::GpuBackend`] - the rendering seam, implemented by
//!   [`gpu::wgpu_backend::WgpuBackend`] and
//!   [`gpu::headless::HeadlessBackend`]
//! - [`options::Options`] - runtime configuration (render constants, layer
//!   defaults, viewer window, key bindings)
//! - [`decode`] - PNG/JPEG decoding for uploaded images
//!
//! # Architecture
//!
//! Layer slots map one-to-one onto texture units and onto indices of every
//! per-layer uniform array. The capacity is probed once from the device.
//! When a layer is removed, the layers above it shift down one slot and
//! re-push all of their uniforms. Redraw requests are coalesced so that any
//! number of state changes between two refreshes produce a single draw.

pub mod decode;
pub mod engine;
pub mod error;
pub mod events;
pub mod gpu;
pub mod input;
pub mod layer;
pub mod options;
pub mod probe;
pub mod render;
#[cfg(feature = "viewer")]
pub mod viewer;
#[cfg(feature = "web")]
pub mod web;

pub use decode::{DecodeService, ImageDecoder, ImageKind, ImageSource};
pub use engine::PhotoEngine;
pub use error::PhotoTuneError;
pub use events::UiEvent;
pub use gpu::backend::GpuBackend;
pub use gpu::headless::HeadlessBackend;
pub use gpu::wgpu_backend::WgpuBackend;
pub use layer::property::Property;
pub use layer::{BlendMode, Resolution};
pub use options::Options;
