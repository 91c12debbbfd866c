//! GPU access for the compositor.
//!
//! The [`backend::GpuBackend`] trait is the seam every component renders
//! through. [`wgpu_backend::WgpuBackend`] drives a real device;
//! [`headless::HeadlessBackend`] records state for tests and tooling.

/// The rendering-context trait and its shared types.
pub mod backend;
/// In-memory backend that records uniform, texture and draw state.
pub mod headless;
/// Shared wgpu boilerplate for the adjustor pipeline.
pub mod pipeline_helpers;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Layer textures and the off-screen render target.
pub mod texture;
/// Uniform naming contract and block layout.
pub mod uniform;
/// wgpu implementation of the backend trait.
pub mod wgpu_backend;
