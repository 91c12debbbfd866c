//! Frame production: the compositing pipeline, redraw coalescing and
//! viewport fitting.

/// Shared adjustor program, quad geometry and frame draw.
pub mod pipeline;
/// Redraw coalescing and resize gating.
pub mod redraw;
/// Surface sizing against the image aspect ratio.
pub mod viewport;
