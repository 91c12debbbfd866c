//! The event-handler facade.
//!
//! [`PhotoEngine`] owns the backend, the layer stack, the render pipeline and
//! the notification queue, and exposes one method per user action. Handlers
//! never return errors for user-level mistakes (unknown property, missing
//! layer); those are logged. Only construction and uploads report failures.

mod handlers;
mod upload;

pub use upload::UploadTicket;

use crate::error::PhotoTuneError;
use crate::events::{Notifier, UiEvent};
use crate::gpu::backend::{GpuBackend, ShaderDefines};
use crate::layer::stack::LayerStack;
use crate::layer::Resolution;
use crate::options::Options;
use crate::probe::{probe, DeviceProfile};
use crate::render::pipeline::RenderPipeline;
use crate::render::redraw::ResizeGate;
use crate::render::viewport::{fit_aspect, fit_image};

/// Layered photo adjustment engine over a GPU backend.
pub struct PhotoEngine<B: GpuBackend> {
    gpu: B,
    profile: DeviceProfile,
    stack: LayerStack,
    pipeline: RenderPipeline,
    notifier: Notifier,
    resize_gate: ResizeGate,
    container: Resolution,
    viewport: Resolution,
    image: Option<Resolution>,
    pending_upload: Option<u64>,
    next_ticket: u64,
    options: Options,
}

impl<B: GpuBackend> PhotoEngine<B> {
    /// Probe the device, build the compositing pipeline and size the
    /// viewport to `container`.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::InsufficientTextureUnits`] when the device
    /// cannot hold a single layer, or [`PhotoTuneError::Gpu`] when the
    /// shader program or quad geometry cannot be created.
    pub fn new(
        mut gpu: B,
        options: Options,
        container: Resolution,
    ) -> Result<Self, PhotoTuneError> {
        let profile = probe(&gpu, options.render.reserved_texture_units)?;
        let defines = ShaderDefines {
            max_layers: profile.layer_capacity as u32,
            gauss_blur_max_radius: options.render.gauss_blur_max_radius,
            checker_tile_width: options.render.checker_tile_width,
        };
        let mut pipeline =
            RenderPipeline::new(defines, options.render.clear_color);
        pipeline.initialize(&mut gpu)?;

        let mut notifier = Notifier::new();
        notifier.console(
            format!(
                "[GPU] Max. available tex. units: {}",
                profile.capabilities.max_texture_units
            ),
            false,
        );
        notifier.console(
            format!(
                "[GPU] Max. tex. size: {}",
                profile.capabilities.max_texture_size
            ),
            false,
        );
        notifier.emit(UiEvent::LayerCount {
            count: 0,
            capacity: profile.layer_capacity,
        });

        let stack = LayerStack::new(
            profile.layer_capacity,
            options.layers.label_prefix.clone(),
        );
        pipeline.push_globals(&mut gpu, None, 0);
        gpu.set_viewport(container.width, container.height);
        let _ = notifier.request_redraw();

        Ok(Self {
            gpu,
            profile,
            stack,
            pipeline,
            notifier,
            resize_gate: ResizeGate::default(),
            container,
            viewport: container,
            image: None,
            pending_upload: None,
            next_ticket: 0,
            options,
        })
    }

    // ── Frame ──

    /// Ask for a redraw on the next refresh. Returns `true` when the caller
    /// must register a refresh callback.
    pub fn request_redraw(&mut self) -> bool {
        self.notifier.request_redraw()
    }

    /// Whether a redraw is waiting for the next refresh.
    #[must_use]
    pub const fn redraw_pending(&self) -> bool {
        self.notifier.redraw().is_pending()
    }

    /// Refresh tick: draws the current state if a redraw was requested.
    /// Returns whether a frame was drawn.
    pub fn on_frame(&mut self) -> bool {
        if !self.notifier.redraw_mut().take() {
            return false;
        }
        self.pipeline.draw(&mut self.gpu, self.stack.layers())
    }

    /// Take every notification queued since the last call.
    pub fn drain_notifications(&mut self) -> Vec<UiEvent> {
        self.notifier.drain()
    }

    // ── Surface ──

    /// A pointer button went down; resizes are ignored until it is released.
    pub fn pointer_down(&mut self) {
        self.resize_gate.pointer_down();
    }

    /// A pointer button went up.
    pub fn pointer_up(&mut self) {
        self.resize_gate.pointer_up();
    }

    /// The surface container changed size. Ignored during a pointer drag.
    /// Returns whether the resize was applied.
    pub fn resize(&mut self, container: Resolution) -> bool {
        if !self.resize_gate.should_handle_resize() {
            log::debug!("resize to {container} ignored during drag");
            return false;
        }
        self.container = container;
        let viewport = match self.image {
            Some(image) if !self.stack.is_empty() => self.fit_viewport(image),
            _ => container,
        };
        self.apply_viewport(viewport);
        let _ = self.notifier.request_redraw();
        true
    }

    /// Viewport for an image of the given size in the current container.
    fn fit_viewport(&self, image: Resolution) -> Resolution {
        if self.options.render.fill_container {
            fit_aspect(image.aspect_ratio(), self.container)
        } else {
            fit_image(image, self.container)
        }
    }

    fn apply_viewport(&mut self, viewport: Resolution) {
        self.viewport = viewport;
        self.gpu.set_viewport(viewport.width, viewport.height);
        for id in 0..self.stack.len() {
            if let Some(layer) = self.stack.get_mut(Some(id)) {
                layer.set_resolution(&mut self.gpu, viewport);
            }
        }
    }

    // ── Accessors ──

    /// The backend.
    #[must_use]
    pub const fn gpu(&self) -> &B {
        &self.gpu
    }

    /// Mutable access to the backend.
    pub fn gpu_mut(&mut self) -> &mut B {
        &mut self.gpu
    }

    /// Probed device limits and layer capacity.
    #[must_use]
    pub const fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Loaded layers.
    #[must_use]
    pub const fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// The compositing pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Current drawing area.
    #[must_use]
    pub const fn viewport(&self) -> Resolution {
        self.viewport
    }

    /// Current container size.
    #[must_use]
    pub const fn container(&self) -> Resolution {
        self.container
    }

    /// Options the engine was built with.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Notifications not yet drained.
    #[must_use]
    pub fn pending_notifications(&self) -> &[UiEvent] {
        self.notifier.events()
    }
}

impl<B: GpuBackend> std::fmt::Debug for PhotoEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoEngine")
            .field("profile", &self.profile)
            .field("layers", &self.stack.len())
            .field("active", &self.stack.active())
            .field("viewport", &self.viewport)
            .field("pipeline", &self.pipeline.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::PhotoEngine;
    use crate::decode::fixtures;
    use crate::gpu::headless::HeadlessBackend;
    use crate::layer::Resolution;
    use crate::options::Options;

    /// Engine over a headless backend with `units` texture units.
    pub(crate) fn engine(units: u32) -> PhotoEngine<HeadlessBackend> {
        PhotoEngine::new(
            HeadlessBackend::with_texture_units(units),
            Options::default(),
            Resolution::new(800, 600),
        )
        .unwrap()
    }

    /// Load a decoded RGBA image as a new layer.
    pub(crate) fn load(
        engine: &mut PhotoEngine<HeadlessBackend>,
        name: &str,
        width: u32,
        height: u32,
    ) -> usize {
        let ticket = engine.begin_upload().unwrap();
        engine
            .finish_upload(ticket, Ok(fixtures::rgba(name, width, height)), None)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{engine, load};
    use super::*;
    use crate::gpu::headless::HeadlessBackend;
    use crate::gpu::uniform::UniformValue;
    use crate::render::pipeline::PipelineState;

    #[test]
    fn construction_probes_and_builds() {
        let mut e = engine(6);
        assert_eq!(e.profile().layer_capacity, 4);
        assert_eq!(e.gpu().defines().unwrap().max_layers, 4);
        assert_eq!(e.pipeline().state(), PipelineState::Ready);
        assert_eq!(e.gpu().viewport(), (800, 600));
        let events = e.drain_notifications();
        assert!(events.contains(&UiEvent::LayerCount {
            count: 0,
            capacity: 4
        }));
        assert!(e.on_frame());
        assert!(!e.on_frame());
    }

    #[test]
    fn construction_fails_without_units() {
        let err = PhotoEngine::new(
            HeadlessBackend::with_texture_units(2),
            Options::default(),
            Resolution::new(10, 10),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PhotoTuneError::InsufficientTextureUnits { .. }
        ));
    }

    #[test]
    fn construction_fails_on_program_error() {
        let mut gpu = HeadlessBackend::with_texture_units(8);
        gpu.fail_program_build(true);
        let err =
            PhotoEngine::new(gpu, Options::default(), Resolution::new(10, 10))
                .unwrap_err();
        assert!(matches!(err, PhotoTuneError::Gpu(_)));
    }

    #[test]
    fn redraws_coalesce_into_one_frame() {
        let mut e = engine(6);
        let _ = e.on_frame();
        let _ = load(&mut e, "a.png", 100, 100);
        e.adjust("Contrast", 120.0);
        e.adjust("Gamma", 80.0);
        let _ = e.request_redraw();
        assert!(e.on_frame());
        assert!(!e.on_frame());
        assert_eq!(e.gpu().draw_count(), 2);
    }

    #[test]
    fn unchanged_frames_push_no_uniforms() {
        let mut e = engine(6);
        let _ = load(&mut e, "a.png", 10, 10);
        let _ = load(&mut e, "b.png", 10, 10);
        assert!(e.on_frame());
        let pushes = e.gpu().push_count();
        let _ = e.request_redraw();
        assert!(e.on_frame());
        assert_eq!(e.gpu().push_count(), pushes);
        assert_eq!(e.gpu().draw_count(), 2);
    }

    #[test]
    fn resize_is_gated_by_pointer() {
        let mut e = engine(6);
        let _ = load(&mut e, "wide.png", 200, 100);
        e.pointer_down();
        assert!(!e.resize(Resolution::new(400, 400)));
        assert_eq!(e.container(), Resolution::new(800, 600));
        e.pointer_up();
        assert!(e.resize(Resolution::new(400, 400)));
        assert_eq!(e.viewport(), Resolution::new(400, 200));
        assert_eq!(
            e.gpu().uniform("u_VpImgRes"),
            Some(UniformValue::Vec2([400.0, 200.0]))
        );
    }

    #[test]
    fn resize_keeps_small_image_at_native_size() {
        let mut options = Options::default();
        options.render.fill_container = false;
        let mut e = PhotoEngine::new(
            HeadlessBackend::with_texture_units(6),
            options,
            Resolution::new(800, 600),
        )
        .unwrap();
        let _ = load(&mut e, "small.png", 100, 50);
        assert_eq!(e.viewport(), Resolution::new(100, 50));

        assert!(e.resize(Resolution::new(800, 600)));
        assert_eq!(e.viewport(), Resolution::new(100, 50));
        assert_eq!(
            e.gpu().uniform("u_VpImgRes"),
            Some(UniformValue::Vec2([100.0, 50.0]))
        );

        assert!(e.resize(Resolution::new(60, 60)));
        assert_eq!(e.viewport(), Resolution::new(60, 30));
    }
}
