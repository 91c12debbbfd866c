//! Standalone adjustment window backed by winit.
//!
//! ```no_run
//! # use phototune::viewer::Viewer;
//! Viewer::builder()
//!     .with_file("photo.jpg")
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::decode::{DecodeError, ImageDecoder, ImageKind, ImageSource};
use crate::engine::PhotoEngine;
use crate::error::PhotoTuneError;
use crate::events::UiEvent;
use crate::gpu::render_context::RenderContext;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::input::InputProcessor;
use crate::layer::Resolution;
use crate::options::Options;

/// Read an image file into an upload source, choosing the decoder from the
/// file extension.
///
/// # Errors
///
/// Returns [`PhotoTuneError::Io`] if the file cannot be read, or
/// [`PhotoTuneError::Decode`] if the extension is not a supported format.
pub fn read_source(path: &Path) -> Result<ImageSource, PhotoTuneError> {
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ImageKind::from_extension(&ext).ok_or_else(|| {
        DecodeError::Unsupported {
            name: name.clone(),
            mime: ext.clone(),
        }
    })?;
    let bytes = std::fs::read(path)?;
    Ok(ImageSource::new(name, kind, bytes))
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    files: Vec<PathBuf>,
    options: Option<Options>,
}

impl ViewerBuilder {
    /// Add an image to load as a layer once the window opens.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add several images, loaded in order.
    #[must_use]
    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            files: self.files,
            options: self.options.unwrap_or_default(),
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window that composites image layers.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    files: Vec<PathBuf>,
    options: Options,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder {
            files: Vec::new(),
            options: None,
        }
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::Viewer`] if the event loop cannot start.
    pub fn run(self) -> Result<(), PhotoTuneError> {
        let event_loop = EventLoop::new()
            .map_err(|e| PhotoTuneError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app = ViewerApp {
            window: None,
            engine: None,
            input: InputProcessor::new(&self.options),
            pending_files: self.files.into(),
            options: self.options,
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| PhotoTuneError::Viewer(e.to_string()))
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// Internal winit application handler.
struct ViewerApp {
    window: Option<Arc<Window>>,
    engine: Option<PhotoEngine<WgpuBackend>>,
    input: InputProcessor,
    pending_files: VecDeque<PathBuf>,
    options: Options,
}

impl ViewerApp {
    fn create_engine(
        &self,
        window: Arc<Window>,
    ) -> Result<PhotoEngine<WgpuBackend>, PhotoTuneError> {
        let inner = window.inner_size();
        let size = (inner.width.max(1), inner.height.max(1));
        let context = pollster::block_on(RenderContext::new(window, size))?;
        let gpu = WgpuBackend::new(context)?;
        PhotoEngine::new(
            gpu,
            self.options.clone(),
            Resolution::new(size.0, size.1),
        )
    }

    fn load_file(&mut self, path: &Path) {
        let Some(engine) = self.engine.as_mut() else {
            self.pending_files.push_back(path.to_path_buf());
            return;
        };
        let result = read_source(path).and_then(|source| {
            pollster::block_on(engine.upload(&ImageDecoder, source))
        });
        if let Err(e) = result {
            log::error!("failed to load {}: {e}", path.display());
        }
    }

    /// Forward notifications to the log and schedule a redraw if one is
    /// pending.
    fn after_event(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        for event in engine.drain_notifications() {
            match event {
                UiEvent::Log { .. } => {}
                other => log::debug!("{other:?}"),
            }
        }
        if engine.redraw_pending() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(&self.options.viewer.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.options.viewer.width,
                self.options.viewer.height,
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.create_engine(window.clone()) {
            Ok(engine) => self.engine = Some(engine),
            Err(e) => {
                log::error!("Failed to initialize engine: {e}");
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);

        let files: Vec<PathBuf> = self.pending_files.drain(..).collect();
        for path in &files {
            self.load_file(path);
        }
        self.after_event();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }

        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::Resized(size) => {
                engine.gpu_mut().resize_surface(size.width, size.height);
                let _ = engine.resize(Resolution::new(
                    size.width.max(1),
                    size.height.max(1),
                ));
            }

            WindowEvent::RedrawRequested => {
                let _ = engine.on_frame();
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => engine.pointer_down(),
                ElementState::Released => {
                    engine.pointer_up();
                    if let Some(window) = &self.window {
                        let inner = window.inner_size();
                        let _ = engine.resize(Resolution::new(
                            inner.width.max(1),
                            inner.height.max(1),
                        ));
                    }
                }
            },

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let key_str = format!("{code:?}");
                let _ = self.input.handle_key_press(&key_str, engine);
            }

            WindowEvent::DroppedFile(path) => {
                self.load_file(&path);
            }

            _ => (),
        }
        self.after_event();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::fixtures;

    #[test]
    fn read_source_picks_kind_from_extension() {
        let dir = std::env::temp_dir().join("phototune_viewer_read_source");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tile.PNG");
        std::fs::write(&path, fixtures::png(2, 2, [1, 2, 3, 255])).unwrap();

        let source = read_source(&path).unwrap();
        assert_eq!(source.name, "tile.PNG");
        assert_eq!(source.kind, ImageKind::Png);

        let err = read_source(&dir.join("notes.txt")).unwrap_err();
        assert!(matches!(err, PhotoTuneError::Decode(_)));
        let missing = read_source(&dir.join("missing.jpg")).unwrap_err();
        assert!(matches!(missing, PhotoTuneError::Io(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn builder_collects_files_in_order() {
        let viewer = Viewer::builder()
            .with_file("a.png")
            .with_files(["b.jpg", "c.jpeg"])
            .build();
        assert_eq!(viewer.files.len(), 3);
        assert_eq!(viewer.files[2], PathBuf::from("c.jpeg"));
        assert_eq!(viewer.options, Options::default());
    }
}
