//! Image upload: decode, layer insertion, texture upload, viewport fit.

use super::PhotoEngine;
use crate::decode::{DecodeError, DecodeService, DecodedImage, ImageSource};
use crate::error::PhotoTuneError;
use crate::events::UiEvent;
use crate::gpu::backend::GpuBackend;
use crate::layer::Resolution;

/// Proof that an upload was started; redeemed by
/// [`PhotoEngine::finish_upload`].
#[derive(Debug, PartialEq, Eq)]
pub struct UploadTicket(u64);

impl<B: GpuBackend> PhotoEngine<B> {
    /// Start an upload. Only one upload may be in flight.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::UploadPending`] while a previous upload has
    /// not finished.
    pub fn begin_upload(&mut self) -> Result<UploadTicket, PhotoTuneError> {
        if self.pending_upload.is_some() {
            log::warn!("upload rejected: previous upload still pending");
            return Err(PhotoTuneError::UploadPending);
        }
        self.next_ticket += 1;
        self.pending_upload = Some(self.next_ticket);
        Ok(UploadTicket(self.next_ticket))
    }

    /// Whether an upload is in flight.
    #[must_use]
    pub const fn upload_pending(&self) -> bool {
        self.pending_upload.is_some()
    }

    /// Complete an upload with its decode result.
    ///
    /// On success a layer is appended (evicting the bottom layer when full),
    /// its texture is filled, the viewport is fitted to the image, and the
    /// new layer becomes active. A texture upload failure is logged and the
    /// layer keeps its placeholder. Returns the new layer's id.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoTuneError::StaleUpload`] for a ticket that is not the
    /// pending one, or [`PhotoTuneError::Decode`] when decoding failed, in
    /// which case no layer is created.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        decoded: Result<DecodedImage, DecodeError>,
        label: Option<String>,
    ) -> Result<usize, PhotoTuneError> {
        if self.pending_upload != Some(ticket.0) {
            return Err(PhotoTuneError::StaleUpload);
        }
        self.pending_upload = None;

        let image = decoded.map_err(|e| {
            self.notifier.console(e.to_string(), true);
            e
        })?;
        let resolution = Resolution::new(image.width, image.height);
        self.notifier
            .console(format!("Input Img res: {resolution}"), false);

        let texture =
            self.gpu.create_texture(self.options.layers.placeholder_color);
        let id = self.stack.insert(
            &mut self.gpu,
            &mut self.notifier,
            texture,
            label,
        );

        if let Err(e) = self.gpu.upload_texture(texture, &image) {
            self.notifier.console(
                format!("[GPU] error loading texture for {}: {e}", image.name),
                true,
            );
            if !self
                .profile
                .capabilities
                .supports_size(image.width, image.height)
            {
                self.notifier.console(
                    "[GPU] Image is too big and cannot be loaded into a texture",
                    true,
                );
            }
        }

        self.image = Some(resolution);
        let viewport = self.fit_viewport(resolution);
        self.apply_viewport(viewport);

        let _ = self.stack.set_active(&mut self.notifier, id);
        self.pipeline.push_globals(
            &mut self.gpu,
            Some(id),
            self.stack.len(),
        );
        let _ = self.notifier.request_redraw();
        log::info!("Image {} loaded into layer {id}", image.name);
        Ok(id)
    }

    /// Decode `source` with `decoder` and load it as a new layer.
    ///
    /// # Errors
    ///
    /// See [`PhotoEngine::begin_upload`] and [`PhotoEngine::finish_upload`].
    pub async fn upload<D: DecodeService>(
        &mut self,
        decoder: &D,
        source: ImageSource,
    ) -> Result<usize, PhotoTuneError> {
        let ticket = self.begin_upload()?;
        let guard = InFlightUpload {
            engine: self,
            ticket: Some(ticket),
        };
        let decoded = decoder.decode(source).await;
        guard.finish(decoded)
    }

    /// Abandon the pending upload without creating a layer.
    pub fn cancel_upload(&mut self, ticket: UploadTicket) {
        if self.pending_upload == Some(ticket.0) {
            self.pending_upload = None;
            self.notifier.emit(UiEvent::Log {
                message: "upload cancelled".to_owned(),
                is_error: false,
            });
        }
    }
}

/// Pending upload owned by an [`PhotoEngine::upload`] future. Dropping the
/// future before the decode resolves releases the pending slot.
struct InFlightUpload<'a, B: GpuBackend> {
    engine: &'a mut PhotoEngine<B>,
    ticket: Option<UploadTicket>,
}

impl<B: GpuBackend> InFlightUpload<'_, B> {
    fn finish(
        mut self,
        decoded: Result<DecodedImage, DecodeError>,
    ) -> Result<usize, PhotoTuneError> {
        match self.ticket.take() {
            Some(ticket) => self.engine.finish_upload(ticket, decoded, None),
            None => Err(PhotoTuneError::StaleUpload),
        }
    }
}

impl<B: GpuBackend> Drop for InFlightUpload<'_, B> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            log::debug!("upload dropped before decode finished");
            self.engine.cancel_upload(ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{engine, load};
    use super::*;
    use crate::decode::{fixtures, ImageDecoder, ImageKind};
    use crate::gpu::headless::HeadlessBackend;
    use crate::gpu::uniform::UniformValue;
    use crate::layer::property::Property;
    use crate::options::Options;
    use std::future::Future;
    use std::pin::pin;
    use std::task::{Context, Waker};

    /// Decoder whose result never arrives.
    struct StalledDecoder;

    impl DecodeService for StalledDecoder {
        fn decode(
            &self,
            _source: ImageSource,
        ) -> impl Future<Output = Result<DecodedImage, DecodeError>> {
            std::future::pending()
        }
    }

    #[test]
    fn successful_upload_activates_new_layer() {
        let mut e = engine(6);
        let _ = e.drain_notifications();
        let id = load(&mut e, "a.png", 1024, 512);
        assert_eq!(id, 0);
        assert_eq!(e.stack().active(), Some(0));
        assert_eq!(e.gpu().uniform("u_ActiveLayer"), Some(UniformValue::Int(0)));
        assert_eq!(e.gpu().uniform("u_LayersLoaded"), Some(UniformValue::Int(1)));
        assert_eq!(e.viewport(), Resolution::new(800, 400));
        assert_eq!(e.stack().layers()[0].aspect_ratio(), 2.0);
        let tex = e.stack().layers()[0].texture();
        assert_eq!(e.gpu().texture(tex).unwrap().width, 1024);
        assert!(e.redraw_pending());

        let events = e.drain_notifications();
        assert!(events.contains(&UiEvent::LayerAdded {
            id: 0,
            label: "Layer0".to_owned()
        }));
        assert!(events.contains(&UiEvent::ActiveLayer { id: Some(0) }));
    }

    #[test]
    fn decode_failure_creates_no_layer() {
        let mut e = engine(6);
        let ticket = e.begin_upload().unwrap();
        let err = e
            .finish_upload(
                ticket,
                Err(DecodeError::Empty {
                    name: "void.png".to_owned(),
                }),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, PhotoTuneError::Decode(_)));
        assert!(e.stack().is_empty());
        assert!(!e.upload_pending());
        assert!(e.drain_notifications().iter().any(|ev| matches!(
            ev,
            UiEvent::Log { message, is_error: true } if message.contains("void.png")
        )));
    }

    #[test]
    fn second_upload_is_rejected_while_pending() {
        let mut e = engine(6);
        let first = e.begin_upload().unwrap();
        assert!(matches!(e.begin_upload(), Err(PhotoTuneError::UploadPending)));
        let _ = e
            .finish_upload(first, Ok(fixtures::rgba("a", 2, 2)), None)
            .unwrap();
        let second = e.begin_upload().unwrap();
        e.cancel_upload(second);
        assert!(!e.upload_pending());
    }

    #[test]
    fn stale_ticket_is_rejected() {
        let mut e = engine(6);
        let ticket = e.begin_upload().unwrap();
        e.cancel_upload(ticket);
        let stale = UploadTicket(1);
        assert!(matches!(
            e.finish_upload(stale, Ok(fixtures::rgba("a", 2, 2)), None),
            Err(PhotoTuneError::StaleUpload)
        ));
        assert!(e.stack().is_empty());
    }

    #[test]
    fn texture_failure_keeps_placeholder_and_layer() {
        let gpu = HeadlessBackend::new(crate::probe::DeviceCapabilities {
            max_texture_units: 6,
            max_combined_texture_units: 12,
            max_texture_size: 64,
        });
        let mut e = PhotoEngine::new(
            gpu,
            Options::default(),
            Resolution::new(800, 600),
        )
        .unwrap();
        let _ = e.drain_notifications();
        let id = load(&mut e, "huge.png", 128, 32);
        let tex = e.stack().layers()[id].texture();
        assert_eq!(
            e.gpu().texture(tex).unwrap().rgba,
            vec![45, 45, 45, 255]
        );
        let errors: Vec<_> = e
            .drain_notifications()
            .into_iter()
            .filter_map(|ev| match ev {
                UiEvent::Log {
                    message,
                    is_error: true,
                } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("too big"));
    }

    #[test]
    fn rejected_texture_within_limits_logs_one_error() {
        let mut gpu = HeadlessBackend::with_texture_units(6);
        gpu.fail_texture_uploads(true);
        let mut e = PhotoEngine::new(
            gpu,
            Options::default(),
            Resolution::new(800, 600),
        )
        .unwrap();
        let _ = e.drain_notifications();
        let id = load(&mut e, "small.png", 32, 16);
        assert_eq!(e.stack().len(), 1);
        assert_eq!(e.stack().active(), Some(id));
        let tex = e.stack().layers()[id].texture();
        assert_eq!(e.gpu().texture(tex).unwrap().rgba, vec![45, 45, 45, 255]);
        assert_eq!(e.viewport(), Resolution::new(800, 400));

        let errors: Vec<_> = e
            .drain_notifications()
            .into_iter()
            .filter_map(|ev| match ev {
                UiEvent::Log {
                    message,
                    is_error: true,
                } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("small.png"));
        assert!(!errors[0].contains("too big"));
    }

    #[test]
    fn full_stack_evicts_oldest_on_upload() {
        let mut e = engine(4);
        assert_eq!(e.profile().layer_capacity, 2);
        let _ = load(&mut e, "a", 4, 4);
        let _ = load(&mut e, "b", 4, 4);
        e.adjust("GaussBlurRadius", 2.0);
        let c = load(&mut e, "c", 4, 4);
        assert_eq!(c, 1);
        assert_eq!(e.stack().len(), 2);
        assert_eq!(e.gpu().live_textures(), 2);
        // "b" moved to slot 0 and carried its blur radius.
        assert_eq!(
            e.stack().layers()[0]
                .properties()
                .get(Property::GaussBlurRadius)
                .value,
            2.0
        );
        assert_eq!(
            e.gpu().uniform("u_GaussBlurRadius[0]"),
            Some(UniformValue::Int(2))
        );
    }

    #[test]
    fn async_upload_with_real_decoder() {
        let mut e = engine(6);
        let source = ImageSource::new(
            "photo.jpg",
            ImageKind::Jpeg,
            fixtures::jpeg(16, 8, [90, 90, 90]),
        );
        let id = pollster::block_on(e.upload(&ImageDecoder, source)).unwrap();
        assert_eq!(id, 0);
        let tex = e.stack().layers()[0].texture();
        let stored = e.gpu().texture(tex).unwrap();
        assert_eq!((stored.width, stored.height), (16, 8));
        assert_eq!(stored.rgba.len(), 16 * 8 * 4);

        let png = fixtures::png_source("overlay.png", 16, 8);
        assert_eq!(pollster::block_on(e.upload(&ImageDecoder, png)).unwrap(), 1);

        let bad = ImageSource::new("bad.png", ImageKind::Png, vec![9; 10]);
        assert!(matches!(
            pollster::block_on(e.upload(&ImageDecoder, bad)),
            Err(PhotoTuneError::Decode(_))
        ));
        assert_eq!(e.stack().len(), 2);
        assert!(!e.upload_pending());
    }

    #[test]
    fn dropped_upload_releases_pending_slot() {
        let mut e = engine(6);
        {
            let mut upload = pin!(
                e.upload(&StalledDecoder, fixtures::png_source("slow.png", 4, 4))
            );
            let mut cx = Context::from_waker(Waker::noop());
            assert!(upload.as_mut().poll(&mut cx).is_pending());
        }
        assert!(!e.upload_pending());
        assert!(e.stack().is_empty());
        assert!(e.drain_notifications().iter().any(|ev| matches!(
            ev,
            UiEvent::Log { message, .. } if message == "upload cancelled"
        )));
        let id = load(&mut e, "next.png", 4, 4);
        assert_eq!(id, 0);
    }

    #[test]
    fn handlers_run_while_decode_is_outstanding() {
        let mut e = engine(6);
        let _ = load(&mut e, "base.png", 8, 8);
        let _ = e.on_frame();

        let ticket = e.begin_upload().unwrap();
        e.adjust("Contrast", 150.0);
        assert!(e.on_frame());
        assert_eq!(e.stack().len(), 1);

        let source = fixtures::png_source("late.png", 8, 4);
        let decoded = pollster::block_on(ImageDecoder.decode(source));
        let id = e.finish_upload(ticket, decoded, None).unwrap();
        assert_eq!(id, 1);
        assert_eq!(e.stack().active(), Some(1));
        assert!(!e.upload_pending());
    }
}
