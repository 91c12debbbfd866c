//! Image decoding for uploaded layers.
//!
//! Two upload kinds are accepted: PNG decodes to RGBA8, JPEG to RGB8. The
//! [`DecodeService`] trait is the only asynchronous seam in the crate;
//! [`ImageDecoder`] is the default implementation backed by the `image`
//! crate.

use std::fmt;
use std::future::Future;

/// Declared type of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
}

impl ImageKind {
    /// Map a MIME type to an upload kind. Parameters after `;` are ignored.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Guess the kind from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Canonical MIME type.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Pixel format this kind decodes to.
    #[must_use]
    pub const fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Png => PixelFormat::Rgba8,
            Self::Jpeg => PixelFormat::Rgb8,
        }
    }

    const fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Layout of decoded pixel rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel.
    Rgba8,
    /// 3 bytes per pixel.
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
        }
    }
}

/// Raw upload: bytes plus the declared kind and a source identifier used in
/// error messages and as the default layer label.
#[derive(Debug, Clone)]
pub struct ImageSource {
    /// Source identifier (file name).
    pub name: String,
    /// Declared type.
    pub kind: ImageKind,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

impl ImageSource {
    /// Bundle an upload.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ImageKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// Bundle an upload declared by MIME type.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Unsupported`] for anything but PNG or JPEG.
    pub fn from_mime(
        name: impl Into<String>,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        let name = name.into();
        match ImageKind::from_mime(mime) {
            Some(kind) => Ok(Self::new(name, kind, bytes)),
            None => Err(DecodeError::Unsupported {
                name,
                mime: mime.to_owned(),
            }),
        }
    }
}

/// A decoded image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Source identifier.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel layout of `pixels`.
    pub format: PixelFormat,
    /// Tightly packed pixel rows.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Expand to RGBA8 with the row order reversed (bottom row first), the
    /// layout textures sampled with a bottom-left UV origin expect.
    #[must_use]
    pub fn to_rgba8_flipped(&self) -> Vec<u8> {
        let channels = self.format.channels();
        let row_len = self.width as usize * channels;
        let mut out =
            Vec::with_capacity(self.width as usize * self.height as usize * 4);
        if row_len == 0 {
            return out;
        }
        for row in self.pixels.chunks_exact(row_len).rev() {
            match self.format {
                PixelFormat::Rgba8 => out.extend_from_slice(row),
                PixelFormat::Rgb8 => {
                    for px in row.chunks_exact(3) {
                        out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                    }
                }
            }
        }
        out
    }
}

/// Decoding failures. Every variant names the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The declared MIME type is not an accepted upload kind.
    Unsupported {
        /// Source identifier.
        name: String,
        /// Declared MIME type.
        mime: String,
    },
    /// The bytes could not be decoded as the declared kind.
    Malformed {
        /// Source identifier.
        name: String,
        /// Decoder message.
        reason: String,
    },
    /// The upload contained no bytes or decoded to a zero-sized image.
    Empty {
        /// Source identifier.
        name: String,
    },
}

impl DecodeError {
    /// Source identifier of the failed upload.
    #[must_use]
    pub fn source_name(&self) -> &str {
        match self {
            Self::Unsupported { name, .. }
            | Self::Malformed { name, .. }
            | Self::Empty { name } => name,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { name, mime } => {
                write!(f, "could not load image {name}: unsupported type {mime}")
            }
            Self::Malformed { name, reason } => {
                write!(f, "could not load image {name}: {reason}")
            }
            Self::Empty { name } => {
                write!(f, "could not load image {name}: no image data")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Asynchronous image decoder.
pub trait DecodeService {
    /// Decode one upload.
    fn decode(
        &self,
        source: ImageSource,
    ) -> impl Future<Output = Result<DecodedImage, DecodeError>>;
}

/// Decoder backed by the `image` crate. Decoding completes synchronously;
/// the returned future is immediately ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    /// Decode an upload on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the bytes are empty, malformed, or decode
    /// to a zero-sized image.
    pub fn decode_blocking(
        &self,
        source: &ImageSource,
    ) -> Result<DecodedImage, DecodeError> {
        if source.bytes.is_empty() {
            return Err(DecodeError::Empty {
                name: source.name.clone(),
            });
        }
        let dynamic = image::load_from_memory_with_format(
            &source.bytes,
            source.kind.image_format(),
        )
        .map_err(|e| DecodeError::Malformed {
            name: source.name.clone(),
            reason: e.to_string(),
        })?;

        let (width, height) = (dynamic.width(), dynamic.height());
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty {
                name: source.name.clone(),
            });
        }
        let format = source.kind.pixel_format();
        let pixels = match format {
            PixelFormat::Rgba8 => dynamic.into_rgba8().into_raw(),
            PixelFormat::Rgb8 => dynamic.into_rgb8().into_raw(),
        };
        log::debug!(
            "decoded {} ({}x{}, {:?})",
            source.name,
            width,
            height,
            format
        );
        Ok(DecodedImage {
            name: source.name.clone(),
            width,
            height,
            format,
            pixels,
        })
    }
}

impl DecodeService for ImageDecoder {
    fn decode(
        &self,
        source: ImageSource,
    ) -> impl Future<Output = Result<DecodedImage, DecodeError>> {
        std::future::ready(self.decode_blocking(&source))
    }
}

/// Test fixtures shared across modules.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use super::{DecodedImage, ImageKind, ImageSource, PixelFormat};

    /// Encode a solid-color PNG.
    pub(crate) fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Encode a solid-color JPEG.
    pub(crate) fn jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    /// A PNG upload.
    pub(crate) fn png_source(name: &str, width: u32, height: u32) -> ImageSource {
        ImageSource::new(name, ImageKind::Png, png(width, height, [10, 20, 30, 255]))
    }

    /// An already decoded RGBA image.
    pub(crate) fn rgba(name: &str, width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            name: name.to_owned(),
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels: vec![200; (width * height * 4) as usize],
        }
    }
}
