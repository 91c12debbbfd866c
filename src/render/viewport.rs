//! Fitting the drawing surface to the loaded image and its container.
//!
//! Canvas dimensions are whole pixels; fractional results are truncated.

use crate::layer::Resolution;

/// Shrink `image` so it fits inside `container`, preserving its aspect
/// ratio. Images already smaller than the container keep their size.
#[must_use]
pub fn fit_image(image: Resolution, container: Resolution) -> Resolution {
    let aspect = image.aspect_ratio();
    let (mut w, mut h) = (f64::from(image.width), f64::from(image.height));
    let (max_w, max_h) = (f64::from(container.width), f64::from(container.height));

    if w > max_w {
        w = max_w;
        h = max_w / aspect;
    }
    if h > max_h {
        h = max_h;
        w = max_h * aspect;
    }
    Resolution::new(w as u32, h as u32)
}

/// Largest size with the given aspect ratio that fills `container` along one
/// axis without overflowing the other.
#[must_use]
pub fn fit_aspect(aspect: f64, container: Resolution) -> Resolution {
    if !aspect.is_finite() || aspect <= 0.0 {
        return container;
    }
    let (max_w, max_h) = (f64::from(container.width), f64::from(container.height));
    let (mut w, mut h) = (max_w, max_h);

    if max_w / aspect > max_h {
        w = (max_h * aspect).floor();
    } else if max_h * aspect > max_w {
        h = max_w / aspect;
    }
    Resolution::new(w as u32, h as u32)
}
