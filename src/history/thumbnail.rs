use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Dimensions of `width`x`height` scaled uniformly to fit in the box.
///
/// The scale is `min(max_width / width, max_height / height)`, so small
/// images are enlarged. Both sides are rounded down but never below one
/// pixel.
pub fn fitted_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    // Integer arithmetic so the binding side lands exactly on the box edge.
    let (w, h) = (u64::from(width), u64::from(height));
    let (max_w, max_h) = (u64::from(max_width), u64::from(max_height));
    let (fitted_w, fitted_h) = if w * max_h >= h * max_w {
        (max_w, h * max_w / w)
    } else {
        (w * max_h / h, max_h)
    };
    // Both are bounded by the box, so they fit back into u32.
    (fitted_w.max(1) as u32, fitted_h.max(1) as u32)
}

/// Copy scaled for list display; see [`fitted_size`].
pub fn thumbnail(image: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (width, height) = fitted_size(image.width(), image.height(), max_width, max_height);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}
