use image::DynamicImage;
use imageproc::filter::gaussian_blur_f32;
use rayon::prelude::*;

use super::{from_unit, to_unit};

/// Blur radius used for the bloom glow.
pub const BLOOM_RADIUS: f32 = 10.0;

/// Gaussian blur with `radius` used as sigma. Output keeps the input size.
pub fn gaussian(img: DynamicImage, radius: f32) -> DynamicImage {
    if radius < 0.001 || img.width() == 0 || img.height() == 0 {
        return img;
    }
    let rgba = img.to_rgba8();
    DynamicImage::ImageRgba8(gaussian_blur_f32(&rgba, radius))
}

/// Screen-blends a wide blur of the image over itself, weighted by `amount`.
pub fn bloom(img: DynamicImage, amount: f32) -> DynamicImage {
    let amount = amount.clamp(0.0, 1.0);
    if amount < 0.001 || img.width() == 0 || img.height() == 0 {
        return img;
    }

    let mut rgba = img.to_rgba8();
    let glow = gaussian_blur_f32(&rgba, BLOOM_RADIUS);
    rgba.par_chunks_exact_mut(4)
        .zip(glow.par_chunks_exact(4))
        .for_each(|(px, g)| {
            for c in 0..3 {
                let s = to_unit(px[c]);
                let b = to_unit(g[c]) * amount;
                px[c] = from_unit(1.0 - (1.0 - s) * (1.0 - b));
            }
        });
    DynamicImage::ImageRgba8(rgba)
}
