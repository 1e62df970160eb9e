use image::DynamicImage;

use super::{for_each_row, from_unit, smoothstep, to_unit};

// Normalised distance from the centre where darkening starts.
const FALLOFF_START: f32 = 0.25;

/// Darkens towards the corners by up to `amount` (0..=1). The centre is untouched.
pub fn apply(img: DynamicImage, amount: f32) -> DynamicImage {
    let amount = amount.clamp(0.0, 1.0);
    if amount < 0.001 {
        return img;
    }

    let mut rgba = img.to_rgba8();
    let cx = (rgba.width() as f32 - 1.0) * 0.5;
    let cy = (rgba.height() as f32 - 1.0) * 0.5;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1e-3);

    for_each_row(&mut rgba, |y, row| {
        let dy = y as f32 - cy;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let dx = x as f32 - cx;
            let dist = (dx * dx + dy * dy).sqrt() / max_dist;
            let w = smoothstep(FALLOFF_START, 1.0, dist);
            let factor = 1.0 - amount * w * w;
            for c in px.iter_mut().take(3) {
                *c = from_unit(to_unit(*c) * factor);
            }
        }
    });
    DynamicImage::ImageRgba8(rgba)
}
