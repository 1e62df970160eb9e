pub mod blur;
pub mod color;
pub mod compose;
pub mod pipeline;
pub mod text;
pub mod vignette;

use image::RgbaImage;
use rayon::prelude::*;

/// Runs `f(y, row)` over every RGBA row in parallel.
pub(crate) fn for_each_row<F>(rgba: &mut RgbaImage, f: F)
where
    F: Fn(u32, &mut [u8]) + Sync + Send,
{
    let stride = rgba.width() as usize * 4;
    if stride == 0 || rgba.height() == 0 {
        return;
    }
    rgba.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, row)| f(y as u32, row));
}

/// Runs `f(px)` over every RGBA pixel in parallel.
pub(crate) fn for_each_pixel<F>(rgba: &mut RgbaImage, f: F)
where
    F: Fn(&mut [u8]) + Sync + Send,
{
    rgba.par_chunks_exact_mut(4).for_each(f);
}

pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

pub(crate) fn from_unit(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
