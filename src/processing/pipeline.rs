use std::time::Instant;

use image::DynamicImage;

use crate::state::{FilterKind, FilterSet, FilterSetting};

use super::{blur, color, vignette};

/// Applies a single named filter.
pub fn apply_filter(img: DynamicImage, setting: &FilterSetting) -> DynamicImage {
    let intensity = setting.kind.clamp(setting.intensity);
    match setting.kind {
        FilterKind::Blur => blur::gaussian(img, intensity),
        FilterKind::Vignette => vignette::apply(img, intensity),
        FilterKind::Sepia => color::sepia(img, intensity),
        FilterKind::Bloom => blur::bloom(img, intensity),
        FilterKind::Hue => color::hue_rotate(img, intensity),
    }
}

/// Applies every filter in `filters`, in order, each one consuming the previous output.
pub fn apply_filters(img: DynamicImage, filters: &FilterSet) -> DynamicImage {
    if filters.is_empty() {
        return img;
    }
    filters.iter().fold(img, |acc, setting| {
        let t0 = Instant::now();
        let out = apply_filter(acc, setting);
        tracing::debug!(
            filter = setting.kind.name(),
            intensity = setting.intensity,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "applied filter"
        );
        out
    })
}
