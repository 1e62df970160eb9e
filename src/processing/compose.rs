//! Layering of a (filtered) watermark over a (filtered) base image.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};

use crate::state::{FilterSet, TextStyle};

use super::pipeline::apply_filters;
use super::text::TextRenderer;

pub const MAX_WATERMARK_TEXT_CHARS: usize = 15;

// Positions and sizes are fractions of the base image dimensions.
const IMAGE_ORIGIN: (f32, f32) = (0.10, 0.75);
const IMAGE_WIDTH_OF_BASE_W: f32 = 0.15;
const IMAGE_HEIGHT_OF_BASE_W: f32 = 0.10;
const TEXT_ORIGIN: (f32, f32) = (0.10, 0.80);
const TEXT_SIZE_OF_BASE_W: f32 = 0.05;
pub const TEXT_COLOR: [u8; 3] = [255, 128, 0];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WatermarkError {
    #[error("watermark text is {len} characters, the limit is {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("a text watermark needs a font; pass --font or set MIST_FONT")]
    FontUnavailable,
}

#[derive(Debug, Clone)]
pub enum Watermark {
    Image(DynamicImage),
    Text(String),
}

impl Watermark {
    /// Builds a text watermark, rejecting text over the character limit.
    pub fn text(text: impl Into<String>) -> Result<Self, WatermarkError> {
        let text = text.into();
        let len = text.chars().count();
        if len > MAX_WATERMARK_TEXT_CHARS {
            return Err(WatermarkError::TextTooLong {
                len,
                max: MAX_WATERMARK_TEXT_CHARS,
            });
        }
        Ok(Watermark::Text(text))
    }
}

/// Everything needed to flatten one edit into a single image.
pub struct Layers<'a> {
    pub base: &'a DynamicImage,
    pub base_filters: &'a FilterSet,
    pub watermark: Option<&'a Watermark>,
    pub watermark_filters: &'a FilterSet,
    pub text_style: &'a TextStyle,
}

/// Filters the base, then draws the watermark on top at its fixed position.
pub fn compose(layers: &Layers<'_>, text: Option<&TextRenderer>) -> Result<DynamicImage, WatermarkError> {
    let filtered = apply_filters(layers.base.clone(), layers.base_filters);
    let Some(watermark) = layers.watermark else {
        return Ok(filtered);
    };

    let mut canvas = filtered.to_rgba8();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    match watermark {
        Watermark::Image(img) => {
            let mark = apply_filters(img.clone(), layers.watermark_filters);
            let mark_w = (w * IMAGE_WIDTH_OF_BASE_W).round().max(1.0) as u32;
            let mark_h = (w * IMAGE_HEIGHT_OF_BASE_W).round().max(1.0) as u32;
            let mark = mark.resize_exact(mark_w, mark_h, FilterType::Lanczos3).to_rgba8();
            let (x, y) = origin(IMAGE_ORIGIN, w, h);
            imageops::overlay(&mut canvas, &mark, x, y);
        }
        Watermark::Text(content) => {
            if content.is_empty() {
                return Ok(DynamicImage::ImageRgba8(canvas));
            }
            let renderer = text.ok_or(WatermarkError::FontUnavailable)?;
            if let Some(mask) = renderer.render_mask(content, w * TEXT_SIZE_OF_BASE_W, layers.text_style) {
                let (x, y) = origin(TEXT_ORIGIN, w, h);
                overlay_mask(&mut canvas, &mask, TEXT_COLOR, x, y);
            }
        }
    }

    Ok(DynamicImage::ImageRgba8(canvas))
}

fn origin(frac: (f32, f32), w: f32, h: f32) -> (i64, i64) {
    ((w * frac.0).round() as i64, (h * frac.1).round() as i64)
}

/// Tints a coverage mask with `color` and alpha-composites it at (`x`, `y`).
pub(crate) fn overlay_mask(canvas: &mut RgbaImage, mask: &GrayImage, color: [u8; 3], x: i64, y: i64) {
    let layer = RgbaImage::from_fn(mask.width(), mask.height(), |mx, my| {
        Rgba([color[0], color[1], color[2], mask.get_pixel(mx, my)[0]])
    });
    imageops::overlay(canvas, &layer, x, y);
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};

    use crate::state::{FilterKind, FilterSet, TextStyle};

    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba(px)))
    }

    fn layers<'a>(
        base: &'a DynamicImage,
        watermark: Option<&'a Watermark>,
        base_filters: &'a FilterSet,
        watermark_filters: &'a FilterSet,
        style: &'a TextStyle,
    ) -> Layers<'a> {
        Layers {
            base,
            base_filters,
            watermark,
            watermark_filters,
            text_style: style,
        }
    }

    #[test]
    fn no_watermark_returns_filtered_base() {
        let base = solid(20, 20, [255, 0, 0, 255]);
        let mut filters = FilterSet::new();
        filters.set_intensity(FilterKind::Hue, 120.0);
        let none = FilterSet::new();
        let style = TextStyle::default();
        let out = compose(&layers(&base, None, &filters, &none, &style), None)
            .unwrap()
            .to_rgba8();
        assert!(out.get_pixel(10, 10)[1] > 250);
    }

    #[test]
    fn image_watermark_lands_at_fixed_position() {
        let base = solid(100, 100, [0, 0, 0, 255]);
        let mark = Watermark::Image(solid(4, 4, [255, 255, 255, 255]));
        let none = FilterSet::new();
        let style = TextStyle::default();
        let out = compose(&layers(&base, Some(&mark), &none, &none, &style), None)
            .unwrap()
            .to_rgba8();

        assert_eq!(out.dimensions(), (100, 100));
        // rect spans x 10..25, y 75..85
        assert!(out.get_pixel(12, 77)[0] > 250);
        assert!(out.get_pixel(24, 84)[0] > 250);
        assert_eq!(out.get_pixel(9, 77).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(12, 86).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(50, 50).0, [0, 0, 0, 255]);
    }

    #[test]
    fn watermark_filters_only_touch_the_watermark() {
        let base = solid(100, 100, [255, 0, 0, 255]);
        let mark = Watermark::Image(solid(4, 4, [255, 0, 0, 255]));
        let none = FilterSet::new();
        let mut mark_filters = FilterSet::new();
        mark_filters.set_intensity(FilterKind::Hue, 240.0);
        let style = TextStyle::default();
        let out = compose(&layers(&base, Some(&mark), &none, &mark_filters, &style), None)
            .unwrap()
            .to_rgba8();

        assert_eq!(out.get_pixel(50, 50).0, [255, 0, 0, 255]);
        let p = out.get_pixel(15, 80);
        assert!(p[2] > 250 && p[0] < 5);
    }

    #[test]
    fn transparent_watermark_keeps_base_visible() {
        let base = solid(100, 100, [0, 0, 200, 255]);
        let mark = Watermark::Image(solid(4, 4, [255, 255, 255, 0]));
        let none = FilterSet::new();
        let style = TextStyle::default();
        let out = compose(&layers(&base, Some(&mark), &none, &none, &style), None)
            .unwrap()
            .to_rgba8();
        assert_eq!(out.get_pixel(15, 80).0, [0, 0, 200, 255]);
    }

    #[test]
    fn text_watermark_without_font_is_an_error() {
        let base = solid(10, 10, [0, 0, 0, 255]);
        let mark = Watermark::text("hello").unwrap();
        let none = FilterSet::new();
        let style = TextStyle::default();
        let err = compose(&layers(&base, Some(&mark), &none, &none, &style), None).unwrap_err();
        assert_eq!(err, WatermarkError::FontUnavailable);
    }

    #[test]
    fn empty_text_watermark_draws_nothing() {
        let base = solid(10, 10, [9, 9, 9, 255]);
        let mark = Watermark::text("").unwrap();
        let none = FilterSet::new();
        let style = TextStyle::default();
        let out = compose(&layers(&base, Some(&mark), &none, &none, &style), None).unwrap();
        assert_eq!(out.to_rgba8(), base.to_rgba8());
    }

    #[test]
    fn text_longer_than_limit_is_rejected() {
        assert!(Watermark::text("fifteen chars!!").is_ok());
        assert_eq!(
            Watermark::text("sixteen chars!!!").unwrap_err(),
            WatermarkError::TextTooLong { len: 16, max: 15 }
        );
    }

    #[test]
    fn mask_overlay_tints_and_clips() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));
        // partially off-canvas must not panic
        overlay_mask(&mut canvas, &mask, TEXT_COLOR, 8, 8);
        let p = canvas.get_pixel(8, 8);
        assert!(p[0] > 250 && (p[1] as i32 - 128).abs() <= 1 && p[2] < 5);
        assert_eq!(canvas.get_pixel(9, 8).0, [0, 0, 0, 255]);
    }

    #[test]
    fn text_watermark_is_orange_below_left_of_centre() {
        let Some(renderer) = crate::processing::text::resolve_font_path(None, None)
            .and_then(|path| TextRenderer::from_file(&path).ok())
        else {
            return;
        };
        let base = solid(800, 800, [0, 0, 0, 255]);
        let mark = Watermark::text("mist").unwrap();
        let none = FilterSet::new();
        let style = TextStyle::default();
        let out = compose(&layers(&base, Some(&mark), &none, &none, &style), Some(&renderer))
            .unwrap()
            .to_rgba8();

        // origin (80, 640), 40px text
        let inked: Vec<_> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .collect();
        if inked.is_empty() {
            return;
        }
        for (x, y, p) in &inked {
            assert!((80..400).contains(x) && (640..720).contains(y), "ink at ({x}, {y})");
            assert_eq!(p[2], 0);
        }
        assert!(inked.iter().any(|(_, _, p)| {
            p[0] >= 254 && (p[1] as i32 - TEXT_COLOR[1] as i32).abs() <= 1
        }));
    }
}
