use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont, point};
use anyhow::{Context, anyhow};
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::state::TextStyle;

pub const FONT_ENV: &str = "MIST_FONT";

static SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Rasterises watermark text with a single loaded font.
pub struct TextRenderer {
    font: FontVec,
}

impl TextRenderer {
    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let font = FontVec::try_from_vec(bytes).map_err(|_| anyhow!("invalid font data"))?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("failed to parse font {}", path.display()))
    }

    /// Renders `text` at `px` pixels into a coverage mask.
    ///
    /// Returns `None` for empty text. `kern` widens every advance and `stroke`
    /// keeps only an outline of that width around the glyphs. `obliqueness`
    /// shears rows about the baseline: rows above it move right, descenders
    /// move left, and the whole line is shifted so nothing falls off the mask.
    pub fn render_mask(&self, text: &str, px: f32, style: &TextStyle) -> Option<GrayImage> {
        if text.is_empty() || px <= 0.0 {
            return None;
        }
        let style = style.clamped();
        let scale = PxScale::from(px);
        let scaled = self.font.as_scaled(scale);
        let ascent = scaled.ascent();
        let descent = scaled.descent();
        let line_h = (ascent - descent).ceil().max(1.0);
        let shear = style.obliqueness;
        let lean = |y: f32| (ascent - y) * shear - descent * shear;
        let pad = style.stroke.map_or(0.0, f32::ceil) + 1.0;

        let mut glyphs = Vec::with_capacity(text.len());
        let mut caret = 0.0_f32;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, ascent)));
            caret += scaled.h_advance(id) + style.kern;
            prev = Some(id);
        }

        let width = (caret + line_h * shear + pad * 2.0).ceil().max(1.0) as u32;
        let height = (line_h + pad * 2.0).ceil() as u32;
        let mut mask = GrayImage::new(width, height);

        for glyph in glyphs {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, cov| {
                let y = bounds.min.y + gy as f32;
                let x = bounds.min.x + gx as f32 + lean(y);
                plot(&mut mask, x + pad, y + pad, cov);
            });
        }

        Some(match style.stroke {
            Some(width) => outline(&mask, width),
            None => mask,
        })
    }
}

fn plot(mask: &mut GrayImage, x: f32, y: f32, coverage: f32) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= mask.width() || y >= mask.height() {
        return;
    }
    let v = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
    let px = mask.get_pixel_mut(x, y);
    px.0[0] = px.0[0].max(v);
}

/// Replaces filled glyph coverage with a ring `width` pixels wide around it.
pub(crate) fn outline(mask: &GrayImage, width: f32) -> GrayImage {
    let k = width.round().clamp(1.0, 255.0) as u8;
    let grown = dilate(mask, Norm::LInf, k);
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([grown.get_pixel(x, y)[0].saturating_sub(mask.get_pixel(x, y)[0])])
    })
}

/// Resolves the font to use: explicit path, then `MIST_FONT`, then config, then system fonts.
pub fn resolve_font_path(explicit: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    let env = std::env::var_os(FONT_ENV).map(PathBuf::from);
    resolve_font_path_with(explicit, env.as_deref(), configured, |p| p.is_file())
}

fn resolve_font_path_with<F>(
    explicit: Option<&Path>,
    env: Option<&Path>,
    configured: Option<&Path>,
    exists: F,
) -> Option<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    for (source, candidate) in [("flag", explicit), ("env", env), ("config", configured)] {
        let Some(path) = candidate else {
            continue;
        };
        if exists(path) {
            return Some(path.to_path_buf());
        }
        tracing::warn!(source, path = %path.display(), "font not found, trying next source");
    }

    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .chain(user_fonts())
        .find(|p| exists(p))
}

fn user_fonts() -> impl Iterator<Item = PathBuf> {
    dirs::font_dir()
        .and_then(|dir| std::fs::read_dir(dir).ok())
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
        })
}
