use std::path::Path;

use image::DynamicImage;

use crate::export::{self, ExportOptions};
use crate::processing::compose::{self, Layers, Watermark, WatermarkError};
use crate::processing::text::TextRenderer;
use crate::state::{FilterSet, Recipe, TextStyle};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("no base image selected; select an image before saving")]
    NoBaseImage,
}

/// In-memory state of one editing session: base image, watermark and filters.
#[derive(Debug, Default)]
pub struct EditSession {
    base: Option<DynamicImage>,
    watermark: Option<Watermark>,
    image_filters: FilterSet,
    watermark_filters: FilterSet,
    text_style: TextStyle,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base(&mut self, img: DynamicImage) {
        self.base = Some(img);
    }

    /// Uses an image as the watermark, replacing any text watermark.
    pub fn set_watermark_image(&mut self, img: DynamicImage) {
        self.watermark = Some(Watermark::Image(img));
    }

    /// Uses text as the watermark, replacing any image watermark.
    pub fn set_watermark_text(&mut self, text: &str) -> Result<(), WatermarkError> {
        self.watermark = Some(Watermark::text(text)?);
        Ok(())
    }

    pub fn clear_watermark(&mut self) {
        self.watermark = None;
    }

    pub fn watermark(&self) -> Option<&Watermark> {
        self.watermark.as_ref()
    }

    pub fn image_filters(&self) -> &FilterSet {
        &self.image_filters
    }

    pub fn image_filters_mut(&mut self) -> &mut FilterSet {
        &mut self.image_filters
    }

    pub fn watermark_filters(&self) -> &FilterSet {
        &self.watermark_filters
    }

    pub fn watermark_filters_mut(&mut self) -> &mut FilterSet {
        &mut self.watermark_filters
    }

    pub fn text_style(&self) -> &TextStyle {
        &self.text_style
    }

    pub fn text_style_mut(&mut self) -> &mut TextStyle {
        &mut self.text_style
    }

    /// Replaces filters and text style with the ones from `recipe`.
    pub fn apply_recipe(&mut self, recipe: &Recipe) {
        self.image_filters = recipe.image_filters.clone();
        self.watermark_filters = recipe.watermark_filters.clone();
        self.text_style = recipe.text_style.clone();
    }

    /// Flattens the session into a single image.
    pub fn render(&self, text: Option<&TextRenderer>) -> anyhow::Result<DynamicImage> {
        let base = self.base.as_ref().ok_or(SessionError::NoBaseImage)?;
        let layers = Layers {
            base,
            base_filters: &self.image_filters,
            watermark: self.watermark.as_ref(),
            watermark_filters: &self.watermark_filters,
            text_style: &self.text_style,
        };
        tracing::debug!(
            image_filters = self.image_filters.len(),
            watermark_filters = self.watermark_filters.len(),
            watermark = ?self.watermark.as_ref().map(watermark_kind),
            "rendering session"
        );
        Ok(compose::compose(&layers, text)?)
    }

    /// Renders and writes the result to `path`.
    pub fn save(
        &self,
        path: &Path,
        text: Option<&TextRenderer>,
        options: &ExportOptions,
    ) -> anyhow::Result<()> {
        let rendered = self.render(text)?;
        export::write_image(&rendered, path, options)
    }
}

fn watermark_kind(w: &Watermark) -> &'static str {
    match w {
        Watermark::Image(_) => "image",
        Watermark::Text(_) => "text",
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use super::{EditSession, SessionError};
    use crate::processing::compose::{Watermark, WatermarkError};
    use crate::state::{FilterKind, FilterSet, Recipe};

    fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba(px)))
    }

    #[test]
    fn render_without_base_is_an_error() {
        let session = EditSession::new();
        let err = session.render(None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::NoBaseImage)
        );
    }

    #[test]
    fn watermark_kinds_replace_each_other() {
        let mut session = EditSession::new();
        session.set_watermark_text("mist").unwrap();
        session.set_watermark_image(solid(2, 2, [1, 1, 1, 255]));
        assert!(matches!(session.watermark(), Some(Watermark::Image(_))));
        session.set_watermark_text("again").unwrap();
        assert!(matches!(session.watermark(), Some(Watermark::Text(t)) if t == "again"));
        session.clear_watermark();
        assert!(session.watermark().is_none());
    }

    #[test]
    fn over_long_text_keeps_previous_watermark() {
        let mut session = EditSession::new();
        session.set_watermark_text("ok").unwrap();
        let err = session.set_watermark_text("this is far too long").unwrap_err();
        assert!(matches!(err, WatermarkError::TextTooLong { .. }));
        assert!(matches!(session.watermark(), Some(Watermark::Text(t)) if t == "ok"));
    }

    #[test]
    fn render_applies_session_filters() {
        let mut session = EditSession::new();
        session.set_base(solid(8, 8, [100, 100, 100, 255]));
        session.image_filters_mut().toggle(FilterKind::Sepia, 1.0);
        let out = session.render(None).unwrap().to_rgba8();
        let p = out.get_pixel(4, 4);
        assert!(p[0] > p[2]);
    }

    #[test]
    fn recipe_replaces_filters_and_style() {
        let mut session = EditSession::new();
        session.image_filters_mut().toggle(FilterKind::Blur, 3.0);

        let mut image_filters = FilterSet::new();
        image_filters.set_intensity(FilterKind::Hue, 30.0);
        let mut recipe = Recipe {
            image_filters,
            ..Default::default()
        };
        recipe.text_style.kern = 1.5;
        session.apply_recipe(&recipe);

        assert!(!session.image_filters().contains(FilterKind::Blur));
        assert_eq!(session.image_filters().intensity(FilterKind::Hue), Some(30.0));
        assert_eq!(session.text_style().kern, 1.5);
    }

    #[test]
    fn save_writes_composited_png() {
        let mut session = EditSession::new();
        session.set_base(solid(20, 20, [0, 0, 0, 255]));
        session.set_watermark_image(solid(2, 2, [255, 255, 255, 255]));
        let path = std::env::temp_dir()
            .join(format!("mist-session-test-{}", std::process::id()))
            .join("out.png");
        session
            .save(&path, None, &crate::export::ExportOptions::default())
            .unwrap();

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (20, 20));
        // watermark rect: x 2..5, y 15..17
        assert!(back.get_pixel(3, 15)[0] > 200);
        assert_eq!(back.get_pixel(10, 5)[0], 0);
        let _ = std::fs::remove_file(&path);
    }
}
