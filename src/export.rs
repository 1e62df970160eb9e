use std::path::Path;

use anyhow::Context;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{
    CompressionType as PngCompressionType, FilterType as PngFilterType, PngEncoder,
};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    /// `None` picks the format from the output extension, defaulting to PNG.
    pub format: Option<OutputFormat>,
    pub jpg_quality: u8,
    pub png_compression: u8,
    pub resize_long_edge: Option<u32>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: None,
            jpg_quality: 90,
            png_compression: 6,
            resize_long_edge: None,
        }
    }
}

impl ExportOptions {
    pub fn format_for(&self, path: &Path) -> OutputFormat {
        self.format
            .or_else(|| OutputFormat::from_path(path))
            .unwrap_or(OutputFormat::Png)
    }
}

/// Writes `img` to `output_path`, downscaling first when a long-edge limit is set.
pub fn write_image(img: &DynamicImage, output_path: &Path, options: &ExportOptions) -> anyhow::Result<()> {
    let rendered = apply_export_resize(img, options.resize_long_edge);
    let format = options.format_for(output_path);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    let writer = std::io::BufWriter::new(file);
    match format {
        OutputFormat::Jpg => {
            let encoder = JpegEncoder::new_with_quality(writer, options.jpg_quality.clamp(1, 100));
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(rendered.to_rgb8()).write_with_encoder(encoder)?;
        }
        OutputFormat::Png => {
            let compression = PngCompressionType::Level(options.png_compression.min(9));
            let encoder =
                PngEncoder::new_with_quality(writer, compression, PngFilterType::Adaptive);
            rendered.write_with_encoder(encoder)?;
        }
        OutputFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(writer);
            DynamicImage::ImageRgba8(rendered.to_rgba8()).write_with_encoder(encoder)?;
        }
    }
    tracing::info!(
        path = %output_path.display(),
        format = format.extension(),
        width = rendered.width(),
        height = rendered.height(),
        "saved image"
    );
    Ok(())
}

fn apply_export_resize(img: &DynamicImage, long_edge: Option<u32>) -> DynamicImage {
    let Some((new_w, new_h)) =
        long_edge.and_then(|limit| resized_dimensions(img.width(), img.height(), limit))
    else {
        return img.clone();
    };
    img.resize_exact(new_w, new_h, FilterType::Lanczos3)
}

fn resized_dimensions(width: u32, height: u32, max_long_edge: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || max_long_edge == 0 {
        return None;
    }
    let long = width.max(height);
    if long <= max_long_edge {
        return None;
    }
    let scale = max_long_edge as f32 / long as f32;
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    Some((new_w, new_h))
}
