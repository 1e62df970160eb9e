use std::path::Path;

use anyhow::Context;
use image::DynamicImage;

static RAW_EXTS: &[&str] = &["raf", "dng", "nef", "cr2", "arw"];
static SUPPORTED_IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif", "raf", "dng", "nef", "cr2", "arw",
];

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

pub fn is_raw_image(path: &Path) -> bool {
    has_extension(path, RAW_EXTS)
}

/// Returns `true` if the path has an extension we know how to decode.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTS)
}

/// Decodes an image already held in memory, guessing the format from its header.
pub fn decode_bytes(bytes: &[u8]) -> anyhow::Result<DynamicImage> {
    image::load_from_memory(bytes).context("image data could not be decoded")
}

/// Opens an image file, falling back to RAW develop for camera RAW extensions.
pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    if !is_supported_image(path) {
        tracing::warn!(path = %path.display(), "unrecognised extension, attempting decode anyway");
    }
    let img = open_image_with_hooks(path, open_standard, open_raw)
        .with_context(|| format!("failed to open {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "loaded image"
    );
    Ok(img)
}

fn open_standard(path: &Path) -> anyhow::Result<DynamicImage> {
    Ok(image::open(path)?)
}

fn open_raw(path: &Path) -> anyhow::Result<DynamicImage> {
    let raw = rawler::decode_file(path)?;
    let develop = rawler::imgop::develop::RawDevelop::default();
    let intermediate = develop.develop_intermediate(&raw)?;
    intermediate
        .to_dynamic_image()
        .ok_or_else(|| anyhow::anyhow!("raw develop produced invalid image"))
}

fn open_image_with_hooks<FStd, FRaw>(
    path: &Path,
    open_std: FStd,
    open_raw: FRaw,
) -> anyhow::Result<DynamicImage>
where
    FStd: Fn(&Path) -> anyhow::Result<DynamicImage>,
    FRaw: Fn(&Path) -> anyhow::Result<DynamicImage>,
{
    match open_std(path) {
        Ok(img) => Ok(img),
        Err(err) if !is_raw_image(path) => Err(err),
        Err(_) => open_raw(path),
    }
}
