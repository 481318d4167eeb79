use image::{DynamicImage, GrayImage, ImageFormat, ImageResult};
use std::path::Path;
use tracing::{debug, info};

/// Save an image, picking the format from the file extension.
///
/// JPEG has no alpha channel, so images headed for `.jpg`/`.jpeg` are
/// flattened to RGB first.
pub fn save_image(image: &DynamicImage, path: &Path) -> ImageResult<()> {
    ensure_parent(path)?;

    let format = ImageFormat::from_path(path)?;
    if format == ImageFormat::Jpeg && image.color().has_alpha() {
        debug!("Converting to RGB for JPEG output: {:?}", path);
        DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format)?;
    } else {
        image.save_with_format(path, format)?;
    }

    info!("Wrote {:?}", path);
    Ok(())
}

/// Save a watermark mask as a single-channel TIFF.
pub fn save_mask(mask: &GrayImage, path: &Path) -> ImageResult<()> {
    ensure_parent(path)?;
    mask.save_with_format(path, ImageFormat::Tiff)?;
    info!("Wrote mask {:?}", path);
    Ok(())
}

pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
