use image::{RgbaImage, imageops::FilterType};
use tracing::debug;

use crate::config::LogoConfig;
use crate::geometry::{Padding, place};

/// Scale `logo` so its binding dimension equals `size_percent` of the canvas.
///
/// Width binds when the logo is at least as wide as it is tall, height
/// otherwise. Aspect ratio is kept and each side is at least one pixel.
pub fn logo_target_size(logo: (u32, u32), canvas: (u32, u32), size_percent: f32) -> (u32, u32) {
    let (logo_w, logo_h) = (logo.0 as f32, logo.1 as f32);
    let factor = if logo.0 >= logo.1 {
        size_percent / 100.0 * canvas.0 as f32 / logo_w
    } else {
        size_percent / 100.0 * canvas.1 as f32 / logo_h
    };

    (
        (logo_w * factor).round().max(1.0) as u32,
        (logo_h * factor).round().max(1.0) as u32,
    )
}

pub fn load_logo(config: &LogoConfig, canvas: (u32, u32)) -> image::ImageResult<RgbaImage> {
    let raw = image::open(&config.path)?;
    let (width, height) = logo_target_size(
        (raw.width(), raw.height()),
        canvas,
        config.size_percent,
    );
    debug!(
        "Resizing logo {:?} from {}x{} to {}x{}",
        config.path,
        raw.width(),
        raw.height(),
        width,
        height
    );
    Ok(raw
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgba8())
}

/// Alpha-composite the logo onto the canvas; returns where it landed.
pub fn place_logo(canvas: &mut RgbaImage, logo: &RgbaImage, config: &LogoConfig) -> (u32, u32) {
    let (x, y) = place(
        canvas.dimensions(),
        logo.dimensions(),
        config.align_x,
        config.align_y,
        Padding::default(),
    );
    debug!(
        "Placing the logo {}/{} at ({}, {})",
        config.align_x, config.align_y, x, y
    );
    image::imageops::overlay(canvas, logo, i64::from(x), i64::from(y));
    (x, y)
}
