//! Text or image watermarks with a companion mask.
//!
//! The mark is first rendered into an RGBA layer of its own size: text as
//! glyph coverage in the configured colour, images as-is after scaling. The
//! layer is then stamped onto a copy of the source while the mask records
//! which pixels were inked.

mod mask;

pub use mask::{
    InkRule, MASK_CLEAR, MASK_INK, MarkBackground, Thresholds, blank_mask, ink_count, stamp,
};

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage, imageops::FilterType};
use imageproc::drawing::draw_text_mut;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{MAX_DIMENSION, MarkConfig, WatermarkConfig};
use crate::fonts::{FontError, FontHandle, FontRegistry};
use crate::geometry::place;
use crate::output::{save_image, save_mask};

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Font error: {0}")]
    FontError(#[from] FontError),

    #[error("Image is {width}x{height}, larger than the {limit_x}x{limit_y} limit")]
    ImageTooLarge {
        width: u32,
        height: u32,
        limit_x: u32,
        limit_y: u32,
    },

    #[error("Watermark renders to an empty image")]
    EmptyMark,

    #[error("Scaled watermark would be {width}x{height}, larger than {limit}px")]
    MarkTooLarge { width: u64, height: u64, limit: u32 },
}

/// A rendered mark ready to be stamped.
#[derive(Debug, Clone)]
pub struct MarkLayer {
    pub pixels: RgbaImage,
    /// Whether transparency, rather than colour, decides what is ink
    pub has_alpha: bool,
}

impl MarkLayer {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// The result of watermarking one image in memory.
#[derive(Debug)]
pub struct Watermarked {
    pub image: RgbaImage,
    pub mask: GrayImage,
    pub origin: (u32, u32),
    pub ink_pixels: usize,
}

/// Paths written by [`WatermarkComposer::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkOutput {
    pub image: PathBuf,
    pub mask: Option<PathBuf>,
}

/// `<stem>_WaterMarked.<ext>` and `<stem>_mask.tif` next to `output`.
pub fn output_paths(output: &Path) -> (PathBuf, PathBuf) {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jpg".to_string());

    (
        output.with_file_name(format!("{}_WaterMarked.{}", stem, extension)),
        output.with_file_name(format!("{}_mask.tif", stem)),
    )
}

pub struct WatermarkComposer {
    config: WatermarkConfig,
    layer: MarkLayer,
}

impl WatermarkComposer {
    /// Render the mark once so it can be reused across a batch.
    pub fn new(
        config: WatermarkConfig,
        fonts: &FontRegistry,
        fonts_folder: &Path,
    ) -> Result<Self, WatermarkError> {
        let layer = render_mark(&config.mark, fonts, fonts_folder)?;
        let (width, height) = layer.dimensions();
        if width == 0 || height == 0 {
            return Err(WatermarkError::EmptyMark);
        }
        info!("Watermark measures {}x{}px", width, height);
        Ok(Self { config, layer })
    }

    pub fn layer(&self) -> &MarkLayer {
        &self.layer
    }

    pub fn apply(&self, source: &DynamicImage) -> Result<Watermarked, WatermarkError> {
        let (width, height) = (source.width(), source.height());
        if width > self.config.horizontal_limit || height > self.config.vertical_limit {
            return Err(WatermarkError::ImageTooLarge {
                width,
                height,
                limit_x: self.config.horizontal_limit,
                limit_y: self.config.vertical_limit,
            });
        }

        let origin = place(
            (width, height),
            self.layer.dimensions(),
            self.config.align_x,
            self.config.align_y,
            self.config.padding,
        );
        debug!(
            "Aligning {}/{} on {}x{}: drawing at {:?}",
            self.config.align_x, self.config.align_y, width, height, origin
        );

        let rule = InkRule::select(
            self.layer.has_alpha,
            self.config.background,
            &self.config.thresholds,
        );
        let mut image = source.to_rgba8();
        let mut mask = blank_mask(width, height);
        let ink_pixels = stamp(&mut image, &mut mask, &self.layer.pixels, origin, rule);

        let image = image::imageops::crop_imm(&image, 0, 0, width, height).to_image();

        Ok(Watermarked {
            image,
            mask,
            origin,
            ink_pixels,
        })
    }

    /// Watermark `input` and write the marked image and mask beside `output`.
    pub fn run(&self, input: &Path, output: &Path) -> Result<WatermarkOutput, WatermarkError> {
        let source = image::open(input)?;
        info!(
            "Image {:?} is w:{}px h:{}px",
            input,
            source.width(),
            source.height()
        );

        let marked = self.apply(&source)?;
        let (image_path, mask_path) = output_paths(output);

        let mask = if self.config.generate_mask {
            save_mask(&marked.mask, &mask_path)?;
            Some(mask_path)
        } else {
            None
        };
        save_image(&DynamicImage::ImageRgba8(marked.image), &image_path)?;

        Ok(WatermarkOutput {
            image: image_path,
            mask,
        })
    }
}

pub fn render_mark(
    mark: &MarkConfig,
    fonts: &FontRegistry,
    fonts_folder: &Path,
) -> Result<MarkLayer, WatermarkError> {
    match mark {
        MarkConfig::Text {
            text,
            font,
            font_file,
            size,
            colour,
        } => {
            let handle = match font_file {
                Some(file) => FontHandle::from_file(&fonts_folder.join(file), *size)?,
                None => fonts.load(font, *size)?,
            };
            Ok(render_text_mark(text, &handle, *colour))
        }
        MarkConfig::Image { path, scale } => {
            let image = image::open(path)?;
            scale_image_mark(image, *scale)
        }
    }
}

/// Rasterize text as a coverage layer tinted with `colour`.
///
/// The layer is cropped to the inked box, so descenders and overhanging
/// glyphs are kept whole.
pub fn render_text_mark(text: &str, font: &FontHandle, colour: Rgba<u8>) -> MarkLayer {
    let Some((left, top, right, bottom)) = font.ink_bounds(text) else {
        return MarkLayer {
            pixels: RgbaImage::new(0, 0),
            has_alpha: true,
        };
    };
    let width = (right - left) as u32;
    let height = (bottom - top) as u32;

    let mut coverage = GrayImage::new(width, height);
    draw_text_mut(
        &mut coverage,
        Luma([255u8]),
        -left,
        -top,
        font.scale(),
        font.font(),
        text,
    );

    let [r, g, b, a] = colour.0;
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        let cover = u16::from(coverage.get_pixel(x, y)[0]);
        Rgba([r, g, b, ((cover * u16::from(a)) / 255) as u8])
    });

    MarkLayer {
        pixels,
        has_alpha: true,
    }
}

pub fn scale_image_mark(image: DynamicImage, scale: f32) -> Result<MarkLayer, WatermarkError> {
    let has_alpha = image.color().has_alpha();
    let image = if (scale - 1.0).abs() > f32::EPSILON {
        let width = (image.width() as f32 * scale) as u64;
        let height = (image.height() as f32 * scale) as u64;
        let limit = u64::from(MAX_DIMENSION);
        if width > limit || height > limit {
            return Err(WatermarkError::MarkTooLarge {
                width,
                height,
                limit: MAX_DIMENSION,
            });
        }
        debug!("Resizing watermark to {}x{}", width, height);
        image.resize_exact(width as u32, height as u32, FilterType::Lanczos3)
    } else {
        image
    };

    Ok(MarkLayer {
        pixels: image.to_rgba8(),
        has_alpha,
    })
}
