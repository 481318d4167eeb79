//! Branded slogan images.
//!
//! Composition runs a fixed sequence of stages over one canvas. Most stages
//! are best-effort: when a font or the logo cannot be loaded the stage is
//! skipped, logged and recorded in the report, and the image is still
//! written. A quote that wraps to too many lines rejects the whole slogan.

pub mod logo;

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fonts::{FontError, FontHandle, FontRegistry};
use crate::output::save_image;
use crate::text::{MAX_QUOTE_LINES, TextError, TextMeasure, quote, shrink_to_fit, wrap};

/// Author font sizes step down by this much while the name is too wide.
pub const AUTHOR_SIZE_STEP: f32 = 2.0;
/// Smallest author font size tried before giving up and keeping the original.
pub const MIN_AUTHOR_SIZE: f32 = 2.0;

#[derive(Debug, Error)]
pub enum SloganError {
    #[error("Quote rejected: {0}")]
    QuoteTooLong(#[from] TextError),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateCanvas,
    DrawBackground,
    DrawQuoteText,
    DrawHeader,
    DrawAuthor,
    LoadLogo,
    PlaceLogo,
    WriteFile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CreateCanvas => "create canvas",
            Stage::DrawBackground => "draw background",
            Stage::DrawQuoteText => "draw quote text",
            Stage::DrawHeader => "draw header",
            Stage::DrawAuthor => "draw author",
            Stage::LoadLogo => "load logo",
            Stage::PlaceLogo => "place logo",
            Stage::WriteFile => "write file",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStage {
    pub stage: Stage,
    pub reason: String,
}

/// A composed canvas and the stages that could not be completed.
#[derive(Debug)]
pub struct Composition {
    pub canvas: RgbaImage,
    pub skipped: Vec<SkippedStage>,
}

#[derive(Debug)]
pub struct SloganReport {
    pub output: PathBuf,
    pub skipped: Vec<SkippedStage>,
}

enum StageError {
    Skipped(String),
    Fatal(SloganError),
}

impl From<FontError> for StageError {
    fn from(e: FontError) -> Self {
        StageError::Skipped(e.to_string())
    }
}

impl From<TextError> for StageError {
    fn from(e: TextError) -> Self {
        StageError::Fatal(e.into())
    }
}

/// Top-left corner of the header text.
pub fn header_origin(canvas: (u32, u32)) -> (i32, i32) {
    ((canvas.0 / 8) as i32, (canvas.1 / 20) as i32)
}

/// Author captions use `Unknown` for a blank or `""` name and drop
/// surrounding quotes.
pub fn author_name(author: &str) -> &str {
    let name = author.trim().trim_matches('"').trim();
    if name.is_empty() { "Unknown" } else { name }
}

pub struct SloganComposer<'a> {
    config: &'a Config,
    fonts: &'a FontRegistry,
}

impl<'a> SloganComposer<'a> {
    pub fn new(config: &'a Config, fonts: &'a FontRegistry) -> Self {
        Self { config, fonts }
    }

    /// Compose the slogan in memory.
    pub fn compose(&self, text: &str, author: Option<&str>) -> Result<Composition, SloganError> {
        let mut skipped = Vec::new();

        let mut canvas = self.create_canvas();
        self.draw_background(&mut canvas);

        let result = self.draw_quote_text(&mut canvas, text);
        record(&mut skipped, Stage::DrawQuoteText, result)?;

        let result = self.draw_header(&mut canvas);
        record(&mut skipped, Stage::DrawHeader, result)?;

        if let Some(author) = author {
            let result = self.draw_author(&mut canvas, author);
            record(&mut skipped, Stage::DrawAuthor, result)?;
        }

        match self.load_logo(canvas.dimensions()) {
            Ok(logo) => {
                let result = self.place_logo(&mut canvas, &logo);
                record(&mut skipped, Stage::PlaceLogo, result)?;
            }
            Err(e) => {
                record(&mut skipped, Stage::LoadLogo, Err(e))?;
                let reason = StageError::Skipped("no logo loaded".to_string());
                record(&mut skipped, Stage::PlaceLogo, Err(reason))?;
            }
        }

        Ok(Composition { canvas, skipped })
    }

    /// Compose the slogan and write it to `output`.
    pub fn run(
        &self,
        text: &str,
        author: Option<&str>,
        output: &Path,
    ) -> Result<SloganReport, SloganError> {
        let composition = self.compose(text, author)?;
        save_image(&DynamicImage::ImageRgba8(composition.canvas), output)?;

        if !composition.skipped.is_empty() {
            warn!(
                "Wrote {:?} with {} skipped stages",
                output,
                composition.skipped.len()
            );
        }
        Ok(SloganReport {
            output: output.to_path_buf(),
            skipped: composition.skipped,
        })
    }

    fn create_canvas(&self) -> RgbaImage {
        let canvas = &self.config.canvas;
        debug!("Creating {}x{} canvas", canvas.width, canvas.height);
        RgbaImage::new(canvas.width, canvas.height)
    }

    fn draw_background(&self, canvas: &mut RgbaImage) {
        let background = self.config.canvas.background;
        for pixel in canvas.pixels_mut() {
            *pixel = background;
        }
    }

    fn draw_quote_text(&self, canvas: &mut RgbaImage, text: &str) -> Result<(), StageError> {
        let font = self.fonts.load(&self.config.font.name, self.config.font.size)?;
        let (width, height) = canvas.dimensions();
        let borders = &self.config.borders;

        let x_min = width as f32 * borders.x_min / 100.0;
        let x_max = width as f32 * borders.x_max / 100.0;
        let max_width = (x_max - x_min) as u32;
        let top = (height as f32 * borders.y_min / 100.0) as i32;

        let lines = quote(wrap(text, &font, max_width, MAX_QUOTE_LINES)?);
        let line_height = font.line_height() as i32;

        for (row, line) in lines.iter().enumerate() {
            let line_width = font.text_width(line) as i32;
            let x = width as i32 / 2 - line_width / 2;
            let y = top + line_height * row as i32;
            draw_text(canvas, &font, self.config.font.colour, (x, y), line);
        }

        info!("Drew {} quote lines", lines.len());
        Ok(())
    }

    fn draw_header(&self, canvas: &mut RgbaImage) -> Result<(), StageError> {
        let header = &self.config.header;
        let font = self.fonts.load(&header.font, header.size)?;
        let origin = header_origin(canvas.dimensions());
        draw_text(canvas, &font, self.config.font.colour, origin, &header.text);
        Ok(())
    }

    fn draw_author(&self, canvas: &mut RgbaImage, author: &str) -> Result<(), StageError> {
        let name = author_name(author);
        let (width, height) = canvas.dimensions();

        let body = self.fonts.load(&self.config.font.name, self.config.font.size)?;
        let header = self
            .fonts
            .load(&self.config.header.font, self.config.header.size)?;

        let caption = format!("{}:", name);
        let max_width = (self.config.author.width_percent / 100.0 * width as f32) as i32;
        let fits = |size: f32| {
            let right = body
                .with_size(size)
                .ink_bounds(&caption)
                .map_or(0, |(_, _, right, _)| right);
            right <= max_width
        };
        let font = match shrink_to_fit(body.size(), AUTHOR_SIZE_STEP, MIN_AUTHOR_SIZE, fits) {
            Some(size) => body.with_size(size),
            None => {
                warn!("Unable to auto scale author '{}', using original size", name);
                body
            }
        };
        debug!("Author font size {}", font.size());

        let x = (width as f32 * 0.05) as i32;
        let y = (height - height / 8) as i32 - header.line_height() as i32;
        let colour = self.config.font.colour;
        draw_text(canvas, &font, colour, (x, y), "Author -");
        draw_text(
            canvas,
            &font,
            colour,
            (x, y + font.line_height() as i32),
            &caption,
        );
        Ok(())
    }

    fn load_logo(&self, canvas: (u32, u32)) -> Result<RgbaImage, StageError> {
        let config = self
            .config
            .logo
            .as_ref()
            .ok_or_else(|| StageError::Skipped("no logo configured".to_string()))?;
        logo::load_logo(config, canvas).map_err(|e| {
            StageError::Skipped(format!("logo {:?} unavailable: {}", config.path, e))
        })
    }

    fn place_logo(&self, canvas: &mut RgbaImage, image: &RgbaImage) -> Result<(), StageError> {
        let config = self
            .config
            .logo
            .as_ref()
            .ok_or_else(|| StageError::Skipped("no logo configured".to_string()))?;
        logo::place_logo(canvas, image, config);
        Ok(())
    }
}

fn draw_text(
    canvas: &mut RgbaImage,
    font: &FontHandle,
    colour: Rgba<u8>,
    (x, y): (i32, i32),
    text: &str,
) {
    draw_text_mut(canvas, colour, x, y, font.scale(), font.font(), text);
}

fn record(
    skipped: &mut Vec<SkippedStage>,
    stage: Stage,
    result: Result<(), StageError>,
) -> Result<(), SloganError> {
    match result {
        Ok(()) => Ok(()),
        Err(StageError::Skipped(reason)) => {
            warn!("Failed to {}: {}", stage, reason);
            skipped.push(SkippedStage { stage, reason });
            Ok(())
        }
        Err(StageError::Fatal(e)) => Err(e),
    }
}
