use image::Rgba;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geometry::{GeometryError, HorizontalAlign, Padding, VerticalAlign};
use crate::watermark::{MarkBackground, Thresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Missing required key {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Invalid alignment for {key}: {source}")]
    InvalidAlignment {
        key: &'static str,
        #[source]
        source: GeometryError,
    },
}

/// Fully resolved configuration shared by the slogan and watermark tools.
#[derive(Debug, Clone)]
pub struct Config {
    pub canvas: CanvasConfig,
    pub font: FontConfig,
    pub borders: Borders,
    pub header: HeaderConfig,
    pub author: AuthorConfig,
    pub logo: Option<LogoConfig>,
    pub output: OutputConfig,
    pub fonts: FontsConfig,
    pub watermark: Option<WatermarkConfig>,
}

#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background: Rgba<u8>,
}

#[derive(Debug, Clone)]
pub struct FontConfig {
    pub name: String,
    pub size: f32,
    pub colour: Rgba<u8>,
}

/// Text area of the slogan canvas, as percentages of the canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Borders {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Debug, Clone)]
pub struct HeaderConfig {
    pub text: String,
    pub font: String,
    pub size: f32,
}

#[derive(Debug, Clone)]
pub struct AuthorConfig {
    pub width_percent: f32,
}

#[derive(Debug, Clone)]
pub struct LogoConfig {
    pub path: PathBuf,
    /// Share of the canvas the logo may occupy on its binding dimension
    pub size_percent: f32,
    pub align_x: HorizontalAlign,
    pub align_y: VerticalAlign,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl OutputConfig {
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

#[derive(Debug, Clone)]
pub struct FontsConfig {
    pub folder: PathBuf,
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub mark: MarkConfig,
    pub align_x: HorizontalAlign,
    pub align_y: VerticalAlign,
    pub padding: Padding,
    pub background: Option<MarkBackground>,
    pub generate_mask: bool,
    pub horizontal_limit: u32,
    pub vertical_limit: u32,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone)]
pub enum MarkConfig {
    Text {
        text: String,
        /// Registry name, used when no font file is given
        font: String,
        /// File inside the fonts folder, takes precedence over `font`
        font_file: Option<PathBuf>,
        size: f32,
        colour: Rgba<u8>,
    },
    Image {
        path: PathBuf,
        scale: f32,
    },
}

pub const DEFAULT_CANVAS_SIZE: u32 = 2000;
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 125, 255, 255]);
pub const DEFAULT_FONT: &str = "arialbd";
pub const DEFAULT_FONT_SIZE: f32 = 100.0;
pub const DEFAULT_FONT_COLOUR: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const DEFAULT_HEADER_TEXT: &str = "Quote Of The Day";
pub const DEFAULT_HEADER_SIZE: f32 = 180.0;
pub const DEFAULT_AUTHOR_WIDTH_PERCENT: f32 = 50.0;
pub const DEFAULT_WATERMARK_PADDING: u32 = 10;
pub const DEFAULT_PIXEL_LIMIT: u32 = 65535;
/// Largest canvas side, and largest mark scale factor, accepted from config.
pub const MAX_DIMENSION: u32 = 65535;

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig {
                width: DEFAULT_CANVAS_SIZE,
                height: DEFAULT_CANVAS_SIZE,
                background: DEFAULT_BACKGROUND,
            },
            font: FontConfig {
                name: DEFAULT_FONT.to_string(),
                size: DEFAULT_FONT_SIZE,
                colour: DEFAULT_FONT_COLOUR,
            },
            borders: Borders {
                x_min: 10.0,
                x_max: 90.0,
                y_min: 20.0,
                y_max: 80.0,
            },
            header: HeaderConfig {
                text: DEFAULT_HEADER_TEXT.to_string(),
                font: DEFAULT_FONT.to_string(),
                size: DEFAULT_HEADER_SIZE,
            },
            author: AuthorConfig {
                width_percent: DEFAULT_AUTHOR_WIDTH_PERCENT,
            },
            logo: None,
            output: OutputConfig {
                directory: PathBuf::from("Output"),
                file_name: "test.png".to_string(),
            },
            fonts: FontsConfig {
                folder: PathBuf::from("Fonts"),
                snapshot: PathBuf::from("font.json"),
            },
            watermark: None,
        }
    }
}

/// A resolved configuration together with the keys that fell back to defaults.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub defaults_used: Vec<&'static str>,
}

impl LoadedConfig {
    pub fn used_default(&self, key: &str) -> bool {
        self.defaults_used.contains(&key)
    }
}

impl Config {
    /// Load from a JSON file. A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<LoadedConfig, ConfigError> {
        if !path.exists() {
            warn!("Config file not found at {:?}, using defaults", path);
            return Self::from_json_str("{}");
        }
        info!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<LoadedConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content)?;
        raw.resolve()
    }

    /// Resolve an already parsed document, e.g. one built in memory.
    pub fn from_value(value: serde_json::Value) -> Result<LoadedConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_value(value)?;
        raw.resolve()
    }
}

#[derive(Default)]
struct Resolver {
    defaults_used: Vec<&'static str>,
}

impl Resolver {
    fn or<T>(&mut self, key: &'static str, value: Option<T>, default: T) -> T {
        match value {
            Some(value) => value,
            None => {
                debug!("{} not set, using default", key);
                self.defaults_used.push(key);
                default
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    background: Option<RawBackground>,
    font: Option<RawFont>,
    borders: Option<Vec<f32>>,
    header: Option<RawHeader>,
    author: Option<RawAuthor>,
    #[serde(rename = "logo", alias = "Logo")]
    logo: Option<RawLogo>,
    output: Option<RawOutput>,
    canvas: Option<RawCanvas>,
    fonts: Option<RawFonts>,
    watermark: Option<RawWatermark>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBackground {
    colour: Option<Vec<u8>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFont {
    name: Option<String>,
    size: Option<f32>,
    colour: Option<Vec<u8>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHeader {
    text: Option<String>,
    font: Option<String>,
    size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAuthor {
    width_percent: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLogo {
    path: PathBuf,
    size: Option<f32>,
    align_x: Option<String>,
    align_y: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(alias = "Path")]
    path: Option<PathBuf>,
    #[serde(rename = "FileName")]
    file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCanvas {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFonts {
    folder: Option<PathBuf>,
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawWatermark {
    mark_type: Option<String>,
    alignment: Option<RawAlignment>,
    font: Option<String>,
    font_file: Option<PathBuf>,
    size: Option<f32>,
    colour: Option<Vec<u8>>,
    text: Option<String>,
    path: Option<PathBuf>,
    scale: Option<f32>,
    background: Option<String>,
    generate_mask: Option<bool>,
    horizontal_limit: Option<u32>,
    vertical_limit: Option<u32>,
    thresholds: Option<RawThresholds>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAlignment {
    horizontal: Option<String>,
    vertical: Option<String>,
    pad_x: Option<u32>,
    pad_y: Option<u32>,
    /// `[top, bottom, left, right]`
    padding: Option<[u32; 4]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawThresholds {
    alias: Option<u8>,
    black: Option<u8>,
    white: Option<u8>,
    alpha: Option<u8>,
}

impl RawConfig {
    fn resolve(self) -> Result<LoadedConfig, ConfigError> {
        let defaults = Config::default();
        let mut r = Resolver::default();

        let background = self.background.unwrap_or_default();
        let canvas = self.canvas.unwrap_or_default();
        let canvas = CanvasConfig {
            width: dimension(
                "Canvas.Width",
                r.or("Canvas.Width", canvas.width, defaults.canvas.width),
            )?,
            height: dimension(
                "Canvas.Height",
                r.or("Canvas.Height", canvas.height, defaults.canvas.height),
            )?,
            background: match background.colour {
                Some(colour) => parse_colour("Background.Colour", &colour)?,
                None => r.or("Background.Colour", None, defaults.canvas.background),
            },
        };

        let font = self.font.unwrap_or_default();
        let font = FontConfig {
            name: r.or("Font.Name", font.name, defaults.font.name),
            size: positive_f32("Font.Size", r.or("Font.Size", font.size, defaults.font.size))?,
            colour: match font.colour {
                Some(colour) => parse_colour("Font.Colour", &colour)?,
                None => r.or("Font.Colour", None, defaults.font.colour),
            },
        };

        let borders = match self.borders {
            Some(values) => parse_borders(&values)?,
            None => r.or("Borders", None, defaults.borders),
        };

        let header = self.header.unwrap_or_default();
        let header = HeaderConfig {
            text: r.or("Header.Text", header.text, defaults.header.text),
            font: r.or("Header.Font", header.font, font.name.clone()),
            size: positive_f32(
                "Header.Size",
                r.or("Header.Size", header.size, defaults.header.size),
            )?,
        };

        let author = self.author.unwrap_or_default();
        let width_percent = r.or(
            "Author.WidthPercent",
            author.width_percent,
            defaults.author.width_percent,
        );
        let author = AuthorConfig {
            width_percent: percentage("Author.WidthPercent", width_percent)?,
        };

        let logo = self
            .logo
            .map(|logo| logo.resolve(&mut r))
            .transpose()?;

        let output = self.output.unwrap_or_default();
        let output = OutputConfig {
            directory: r.or("Output.path", output.path, defaults.output.directory),
            file_name: r.or("Output.FileName", output.file_name, defaults.output.file_name),
        };

        let fonts = self.fonts.unwrap_or_default();
        let fonts = FontsConfig {
            folder: r.or("Fonts.Folder", fonts.folder, defaults.fonts.folder),
            snapshot: r.or("Fonts.Snapshot", fonts.snapshot, defaults.fonts.snapshot),
        };

        let watermark = self
            .watermark
            .map(|watermark| watermark.resolve(&mut r, &font.name))
            .transpose()?;

        Ok(LoadedConfig {
            config: Config {
                canvas,
                font,
                borders,
                header,
                author,
                logo,
                output,
                fonts,
                watermark,
            },
            defaults_used: r.defaults_used,
        })
    }
}

impl RawLogo {
    fn resolve(self, r: &mut Resolver) -> Result<LogoConfig, ConfigError> {
        let size_percent = percentage("logo.size", r.or("logo.size", self.size, 20.0))?;
        let align_x = r.or("logo.alignX", self.align_x, "right".to_string());
        let align_y = r.or("logo.alignY", self.align_y, "bottom".to_string());
        Ok(LogoConfig {
            path: self.path,
            size_percent,
            align_x: align_x
                .parse()
                .map_err(|source| ConfigError::InvalidAlignment {
                    key: "logo.alignX",
                    source,
                })?,
            align_y: align_y
                .parse()
                .map_err(|source| ConfigError::InvalidAlignment {
                    key: "logo.alignY",
                    source,
                })?,
        })
    }
}

impl RawWatermark {
    fn resolve(self, r: &mut Resolver, body_font: &str) -> Result<WatermarkConfig, ConfigError> {
        let mark_type = self
            .mark_type
            .ok_or(ConfigError::MissingKey("Watermark.MarkType"))?;

        let mark = match mark_type.to_lowercase().as_str() {
            "text" => MarkConfig::Text {
                text: self
                    .text
                    .filter(|text| !text.trim().is_empty())
                    .ok_or(ConfigError::MissingKey("Watermark.Text"))?,
                font: r.or("Watermark.Font", self.font, body_font.to_string()),
                font_file: self.font_file,
                size: positive_f32(
                    "Watermark.Size",
                    r.or("Watermark.Size", self.size, DEFAULT_FONT_SIZE),
                )?,
                colour: match self.colour {
                    Some(colour) => parse_colour("Watermark.Colour", &colour)?,
                    None => r.or("Watermark.Colour", None, DEFAULT_FONT_COLOUR),
                },
            },
            "image" => MarkConfig::Image {
                path: self.path.ok_or(ConfigError::MissingKey("Watermark.Path"))?,
                scale: scale_factor(
                    "Watermark.Scale",
                    r.or("Watermark.Scale", self.scale, 1.0),
                )?,
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "Watermark.MarkType",
                    reason: format!("'{}' is not one of Text, Image", other),
                });
            }
        };

        let alignment = self.alignment.unwrap_or_default();
        let align_x = r
            .or(
                "Watermark.Alignment.Horizontal",
                alignment.horizontal,
                "left".to_string(),
            )
            .parse()
            .map_err(|source| ConfigError::InvalidAlignment {
                key: "Watermark.Alignment.Horizontal",
                source,
            })?;
        let align_y = r
            .or(
                "Watermark.Alignment.Vertical",
                alignment.vertical,
                "top".to_string(),
            )
            .parse()
            .map_err(|source| ConfigError::InvalidAlignment {
                key: "Watermark.Alignment.Vertical",
                source,
            })?;

        let padding = match (alignment.padding, alignment.pad_x, alignment.pad_y) {
            (Some(padding), _, _) => Padding::from_array(padding),
            (None, None, None) => r.or(
                "Watermark.Alignment.Padding",
                None,
                Padding::uniform(DEFAULT_WATERMARK_PADDING),
            ),
            (None, pad_x, pad_y) => Padding::symmetric(
                pad_x.unwrap_or(DEFAULT_WATERMARK_PADDING),
                pad_y.unwrap_or(DEFAULT_WATERMARK_PADDING),
            ),
        };

        let background = self
            .background
            .map(|value| {
                value.parse().map_err(|reason| ConfigError::InvalidValue {
                    key: "Watermark.Background",
                    reason,
                })
            })
            .transpose()?;

        let defaults = Thresholds::default();
        let thresholds = self.thresholds.unwrap_or_default();
        let thresholds = Thresholds {
            alias: r.or("Watermark.Thresholds.Alias", thresholds.alias, defaults.alias),
            black: r.or("Watermark.Thresholds.Black", thresholds.black, defaults.black),
            white: r.or("Watermark.Thresholds.White", thresholds.white, defaults.white),
            alpha: r.or("Watermark.Thresholds.Alpha", thresholds.alpha, defaults.alpha),
        };

        Ok(WatermarkConfig {
            mark,
            align_x,
            align_y,
            padding,
            background,
            generate_mask: r.or("Watermark.GenerateMask", self.generate_mask, true),
            horizontal_limit: positive_u32(
                "Watermark.HorizontalLimit",
                r.or(
                    "Watermark.HorizontalLimit",
                    self.horizontal_limit,
                    DEFAULT_PIXEL_LIMIT,
                ),
            )?,
            vertical_limit: positive_u32(
                "Watermark.VerticalLimit",
                r.or(
                    "Watermark.VerticalLimit",
                    self.vertical_limit,
                    DEFAULT_PIXEL_LIMIT,
                ),
            )?,
            thresholds,
        })
    }
}

fn parse_colour(key: &'static str, values: &[u8]) -> Result<Rgba<u8>, ConfigError> {
    match *values {
        [r, g, b] => Ok(Rgba([r, g, b, 255])),
        [r, g, b, a] => Ok(Rgba([r, g, b, a])),
        _ => Err(ConfigError::InvalidValue {
            key,
            reason: format!("expected 3 or 4 channels, got {}", values.len()),
        }),
    }
}

fn parse_borders(values: &[f32]) -> Result<Borders, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: "Borders",
        reason,
    };

    let [x_min, x_max, y_min, y_max] = *values else {
        return Err(invalid(format!("expected 4 values, got {}", values.len())));
    };
    if values.iter().any(|v| !(0.0..=100.0).contains(v)) {
        return Err(invalid("values must be percentages between 0 and 100".into()));
    }
    if x_min > x_max || y_min > y_max {
        return Err(invalid("minimum border exceeds maximum".into()));
    }

    Ok(Borders {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

fn positive_f32(key: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            reason: format!("{} must be positive", value),
        })
    }
}

fn positive_u32(key: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            reason: "must be positive".to_string(),
        })
    }
}

fn dimension(key: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value > MAX_DIMENSION {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("{} exceeds the {}px limit", value, MAX_DIMENSION),
        });
    }
    positive_u32(key, value)
}

fn scale_factor(key: &'static str, value: f32) -> Result<f32, ConfigError> {
    let value = positive_f32(key, value)?;
    if value > MAX_DIMENSION as f32 {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("{} exceeds the maximum scale of {}", value, MAX_DIMENSION),
        });
    }
    Ok(value)
}

fn percentage(key: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value > 0.0 && value <= 100.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            reason: format!("{} is not a percentage in (0, 100]", value),
        })
    }
}
