pub mod batch;
pub mod config;
pub mod fonts;
pub mod geometry;
pub mod output;
pub mod quotes;
pub mod slogan;
pub mod startup_checks;
pub mod text;
pub mod watermark;

pub use config::{Config, ConfigError, LoadedConfig};
pub use fonts::{FontError, FontHandle, FontRegistry};
pub use geometry::{HorizontalAlign, Padding, VerticalAlign, place};
pub use slogan::{SloganComposer, SloganError, SloganReport};
pub use text::{TextMeasure, wrap};
pub use watermark::{WatermarkComposer, WatermarkError, WatermarkOutput};
