//! Nine-point placement of a mark on a canvas.
//!
//! Alignment follows the usual X by Y grid: `left/middle/right` horizontally
//! and `top/middle/bottom` vertically. `center` and `centre` are accepted as
//! spellings of `middle` on both axes.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("unknown horizontal alignment '{0}', expected left, middle or right")]
    UnknownHorizontal(String),

    #[error("unknown vertical alignment '{0}', expected top, middle or bottom")]
    UnknownVertical(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl FromStr for HorizontalAlign {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "middle" | "center" | "centre" => Ok(Self::Middle),
            "right" => Ok(Self::Right),
            _ => Err(GeometryError::UnknownHorizontal(s.to_string())),
        }
    }
}

impl FromStr for VerticalAlign {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "middle" | "center" | "centre" => Ok(Self::Middle),
            "bottom" => Ok(Self::Bottom),
            _ => Err(GeometryError::UnknownVertical(s.to_string())),
        }
    }
}

impl fmt::Display for HorizontalAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

impl fmt::Display for VerticalAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Top => "top",
            Self::Middle => "middle",
            Self::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

/// Distance in pixels kept between a mark and the canvas edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    pub fn uniform(value: u32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }

    /// Build from `[top, bottom, left, right]`.
    pub fn from_array([top, bottom, left, right]: [u32; 4]) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn symmetric(pad_x: u32, pad_y: u32) -> Self {
        Self {
            top: pad_y,
            bottom: pad_y,
            left: pad_x,
            right: pad_x,
        }
    }
}

/// Compute the top-left draw origin of a mark.
///
/// The origin is clamped to `[0, canvas - mark]` on each axis. A mark larger
/// than the canvas is anchored at 0 and clips on the right or bottom edge.
pub fn place(
    canvas: (u32, u32),
    mark: (u32, u32),
    align_x: HorizontalAlign,
    align_y: VerticalAlign,
    padding: Padding,
) -> (u32, u32) {
    let (canvas_w, canvas_h) = (i64::from(canvas.0), i64::from(canvas.1));
    let (mark_w, mark_h) = (i64::from(mark.0), i64::from(mark.1));

    let x = match align_x {
        HorizontalAlign::Left => i64::from(padding.left),
        HorizontalAlign::Middle => canvas_w / 2 - mark_w / 2,
        HorizontalAlign::Right => canvas_w - mark_w - i64::from(padding.right),
    };
    let y = match align_y {
        VerticalAlign::Top => i64::from(padding.top),
        VerticalAlign::Middle => canvas_h / 2 - mark_h / 2,
        VerticalAlign::Bottom => canvas_h - mark_h - i64::from(padding.bottom),
    };

    (
        clamp_axis(x, canvas_w, mark_w),
        clamp_axis(y, canvas_h, mark_h),
    )
}

fn clamp_axis(origin: i64, canvas: i64, mark: i64) -> u32 {
    let max = (canvas - mark).max(0);
    // max never exceeds the canvas dimension, which came from a u32
    origin.clamp(0, max) as u32
}
