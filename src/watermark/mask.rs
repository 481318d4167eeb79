use image::{GrayImage, Luma, RgbaImage};
use std::str::FromStr;

/// Mask value for pixels covered by the mark.
pub const MASK_INK: u8 = 0;
/// Mask value for untouched pixels.
pub const MASK_CLEAR: u8 = 255;

/// Presumed background of an image mark, which decides what counts as ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkBackground {
    Black,
    White,
}

impl FromStr for MarkBackground {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "black" => Ok(Self::Black),
            "white" => Ok(Self::White),
            _ => Err(format!("'{}' is not one of Black, White", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Any channel above this is ink when no background is configured
    pub alias: u8,
    /// Any channel above this is ink on a black background
    pub black: u8,
    /// Any channel below this is ink on a white background
    pub white: u8,
    /// Alpha above this is ink for marks with transparency
    pub alpha: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            alias: 50,
            black: 35,
            white: 220,
            alpha: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkRule {
    Alpha(u8),
    AnyChannelAbove(u8),
    AnyChannelBelow(u8),
}

impl InkRule {
    pub fn select(has_alpha: bool, background: Option<MarkBackground>, thresholds: &Thresholds) -> Self {
        if has_alpha {
            return Self::Alpha(thresholds.alpha);
        }
        match background {
            Some(MarkBackground::Black) => Self::AnyChannelAbove(thresholds.black),
            Some(MarkBackground::White) => Self::AnyChannelBelow(thresholds.white),
            None => Self::AnyChannelAbove(thresholds.alias),
        }
    }

    #[inline]
    pub fn is_ink(&self, pixel: &[u8]) -> bool {
        match *self {
            Self::Alpha(threshold) => pixel[3] > threshold,
            Self::AnyChannelAbove(threshold) => pixel[..3].iter().any(|&c| c > threshold),
            Self::AnyChannelBelow(threshold) => pixel[..3].iter().any(|&c| c < threshold),
        }
    }
}

pub fn blank_mask(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([MASK_CLEAR]))
}

/// Stamp `mark` onto `output` at `origin`, flagging every ink pixel in `mask`.
///
/// Works a row at a time over the raw buffers. Ink pixels take the mark
/// colour, blended by the mark alpha, so opaque marks are copied exactly.
/// Pixels falling outside the canvas are dropped. Returns the number of ink
/// pixels written.
pub fn stamp(
    output: &mut RgbaImage,
    mask: &mut GrayImage,
    mark: &RgbaImage,
    origin: (u32, u32),
    rule: InkRule,
) -> usize {
    debug_assert_eq!(output.dimensions(), mask.dimensions());

    let (canvas_w, canvas_h) = output.dimensions();
    let (origin_x, origin_y) = (origin.0 as usize, origin.1 as usize);
    if origin.0 >= canvas_w || origin.1 >= canvas_h || mark.width() == 0 || mark.height() == 0 {
        return 0;
    }

    let canvas_w = canvas_w as usize;
    let mark_w = mark.width() as usize;
    let visible_w = mark_w.min(canvas_w - origin_x);
    let visible_h = (mark.height() as usize).min(canvas_h as usize - origin_y);

    let out: &mut [u8] = &mut **output;
    let mask_buf: &mut [u8] = &mut **mask;
    let mut ink = 0;

    for (row, mark_row) in mark.as_raw().chunks_exact(mark_w * 4).take(visible_h).enumerate() {
        let target_row = (origin_y + row) * canvas_w + origin_x;

        for (col, pixel) in mark_row.chunks_exact(4).take(visible_w).enumerate() {
            if !rule.is_ink(pixel) {
                continue;
            }

            let target = target_row + col;
            mask_buf[target] = MASK_INK;

            let dst = &mut out[target * 4..target * 4 + 4];
            let alpha = u16::from(pixel[3]);
            for channel in 0..3 {
                let blended = u16::from(pixel[channel]) * alpha
                    + u16::from(dst[channel]) * (255 - alpha)
                    + 127;
                dst[channel] = (blended / 255) as u8;
            }
            dst[3] = dst[3].max(pixel[3]);
            ink += 1;
        }
    }

    ink
}

/// Number of pixels flagged as ink in a mask.
pub fn ink_count(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v == MASK_INK).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_rule_selection() {
        let t = Thresholds::default();
        let black = Some(MarkBackground::Black);
        let white = Some(MarkBackground::White);

        assert_eq!(InkRule::select(true, white, &t), InkRule::Alpha(20));
        assert_eq!(InkRule::select(false, black, &t), InkRule::AnyChannelAbove(35));
        assert_eq!(InkRule::select(false, white, &t), InkRule::AnyChannelBelow(220));
        assert_eq!(InkRule::select(false, None, &t), InkRule::AnyChannelAbove(50));
    }

    #[test]
    fn test_threshold_edges() {
        let alias = InkRule::AnyChannelAbove(50);
        assert!(!alias.is_ink(&[50, 50, 50, 255]));
        assert!(alias.is_ink(&[0, 51, 0, 255]));

        let white = InkRule::AnyChannelBelow(220);
        assert!(!white.is_ink(&[220, 255, 230, 255]));
        assert!(white.is_ink(&[255, 255, 219, 255]));

        let alpha = InkRule::Alpha(20);
        assert!(!alpha.is_ink(&[255, 255, 255, 20]));
        assert!(alpha.is_ink(&[0, 0, 0, 21]));
    }

    #[test]
    fn test_background_parse() {
        assert_eq!("BLACK".parse(), Ok(MarkBackground::Black));
        assert_eq!("white".parse(), Ok(MarkBackground::White));
        assert!("grey".parse::<MarkBackground>().is_err());
    }

    #[test]
    fn test_stamp_copies_opaque_ink_and_flags_mask() {
        let background = Rgba([10, 10, 10, 255]);
        let mut output = RgbaImage::from_pixel(8, 6, background);
        let mut mask = blank_mask(8, 6);

        // A 3x2 mark with a single dark (non-ink) pixel
        let mut mark = RgbaImage::from_pixel(3, 2, Rgba([200, 40, 90, 255]));
        mark.put_pixel(1, 0, Rgba([5, 5, 5, 255]));

        let ink = stamp(&mut output, &mut mask, &mark, (4, 3), InkRule::AnyChannelAbove(50));

        assert_eq!(ink, 5);
        assert_eq!(ink_count(&mask), 5);
        assert_eq!(output.get_pixel(4, 3), &Rgba([200, 40, 90, 255]));
        assert_eq!(output.get_pixel(5, 3), &background);
        assert_eq!(mask.get_pixel(5, 3), &Luma([MASK_CLEAR]));
        assert_eq!(mask.get_pixel(6, 4), &Luma([MASK_INK]));
        assert_eq!(output.get_pixel(0, 0), &background);
    }

    #[test]
    fn test_stamp_clips_at_canvas_edge() {
        let mut output = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let mut mask = blank_mask(4, 4);
        let mark = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));

        let ink = stamp(&mut output, &mut mask, &mark, (2, 3), InkRule::AnyChannelAbove(50));

        // Only a 2x1 corner of the mark lands on the canvas
        assert_eq!(ink, 2);
        assert_eq!(ink_count(&mask), 2);

        assert_eq!(
            stamp(&mut output, &mut mask, &mark, (4, 0), InkRule::AnyChannelAbove(50)),
            0
        );
    }

    #[test]
    fn test_stamp_blends_partial_alpha() {
        let mut output = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let mut mask = blank_mask(1, 1);
        let mark = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));

        stamp(&mut output, &mut mask, &mark, (0, 0), InkRule::Alpha(20));

        let pixel = output.get_pixel(0, 0);
        assert_eq!(pixel[0], 128);
        assert_eq!(pixel[3], 255);
        assert_eq!(mask.get_pixel(0, 0), &Luma([MASK_INK]));
    }
}
