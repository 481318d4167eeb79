use thiserror::Error;

/// Upper bound on wrapped quote lines before a slogan is rejected.
pub const MAX_QUOTE_LINES: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("text wraps to {lines} lines, more than the limit of {max}")]
    TooManyLines { lines: usize, max: usize },
}

/// Pixel measurement of rendered text.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> u32;
    fn line_height(&self) -> u32;
}

/// Greedily pack whitespace-separated words into lines no wider than
/// `max_width`.
///
/// A word that is wider than `max_width` on its own still gets a line to
/// itself. More than `max_lines` lines is an error; the text is never
/// truncated.
pub fn wrap<M: TextMeasure + ?Sized>(
    text: &str,
    measure: &M,
    max_width: u32,
    max_lines: usize,
) -> Result<Vec<String>, TextError> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if measure.text_width(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        return Err(TextError::TooManyLines {
            lines: lines.len(),
            max: max_lines,
        });
    }
    Ok(lines)
}

/// Wrap the lines in literal double quotes: opening on the first line,
/// closing on the last.
pub fn quote(mut lines: Vec<String>) -> Vec<String> {
    if let Some(first) = lines.first_mut() {
        first.insert(0, '"');
    }
    if let Some(last) = lines.last_mut() {
        last.push('"');
    }
    lines
}

/// Step a font size down by `step` until `fits` accepts it.
///
/// Returns `None` when the size would drop below `floor` first.
pub fn shrink_to_fit(start: f32, step: f32, floor: f32, fits: impl Fn(f32) -> bool) -> Option<f32> {
    let mut size = start;
    while size >= floor {
        if fits(size) {
            return Some(size);
        }
        size -= step;
    }
    None
}
