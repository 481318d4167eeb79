use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use imageproc::drawing::text_size;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::text::TextMeasure;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Fonts folder does not exist: {0:?}")]
    FolderMissing(PathBuf),

    #[error("Font '{0}' not found in registry")]
    NotFound(String),

    #[error("Failed to parse font {0:?}")]
    InvalidFont(PathBuf),
}

const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

/// Fonts found in a folder, keyed by lowercase file stem.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: BTreeMap<String, PathBuf>,
}

impl FontRegistry {
    /// Scan `folder` (non-recursively) for `.ttf` and `.otf` files.
    pub fn discover(folder: &Path) -> Result<Self, FontError> {
        if !folder.is_dir() {
            return Err(FontError::FolderMissing(folder.to_path_buf()));
        }

        let mut fonts = BTreeMap::new();
        for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {:?}: {}", folder, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(name) = font_key(path) else {
                continue;
            };
            let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            debug!("Discovered font '{}' at {:?}", name, absolute);
            fonts.insert(name, absolute);
        }

        info!("Discovered {} fonts in {:?}", fonts.len(), folder);
        Ok(Self { fonts })
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.fonts.get(&name.to_lowercase()).map(PathBuf::as_path)
    }

    pub fn load(&self, name: &str, size: f32) -> Result<FontHandle, FontError> {
        let path = self
            .get(name)
            .ok_or_else(|| FontError::NotFound(name.to_string()))?;
        FontHandle::from_file(path, size)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.fonts
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Persist the registry as a sorted JSON object of name to path.
    pub fn write_snapshot(&self, path: &Path) -> Result<(), FontError> {
        let json = serde_json::to_string_pretty(&self.fonts)?;
        crate::output::ensure_parent(path)?;
        std::fs::write(path, json)?;
        info!("Wrote font registry snapshot to {:?}", path);
        Ok(())
    }
}

fn font_key(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    if !FONT_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    Some(path.file_stem()?.to_str()?.to_lowercase())
}

/// A parsed font at a fixed pixel size.
#[derive(Clone)]
pub struct FontHandle {
    path: PathBuf,
    size: f32,
    font: FontArc,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle")
            .field("path", &self.path)
            .field("size", &self.size)
            .finish()
    }
}

impl FontHandle {
    pub fn from_file(path: &Path, size: f32) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        let font =
            FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFont(path.to_path_buf()))?;
        Ok(Self {
            path: path.to_path_buf(),
            size,
            font,
        })
    }

    /// Same font file at another size, without re-reading it.
    pub fn with_size(&self, size: f32) -> Self {
        Self {
            path: self.path.clone(),
            size,
            font: self.font.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn scale(&self) -> PxScale {
        PxScale::from(self.size)
    }

    pub fn text_size(&self, text: &str) -> (u32, u32) {
        text_size(self.scale(), &self.font, text)
    }

    /// Pixel box `(left, top, right, bottom)` inked by `text` when it is
    /// drawn with `draw_text_mut` at the origin, right and bottom exclusive.
    ///
    /// Unlike [`FontHandle::text_size`] this covers descenders and glyph
    /// overhang. `None` when no glyph has an outline.
    pub fn ink_bounds(&self, text: &str) -> Option<(i32, i32, i32, i32)> {
        let scale = self.scale();
        let scaled = self.font.as_scaled(scale);
        let mut caret = 0.0f32;
        let mut last: Option<GlyphId> = None;
        let mut bounds: Option<(i32, i32, i32, i32)> = None;

        // Same caret walk as imageproc's glyph layout
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
            caret += scaled.h_advance(id);
            let Some(outline) = self.font.outline_glyph(glyph) else {
                continue;
            };
            if let Some(last) = last {
                caret += scaled.kern(id, last);
            }
            last = Some(id);

            let bb = outline.px_bounds();
            let left = bb.min.x.round() as i32;
            let top = bb.min.y.round() as i32;
            let right = left + bb.width().ceil() as i32;
            let bottom = top + bb.height().ceil() as i32;
            bounds = Some(match bounds {
                None => (left, top, right, bottom),
                Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
            });
        }

        bounds
    }
}

impl TextMeasure for FontHandle {
    fn text_width(&self, text: &str) -> u32 {
        self.text_size(text).0
    }

    fn line_height(&self) -> u32 {
        let scaled = self.font.as_scaled(self.scale());
        (scaled.height() + scaled.line_gap()).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_FONT: &str = "static/fonts/DejaVuSans.ttf";

    #[test]
    fn test_discover_filters_and_lowercases() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["Arial-Bold.TTF", "gotham.otf", "readme.txt", "image.png"] {
            std::fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("nested.ttf")).unwrap();

        let registry = FontRegistry::discover(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["arial-bold", "gotham"]
        );
        assert!(registry.get("ARIAL-BOLD").is_some());
        assert!(registry.get("readme").is_none());
        assert!(registry.get("gotham").unwrap().is_absolute());
    }

    #[test]
    fn test_discover_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        let result = FontRegistry::discover(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(FontError::FolderMissing(_))));
    }

    #[test]
    fn test_write_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Zeta.ttf"), b"").unwrap();
        std::fs::write(temp_dir.path().join("alpha.otf"), b"").unwrap();

        let registry = FontRegistry::discover(temp_dir.path()).unwrap();
        let snapshot = temp_dir.path().join("font.json");
        registry.write_snapshot(&snapshot).unwrap();

        let parsed: BTreeMap<String, PathBuf> =
            serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_load_unknown_and_invalid_fonts() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.ttf"), b"not a font").unwrap();
        let registry = FontRegistry::discover(temp_dir.path()).unwrap();

        assert!(matches!(
            registry.load("missing", 12.0),
            Err(FontError::NotFound(_))
        ));
        assert!(matches!(
            registry.load("broken", 12.0),
            Err(FontError::InvalidFont(_))
        ));
    }

    #[test]
    fn test_font_handle_measures_text() {
        let font_path = Path::new(TEST_FONT);
        if !font_path.exists() {
            return;
        }

        let handle = FontHandle::from_file(font_path, 40.0).unwrap();
        let short = handle.text_width("quote");
        let long = handle.text_width("quote of the day");
        assert!(short > 0);
        assert!(long > short);

        let larger = handle.with_size(80.0);
        assert_eq!(larger.path(), handle.path());
        assert!(larger.text_width("quote") > short);
        assert!(larger.line_height() > handle.line_height());
    }

    #[test]
    fn test_ink_bounds_cover_descenders() {
        let font_path = Path::new(TEST_FONT);
        if !font_path.exists() {
            return;
        }

        let handle = FontHandle::from_file(font_path, 48.0).unwrap();
        let (_, top, _, bottom) = handle.ink_bounds("Typography").unwrap();
        let (_, _, _, flat_bottom) = handle.ink_bounds("TOMATO").unwrap();
        let ascent = handle.font().as_scaled(handle.scale()).ascent();

        // Capitals sit on the baseline, descenders drop below it
        assert!((flat_bottom as f32 - ascent).abs() <= 2.0);
        assert!(bottom as f32 > ascent + 5.0);
        assert!(bottom - top > handle.text_size("Typography").1 as i32);

        assert_eq!(handle.ink_bounds("   "), None);
        assert_eq!(handle.ink_bounds(""), None);
    }
}
