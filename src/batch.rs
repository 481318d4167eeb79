use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::quotes::Quote;
use crate::slogan::SloganComposer;
use crate::watermark::WatermarkComposer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

/// All JPEG files under `input`, sorted so runs are reproducible.
pub fn collect_jpegs(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .min_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_jpeg(path))
        .collect();
    files.sort();
    files
}

/// Watermark every JPEG under `input`, mirroring its sub-folders in `output`.
///
/// Images are processed one at a time; a failure is logged and counted and the
/// batch moves on.
pub fn watermark_directory(
    composer: &WatermarkComposer,
    input: &Path,
    output: &Path,
) -> std::io::Result<BatchSummary> {
    std::fs::create_dir_all(output)?;

    let started = Instant::now();
    let mut summary = BatchSummary::default();

    for file in collect_jpegs(input) {
        let relative = file.strip_prefix(input).unwrap_or(&file);
        let target = output.join(relative);
        info!("Processing {:?}", file);

        match composer.run(&file, &target) {
            Ok(written) => {
                info!("Watermarked {:?} -> {:?}", file, written.image);
                summary.processed += 1;
            }
            Err(e) => {
                error!("Failed to watermark {:?}: {}", file, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Watermarked {} images ({} failed) in {:.2?}",
        summary.processed,
        summary.failed,
        started.elapsed()
    );
    Ok(summary)
}

pub fn slogan_file_name(index: usize) -> String {
    format!("slogan_{:03}.png", index + 1)
}

/// Render one slogan per quote into `output`.
pub fn slogans_from_quotes(
    composer: &SloganComposer<'_>,
    quotes: &[Quote],
    output: &Path,
) -> BatchSummary {
    let started = Instant::now();
    let mut summary = BatchSummary::default();

    for (index, quote) in quotes.iter().enumerate() {
        let target = output.join(slogan_file_name(index));
        match composer.run(&quote.text, quote.author.as_deref(), &target) {
            Ok(_) => summary.processed += 1,
            Err(e) => {
                error!("Skipping quote {}: {}", index + 1, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Total image creation of {} images complete in {:.2?}",
        summary.processed,
        started.elapsed()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(Path::new("a/b/photo.jpg")));
        assert!(is_jpeg(Path::new("photo.JPEG")));
        assert!(!is_jpeg(Path::new("photo.png")));
        assert!(!is_jpeg(Path::new("jpeg")));
    }

    #[test]
    fn test_collect_jpegs_recurses() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("2022/may")).unwrap();
        for name in ["b.jpg", "a.JPG", "2022/may/c.jpeg", "2022/notes.txt", "d.png"] {
            std::fs::write(root.join(name), b"").unwrap();
        }

        let files = collect_jpegs(root);
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("2022/may/c.jpeg"),
                PathBuf::from("a.JPG"),
                PathBuf::from("b.jpg"),
            ]
        );
    }

    #[test]
    fn test_slogan_file_name() {
        assert_eq!(slogan_file_name(0), "slogan_001.png");
        assert_eq!(slogan_file_name(41), "slogan_042.png");
    }
}
