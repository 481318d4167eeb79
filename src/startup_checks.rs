use crate::Config;
use crate::config::MarkConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create output directory: {0}")]
    OutputDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Fonts folder does not exist: {0:?}")]
    FontsFolderMissing(PathBuf),

    #[error("Input folder does not exist: {0:?}")]
    InputFolderMissing(PathBuf),

    #[error("Logo file missing: {0:?}")]
    LogoMissing(PathBuf),

    #[error("Watermark image missing: {0:?}")]
    WatermarkImageMissing(PathBuf),

    #[error("No watermark section in configuration")]
    WatermarkNotConfigured,
}

impl StartupCheckError {
    /// Critical failures stop the run; the rest are warnings.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::LogoMissing(_))
    }
}

pub fn check_slogan(config: &Config, output_dir: &Path) -> Result<(), Vec<StartupCheckError>> {
    info!("Performing startup checks...");
    let mut errors = Vec::new();

    check_fonts_folder(config, &mut errors);
    check_output_directory(output_dir, &mut errors);

    if let Some(logo) = &config.logo {
        if logo.path.exists() {
            info!("Logo file found: {:?}", logo.path);
        } else {
            warn!("Logo file missing: {:?}", logo.path);
            errors.push(StartupCheckError::LogoMissing(logo.path.clone()));
        }
    }

    finish(errors)
}

pub fn check_watermark(
    config: &Config,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<(), Vec<StartupCheckError>> {
    info!("Performing startup checks...");
    let mut errors = Vec::new();

    match &config.watermark {
        None => errors.push(StartupCheckError::WatermarkNotConfigured),
        Some(watermark) => match &watermark.mark {
            MarkConfig::Text { .. } => check_fonts_folder(config, &mut errors),
            MarkConfig::Image { path, .. } => {
                if path.exists() {
                    info!("Watermark image found: {:?}", path);
                } else {
                    error!("Watermark image missing: {:?}", path);
                    errors.push(StartupCheckError::WatermarkImageMissing(path.clone()));
                }
            }
        },
    }

    if input_dir.is_dir() {
        info!("Input folder exists: {:?}", input_dir);
    } else {
        error!("Input folder does not exist: {:?}", input_dir);
        errors.push(StartupCheckError::InputFolderMissing(input_dir.to_path_buf()));
    }

    check_output_directory(output_dir, &mut errors);

    finish(errors)
}

fn check_fonts_folder(config: &Config, errors: &mut Vec<StartupCheckError>) {
    let folder = &config.fonts.folder;
    if folder.is_dir() {
        info!("Fonts folder exists: {:?}", folder);
    } else {
        error!("Fonts folder does not exist: {:?}", folder);
        errors.push(StartupCheckError::FontsFolderMissing(folder.clone()));
    }
}

fn check_output_directory(output_dir: &Path, errors: &mut Vec<StartupCheckError>) {
    if output_dir.exists() {
        info!("Output directory exists: {:?}", output_dir);
        return;
    }

    info!("Output directory does not exist, creating: {:?}", output_dir);
    match std::fs::create_dir_all(output_dir) {
        Ok(()) => info!("Output directory created successfully"),
        Err(e) => {
            error!("Failed to create output directory {:?}: {}", output_dir, e);
            errors.push(StartupCheckError::OutputDirectoryCreationFailed(e));
        }
    }
}

fn finish(errors: Vec<StartupCheckError>) -> Result<(), Vec<StartupCheckError>> {
    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
