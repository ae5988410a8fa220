pub mod batch;
pub mod config;
pub mod errors;
pub mod imageops_ai;
pub mod mocks;
pub mod model;
pub mod task;
pub mod traits;

use image::{GenericImageView, ImageFormat};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub use batch::{collect_png_files, process_directory, run_batch, BatchResult};
pub use config::{parse_invocation, Config, Invocation};
pub use errors::{RembgError, Result};
pub use model::{Model, ModelKind};
pub use task::ImageTask;
pub use traits::*;

/// Runs one image through load, background removal, optional trim and save.
pub struct ImageProcessor<M: BackgroundRemovalModel> {
    model: M,
}

impl<M: BackgroundRemovalModel> ImageProcessor<M> {
    pub const fn new(model: M) -> Self {
        Self { model }
    }

    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Process `task` and return the `(width, height)` of the saved image.
    ///
    /// With trim set, the result is cropped to its non-transparent pixels; a
    /// fully transparent result is saved uncropped.
    pub fn process(&self, task: &ImageTask) -> Result<(u32, u32)> {
        ensure_input_exists(task.input())?;
        let input = task.input();
        info!("Processing: {}", display_name(input));

        let img = image::open(input).map_err(|e| RembgError::Decode {
            path: input.to_path_buf(),
            source: e,
        })?;
        let original_size = img.dimensions();

        info!("  Running background removal...");
        let mut output_img = self.model.remove_background(&img)?;

        if task.trim() {
            match imageops_ai::trim_transparent(&output_img) {
                Some(trimmed) => {
                    output_img = trimmed;
                    info!(
                        "  Trimmed: {:?} -> {:?}",
                        original_size,
                        output_img.dimensions()
                    );
                }
                None => debug!("  Nothing left after background removal, skipping trim"),
            }
        }

        save_image(&output_img, task.output())?;
        info!("  Saved: {}", task.output().display());

        Ok(output_img.dimensions())
    }
}

/// Fail with `FileNotFound` unless `path` exists.
pub fn ensure_input_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RembgError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn save_image(img: &image::DynamicImage, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RembgError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create output directory".to_string(),
            source: e,
        })?;
    }

    let format = ImageFormat::from_path(output).unwrap_or(ImageFormat::Png);
    img.save_with_format(output, format)
        .map_err(|e| RembgError::Save {
            path: output.to_path_buf(),
            source: e,
        })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockForeground, MockRemovalModel};
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 128, 255])))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_without_trim_keeps_dimensions() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_png(temp_dir.path(), "in.png", 30, 20);
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Rect([
            5, 5, 4, 4,
        ])));

        let size = processor.process(&ImageTask::new(&input, false))?;
        assert_eq!(size, (30, 20));

        let saved = image::open(&input).unwrap();
        assert_eq!(saved.dimensions(), (30, 20));
        assert_eq!(saved.get_pixel(0, 0).0[3], 0);
        assert_eq!(saved.get_pixel(6, 6).0[3], 255);
        Ok(())
    }

    #[test]
    fn test_trim_crops_to_foreground() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_png(temp_dir.path(), "in.png", 30, 20);
        let output = temp_dir.path().join("nested").join("out.png");
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Rect([
            5, 2, 10, 7,
        ])));

        let task = ImageTask::new(&input, true).with_output(&output);
        assert_eq!(processor.process(&task)?, (10, 7));
        assert_eq!(image::open(&output).unwrap().dimensions(), (10, 7));
        // source untouched when output differs
        assert_eq!(image::open(&input).unwrap().color(), image::ColorType::Rgb8);
        Ok(())
    }

    #[test]
    fn test_trim_fully_transparent_leaves_size() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_png(temp_dir.path(), "in.png", 12, 9);
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Nothing));

        assert_eq!(processor.process(&ImageTask::new(&input, true))?, (12, 9));
        Ok(())
    }

    #[test]
    fn test_missing_input_never_reaches_model() {
        let temp_dir = TempDir::new().unwrap();
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Everything));

        let result = processor.process(&ImageTask::new(temp_dir.path().join("nope.png"), true));
        assert!(matches!(result, Err(RembgError::FileNotFound { .. })));
        assert_eq!(processor.model().calls(), 0);
    }

    #[test]
    fn test_corrupt_input_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("broken.png");
        fs::write(&input, b"definitely not a png").unwrap();
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Everything));

        let result = processor.process(&ImageTask::new(&input, false));
        assert!(matches!(result, Err(RembgError::Decode { .. })));
        assert_eq!(processor.model().calls(), 0);
    }

    #[test]
    fn test_model_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_png(temp_dir.path(), "in.png", 4, 4);
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Error));

        let result = processor.process(&ImageTask::new(&input, false));
        assert!(matches!(result, Err(RembgError::Model { .. })));
    }

    #[test]
    fn test_unwritable_output_is_save_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_png(temp_dir.path(), "in.png", 4, 4);
        // a directory where the output file should go
        let output = temp_dir.path().join("taken.png");
        fs::create_dir(&output).unwrap();
        let processor = ImageProcessor::new(MockRemovalModel::new(MockForeground::Everything));

        let result = processor.process(&ImageTask::new(&input, false).with_output(&output));
        assert!(matches!(result, Err(RembgError::Save { .. })));
    }
}
