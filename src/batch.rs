use crate::errors::{RembgError, Result};
use crate::task::ImageTask;
use crate::traits::BackgroundRemovalModel;
use crate::ImageProcessor;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Outcome tally of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub success: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub const fn total(&self) -> usize {
        self.success + self.failed
    }
}

/// Files directly inside `directory` whose name ends in `.png`, sorted by
/// file name.
///
/// Matching is case-sensitive and does not descend into subdirectories. Only
/// a directory that cannot be listed is an error: a matching entry that
/// cannot be inspected (a dangling symlink, say) is still returned so the
/// batch counts it as a failed file, and a non-matching one is skipped.
pub fn collect_png_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_png_name(entry.file_name()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) if e.depth() > 0 => {
                let Some(path) = e.path().map(Path::to_path_buf) else {
                    continue;
                };
                if path.file_name().is_some_and(is_png_name) {
                    warn!("Cannot inspect {}: {}", path.display(), e);
                    files.push(path);
                } else {
                    debug!("Skipping unreadable entry {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                return Err(RembgError::FileSystem {
                    path: directory.to_path_buf(),
                    operation: "list directory".to_string(),
                    source: e.into(),
                })
            }
        }
    }

    Ok(files)
}

/// `*.png` glob match on a bare file name; `.png` itself matches.
fn is_png_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().ends_with(b".png")
}

/// Process each file in place, isolating failures per file.
pub fn run_batch<M: BackgroundRemovalModel>(
    processor: &ImageProcessor<M>,
    files: &[PathBuf],
    trim: bool,
) -> BatchResult {
    let mut result = BatchResult::default();

    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    for file in files {
        // log lines go to stdout; keep the bar off screen while they print
        pb.suspend(|| match processor.process(&ImageTask::new(file, trim)) {
            Ok(_) => result.record_success(),
            Err(e) => {
                error!("  Error processing {}: {}", file.display(), error_chain(&e));
                result.record_failure();
            }
        });
        pb.inc(1);
    }

    pb.finish_and_clear();
    result
}

/// Process every `*.png` in `directory` in place.
///
/// `load_model` runs only once there is at least one file to process. Only
/// a directory that cannot be listed or a model that cannot be loaded fails
/// the whole call; per-file failures are counted in the returned
/// [`BatchResult`].
pub fn process_directory<M, F>(directory: &Path, trim: bool, load_model: F) -> Result<BatchResult>
where
    M: BackgroundRemovalModel,
    F: FnOnce() -> Result<M>,
{
    let files = collect_png_files(directory)?;
    info!("Found {} PNG files in {}", files.len(), directory.display());

    let result = if files.is_empty() {
        BatchResult::default()
    } else {
        let processor = ImageProcessor::new(load_model()?);
        run_batch(&processor, &files, trim)
    };

    report(&result);
    Ok(result)
}

pub fn report(result: &BatchResult) {
    if result.failed > 0 {
        warn!(
            "Completed: {} success, {} failed",
            result.success, result.failed
        );
    } else {
        info!("Completed: {} success, {} failed", result.success, result.failed);
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
