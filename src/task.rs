use std::path::{Path, PathBuf};

/// One image to process.
///
/// The output defaults to the input, so a task built with [`ImageTask::new`]
/// overwrites its source file. Use [`ImageTask::with_output`] to write
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    input: PathBuf,
    output: PathBuf,
    trim: bool,
}

impl ImageTask {
    pub fn new(input: impl Into<PathBuf>, trim: bool) -> Self {
        let input = input.into();
        Self {
            output: input.clone(),
            input,
            trim,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub const fn trim(&self) -> bool {
        self.trim
    }

    /// Whether processing overwrites the input file.
    pub fn is_in_place(&self) -> bool {
        self.input == self.output
    }
}
