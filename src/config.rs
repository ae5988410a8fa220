use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::errors::{RembgError, Result};
use crate::model::{Model, ModelKind};
use crate::task::ImageTask;

/// Directory under the home directory that holds downloaded models.
const DEFAULT_MODEL_DIR: &str = ".u2net";

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Remove the background from PNG images and optionally trim to content",
    long_about = None
)]
pub struct Config {
    /// Input image, or the directory to process with --batch
    pub input: Option<PathBuf>,

    /// Output image [default: overwrite the input]
    #[arg(conflicts_with = "batch")]
    pub output: Option<PathBuf>,

    /// Process every *.png file in the input directory, in place
    #[arg(long)]
    pub batch: bool,

    /// Also trim transparent pixels after removal
    #[arg(long)]
    pub trim: bool,

    /// Background removal model
    #[arg(long, value_enum, default_value_t = ModelKind::default())]
    pub model: ModelKind,

    /// ONNX file to load instead of <model-dir>/<model>.onnx
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Directory holding <model>.onnx files [default: ~/.u2net]
    #[arg(long, env = "U2NET_HOME")]
    pub model_dir: Option<PathBuf>,

    /// CUDA / TensorRT device id
    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// What the command line asked for.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// No arguments at all: print usage.
    Help,
    /// Process one file.
    Single { config: Config, task: ImageTask },
    /// Process every PNG in a directory.
    Batch { config: Config, directory: PathBuf },
}

/// Parse a full argument list, program name included.
///
/// `-h`/`--help` and `--version` come back as `Err` with the matching
/// [`ErrorKind`]; calling `exit()` on it prints the text and exits with 0.
/// Flags without an input path fail with `MissingRequiredArgument`.
pub fn parse_invocation<I, T>(args: I) -> std::result::Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() <= 1 {
        return Ok(Invocation::Help);
    }

    let config = Config::try_parse_from(args)?;
    let Some(input) = config.input.clone() else {
        return Err(Config::command().error(
            ErrorKind::MissingRequiredArgument,
            "no input file specified",
        ));
    };

    if config.batch {
        Ok(Invocation::Batch {
            config,
            directory: input,
        })
    } else {
        let mut task = ImageTask::new(input, config.trim);
        if let Some(output) = &config.output {
            task = task.with_output(output);
        }
        Ok(Invocation::Single { config, task })
    }
}

impl Config {
    /// Model file to load: `--model-path` if given, else `<model-dir>/<model>.onnx`.
    pub fn resolve_model_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.model_path {
            return Ok(path.clone());
        }

        let model_dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_MODEL_DIR))
                .ok_or_else(|| RembgError::Configuration {
                    message: "cannot locate home directory; pass --model-dir or --model-path"
                        .to_string(),
                })?,
        };

        Ok(model_dir.join(self.model.file_name()))
    }

    /// Load the model selected by `--model`/`--model-path`/`--model-dir`.
    pub fn load_model(&self) -> Result<Model> {
        let model_path = self.resolve_model_path()?;
        Model::new(&model_path, self.model, self.device_id)
    }

    /// Default `tracing` filter directive for the requested verbosity.
    pub const fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
