use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::CommandFactory;
use tracing_subscriber::EnvFilter;

use rembg_rs::{
    ensure_input_exists, parse_invocation, process_directory, Config, ImageProcessor, Invocation,
};

fn main() -> ExitCode {
    let invocation = match parse_invocation(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: Invocation) -> Result<()> {
    match invocation {
        Invocation::Help => {
            Config::command().print_help()?;
            Ok(())
        }
        Invocation::Single { config, task } => {
            init_logging(&config);
            ensure_input_exists(task.input())?;

            let processor = ImageProcessor::new(config.load_model()?);
            let (width, height) = processor
                .process(&task)
                .with_context(|| format!("Failed to process {}", task.input().display()))?;
            tracing::debug!("Final size: {}x{}", width, height);
            Ok(())
        }
        Invocation::Batch { config, directory } => {
            init_logging(&config);
            process_directory(&directory, config.trim, || config.load_model())?;
            Ok(())
        }
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
