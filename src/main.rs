use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use clip_segmenter::{BatchDriver, Config, FfmpegBackend};

#[derive(Parser)]
#[command(
    name = "clip-segmenter",
    version,
    about = "Cut videos into fixed-length, frame-rate-decimated segments",
    long_about = "Clip-Segmenter decodes every video in a directory, keeps every n-th frame to reach the target frame rate, resizes the kept frames and writes them out as consecutive fixed-length segment files."
)]
struct Cli {
    /// Directory containing the source videos (mp4, avi, mov, mkv)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving the segments (created if absent)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Segment length in seconds
    #[arg(short = 'l', long)]
    segment_length: Option<f64>,

    /// Output frame width
    #[arg(long)]
    width: Option<u32>,

    /// Output frame height
    #[arg(long)]
    height: Option<u32>,

    /// Number of files processed in parallel (0 = one per CPU)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Ignore probed frame rate and frame count, use the configured fallbacks
    #[arg(long)]
    no_probe: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input.dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.output.dir = output.clone();
        }
        if let Some(fps) = self.fps {
            config.output.frame_rate = fps;
        }
        if let Some(length) = self.segment_length {
            config.output.segment_length_seconds = length;
        }
        if let Some(width) = self.width {
            config.output.width = width;
        }
        if let Some(height) = self.height {
            config.output.height = height;
        }
        if let Some(jobs) = self.jobs {
            config.batch.jobs = jobs;
        }
        if self.no_probe {
            config.source.probe_metadata = false;
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> Result<bool> {
    info!("Starting Clip-Segmenter v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &cli.write_config {
        config.save_to_file(path)?;
        info!("Configuration written to {:?}", path);
        return Ok(true);
    }

    info!("Input: {:?}", config.input.dir);
    info!("Output: {:?}", config.output.dir);
    info!("Segments: {:.2} fps, {:.2}s, {}x{}, {}",
          config.output.frame_rate, config.output.segment_length_seconds,
          config.output.width, config.output.height, config.output.codec_tag);

    let backend = FfmpegBackend::detect(&config.tools)?;
    let summary = BatchDriver::new(config, backend).run()?;

    info!("Done: {} of {} videos segmented, {} segments written",
          summary.succeeded(), summary.outcomes.len(), summary.total_segments());
    Ok(summary.is_success())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "clip-segmenter", "--input", "raw", "--fps", "10", "-l", "3", "--jobs", "4", "--no-probe",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.input.dir, PathBuf::from("raw"));
        assert_eq!(config.output.dir, PathBuf::from("cutSHORT"));
        assert_eq!(config.output.frame_rate, 10.0);
        assert_eq!(config.output.segment_length_seconds, 3.0);
        assert_eq!(config.batch.jobs, 4);
        assert!(!config.source.probe_metadata);
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let cli = Cli::parse_from(["clip-segmenter"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
