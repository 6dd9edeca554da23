use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use ocrdrop_core::ControllerSettings;
use ocrdrop_engine::{PollSettings, ServerSettings};

/// Batch OCR for PDFs against an ocrdrop server.
#[derive(Debug, Parser)]
#[command(name = "ocrdrop", version, about)]
pub struct Cli {
    /// Base URL of the OCR server.
    #[arg(
        long,
        env = "OCRDROP_SERVER",
        default_value = "http://127.0.0.1:5000",
        global = true
    )]
    pub server: String,

    /// Use the built-in simulated server instead of a real one.
    #[arg(long, env = "OCRDROP_DEMO", global = true)]
    pub demo: bool,

    /// Also log to the terminal.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// off, error, warn, info, debug or trace.
    #[arg(long, env = "OCRDROP_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload PDFs, follow the job and fetch the result.
    Process(ProcessArgs),
    /// Ask the server to drop its OCR cache.
    ClearCache(ClearCacheArgs),
}

#[derive(Debug, Args)]
pub struct ClearCacheArgs {
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// PDF files to process.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Save the result archive here. Without it only the link is printed.
    #[arg(long, env = "OCRDROP_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Answer yes to the cancel prompt. `d` + Enter dismisses error messages.
    #[arg(short, long)]
    pub yes: bool,

    #[arg(long, default_value_t = 1000)]
    pub status_interval_ms: u64,

    #[arg(long, default_value_t = 1000)]
    pub log_interval_ms: u64,

    #[arg(long, default_value_t = 2000)]
    pub completion_interval_ms: u64,

    /// Seconds before the "may be stuck" warning appears.
    #[arg(long, default_value_t = 120.0)]
    pub hang_threshold_secs: f64,
}

impl Cli {
    pub fn level(&self) -> Result<LevelFilter> {
        engine_logging::parse_level(&self.log_level)
            .ok_or_else(|| anyhow!("unknown log level '{}'", self.log_level))
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            base_url: self.server.clone(),
            ..ServerSettings::default()
        }
    }
}

impl ProcessArgs {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            status_interval: Duration::from_millis(self.status_interval_ms.max(1)),
            log_interval: Duration::from_millis(self.log_interval_ms.max(1)),
            completion_interval: Duration::from_millis(self.completion_interval_ms.max(1)),
            ..PollSettings::default()
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            hang_threshold_secs: self.hang_threshold_secs,
            ..ControllerSettings::default()
        }
    }
}
