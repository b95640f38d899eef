// src/cli/mod.rs — CLI definition (clap derive)

pub mod postprocess;
pub mod shell;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "livecap",
    about = "Live-stream recorder and chat highlight clipper",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch channels and record them when they go live
    Daemon {
        #[command(subcommand)]
        action: Option<DaemonAction>,
    },
    /// Detect highlight windows in a chat transcript
    Highlights {
        /// Transcript file (JSON lines)
        transcript: String,
        /// Where to write the windows file (defaults to highlights.output_dir)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Cut clips out of a recording from a windows file
    Clip {
        /// Recording to slice
        video: String,
        /// Highlight windows (JSON array)
        windows: String,
    },
    /// Run detection + clipping for every pending recording
    Process,
}

#[derive(Subcommand, Clone)]
pub enum DaemonAction {
    /// Start the daemon in the foreground
    Start {
        /// Also open the interactive control shell
        #[arg(long)]
        shell: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}
