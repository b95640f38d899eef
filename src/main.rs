// src/main.rs — livecap entry point

use clap::Parser;
use std::path::Path;

use livecap::cli::{postprocess, status, Cli, Commands, DaemonAction};
use livecap::infra::config::Config;
use livecap::infra::{daemon, logger};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = match cli.config {
        Some(ref path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Daemon { action } => run_daemon_command(action, &config).await,
        Commands::Highlights { transcript, output } => {
            postprocess::run_highlights(&config, Path::new(&transcript), output.as_deref().map(Path::new))
                .await
                .map(|_| ())
        }
        Commands::Clip { video, windows } => {
            postprocess::run_clip(&config, Path::new(&video), Path::new(&windows)).await
        }
        Commands::Process => postprocess::run_process(&config).await,
    }
}

async fn run_daemon_command(action: Option<DaemonAction>, config: &Config) -> anyhow::Result<()> {
    let action = match action {
        Some(a) => a,
        None => {
            // Interactive picker
            let options = vec!["start", "stop", "status"];
            let choice = inquire::Select::new("Daemon action:", options)
                .prompt()
                .map_err(|_| anyhow::anyhow!("Selection cancelled"))?;
            match choice {
                "stop" => DaemonAction::Stop,
                "status" => DaemonAction::Status,
                _ => DaemonAction::Start { shell: true },
            }
        }
    };

    match action {
        DaemonAction::Start { shell } => {
            if daemon::is_daemon_running() {
                println!("Daemon is already running.");
                return Ok(());
            }

            let pid_path = daemon::write_pid_file()?;
            tracing::debug!("PID file: {}", pid_path.display());

            let result = daemon::run_daemon(config, shell).await;
            daemon::remove_pid_file();
            result
        }
        DaemonAction::Stop => {
            match daemon::stop_daemon()? {
                Some(pid) => println!("Sent stop signal to daemon (PID {pid})."),
                None => println!("Daemon is not running."),
            }
            Ok(())
        }
        DaemonAction::Status => status::show_status().await,
    }
}
