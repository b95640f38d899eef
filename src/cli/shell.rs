// src/cli/shell.rs — Interactive control shell for a running daemon

use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

use crate::core::LifecycleOrchestrator;

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Add { name: String, quality: Option<String> },
    Remove { name: String },
    List,
    Poll,
    Interval(u64),
    Folder(String),
    Help,
    Exit,
}

/// Parse one line of shell input. `Err` carries a usage hint.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Err("empty command".into());
    };
    let rest: Vec<&str> = parts.collect();

    match (cmd.to_lowercase().as_str(), rest.as_slice()) {
        ("add", [name]) => Ok(ShellCommand::Add {
            name: name.to_string(),
            quality: None,
        }),
        ("add", [name, quality]) => Ok(ShellCommand::Add {
            name: name.to_string(),
            quality: Some(quality.to_string()),
        }),
        ("add", _) => Err("usage: add <name> [quality]".into()),
        ("remove", [name]) => Ok(ShellCommand::Remove {
            name: name.to_string(),
        }),
        ("remove", _) => Err("usage: remove <name>".into()),
        ("list", []) => Ok(ShellCommand::List),
        ("poll", []) => Ok(ShellCommand::Poll),
        ("interval", [secs]) => secs
            .parse()
            .map(ShellCommand::Interval)
            .map_err(|_| format!("'{secs}' is not a number of seconds")),
        ("interval", _) => Err("usage: interval <secs>".into()),
        // Folder paths may contain spaces.
        ("folder", parts) if !parts.is_empty() => Ok(ShellCommand::Folder(parts.join(" "))),
        ("folder", _) => Err("usage: folder <path>".into()),
        ("help", _) => Ok(ShellCommand::Help),
        ("exit" | "quit", _) => Ok(ShellCommand::Exit),
        (other, _) => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

const HELP: &str = "\
  add <name> [quality]   watch a channel
  remove <name>          stop watching (cancels a running capture)
  list                   show captured and watchlisted channels
  poll                   check live status now
  interval <secs>        change the poll interval
  folder <path>          change the download folder
  exit                   stop the daemon";

fn read_line() -> Option<String> {
    match inquire::Text::new("livecap>").prompt() {
        Ok(line) => Some(line),
        Err(inquire::InquireError::OperationCanceled)
        | Err(inquire::InquireError::OperationInterrupted) => None,
        Err(e) => {
            tracing::warn!("Shell input failed: {}", e);
            None
        }
    }
}

/// Prompt loop. Returns (and signals `shutdown`) on `exit` or EOF.
///
/// Prompts run on a plain thread so a pending prompt never holds up
/// runtime shutdown.
pub async fn run_shell(
    orchestrator: Arc<LifecycleOrchestrator>,
    default_quality: String,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    eprintln!("Type 'help' for commands.");
    let (tx, mut rx) = mpsc::channel::<String>(1);
    std::thread::Builder::new()
        .name("livecap-shell".into())
        .spawn(move || {
            while let Some(line) = read_line() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;

    while let Some(line) = rx.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(hint) => {
                eprintln!("  {hint}");
                continue;
            }
        };
        if command == ShellCommand::Exit {
            break;
        }
        execute(&orchestrator, &default_quality, command).await;
    }
    shutdown.notify_one();
    Ok(())
}

async fn execute(orchestrator: &Arc<LifecycleOrchestrator>, default_quality: &str, command: ShellCommand) {
    match command {
        ShellCommand::Add { name, quality } => {
            let quality = quality.as_deref().unwrap_or(default_quality);
            match orchestrator.register(&name, quality).await {
                Ok(msg) => eprintln!("  {msg}"),
                Err(e) => eprintln!("  {e}"),
            }
        }
        ShellCommand::Remove { name } => match orchestrator.unregister(&name).await {
            Ok(msg) => eprintln!("  {msg}"),
            Err(e) => eprintln!("  {e}"),
        },
        ShellCommand::List => {
            let snapshot = orchestrator.snapshot().await;
            eprintln!("  Capturing: {}", join_or_none(&snapshot.watching));
            eprintln!("  Watching:  {}", join_or_none(&snapshot.watchlist));
        }
        ShellCommand::Poll => {
            let report = orchestrator.poll_once().await;
            if report.failed {
                eprintln!("  Status check failed; nothing changed");
            } else {
                eprintln!(
                    "  Checked {}, started [{}], offline [{}]",
                    report.checked,
                    report.started.join(", "),
                    report.went_offline.join(", ")
                );
            }
        }
        ShellCommand::Interval(secs) => {
            let applied = orchestrator.set_interval(secs).await;
            eprintln!("  Poll interval is now {applied}s");
        }
        ShellCommand::Folder(folder) => {
            orchestrator.set_download_folder(&folder).await;
            eprintln!("  Download folder is now '{folder}'");
        }
        ShellCommand::Help => eprintln!("{HELP}"),
        ShellCommand::Exit => {}
    }
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
