// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the LIVECAP_HOME environment variable for isolation.
// When LIVECAP_HOME is set, all config and data live under that directory.
// When unset, config uses ~/.livecap/ and data uses XDG_DATA_HOME/livecap.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the LIVECAP_HOME override, if set.
fn livecap_home() -> Option<PathBuf> {
    std::env::var_os("LIVECAP_HOME").map(PathBuf::from)
}

/// Configuration directory: $LIVECAP_HOME/ or ~/.livecap/
pub fn config_dir() -> PathBuf {
    if let Some(home) = livecap_home() {
        return home;
    }
    dirs_home().join(".livecap")
}

/// Data directory: $LIVECAP_HOME/data/ or ~/.local/share/livecap/
pub fn data_dir() -> PathBuf {
    if let Some(home) = livecap_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "livecap") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Home directory, falling back to the working directory when unknown.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Job table database
pub fn db_path() -> PathBuf {
    data_dir().join("jobs.db")
}

/// Where highlight window files are written by default.
pub fn highlights_dir() -> PathBuf {
    data_dir().join("chat_segments")
}

pub fn pid_file_path() -> PathBuf {
    data_dir().join("daemon.pid")
}

/// Create the data directory if needed.
pub fn ensure_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir())
}
