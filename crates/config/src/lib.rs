// Configuration loading

use std::path::PathBuf;

pub mod session;
pub mod settings;

pub use session::Session;
pub use settings::{Settings, DEFAULT_API_BASE};

/// Environment variable that relocates the whole config directory.
pub const CONFIG_DIR_ENV: &str = "TALLY_CONFIG_DIR";

/// `$TALLY_CONFIG_DIR`, else `~/.config/tally`.
pub fn config_dir() -> PathBuf {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally"),
    }
}

/// Strip whole-line `//` comments so settings files can be annotated.
pub(crate) fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}
