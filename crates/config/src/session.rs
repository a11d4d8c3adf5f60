use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// State carried between CLI runs. `filter_query` plays the role of the
/// address bar: the last written filter query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Session {
    pub version: u32,
    pub filter_query: String,
    /// Previous filter queries, oldest first.
    pub filter_history: Vec<String>,
}

/// Older entries are dropped past this many.
pub const MAX_FILTER_HISTORY: usize = 50;

impl Session {
    pub fn path() -> PathBuf {
        crate::config_dir().join("session.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| match serde_json::from_str(&s) {
                Ok(session) => Some(session),
                Err(e) => {
                    log::warn!("ignoring invalid session file {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// New current query; the old one moves into history.
    pub fn push_query(&mut self, query: String) {
        let previous = std::mem::replace(&mut self.filter_query, query);
        self.filter_history.push(previous);
        if self.filter_history.len() > MAX_FILTER_HISTORY {
            let excess = self.filter_history.len() - MAX_FILTER_HISTORY;
            self.filter_history.drain(..excess);
        }
    }

    /// New current query with no history entry.
    pub fn replace_query(&mut self, query: String) {
        self.filter_query = query;
    }
}
