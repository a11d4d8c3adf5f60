//! Token storage.
//!
//! Reads/writes `auth.json` (0600 on Unix) at a path the caller picks. Only
//! written when the user opts into remembering the token.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Authentication credentials stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthCredentials {
    /// Bearer token issued by `/login` or `/register`
    pub token: String,
    /// API base the token belongs to
    pub api_base: String,
    /// User email (for display)
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthCredentials {
    pub fn new(token: String, api_base: String) -> Self {
        Self { token, api_base, email: None }
    }
}

/// Load saved credentials. `None` if the file is absent or unreadable.
pub fn load_auth(path: &Path) -> Option<AuthCredentials> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(creds) => Some(creds),
        Err(e) => {
            log::warn!("ignoring invalid auth file {}: {}", path.display(), e);
            None
        }
    }
}

/// Save credentials, creating the parent directory. 0600 on Unix.
pub fn save_auth(path: &Path, creds: &AuthCredentials) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

    std::fs::write(path, &contents)
        .map_err(|e| format!("Failed to write auth file: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| format!("Failed to set file permissions: {}", e))?;
    }

    Ok(())
}

/// Delete saved credentials. Missing file is fine.
pub fn delete_auth(path: &Path) -> Result<(), String> {
    if path.exists() {
        std::fs::remove_file(path)
            .map_err(|e| format!("Failed to delete auth file: {}", e))?;
    }
    Ok(())
}
