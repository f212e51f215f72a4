//! Cursor IDE path discovery.
//!
//! Handles locating Cursor's global state database across platforms.

use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

/// Known Cursor data directory locations by platform, relative to home.
const CURSOR_CONFIG_PATHS: &[&str] = &[
    // Linux
    ".config/Cursor",
    // macOS
    "Library/Application Support/Cursor",
    // Alternative locations
    ".cursor",
];

/// Global state database, relative to the Cursor data directory.
const GLOBAL_STORAGE_PATH: &str = "User/globalStorage";
const STATE_DB_NAME: &str = "state.vscdb";

/// Resolves the conventional location of the conversation store.
///
/// The first candidate whose database exists wins. When none exist the
/// platform's primary location is returned so the caller can report it.
///
/// # Errors
/// Returns error if the home directory cannot be determined.
pub fn default_store_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| AppError::Config {
        message: "Could not determine home directory".into(),
    })?;

    Ok(resolve_store_path(&home))
}

/// Picks the store path below a given home directory.
fn resolve_store_path(home: &Path) -> PathBuf {
    let candidates: Vec<PathBuf> = CURSOR_CONFIG_PATHS
        .iter()
        .map(|dir| home.join(dir).join(GLOBAL_STORAGE_PATH).join(STATE_DB_NAME))
        .collect();

    for candidate in &candidates {
        if candidate.is_file() {
            tracing::debug!("Found global state DB: {}", candidate.display());
            return candidate.clone();
        }
    }

    let primary = if cfg!(target_os = "macos") { 1 } else { 0 };
    tracing::debug!("No state DB found. Searched: {CURSOR_CONFIG_PATHS:?}");
    candidates[primary].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_prefers_existing_store() {
        let home = tempdir().unwrap();
        let db_dir = home.path().join(".cursor").join(GLOBAL_STORAGE_PATH);
        std::fs::create_dir_all(&db_dir).unwrap();
        std::fs::write(db_dir.join(STATE_DB_NAME), b"").unwrap();

        assert_eq!(resolve_store_path(home.path()), db_dir.join(STATE_DB_NAME));
    }

    #[test]
    fn test_resolve_falls_back_to_platform_default() {
        let home = tempdir().unwrap();
        let path = resolve_store_path(home.path());
        assert!(path.starts_with(home.path()));
        assert!(path.ends_with("User/globalStorage/state.vscdb"));
    }
}
