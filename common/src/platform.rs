//! Platform-specific default paths.
//!
//! The orchestrator needs two well-known filesystem locations: a state
//! directory for anything not kept in the external KV (currently just the
//! loaded catalog), and the reverse-proxy include file the Router
//! Generator writes. Both follow the same per-OS convention the teacher
//! uses for its database path.

use std::env;
use std::path::PathBuf;

/// `%APPDATA%\mindctl\` / `~/Library/Application Support/mindctl/` /
/// `~/.local/share/mindctl/` (XDG), depending on platform.
pub fn get_default_state_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = env::var("APPDATA") {
            return PathBuf::from(appdata).join("mindctl");
        }
        PathBuf::from(".").join("mindctl")
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("mindctl");
        }
        PathBuf::from(".").join("mindctl")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Ok(xdg_data_home) = env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg_data_home).join("mindctl");
        }
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(".local").join("share").join("mindctl");
        }
        PathBuf::from(".").join("mindctl")
    }
}

/// The reverse-proxy include file the Router Generator writes, by default
/// alongside the state directory's parent (operators are expected to
/// point their proxy's include directive here, or override via config).
pub fn get_default_router_file_path() -> PathBuf {
    get_default_state_dir().join("router").join("mind_models.conf")
}

pub fn get_default_catalog_path() -> PathBuf {
    get_default_state_dir().join("models.json")
}

pub fn ensure_parent_dir(path: &std::path::Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_file_path_lives_under_state_dir() {
        let state_dir = get_default_state_dir();
        let router_path = get_default_router_file_path();
        assert!(router_path.starts_with(&state_dir));
        assert_eq!(router_path.file_name().unwrap(), "mind_models.conf");
    }
}
