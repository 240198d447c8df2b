use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base repoint config directory (universal ~/.config/repoint/ on all platforms)
pub fn repoint() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("repoint"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("repoint"))
    }
}

/// Per-project session files directory
pub fn sessions() -> Result<PathBuf> {
    Ok(repoint()?.join("sessions"))
}

/// Session file path for a project slug
pub fn session(slug: &str) -> Result<PathBuf> {
    Ok(sessions()?.join(format!("{}.json", slug)))
}
