//! Configuration file locations
//!
//! - User config: `CHARTSCOPE_CONFIG_DIR`, else the platform config dir
//!   (`$XDG_CONFIG_HOME/chartscope` or `~/.config/chartscope` on Unix,
//!   `%APPDATA%\chartscope\config` on Windows)
//! - Project config: `chartscope.yaml` in the working directory

use std::path::{Path, PathBuf};

/// File name of the per-repository config
pub const PROJECT_CONFIG_FILE: &str = "chartscope.yaml";

/// User configuration directory
pub fn config_dir() -> PathBuf {
    std::env::var("CHARTSCOPE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(windows)]
            {
                use directories::ProjectDirs;
                ProjectDirs::from("", "", "chartscope")
                    .map(|dirs| dirs.config_dir().to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join("chartscope"))
            }
            #[cfg(not(windows))]
            {
                use directories::BaseDirs;
                std::env::var("XDG_CONFIG_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        BaseDirs::new()
                            .map(|dirs| dirs.home_dir().join(".config"))
                            .unwrap_or_else(|| PathBuf::from(".").join(".config"))
                    })
                    .join("chartscope")
            }
        })
}

/// User configuration file
pub fn user_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Project configuration file inside `dir`
pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_CONFIG_FILE)
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_path() {
        let path = user_config_path();
        assert!(path.ends_with("config.yaml"));
        assert!(path.to_string_lossy().contains("chartscope") || std::env::var("CHARTSCOPE_CONFIG_DIR").is_ok());
    }

    #[test]
    fn test_project_config_path() {
        assert_eq!(
            project_config_path(Path::new("/repo")),
            PathBuf::from("/repo/chartscope.yaml")
        );
    }
}
