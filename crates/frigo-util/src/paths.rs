//! Default paths for frigorifico components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/frigorifico/config.toml` or `~/.config/frigorifico/config.toml`
//! - Data: `$XDG_DATA_HOME/frigorifico` or `~/.local/share/frigorifico`

use std::path::{Path, PathBuf};

/// Environment variable for overriding the data directory
pub const FRIGO_DATA_DIR_ENV: &str = "FRIGO_DATA_DIR";

/// Environment variable for overriding the config file
pub const FRIGO_CONFIG_ENV: &str = "FRIGO_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "frigorifico";

/// Database filename within the data directory
const DB_FILENAME: &str = "frigorifico.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$FRIGO_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/frigorifico/config.toml`
/// 3. `~/.config/frigorifico/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(FRIGO_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Default data directory, ignoring `FRIGO_DATA_DIR`.
/// The CLI applies the env var override itself.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Database file inside a data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_app_name() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("frigorifico"));
    }

    #[test]
    fn database_lives_in_data_dir() {
        let dir = PathBuf::from("/var/lib/frigorifico");
        assert_eq!(database_path(&dir), dir.join("frigorifico.db"));
    }
}
