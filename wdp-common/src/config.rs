//! Configuration file location and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "WDP_CONFIG";

/// Environment variable naming the root folder (mounted volume)
pub const ROOT_FOLDER_ENV_VAR: &str = "WDP_ROOT_FOLDER";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Value from the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_value: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_value {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Locate the configuration file to load, if any.
///
/// An explicit path (command line, then `WDP_CONFIG`) must exist; the
/// platform locations are only used when present.
pub fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().filter(|p| !p.is_empty()).map(PathBuf::from));

    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }

    Ok(platform_config_paths().into_iter().find(|p| p.exists()))
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Candidate configuration files for the platform, most specific first
fn platform_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("wdp").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/wdp/config.toml"));
    }
    paths
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::data_local_dir().map(|d| d.join("wdp")))
        .unwrap_or_else(|| PathBuf::from("."))
}
