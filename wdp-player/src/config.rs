//! wdp-player configuration
//!
//! Loaded from TOML; every field has a built-in default so an absent or
//! partial file is fine. Command-line arguments override file values in
//! `main.rs`.

use crate::audio::buffer::DEFAULT_BUFFER_SIZE;
use crate::error::{Error, Result};
use crate::playback::PlayerSettings;
use crate::wave::DEFAULT_HEADER_SCAN_LIMIT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use wdp_common::config::{load_toml, locate_config_file, resolve_root_folder, ROOT_FOLDER_ENV_VAR};

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "wdp_player=info,wdp_common=info";

/// Conversion hardware behind the codec adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Host audio device through cpal
    #[default]
    Cpal,
    /// Software DAC, no sound
    Virtual,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Mounted volume; relative play paths resolve against it
    pub root_folder: Option<PathBuf>,

    /// Transfer buffer size in bytes
    pub buffer_size: usize,

    /// Ceiling on chunk header offsets while parsing
    pub header_scan_limit: u64,

    pub output: OutputKind,

    /// cpal output device name (default device when unset)
    pub device: Option<String>,

    /// tracing `EnvFilter` directives, used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            header_scan_limit: DEFAULT_HEADER_SCAN_LIMIT,
            output: OutputKind::default(),
            device: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PlayerConfig {
    /// Load the configuration file (explicit path, `WDP_CONFIG`, then the
    /// platform locations), falling back to defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match locate_config_file(explicit)? {
            Some(path) => {
                info!("Using config file: {}", path.display());
                load_toml::<PlayerConfig>(&path)?
            }
            None => PlayerConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 || self.buffer_size % 4 != 0 {
            return Err(Error::Config(format!(
                "buffer_size must be a non-zero multiple of 4, got {}",
                self.buffer_size
            )));
        }
        if self.header_scan_limit == 0 {
            return Err(Error::Config("header_scan_limit must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Root folder after applying the command line and `WDP_ROOT_FOLDER`
    pub fn resolve_root_folder(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_root_folder(cli_arg, ROOT_FOLDER_ENV_VAR, self.root_folder.as_deref())
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            buffer_size: self.buffer_size,
            header_scan_limit: self.header_scan_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = PlayerConfig::from_toml_str("").unwrap();
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.header_scan_limit, 4096);
        assert_eq!(config.output, OutputKind::Cpal);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_full_file() {
        let config = PlayerConfig::from_toml_str(
            r#"
            root_folder = "/mnt/sd"
            buffer_size = 2048
            header_scan_limit = 512
            output = "virtual"
            device = "USB DAC"
            log_filter = "wdp_player=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.root_folder, Some(PathBuf::from("/mnt/sd")));
        assert_eq!(config.buffer_size, 2048);
        assert_eq!(config.output, OutputKind::Virtual);
        assert_eq!(config.device.as_deref(), Some("USB DAC"));
        assert_eq!(
            config.player_settings(),
            PlayerSettings {
                buffer_size: 2048,
                header_scan_limit: 512
            }
        );
    }

    #[test]
    fn test_rejects_bad_buffer_size() {
        assert!(matches!(
            PlayerConfig::from_toml_str("buffer_size = 1022"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            PlayerConfig::from_toml_str("buffer_size = 0"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_output_and_fields() {
        assert!(PlayerConfig::from_toml_str(r#"output = "alsa""#).is_err());
        assert!(PlayerConfig::from_toml_str("volume = 3").is_err());
    }

    #[test]
    #[serial]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "buffer_size = 256").unwrap();

        let config = PlayerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.buffer_size, 256);
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file_fails() {
        let result = PlayerConfig::load(Some(Path::new("/nonexistent/wdp.toml")));
        assert!(matches!(result, Err(Error::Common(wdp_common::Error::Config(_)))));
    }

    #[test]
    #[serial]
    fn test_root_folder_from_file_when_no_overrides() {
        std::env::remove_var(ROOT_FOLDER_ENV_VAR);
        let config = PlayerConfig::from_toml_str(r#"root_folder = "/mnt/sd""#).unwrap();
        assert_eq!(config.resolve_root_folder(None), PathBuf::from("/mnt/sd"));
        assert_eq!(
            config.resolve_root_folder(Some(Path::new("/cli"))),
            PathBuf::from("/cli")
        );
    }
}
