//! legend configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{LegendError, LegendResult};
use crate::event::UserProfile;

static DEFAULT_DATA_DIR: &str = "~/.local/share/legend";
static DEFAULT_POLL_INTERVAL: &str = "5s";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

fn default_poll_interval() -> String {
    DEFAULT_POLL_INTERVAL.to_string()
}

fn is_default_poll_interval(s: &String) -> bool {
    s == DEFAULT_POLL_INTERVAL
}

/// Configuration at ~/.config/legend/config.toml
///
/// Any option can be overridden with a `LEGEND_`-prefixed environment
/// variable, e.g. `LEGEND_DATA_DIR` or `LEGEND_PROFILE__NAME`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LegendConfig {
    /// Root of the local cache.
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the shared event table. Defaults to `<data_dir>/remote`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_dir: Option<PathBuf>,

    /// How often connectivity is probed, e.g. "5s" or "1m".
    #[serde(
        default = "default_poll_interval",
        skip_serializing_if = "is_default_poll_interval"
    )]
    pub poll_interval: String,

    /// The acting user. Absent means guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

impl Default for LegendConfig {
    fn default() -> Self {
        LegendConfig {
            data_dir: default_data_dir(),
            remote_dir: None,
            poll_interval: default_poll_interval(),
            profile: None,
        }
    }
}

impl LegendConfig {
    pub fn config_path() -> LegendResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LegendError::Config("Could not determine config directory".into()))?
            .join("legend");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config, writing a commented-out default on first run.
    pub fn load() -> LegendResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> LegendResult<Self> {
        let config: LegendConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("LEGEND")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| LegendError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| LegendError::Config(e.to_string()))?;

        config.poll_interval()?;
        Ok(config)
    }

    /// Save the current config to ~/.config/legend/config.toml
    pub fn save(&self) -> LegendResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> LegendResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| LegendError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| LegendError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> LegendResult<()> {
        let contents = format!(
            "\
# legend configuration

# Where cached events and offline changes are kept:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Shared event table. The default <data_dir>/remote is created on first
# use; a directory set here is not, and legend works offline while it is
# missing (e.g. an unmounted share):
# remote_dir = \"~/Dropbox/legend\"

# How often to check whether the shared table is reachable:
# poll_interval = \"{DEFAULT_POLL_INTERVAL}\"

# Who you are. Leave out to use legend as a guest.
# [profile]
# id = \"alex\"
# name = \"Alex\"
# color = \"#3b82f6\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LegendError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| LegendError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn remote_path(&self) -> PathBuf {
        match &self.remote_dir {
            Some(dir) => expand(dir),
            None => self.data_path().join("remote"),
        }
    }

    /// Create the default shared table directory if no `remote_dir` is set.
    ///
    /// A configured `remote_dir` is left alone: its absence is how an
    /// unmounted share shows up as offline.
    pub fn ensure_remote_dir(&self) -> LegendResult<PathBuf> {
        let path = self.remote_path();
        if self.remote_dir.is_none() && !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| {
                LegendError::Config(format!("Could not create {}: {e}", path.display()))
            })?;
            tracing::info!(path = %path.display(), "created local shared table");
        }
        Ok(path)
    }

    pub fn poll_interval(&self) -> LegendResult<Duration> {
        humantime::parse_duration(&self.poll_interval).map_err(|e| {
            LegendError::Config(format!("Invalid poll_interval '{}': {e}", self.poll_interval))
        })
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_default_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legend").join("config.toml");

        LegendConfig::create_default_config(&path).unwrap();
        let config = LegendConfig::load_from(&path).unwrap();

        assert_eq!(config.data_dir, default_data_dir());
        assert_eq!(config.poll_interval().unwrap(), Duration::from_secs(5));
        assert!(config.profile.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = LegendConfig {
            remote_dir: Some(dir.path().join("shared")),
            poll_interval: "1m".into(),
            profile: Some(UserProfile::new("alex", "Alex").with_color("#3b82f6")),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(!saved.contains("data_dir"));

        let reloaded = LegendConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.poll_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(reloaded.remote_path(), dir.path().join("shared"));
    }

    #[test]
    fn test_invalid_poll_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval = \"soon\"\n").unwrap();

        assert!(matches!(
            LegendConfig::load_from(&path),
            Err(LegendError::Config(_))
        ));
    }

    #[test]
    fn test_default_remote_dir_is_created_but_configured_one_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let config = LegendConfig {
            data_dir: dir.path().join("data"),
            ..Default::default()
        };

        let path = config.ensure_remote_dir().unwrap();
        assert_eq!(path, dir.path().join("data").join("remote"));
        assert!(path.is_dir());
        // A second run finds it in place
        assert_eq!(config.ensure_remote_dir().unwrap(), path);

        let mounted = LegendConfig {
            remote_dir: Some(dir.path().join("share")),
            ..Default::default()
        };
        let path = mounted.ensure_remote_dir().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remote_defaults_under_data_dir() {
        let config = LegendConfig {
            data_dir: PathBuf::from("/tmp/legend"),
            ..Default::default()
        };
        assert_eq!(config.remote_path(), PathBuf::from("/tmp/legend/remote"));
    }
}
