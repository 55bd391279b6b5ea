//! Configuration loading.
//!
//! Handles parsing of `config.toml` in the companion's data directory. Every
//! field has a default, and a broken file falls back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Quest content file; relative paths are resolved against the data directory
    #[serde(default = "default_content")]
    pub content: PathBuf,

    /// Progress profile used when `--profile` is not given
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Whether quest entries start expanded
    #[serde(default)]
    pub open_by_default: bool,

    /// Command used to open external links; platform default when unset
    #[serde(default)]
    pub link_opener: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content: default_content(),
            profile: default_profile(),
            open_by_default: false,
            link_opener: None,
        }
    }
}

fn default_content() -> PathBuf {
    PathBuf::from("quests.json")
}

fn default_profile() -> String {
    "default".to_string()
}

impl Config {
    /// Load `config.toml` from `dir`, falling back to defaults when the file is
    /// missing or invalid.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::parse_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Content path resolved against the data directory.
    pub fn content_path(&self, dir: &Path) -> PathBuf {
        if self.content.is_absolute() {
            self.content.clone()
        } else {
            dir.join(&self.content)
        }
    }

    /// Command used to open external links.
    pub fn opener(&self) -> String {
        self.link_opener.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "open".to_string()
            } else if cfg!(target_os = "windows") {
                "explorer".to_string()
            } else {
                "xdg-open".to_string()
            }
        })
    }
}
