use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::{swlog_debug, Error, Result};

/// Default tmux session name for a swarm run.
pub const DEFAULT_SESSION: &str = "cathedral-swarm";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Override for the tmux session name.
    pub session: Option<String>,
    /// Override for the artifact base directory (default "artifacts").
    pub base_dir: Option<String>,
}

impl Config {
    pub fn swarm_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".swarm"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::swarm_dir()?.join("swarm.toml"))
    }

    pub fn effective_session(&self) -> &str {
        self.session.as_deref().unwrap_or(DEFAULT_SESSION)
    }

    pub fn effective_base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => expand_tilde(dir),
            None => PathBuf::from(crate::artifact::BASE_DIR),
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        swlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            swlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        swlog_debug!(
            "Config loaded: session={:?}, base_dir={:?}",
            config.session,
            config.base_dir
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let swarm_dir = Self::swarm_dir()?;
        if !swarm_dir.exists() {
            fs::create_dir_all(&swarm_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        swlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn ensure_dirs() -> Result<()> {
        let swarm_dir = Self::swarm_dir()?;
        if !swarm_dir.exists() {
            swlog_debug!("Creating swarm directory: {}", swarm_dir.display());
            fs::create_dir_all(&swarm_dir)?;
        }
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
