use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("ANIWEEK_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

pub struct PathManager {
    config_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("aniweek");

        Ok(Self {
            log_dir: base_dir.join("logs"),
            config_dir: base_dir,
        })
    }

    pub fn from_container_env() -> Self {
        let base = container_base_path();
        Self {
            config_dir: base.clone(),
            log_dir: base.join("logs"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Config file location; `ANIWEEK_CONFIG` overrides the managed path.
    pub fn config_file(&self) -> PathBuf {
        std::env::var("ANIWEEK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| self.config_dir.join("config.toml"))
    }

    pub fn server_log_file(&self) -> PathBuf {
        self.log_dir.join("aniweek.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // Presence of the container base directory indicates a container build
        let base = container_base_path();
        if base.exists() {
            return Self::from_container_env();
        }

        // Otherwise platform paths, e.g. ~/.config/aniweek on Linux
        Self::new().unwrap_or_else(|_| Self::from_container_env())
    }
}
