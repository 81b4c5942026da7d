use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub anilist: AniListConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// IANA zone the schedule week is anchored in. The week always starts on
    /// Sunday 00:00:00 in this zone, and airing times display in it.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// How many weeks away from the current one can be requested, in either
    /// direction.
    #[serde(default = "default_week_range")]
    pub week_range: i32,
    /// Warm the cache for the adjacent weeks after a week resolves.
    #[serde(default = "default_true")]
    pub prefetch: bool,
    /// Delay before a prefetch fires, so it never competes with the
    /// foreground request.
    #[serde(default = "default_prefetch_delay_ms")]
    pub prefetch_delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AniListConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Page size for airing schedule queries. One page per sub-range query.
    #[serde(default = "default_per_page")]
    pub per_page: i32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// CDN freshness window for /api/schedule responses, in seconds.
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u32,
    /// stale-while-revalidate window for /api/schedule responses, in seconds.
    #[serde(default = "default_cache_stale_secs")]
    pub cache_stale_secs: u32,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_week_range() -> i32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_prefetch_delay_ms() -> u64 {
    200
}

fn default_endpoint() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_per_page() -> i32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_cache_max_age_secs() -> u32 {
    3600
}

fn default_cache_stale_secs() -> u32 {
    86400
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            week_range: default_week_range(),
            prefetch: default_true(),
            prefetch_delay_ms: default_prefetch_delay_ms(),
        }
    }
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cache_max_age_secs: default_cache_max_age_secs(),
            cache_stale_secs: default_cache_stale_secs(),
        }
    }
}

impl ScheduleConfig {
    /// Parse the configured zone name. Invalid names are a config error, not
    /// a runtime fallback.
    pub fn tz(&self) -> anyhow::Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone in [schedule]: {}", self.timezone))
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.schedule.tz()?;

        if self.schedule.week_range < 0 {
            return Err(anyhow::anyhow!("week_range must be non-negative"));
        }
        if self.anilist.per_page < 1 {
            return Err(anyhow::anyhow!("per_page must be at least 1"));
        }
        if self.anilist.endpoint.is_empty() {
            return Err(anyhow::anyhow!("anilist endpoint cannot be empty"));
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "server bind address is not host:port: {}",
                self.server.bind
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.timezone, "America/New_York");
        assert_eq!(config.schedule.week_range, 3);
        assert_eq!(config.anilist.per_page, 100);
        assert_eq!(config.server.cache_max_age_secs, 3600);
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.schedule.timezone = "Asia/Tokyo".to_string();
        config.schedule.week_range = 2;
        config.anilist.timeout_secs = 10;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.schedule.timezone, "Asia/Tokyo");
        assert_eq!(loaded.schedule.week_range, 2);
        assert_eq!(loaded.anilist.timeout_secs, 10);
        // Untouched sections come back as defaults
        assert_eq!(loaded.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[schedule]\ntimezone = \"Europe/Paris\"\n").unwrap();

        let loaded = Config::load_from_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(loaded.schedule.timezone, "Europe/Paris");
        assert_eq!(loaded.schedule.week_range, 3);
        assert_eq!(loaded.anilist.endpoint, "https://graphql.anilist.co");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.schedule.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.week_range = -1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_for_missing_file() {
        let path = PathBuf::from("/nonexistent/aniweek/config.toml");
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.schedule.week_range, 3);
    }
}
