pub mod config;
pub mod paths;

pub use config::{AniListConfig, Config, ScheduleConfig, ServerConfig};
pub use paths::{container_base_path, PathManager};
