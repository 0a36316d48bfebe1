use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::loader::ColumnRoles;

pub const DEFAULT_DATA_BASE_URL: &str =
    "https://raw.githubusercontent.com/CarlosCO94/Scout_911/main/data";
const CACHE_DIR: &str = "scout_engine";

/// Settings for the data loader and binaries. Engine functions take all
/// their inputs explicitly and never read this.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_base_url: String,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub fetch_threads: usize,
    pub default_top_n: usize,
    pub columns: ColumnRoles,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_base_url: DEFAULT_DATA_BASE_URL.to_string(),
            cache_dir: default_cache_dir(),
            cache_ttl: Duration::from_secs(6 * 3600),
            fetch_threads: 8,
            default_top_n: 5,
            columns: ColumnRoles::default(),
        }
    }
}

impl EngineConfig {
    /// Reads `SCOUT_*` variables; unset or unparsable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let data_base_url = env_string("SCOUT_DATA_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.data_base_url);
        let cache_dir = env_string("SCOUT_CACHE_DIR")
            .map(PathBuf::from)
            .or(defaults.cache_dir);
        let cache_ttl = env_parse::<u64>("SCOUT_CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let fetch_threads = env_parse::<usize>("SCOUT_FETCH_THREADS")
            .unwrap_or(defaults.fetch_threads)
            .clamp(1, 32);
        let default_top_n = env_parse::<usize>("SCOUT_DEFAULT_TOP_N")
            .unwrap_or(defaults.default_top_n)
            .max(1);

        let base_cols = defaults.columns;
        let columns = ColumnRoles {
            name: env_string("SCOUT_NAME_COLUMN").unwrap_or(base_cols.name),
            team: env_string("SCOUT_TEAM_COLUMN").unwrap_or(base_cols.team),
            season: env_string("SCOUT_SEASON_COLUMN").unwrap_or(base_cols.season),
            position: env_string("SCOUT_POSITION_COLUMN").unwrap_or(base_cols.position),
        };

        Self {
            data_base_url,
            cache_dir,
            cache_ttl,
            fetch_threads,
            default_top_n,
            columns,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse::<T>().ok())
}

pub fn default_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}
