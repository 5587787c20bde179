use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::tips::MarginMode;

pub const APP_DIR: &str = "cmk_tipping";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TOAST_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub margin_mode: MarginMode,
    pub require_favorite_team: bool,
    pub http_timeout: Duration,
    pub toast_secs: u64,
    pub log_level: tracing::Level,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            margin_mode: MarginMode::Exact,
            require_favorite_team: false,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            toast_secs: DEFAULT_TOAST_SECS,
            log_level: tracing::Level::INFO,
        }
    }
}

impl ClientConfig {
    /// Reads `TIPPING_*` variables; call after loading any `.env` files.
    pub fn from_env() -> Self {
        let base_url = env::var("TIPPING_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let margin_mode = env::var("TIPPING_MARGIN_MODE")
            .ok()
            .and_then(|v| MarginMode::parse(&v))
            .unwrap_or_default();
        let require_favorite_team = env_bool("TIPPING_REQUIRE_FAV_TEAM", false);
        let timeout_secs = env::var("TIPPING_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        let toast_secs = env::var("TIPPING_TOAST_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TOAST_SECS)
            .clamp(1, 30);
        let log_level = env::var("TIPPING_LOG")
            .ok()
            .and_then(|v| tracing::Level::from_str(v.trim()).ok())
            .unwrap_or(tracing::Level::INFO);

        Self {
            base_url,
            margin_mode,
            require_favorite_team,
            http_timeout: Duration::from_secs(timeout_secs),
            toast_secs,
            log_level,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(val) => matches!(
            val.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

/// `$XDG_CACHE_HOME/cmk_tipping`, falling back to `~/.cache/cmk_tipping`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}
