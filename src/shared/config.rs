use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// Periodic drain interval in seconds. `0` disables the timer.
    pub sync_interval: u64,
    pub lock_name: String,
    pub lock_lease_secs: u64,
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub complete_display_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 300, // 5 minutes
                lock_name: "offline-sync".to_string(),
                lock_lease_secs: 120,
                event_capacity: 256,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:8000/api".to_string(),
                auth_token: None,
                request_timeout: 30,
            },
            progress: ProgressConfig {
                complete_display_ms: 3000,
            },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let url = dirs::data_local_dir()
            .map(|dir| dir.join("offline-sync").join("offline.db"))
            .map(|path| format!("sqlite:{}", path.display()))
            .unwrap_or_else(|| "sqlite:data/offline.db".to_string());
        Self {
            url,
            max_connections: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("OFFLINE_SYNC_DATABASE_URL")
            && !v.trim().is_empty()
        {
            cfg.database.url = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_DATABASE_MAX_CONNECTIONS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.database.max_connections = value.clamp(1, u64::from(u32::MAX)) as u32;
        }

        if let Ok(v) = std::env::var("OFFLINE_SYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.sync_interval = value;
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_LOCK_NAME")
            && !v.trim().is_empty()
        {
            cfg.sync.lock_name = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_LOCK_LEASE_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.lock_lease_secs = value.max(1);
        }

        if let Ok(v) = std::env::var("OFFLINE_SYNC_API_BASE_URL")
            && !v.trim().is_empty()
        {
            cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_API_TOKEN") {
            let token = v.trim();
            cfg.remote.auth_token = if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            };
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_API_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.remote.request_timeout = value.max(1);
        }

        if let Ok(v) = std::env::var("OFFLINE_SYNC_COMPLETE_DISPLAY_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.progress.complete_display_ms = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.max_connections == 0 {
            return Err(AppError::ValidationError(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if self.sync.lock_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Sync lock_name cannot be empty".to_string(),
            ));
        }
        if self.sync.lock_lease_secs == 0 {
            return Err(AppError::ValidationError(
                "Sync lock_lease_secs must be greater than 0".to_string(),
            ));
        }
        if self.sync.event_capacity == 0 {
            return Err(AppError::ValidationError(
                "Sync event_capacity must be greater than 0".to_string(),
            ));
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            return Err(AppError::ValidationError(format!(
                "Remote base_url must be an http(s) URL: {}",
                self.remote.base_url
            )));
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sync.sync_interval, 300);
        assert!(cfg.database.url.starts_with("sqlite:"));
    }

    #[test]
    fn parse_bool_falls_back_to_default() {
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
        assert!(!parse_bool("", false));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "ftp://example.com".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_lease() {
        let mut cfg = AppConfig::default();
        cfg.sync.lock_lease_secs = 0;
        assert_eq!(
            cfg.validate(),
            Err(AppError::ValidationError(
                "Sync lock_lease_secs must be greater than 0".to_string()
            ))
        );
    }
}
