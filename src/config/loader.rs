//! Load config from a JSON file; process settings from the environment.

use crate::config::RestConfig;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "REST_CONFIG_PATH";

pub fn load_from_str(json: &str) -> Result<RestConfig, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<RestConfig, ConfigError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&json)
}

/// Process settings. Reads `.env` when present.
#[derive(Clone, Debug)]
pub struct Settings {
    pub config_path: PathBuf,
    pub database_url: String,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .map_err(|_| ConfigError::Load(format!("{} is not set", CONFIG_PATH_ENV)))?;
        Ok(Settings {
            config_path,
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/rest".into()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessMode;

    #[test]
    fn applies_defaults() {
        let config = load_from_str(r#"{"resource_types": {"articles": {}}}"#).unwrap();
        let rt = &config.resource_types["articles"];
        assert_eq!(rt.read, AccessMode::Deny);
        assert_eq!(rt.write, AccessMode::Deny);
        assert_eq!(rt.data_provider, "virtual_object");
        assert_eq!(rt.authentication, "basic");
        assert_eq!(rt.cache, "memory");
        assert_eq!(rt.cache_life_time, 0);
        assert!(config.users.is_empty());
    }

    #[test]
    fn rejects_unknown_access_mode() {
        assert!(matches!(
            load_from_str(r#"{"resource_types": {"articles": {"read": "maybe"}}}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path("/nonexistent/rest.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
