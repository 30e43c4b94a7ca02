//! Configuration Management
//!
//! Connection settings for a Superset instance. A [`Config`] is always built
//! explicitly: callers collect [`ConfigOverrides`] from their sources (CLI flags, a
//! YAML profile, the process environment), layer them, and resolve the result once.
//! The library never reads the environment on its own.

use crate::error::{SupersetError, SupersetResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_DATABASE_NAME: &str = "examples";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variables recognised by [`ConfigOverrides::from_env`]
pub const ENV_URL: &str = "SUPERSET_URL";
pub const ENV_USERNAME: &str = "SUPERSET_USERNAME";
pub const ENV_PASSWORD: &str = "SUPERSET_PASSWORD";
pub const ENV_SCHEMA: &str = "SUPERSET_SCHEMA";
pub const ENV_DATABASE_NAME: &str = "SUPERSET_DATABASE_NAME";
pub const ENV_TIMEOUT_SECS: &str = "SUPERSET_TIMEOUT_SECS";

/// Resolved connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL without trailing slash, e.g. `https://superset.example.com`
    pub superset_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Default schema for datasets created by table name
    pub schema: String,
    /// Default database that datasets are registered against
    pub database_name: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("superset_url", &self.superset_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("schema", &self.schema)
            .field("database_name", &self.database_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Build a config from the three required values, using defaults for the rest
    pub fn new(superset_url: &str, username: &str, password: &str) -> SupersetResult<Self> {
        ConfigOverrides {
            superset_url: Some(superset_url.to_string()),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        }
        .resolve()
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    pub fn with_database_name(mut self, database_name: &str) -> Self {
        self.database_name = database_name.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Partial configuration from a single source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub superset_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Read the `SUPERSET_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the `SUPERSET_*` variables through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = get(ENV_TIMEOUT_SECS).and_then(|v| match v.trim().parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(_) => {
                tracing::warn!("Ignoring invalid {}: {:?}", ENV_TIMEOUT_SECS, v);
                None
            }
        });

        Self {
            superset_url: get(ENV_URL),
            username: get(ENV_USERNAME),
            password: get(ENV_PASSWORD),
            schema: get(ENV_SCHEMA),
            database_name: get(ENV_DATABASE_NAME),
            timeout_secs,
        }
    }

    /// Load a YAML profile
    pub fn load_file(path: &Path) -> SupersetResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SupersetError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| SupersetError::config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Load the default YAML profile if it exists
    pub fn load_default_file() -> SupersetResult<Option<Self>> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_file(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Fill every unset field from `fallback` (self wins)
    pub fn or(self, fallback: ConfigOverrides) -> Self {
        Self {
            superset_url: self.superset_url.or(fallback.superset_url),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            schema: self.schema.or(fallback.schema),
            database_name: self.database_name.or(fallback.database_name),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
        }
    }

    /// Validate and turn into a [`Config`]
    pub fn resolve(self) -> SupersetResult<Config> {
        let url = self
            .superset_url
            .ok_or_else(|| SupersetError::config(format!("Superset URL not set (use {})", ENV_URL)))?;
        let username = self
            .username
            .ok_or_else(|| SupersetError::config(format!("username not set (use {})", ENV_USERNAME)))?;
        let password = self
            .password
            .ok_or_else(|| SupersetError::config(format!("password not set (use {})", ENV_PASSWORD)))?;

        Ok(Config {
            superset_url: normalize_base_url(&url)?,
            username,
            password,
            schema: self.schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            database_name: self
                .database_name
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1),
        })
    }
}

/// Default profile location: `<config dir>/superset-toolkit/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("superset-toolkit").join("config.yaml"))
}

/// Validate a base URL and strip the trailing slash
fn normalize_base_url(raw: &str) -> SupersetResult<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| SupersetError::config(format!("invalid Superset URL {:?}: {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(SupersetError::config(format!(
                "unsupported URL scheme {:?}",
                other
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(SupersetError::config("Superset URL has no host"));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_new_applies_defaults_and_trims_slash() {
        let config = Config::new("https://bi.example.com/", "admin", "secret").unwrap();
        assert_eq!(config.superset_url, "https://bi.example.com");
        assert_eq!(config.schema, DEFAULT_SCHEMA);
        assert_eq!(config.database_name, DEFAULT_DATABASE_NAME);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let env = ConfigOverrides::from_lookup(lookup_from(&[
            (ENV_URL, "http://env-host:8088"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
            (ENV_SCHEMA, "env_schema"),
        ]));
        let explicit = ConfigOverrides {
            username: Some("cli-user".to_string()),
            schema: Some("reports".to_string()),
            ..Default::default()
        };

        let config = explicit.or(env).resolve().unwrap();
        assert_eq!(config.superset_url, "http://env-host:8088");
        assert_eq!(config.username, "cli-user");
        assert_eq!(config.password, "env-pass");
        assert_eq!(config.schema, "reports");
    }

    #[test]
    fn test_file_sits_between_explicit_and_env() {
        let env = ConfigOverrides::from_lookup(lookup_from(&[
            (ENV_URL, "http://env-host:8088"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
            (ENV_DATABASE_NAME, "env_db"),
        ]));
        let file = ConfigOverrides {
            username: Some("file-user".to_string()),
            database_name: Some("file_db".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let explicit = ConfigOverrides {
            database_name: Some("cli_db".to_string()),
            ..Default::default()
        };

        let config = explicit.or(file).or(env).resolve().unwrap();
        assert_eq!(config.username, "file-user");
        assert_eq!(config.database_name, "cli_db");
        assert_eq!(config.password, "env-pass");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let env = ConfigOverrides::from_lookup(lookup_from(&[
            (ENV_URL, "  "),
            (ENV_TIMEOUT_SECS, "soon"),
        ]));
        assert_eq!(env, ConfigOverrides::default());
    }

    #[test]
    fn test_missing_password_is_config_error() {
        let err = ConfigOverrides {
            superset_url: Some("http://localhost:8088".to_string()),
            username: Some("admin".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, SupersetError::Config(_)));
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(Config::new("ftp://bi.example.com", "a", "b").is_err());
        assert!(Config::new("not a url", "a", "b").is_err());
    }

    #[test]
    fn test_load_yaml_profile() {
        let path = std::env::temp_dir().join(format!("superset-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "superset_url: http://localhost:8088\nusername: admin\nschema: analytics\ntimeout_secs: 5\n",
        )
        .unwrap();

        let file = ConfigOverrides::load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(file.schema.as_deref(), Some("analytics"));
        assert_eq!(file.timeout_secs, Some(5));
        assert!(file.password.is_none());
    }

    #[test]
    fn test_serialized_config_omits_password() {
        let config = Config::new("http://localhost:8088", "admin", "hunter2").unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "admin");
    }

    #[test]
    fn test_debug_masks_password() {
        let config = Config::new("http://localhost:8088", "admin", "hunter2").unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
    }
}
