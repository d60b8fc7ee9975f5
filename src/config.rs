//! Client configuration.
//!
//! Read from `config.toml` (an explicit path, or `oneview/config.toml` under
//! the platform config directory), then overridden from `ONEVIEW_*`
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::connection::Credentials;
use crate::error::{OneViewError, Result};
use crate::tasks::CONNECTION_FAILURE_TIMEOUT;

pub const DEFAULT_API_VERSION: u32 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const ENV_HOST: &str = "ONEVIEW_HOST";
pub const ENV_API_VERSION: &str = "ONEVIEW_API_VERSION";
pub const ENV_USER: &str = "ONEVIEW_USER";
pub const ENV_PASSWORD: &str = "ONEVIEW_PASSWORD";
pub const ENV_AUTH_LOGIN_DOMAIN: &str = "ONEVIEW_AUTH_LOGIN_DOMAIN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub api_version: u32,
    pub credentials: Option<Credentials>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// How long the task monitor tolerates network failures while polling
    pub connection_failure_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            api_version: DEFAULT_API_VERSION,
            credentials: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            connection_failure_timeout_secs: CONNECTION_FAILURE_TIMEOUT.as_secs(),
        }
    }
}

impl ClientConfig {
    /// Load, apply environment overrides and validate.
    ///
    /// With no explicit path a missing default file is not an error; an
    /// explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            OneViewError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| OneViewError::Config(e.to_string()))
    }

    /// Overlay values found through `lookup` onto this configuration.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(version) = lookup(ENV_API_VERSION) {
            self.api_version = version.trim().parse().map_err(|_| {
                OneViewError::Config(format!("{ENV_API_VERSION} is not a number: {version}"))
            })?;
        }

        let user = lookup(ENV_USER);
        let password = lookup(ENV_PASSWORD);
        let domain = lookup(ENV_AUTH_LOGIN_DOMAIN);
        if user.is_some() || password.is_some() || domain.is_some() {
            let credentials = self.credentials.get_or_insert_with(|| Credentials {
                user_name: String::new(),
                password: String::new(),
                auth_login_domain: None,
            });
            if let Some(user) = user {
                credentials.user_name = user;
            }
            if let Some(password) = password {
                credentials.password = password;
            }
            if domain.is_some() {
                credentials.auth_login_domain = domain;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(OneViewError::Config(format!(
                "no appliance host configured (set `host` or {ENV_HOST})"
            )));
        }
        if let Some(credentials) = &self.credentials {
            if credentials.user_name.is_empty() {
                return Err(OneViewError::Config(
                    "credentials are missing a user name".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// `https://{host}`; a host that already carries a scheme is kept as is.
    pub fn base_url(&self) -> Result<Url> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(OneViewError::Config("appliance host is empty".to_string()));
        }
        if host.contains("://") {
            Ok(Url::parse(host)?)
        } else {
            Ok(Url::parse(&format!("https://{host}"))?)
        }
    }

    pub fn connection_failure_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_failure_timeout_secs)
    }
}

/// `<config dir>/oneview/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("oneview").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_version, 300);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.connection_failure_timeout_secs, 90);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ClientConfig::from_toml(
            r#"
host = "oneview.local"
api_version = 500

[credentials]
user_name = "Administrator"
password = "secret"
"#,
        )
        .unwrap();

        assert_eq!(config.host, "oneview.local");
        assert_eq!(config.api_version, 500);
        assert_eq!(config.request_timeout_secs, 120);
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.user_name, "Administrator");
        assert_eq!(credentials.auth_login_domain, None);
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let err = ClientConfig::from_toml("api_version = \"three hundred\"").unwrap_err();
        assert!(matches!(err, OneViewError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "host = \"10.0.0.1\"\nconnection_failure_timeout_secs = 30\n").unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.connection_failure_timeout().as_secs(), 30);
    }

    #[test]
    fn test_from_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ClientConfig::from_file(&temp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ClientConfig::from_toml(
            "host = \"file-host\"\n[credentials]\nuser_name = \"file-user\"\npassword = \"p\"\n",
        )
        .unwrap();

        config
            .apply_env(lookup(&[
                (ENV_HOST, "env-host"),
                (ENV_API_VERSION, "800"),
                (ENV_USER, "env-user"),
                (ENV_AUTH_LOGIN_DOMAIN, "LOCAL"),
            ]))
            .unwrap();

        assert_eq!(config.host, "env-host");
        assert_eq!(config.api_version, 800);
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.user_name, "env-user");
        assert_eq!(credentials.password, "p");
        assert_eq!(credentials.auth_login_domain.as_deref(), Some("LOCAL"));
    }

    #[test]
    fn test_env_creates_credentials() {
        let mut config = ClientConfig::default();
        config
            .apply_env(lookup(&[(ENV_USER, "admin"), (ENV_PASSWORD, "pw")]))
            .unwrap();
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.user_name, "admin");
        assert_eq!(credentials.password, "pw");
    }

    #[test]
    fn test_env_bad_api_version() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env(lookup(&[(ENV_API_VERSION, "latest")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_API_VERSION));
    }

    #[test]
    fn test_validate_requires_host() {
        let err = ClientConfig::default().validate().unwrap_err();
        assert!(matches!(err, OneViewError::Config(_)));

        let config = ClientConfig {
            host: "h".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url() {
        let config = ClientConfig {
            host: "oneview.example.com".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.base_url().unwrap().as_str(), "https://oneview.example.com/");

        let config = ClientConfig {
            host: "http://127.0.0.1:8080".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.base_url().unwrap().as_str(), "http://127.0.0.1:8080/");

        assert!(ClientConfig::default().base_url().is_err());
    }

    #[test]
    fn test_default_config_path_ends_with_file_name() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("oneview/config.toml"));
        }
    }
}
