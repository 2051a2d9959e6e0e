//! Plugin configuration
//!
//! Client credentials and connection settings used to talk to the Qiita
//! server. They come either from the plugin's configuration file or from
//! environment variables; the server URL is always given by the caller.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Plugin configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Qiita server base URL (e.g., "https://localhost:21174")
    pub server_url: String,

    /// OAuth2 client id of the plugin
    pub client_id: String,

    /// OAuth2 client secret of the plugin
    pub client_secret: String,

    /// Certificate used to verify the server, instead of the default roots
    pub server_cert: Option<PathBuf>,

    /// Timeout applied to every HTTP call
    pub request_timeout: Option<Duration>,
}

/// On-disk layout of the configuration file
///
/// ```toml
/// [main]
/// CLIENT_ID = "19ndkO3oMKsoChjVVWluF7QkxHRfYhTKSFbAVt8IhK7gZgDaO4"
/// CLIENT_SECRET = "J7FfQ7CQdOxuKhQAf1eoGgBAE81Ns8Gu3EKaWFm3IO2JKhAmmCWZuabe0O5Mp28s1"
/// SERVER_CERT = ""
/// ```
#[derive(Debug, Deserialize)]
struct ConfigFile {
    main: MainSection,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    #[serde(rename = "CLIENT_ID")]
    client_id: String,
    #[serde(rename = "CLIENT_SECRET")]
    client_secret: String,
    #[serde(rename = "SERVER_CERT", default)]
    server_cert: Option<String>,
    #[serde(rename = "REQUEST_TIMEOUT", default)]
    request_timeout: Option<u64>,
}

impl Config {
    /// Creates a configuration without certificate or timeout
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            server_cert: None,
            request_timeout: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - QIITA_CLIENT_ID (required)
    /// - QIITA_CLIENT_SECRET (required)
    /// - QIITA_SERVER_CERT (optional, path to a PEM certificate)
    /// - QIITA_REQUEST_TIMEOUT (optional, seconds)
    pub fn from_env(server_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::from_lookup(server_url, |key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(server_url: impl Into<String>, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = lookup("QIITA_CLIENT_ID")
            .ok_or_else(|| anyhow::anyhow!("QIITA_CLIENT_ID environment variable not set"))?;

        let client_secret = lookup("QIITA_CLIENT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("QIITA_CLIENT_SECRET environment variable not set"))?;

        let server_cert = lookup("QIITA_SERVER_CERT")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let request_timeout = lookup("QIITA_REQUEST_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Ok(Self {
            server_url: server_url.into(),
            client_id,
            client_secret,
            server_cert,
            request_timeout,
        })
    }

    /// Creates configuration from the plugin's configuration file
    pub fn from_file(server_url: impl Into<String>, path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(server_url, &contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn from_toml(server_url: impl Into<String>, contents: &str) -> anyhow::Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;

        Ok(Self {
            server_url: server_url.into(),
            client_id: file.main.client_id,
            client_secret: file.main.client_secret,
            server_cert: file
                .main
                .server_cert
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            request_timeout: file.main.request_timeout.map(Duration::from_secs),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.is_empty() {
            anyhow::bail!("client_id cannot be empty");
        }

        if self.client_secret.is_empty() {
            anyhow::bail!("client_secret cannot be empty");
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            anyhow::bail!("server_url must start with http:// or https://");
        }

        if let Some(cert) = self.server_cert.as_ref().filter(|cert| !cert.exists()) {
            anyhow::bail!("server certificate {} does not exist", cert.display());
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(
            "https://localhost:21174",
            lookup(&[
                ("QIITA_CLIENT_ID", "id"),
                ("QIITA_CLIENT_SECRET", "secret"),
                ("QIITA_REQUEST_TIMEOUT", "60"),
            ]),
        )
        .unwrap();

        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.server_cert, None);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(60)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_requires_credentials() {
        let err = Config::from_lookup(
            "https://localhost:21174",
            lookup(&[("QIITA_CLIENT_ID", "id")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("QIITA_CLIENT_SECRET"));
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            "https://localhost:21174",
            r#"
            [main]
            CLIENT_ID = "19ndkO3oMKsoChjVVWluF7QkxHRfYhTKSFbAVt8IhK7gZgDaO4"
            CLIENT_SECRET = "J7FfQ7CQdOxuKhQAf1eoGgBAE81Ns8Gu3EKaWFm3IO2JKh"
            SERVER_CERT = ""
            "#,
        )
        .unwrap();

        assert_eq!(
            config.client_id,
            "19ndkO3oMKsoChjVVWluF7QkxHRfYhTKSFbAVt8IhK7gZgDaO4"
        );
        assert_eq!(config.server_cert, None);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_from_toml_missing_section() {
        assert!(Config::from_toml("https://localhost:21174", "CLIENT_ID = \"x\"").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("https://localhost:21174", "id", "secret");
        assert!(config.validate().is_ok());

        config.client_id = String::new();
        assert!(config.validate().is_err());
        config.client_id = "id".to_string();

        config.server_url = "localhost:21174".to_string();
        assert!(config.validate().is_err());
        config.server_url = "http://localhost:21174".to_string();

        config.server_cert = Some(PathBuf::from("/nonexistent/server.crt"));
        assert!(config.validate().is_err());
        config.server_cert = None;

        config.request_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
