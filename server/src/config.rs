//! Server configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use cookbook_core::llm::openrouter::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use cookbook_core::{HostAllowlist, OpenRouterConfig};
use rand::rngs::OsRng;
use rand::TryRngCore;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
const DEFAULT_STORAGE_DIR: &str = "data/storage";
const DEFAULT_SITE_NAME: &str = "Cookbook";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to generate signing key: {0}")]
    Random(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Base URL used when building signed storage links.
    pub public_url: String,
    pub storage_dir: PathBuf,
    pub signing_key: Vec<u8>,
    pub allowed_hosts: HostAllowlist,
    /// `openrouter` or `fake`.
    pub ai_provider: String,
    pub openrouter: OpenRouterConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = get("COOKBOOK_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "COOKBOOK_BIND_ADDR",
                reason: e.to_string(),
            })?;

        let public_url = get("COOKBOOK_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&public_url).map_err(|e| ConfigError::Invalid {
            name: "COOKBOOK_PUBLIC_URL",
            reason: e.to_string(),
        })?;

        let storage_dir = PathBuf::from(
            get("COOKBOOK_STORAGE_DIR").unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string()),
        );

        let signing_key = match get("COOKBOOK_SIGNING_KEY") {
            Some(key) => key.into_bytes(),
            None => {
                tracing::warn!(
                    "COOKBOOK_SIGNING_KEY not set, using a random key; image links will not survive a restart"
                );
                random_key()?
            }
        };

        let allowed_hosts = get("COOKBOOK_ALLOWED_HOSTS")
            .map(|hosts| HostAllowlist::parse(&hosts))
            .unwrap_or_default();

        let ai_provider = get("COOKBOOK_AI_PROVIDER")
            .map(|p| p.to_ascii_lowercase())
            .unwrap_or_else(|| "openrouter".to_string());
        if !matches!(ai_provider.as_str(), "openrouter" | "fake") {
            return Err(ConfigError::Invalid {
                name: "COOKBOOK_AI_PROVIDER",
                reason: format!("expected openrouter or fake, got {}", ai_provider),
            });
        }

        let openrouter = OpenRouterConfig {
            api_key: get("OPENROUTER_API_KEY").unwrap_or_default(),
            model: get("COOKBOOK_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("COOKBOOK_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            site_url: get("COOKBOOK_SITE_URL").unwrap_or_else(|| public_url.clone()),
            site_name: get("COOKBOOK_SITE_NAME").unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
            ..OpenRouterConfig::default()
        };

        Ok(Self {
            database_url,
            bind_addr,
            public_url,
            storage_dir,
            signing_key,
            allowed_hosts,
            ai_provider,
            openrouter,
        })
    }
}

fn random_key() -> Result<Vec<u8>, ConfigError> {
    let mut key = vec![0u8; 32];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| ConfigError::Random(e.to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/cookbook")]).unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.public_url, "http://localhost:3000");
        assert_eq!(config.storage_dir, PathBuf::from("data/storage"));
        assert_eq!(config.signing_key.len(), 32);
        assert!(!config.allowed_hosts.is_restricted());
        assert_eq!(config.ai_provider, "openrouter");
        assert_eq!(config.openrouter.model, DEFAULT_MODEL);
        assert_eq!(config.openrouter.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.openrouter.site_url, "http://localhost:3000");
    }

    #[test]
    fn test_database_url_required() {
        assert!(matches!(
            config(&[("DATABASE_URL", "  ")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://db/cookbook"),
            ("COOKBOOK_BIND_ADDR", "127.0.0.1:8080"),
            ("COOKBOOK_PUBLIC_URL", "https://cook.example/"),
            ("COOKBOOK_SIGNING_KEY", "secret"),
            ("COOKBOOK_ALLOWED_HOSTS", "localhost:8081, example.com"),
            ("COOKBOOK_AI_PROVIDER", "FAKE"),
            ("OPENROUTER_API_KEY", "sk-test"),
            ("COOKBOOK_SITE_NAME", "My Kitchen"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.public_url, "https://cook.example");
        assert_eq!(config.signing_key, b"secret");
        assert!(config.allowed_hosts.is_restricted());
        assert!(config
            .allowed_hosts
            .check("http://localhost:8081/recipe")
            .is_ok());
        assert!(config.allowed_hosts.check("https://other.test/").is_err());
        assert_eq!(config.ai_provider, "fake");
        assert_eq!(config.openrouter.api_key, "sk-test");
        assert_eq!(config.openrouter.site_url, "https://cook.example");
        assert_eq!(config.openrouter.site_name, "My Kitchen");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            config(&[("DATABASE_URL", "x"), ("COOKBOOK_BIND_ADDR", "nope")]),
            Err(ConfigError::Invalid {
                name: "COOKBOOK_BIND_ADDR",
                ..
            })
        ));
        assert!(matches!(
            config(&[("DATABASE_URL", "x"), ("COOKBOOK_AI_PROVIDER", "claude")]),
            Err(ConfigError::Invalid {
                name: "COOKBOOK_AI_PROVIDER",
                ..
            })
        ));
    }
}
