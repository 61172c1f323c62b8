use crate::utils::get_leadcrab_home;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path", rename = "webhookPath")]
    pub webhook_path: String,
    /// Shared secret for HMAC signature validation of inbound webhooks.
    /// Unset disables the check (local development).
    #[serde(default, rename = "webhookSecret")]
    pub webhook_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            webhook_path: default_webhook_path(),
            webhook_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        Ok(get_leadcrab_home()?.join("leads.db"))
    }
}

/// Messaging-gateway endpoint and credentials. `base_url` doubles as the
/// rewrite target for loopback media URLs the gateway emits.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default, rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            root: None,
        }
    }
}

impl StorageConfig {
    pub fn resolved_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        Ok(get_leadcrab_home()?.join("storage"))
    }
}

fn default_port() -> u16 {
    8087
}

fn default_webhook_path() -> String {
    "/webhook/inbound".to_string()
}

fn default_bucket() -> String {
    "lead-media".to_string()
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_leadcrab_home()?.join("config.toml"))
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist. Env overrides (credentials) apply either way.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.toml"));
    let path = config_path.unwrap_or(default_path.as_path());

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from {}", path.display()))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);
    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}

/// Env beats file for credentials so secrets can stay out of config.toml.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(key) = std::env::var("LEADCRAB_GATEWAY_API_KEY")
        && !key.is_empty()
    {
        config.gateway.api_key = key;
    }
    if let Ok(secret) = std::env::var("LEADCRAB_WEBHOOK_SECRET")
        && !secret.is_empty()
    {
        config.server.webhook_secret = Some(secret);
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.server.webhook_path.starts_with('/') {
            bail!(
                "server.webhookPath must start with '/': {}",
                self.server.webhook_path
            );
        }
        if self.storage.bucket.is_empty() {
            bail!("storage.bucket must not be empty");
        }
        if let Some(base) = &self.gateway.base_url {
            let parsed = url::Url::parse(base)
                .with_context(|| format!("gateway.baseUrl is not a valid URL: {}", base))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                bail!("gateway.baseUrl must be http(s): {}", base);
            }
        }
        Ok(())
    }
}
