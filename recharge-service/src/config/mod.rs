use recharge_core::error::AppError;
use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration.
///
/// Every field has a default, so an empty environment boots a service with a
/// simulated payment gateway, an in-memory ledger and the built-in catalog.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CatalogConfig {
    /// Base URL of the plan catalog; plans are read from `{base_url}/plans`.
    /// Unset means the built-in catalog is always served.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_catalog_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Simulated,
    Gateway,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PaymentConfig {
    #[serde(default)]
    pub mode: PaymentMode,
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
    #[serde(default)]
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub key_id: String,
    #[serde(default = "empty_secret")]
    pub key_secret: Secret<String>,
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3010
}

fn default_catalog_timeout_ms() -> u64 {
    5_000
}

fn default_simulated_delay_ms() -> u64 {
    2_000
}

fn default_gateway_timeout_ms() -> u64 {
    30_000
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info,recharge_service=debug".to_string()
}

fn default_service_name() -> String {
    "recharge-service".to_string()
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_catalog_timeout_ms(),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            mode: PaymentMode::default(),
            simulated_delay_ms: default_simulated_delay_ms(),
            gateway_url: None,
            key_id: String::new(),
            key_secret: empty_secret(),
            timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

impl PaymentConfig {
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            directory: default_storage_directory(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            payment: PaymentConfig::default(),
            storage: StorageConfig::default(),
            log_level: default_log_level(),
            service_name: default_service_name(),
        }
    }
}

impl Config {
    /// Reads `configuration.{yaml,toml,json}` if present, then `APP_*`
    /// variables such as `APP_PAYMENT__MODE=gateway`.
    pub fn load() -> Result<Self, AppError> {
        let config: Self = recharge_core::config::load_configuration("configuration")?;

        if config.payment.mode == PaymentMode::Gateway && config.payment.gateway_url.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "payment.gateway_url must be set when payment.mode is 'gateway'"
            )));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_boot_a_simulated_in_memory_service() {
        let config = Config::default();

        assert_eq!(config.payment.mode, PaymentMode::Simulated);
        assert_eq!(config.payment.simulated_delay(), Duration::from_secs(2));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.catalog.base_url.is_none());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "payment": { "mode": "gateway", "gateway_url": "http://pay.local" },
            "storage": { "backend": "file" }
        }))
        .unwrap();

        assert_eq!(config.payment.mode, PaymentMode::Gateway);
        assert_eq!(config.payment.timeout_ms, 30_000);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.directory, PathBuf::from("data"));
        assert_eq!(config.server.port, 3010);
    }
}
