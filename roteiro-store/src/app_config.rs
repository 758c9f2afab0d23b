use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub billing: BillingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub seat_hold_seconds: u64,
    pub rate_limit_per_minute: i64,
    #[serde(default = "default_commission_rate")]
    pub default_commission_rate: i32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_commission_rate() -> i32 { 10 }
fn default_currency() -> String { "BRL".into() }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: 600,
            rate_limit_per_minute: 120,
            default_commission_rate: default_commission_rate(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Without brokers, domain events are only logged.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    pub plan: String,
    pub amount_cents: i64,
    pub portal_url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `ROTEIRO__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("ROTEIRO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    const MINIMAL: &str = r#"
        [server]
        port = 9000
        [database]
        url = "postgres://localhost/roteiro"
        [redis]
        url = "redis://localhost"
        [auth]
        jwt_secret = "s"
        jwt_expiration_seconds = 60
        [business_rules]
        seat_hold_seconds = 300
        rate_limit_per_minute = 30
        [billing]
        plan = "Basic"
        amount_cents = 9900
        portal_url = "https://billing.test/portal"
    "#;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let cfg = parse(MINIMAL);
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert_eq!(cfg.database.max_connections, 5);
        assert!(cfg.kafka.brokers.is_none());
        assert_eq!(cfg.business_rules.default_commission_rate, 10);
        assert_eq!(cfg.business_rules.currency, "BRL");
    }

    #[test]
    fn memory_backend_is_selectable() {
        let cfg = parse(&format!("{MINIMAL}\n[storage]\nbackend = \"memory\"\n"));
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    }
}
