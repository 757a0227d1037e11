use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub kafka: KafkaSettings,
    pub gateway: GatewaySettings,
    pub worker: WorkerSettings,
    pub application: ApplicationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSettings {
    pub enabled: bool,
    pub brokers: String,
    pub topic: String,
}

/// Merchant-side configuration for the payment gateway family.
///
/// Credentials are supplied here (file or environment layer), never
/// hard-coded at call sites.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Operator tag, also the prefix of generated external references.
    pub name: String,
    pub api_key: String,
    pub site_id: String,
    /// Shared secret used for webhook signature verification.
    pub secret_key: String,
    pub api_url: String,
    pub check_url: String,
    pub notify_url: String,
    pub return_url: String,
    /// Header carrying the webhook signature, per gateway family.
    pub signature_header: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub poll_interval_secs: u64,
    pub batch_size: usize,
    pub first_check_delay_secs: u64,
    pub recheck_delay_secs: u64,
    pub unavailable_backoff_secs: u64,
    pub lease_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
