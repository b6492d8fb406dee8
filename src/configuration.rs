use std::str::FromStr;

use config::{Config, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::field_attributes::{
    deserialize_number_from_string, deserialize_option_number_from_string,
};
use sqlx::ConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;

#[derive(Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    #[serde(default)]
    pub payments: Option<PaymentSettings>,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(serde::Deserialize)]
pub struct ApplicationSettings {
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    /// Public origin used to build provider callback URLs.
    pub base_url: String,

    /// Signs session tokens.
    pub secret_key: SecretString,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub session_ttl_hours: i64,

    /// Subscriptions a non-premium account may hold. `null` disables the cap.
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub free_tier_limit: Option<i64>,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub due_soon_window_days: u32,

    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(serde::Deserialize)]
pub struct DatabaseSettings {
    /// `sqlite://path/to/file.db` or `sqlite::memory:`.
    pub url: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        Ok(SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .log_statements(tracing_log::log::LevelFilter::Trace))
    }
}

#[derive(serde::Deserialize)]
pub struct PaymentSettings {
    pub secret_key: SecretString,
    #[serde(default)]
    pub publishable_key: String,
    pub price_id: String,
    #[serde(default = "default_payments_api")]
    pub api_base: String,
}

fn default_payments_api() -> String {
    "https://api.stripe.com".to_string()
}

impl PaymentSettings {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().trim().is_empty() && !self.price_id.trim().is_empty()
    }
}

#[derive(serde::Deserialize, Default)]
pub struct TelemetrySettings {
    /// OTLP gRPC collector. Spans are only exported when this is set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn to_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {e}"))
    })?;
    let configuration_directory = base_path.join("configurations");
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base")))
        .add_source(File::from(
            configuration_directory.join(environment.to_str()),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"), // APP_DATABASE__URL sets database.url
        );

    settings.build()?.try_deserialize()
}
