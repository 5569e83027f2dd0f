use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use smsgate_aws_sns::AwsSnsSettings;
use smsgate_http_form::HttpFormSettings;
use smsgate_secrets_aws::AwsSecretsSettings;
use smsgate_twilio::TwilioSettings;
use std::env;

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Secret store holding provider credentials; absent means static values only
    #[serde(default)]
    pub secret_store: Option<AwsSecretsSettings>,
    /// SMS providers configuration
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// SMS providers configuration.
///
/// A provider counts as installed when its section is present. Selection
/// order is `http_form`, `twilio`, `aws_sns`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    /// Form-post carrier configuration
    #[serde(default)]
    pub http_form: Option<HttpFormSettings>,
    /// Twilio Messaging Service configuration
    #[serde(default)]
    pub twilio: Option<TwilioSettings>,
    /// AWS SNS configuration
    #[serde(default)]
    pub aws_sns: Option<AwsSnsSettings>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level or filter directive (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables, e.g. SMSGATE__PROVIDERS__HTTP_FORM__ENDPOINT
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }

    /// Parse configuration from a TOML document, on top of the defaults.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SMSGATE").separator("__")
}
