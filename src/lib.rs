//! # SMS Gateway
//!
//! Pluggable outbound SMS for services: one call site, one carrier chosen at
//! startup, credentials pulled from configuration or a secret store.
//!
//! ## Features
//!
//! - **Interchangeable carriers**: form-post HTTP carrier, Twilio Messaging Service, AWS SNS
//! - **Lazy selection**: the first configured provider is built on first use and reused
//! - **Credential indirection**: every credential field may come from AWS Secrets Manager
//! - **Fail fast**: blank credentials stop the gateway before any message is sent
//! - **Observability**: structured logging of payloads and carrier responses
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smsgate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     smsgate::telemetry::init(&config.logging)?;
//!
//!     let dispatcher = smsgate::gateway::dispatcher(&config).await;
//!     dispatcher.send_message(true, "+1", "5550001111", "Hello from smsgate!").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [secret_store]
//! secret_id = "prod/sms"
//!
//! [providers.http_form]
//! endpoint = "https://sms.example.com/send"
//! username = { value = "acme" }
//! password = { secret_key = "sms_password" }
//! sender_id = { value = "ACME" }
//! ```

pub mod config;
pub mod gateway;
pub mod telemetry;

pub use crate::config::*;

/// Common imports for smsgate usage
pub mod prelude {
    pub use crate::config::{AppConfig, LoggingConfig, ProvidersConfig};
    pub use smsgate_aws_sns::{AwsSnsClient, AwsSnsSettings};
    pub use smsgate_core::*;
    pub use smsgate_http_form::{HttpFormClient, HttpFormSettings};
    pub use smsgate_secrets_aws::{AwsSecretsManagerStore, AwsSecretsSettings};
    pub use smsgate_twilio::{TwilioClient, TwilioSettings};
}
