//! # SMS Gateway Core
//!
//! Core traits and types for the smsgate pluggable SMS gateway.
//!
//! This crate provides the building blocks every carrier backend plugs into:
//! - [`SmsProvider`] trait implemented by each carrier adapter
//! - [`CredentialResolver`] for secret-store or statically configured credentials
//! - [`ProviderRegistry`] listing the installed provider factories in discovery order
//! - [`GatewayCell`] holding the one adapter built for the process
//! - [`Dispatcher`], the single entry point the application calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use smsgate_core::{Dispatcher, ProviderRegistry};
//!
//! let dispatcher = Dispatcher::new(ProviderRegistry::new().with(factory));
//! dispatcher.send_message(true, "+1", "5550001111", "Hello world!").await?;
//! ```

pub mod credentials;
pub mod dispatcher;
pub mod registry;
pub mod singleton;

pub use credentials::{
    CredentialResolver, CredentialSet, CredentialSource, FieldSpec, SecretDocument, SecretStore,
    SecretStoreError, StaticSecretStore,
};
pub use dispatcher::Dispatcher;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use singleton::GatewayCell;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Errors raised by a carrier call. These are per-call and recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// HTTP communication error
    #[error("http error: {0}")]
    Http(String),
    /// Authentication/authorization error
    #[error("authentication error: {0}")]
    Auth(String),
    /// Invalid request parameters
    #[error("invalid request: {0}")]
    Invalid(String),
    /// SMS provider returned an error
    #[error("provider error: {0}")]
    Provider(String),
    /// Unexpected error occurred
    #[error("unexpected: {0}")]
    Unexpected(String),
}

/// Errors surfaced by the gateway.
///
/// `Configuration`, `SecretStore` and `NoProviderInstalled` are raised while the
/// adapter is being built on first use; `Transport` wraps a failed carrier call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("provider {provider} is missing required credential(s): {}", .fields.join(", "))]
    Configuration {
        provider: ProviderIdentity,
        fields: Vec<String>,
    },
    #[error("secret store lookup failed for provider {provider}: {reason}")]
    SecretStore {
        provider: ProviderIdentity,
        reason: String,
    },
    #[error("no SMS provider installed")]
    NoProviderInstalled,
    #[error("transport error: {0}")]
    Transport(#[from] SmsError),
}

/// Stable name of a carrier backend, e.g. "twilio".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProviderIdentity(&'static str);

impl ProviderIdentity {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A single outbound text message.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NotificationRequest<'a> {
    /// When false the send is skipped without touching the network.
    pub enabled: bool,
    pub country_code: &'a str,
    pub number: &'a str,
    pub message: &'a str,
}

impl<'a> NotificationRequest<'a> {
    pub fn new(enabled: bool, country_code: &'a str, number: &'a str, message: &'a str) -> Self {
        Self {
            enabled,
            country_code,
            number,
            message,
        }
    }

    /// Destination as sent to carriers: country code followed by the number.
    pub fn destination(&self) -> String {
        format!("{}{}", self.country_code, self.number)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    pub id: String,
    /// Name of the backend/provider that produced the response, e.g. "twilio".
    pub provider: ProviderIdentity,
    /// Raw provider payload for debugging / audit.
    pub raw: serde_json::Value,
    pub sent_at: OffsetDateTime,
}

impl SendResponse {
    pub fn new(id: String, provider: ProviderIdentity, raw: serde_json::Value) -> Self {
        Self {
            id,
            provider,
            raw,
            sent_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Carrier adapter behind the uniform send contract.
///
/// Implementors provide [`SmsProvider::deliver`]; callers go through
/// [`SmsProvider::send_message`], which skips disabled requests and logs
/// failures before returning them.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    fn identity(&self) -> ProviderIdentity;

    /// Perform exactly one carrier call for an enabled request.
    async fn deliver(&self, req: &NotificationRequest<'_>) -> Result<SendResponse, SmsError>;

    /// Send a message, or do nothing when `req.enabled` is false.
    async fn send_message(
        &self,
        req: NotificationRequest<'_>,
    ) -> Result<Option<SendResponse>, SmsError> {
        let provider = self.identity();
        if !req.enabled {
            debug!(%provider, "SMS sending disabled, skipping");
            return Ok(None);
        }

        match self.deliver(&req).await {
            Ok(res) => {
                info!(%provider, id = %res.id, "SMS accepted by carrier");
                Ok(Some(res))
            }
            Err(e) => {
                error!(
                    %provider,
                    to = %req.destination(),
                    message_len = req.message.chars().count(),
                    error = %e,
                    "SMS delivery failed"
                );
                Err(e)
            }
        }
    }
}

/// Utility to create a pseudo id if a provider doesn't return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}
