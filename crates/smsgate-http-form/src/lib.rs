//! # HTTP Form Carrier
//!
//! Carrier backend that posts a form-encoded request to a fixed endpoint.
//! The request carries an explicit `maxsplit` segment count so the carrier
//! knows how many 160-character parts it may split the message into.
//!
//! ## Example
//!
//! ```rust,ignore
//! use smsgate_core::{CredentialResolver, CredentialSource};
//! use smsgate_http_form::{HttpFormClient, HttpFormSettings, PROVIDER};
//!
//! let settings = HttpFormSettings {
//!     endpoint: "https://sms.example.com/send".into(),
//!     username: CredentialSource::value("acme"),
//!     password: CredentialSource::secret("sms_password"),
//!     sender_id: CredentialSource::value("ACME"),
//! };
//! let resolver = CredentialResolver::new(PROVIDER, store);
//! let client = HttpFormClient::connect(&settings, &resolver).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsgate_core::{
    fallback_id, CredentialResolver, CredentialSet, CredentialSource, FieldSpec, GatewayError,
    NotificationRequest, ProviderFactory, ProviderIdentity, SecretStore, SendResponse, SmsError,
    SmsProvider,
};
use tracing::{debug, info};

pub const PROVIDER: ProviderIdentity = ProviderIdentity::new("http-form");

/// UTF-16 code units per billed segment.
pub const SEGMENT_LENGTH: usize = 160;

const DELAY: &str = "0";
const CONTENT_TYPE: &str = "UTF-8";

/// Number of segments announced for a message: `len / 160 + 1`, so never zero.
///
/// Length is measured in UTF-16 code units, the unit carriers split on, so a
/// character outside the Basic Multilingual Plane counts twice.
pub fn segment_count(message: &str) -> usize {
    message.encode_utf16().count() / SEGMENT_LENGTH + 1
}

/// Configuration of the form carrier.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HttpFormSettings {
    /// Fixed URL the form is posted to.
    pub endpoint: String,
    #[serde(default)]
    pub username: CredentialSource,
    #[serde(default)]
    pub password: CredentialSource,
    #[serde(default)]
    pub sender_id: CredentialSource,
}

#[derive(Debug, Clone, Serialize)]
struct HttpFormPayload<'a> {
    username: &'a str,
    password: &'a str,
    from: &'a str,
    to: String,
    message: &'a str,
    delay: &'static str,
    maxsplit: String,
    #[serde(rename = "Content-Type")]
    content_type: &'static str,
}

/// Form-post carrier client.
#[derive(Clone, Debug)]
pub struct HttpFormClient {
    credentials: CredentialSet,
    http: reqwest::Client,
}

impl HttpFormClient {
    /// Resolve credentials and build the client; fails if any field is blank.
    pub async fn connect(
        settings: &HttpFormSettings,
        resolver: &CredentialResolver,
    ) -> Result<Self, GatewayError> {
        let endpoint = CredentialSource::value(settings.endpoint.clone());
        let credentials = resolver
            .resolve(&[
                FieldSpec::new("endpoint", &endpoint),
                FieldSpec::new("username", &settings.username),
                FieldSpec::new("password", &settings.password),
                FieldSpec::new("sender_id", &settings.sender_id),
            ])
            .await?;
        Ok(Self::from_credentials(credentials))
    }

    pub fn new<S: Into<String>>(
        endpoint: S,
        username: S,
        password: S,
        sender_id: S,
    ) -> Result<Self, GatewayError> {
        let credentials = CredentialSet::new(
            PROVIDER,
            [
                ("endpoint", endpoint.into()),
                ("username", username.into()),
                ("password", password.into()),
                ("sender_id", sender_id.into()),
            ],
        )?;
        Ok(Self::from_credentials(credentials))
    }

    fn from_credentials(credentials: CredentialSet) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.credentials.get("endpoint")
    }

    fn payload<'a>(&'a self, req: &NotificationRequest<'a>) -> HttpFormPayload<'a> {
        HttpFormPayload {
            username: self.credentials.get("username"),
            password: self.credentials.get("password"),
            from: self.credentials.get("sender_id"),
            to: req.destination(),
            message: req.message,
            delay: DELAY,
            maxsplit: segment_count(req.message).to_string(),
            content_type: CONTENT_TYPE,
        }
    }
}

#[async_trait]
impl SmsProvider for HttpFormClient {
    fn identity(&self) -> ProviderIdentity {
        PROVIDER
    }

    async fn deliver(&self, req: &NotificationRequest<'_>) -> Result<SendResponse, SmsError> {
        let payload = self.payload(req);
        let redacted = HttpFormPayload {
            password: "<redacted>",
            ..payload.clone()
        };
        debug!(
            endpoint = self.endpoint(),
            payload = %serde_urlencoded::to_string(&redacted).unwrap_or_default(),
            "posting SMS form"
        );

        let res = self
            .http
            .post(self.endpoint())
            .form(&payload)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        info!(%status, response = %body, "SMS form carrier responded");

        if !status.is_success() {
            return Err(SmsError::Provider(format!("HTTP {}: {}", status, body)));
        }

        Ok(SendResponse::new(
            fallback_id(),
            PROVIDER,
            serde_json::json!({ "status": status.as_u16(), "body": body }),
        ))
    }
}

/// Builds an [`HttpFormClient`] from settings on first use.
#[derive(Clone)]
pub struct HttpFormFactory {
    settings: HttpFormSettings,
    store: Option<Arc<dyn SecretStore>>,
}

impl HttpFormFactory {
    pub fn new(settings: HttpFormSettings, store: Option<Arc<dyn SecretStore>>) -> Self {
        Self { settings, store }
    }
}

#[async_trait]
impl ProviderFactory for HttpFormFactory {
    fn identity(&self) -> ProviderIdentity {
        PROVIDER
    }

    async fn create(&self) -> Result<Arc<dyn SmsProvider>, GatewayError> {
        let resolver = CredentialResolver::new(PROVIDER, self.store.clone());
        let client = HttpFormClient::connect(&self.settings, &resolver).await?;
        Ok(Arc::new(client))
    }
}
