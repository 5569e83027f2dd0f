//! # Twilio Messaging Service Backend
//!
//! Sends through a Twilio Messaging Service. Twilio picks the sender and
//! handles segmentation and encoding, so the adapter posts one logical message
//! per send.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsgate_core::{
    fallback_id, CredentialResolver, CredentialSet, CredentialSource, FieldSpec, GatewayError,
    NotificationRequest, ProviderFactory, ProviderIdentity, SecretStore, SendResponse, SmsError,
    SmsProvider,
};
use tracing::{debug, info};

pub const PROVIDER: ProviderIdentity = ProviderIdentity::new("twilio");

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Configuration of the Twilio backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioSettings {
    #[serde(default)]
    pub account_sid: CredentialSource,
    #[serde(default)]
    pub auth_token: CredentialSource,
    #[serde(default)]
    pub messaging_service_sid: CredentialSource,
    /// API base URL; override for testing/mocking.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for TwilioSettings {
    fn default() -> Self {
        Self {
            account_sid: CredentialSource::default(),
            auth_token: CredentialSource::default(),
            messaging_service_sid: CredentialSource::default(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TwilioMessageRequest<'a> {
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "MessagingServiceSid")]
    messaging_service_sid: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    code: Option<i64>,
    message: Option<String>,
}

/// Twilio REST client bound to one account and messaging service.
#[derive(Clone, Debug)]
pub struct TwilioClient {
    credentials: CredentialSet,
    base_url: String,
    http: reqwest::Client,
}

impl TwilioClient {
    pub async fn connect(
        settings: &TwilioSettings,
        resolver: &CredentialResolver,
    ) -> Result<Self, GatewayError> {
        let credentials = resolver
            .resolve(&[
                FieldSpec::new("account_sid", &settings.account_sid),
                FieldSpec::new("auth_token", &settings.auth_token),
                FieldSpec::new("messaging_service_sid", &settings.messaging_service_sid),
            ])
            .await?;
        Ok(Self::with_base_url(credentials, settings.base_url.clone()))
    }

    pub fn new<S: Into<String>>(
        account_sid: S,
        auth_token: S,
        messaging_service_sid: S,
    ) -> Result<Self, GatewayError> {
        let credentials = CredentialSet::new(
            PROVIDER,
            [
                ("account_sid", account_sid.into()),
                ("auth_token", auth_token.into()),
                ("messaging_service_sid", messaging_service_sid.into()),
            ],
        )?;
        Ok(Self::with_base_url(credentials, default_base_url()))
    }

    pub fn with_base_url(credentials: CredentialSet, base_url: String) -> Self {
        Self {
            credentials,
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.credentials.get("account_sid")
        )
    }

    fn message<'a>(&'a self, req: &NotificationRequest<'a>) -> TwilioMessageRequest<'a> {
        TwilioMessageRequest {
            to: req.destination(),
            messaging_service_sid: self.credentials.get("messaging_service_sid"),
            body: req.message,
        }
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> SmsError {
    let detail = serde_json::from_str::<TwilioErrorResponse>(body)
        .ok()
        .and_then(|e| {
            e.message
                .map(|m| format!("{} (code {})", m, e.code.unwrap_or_default()))
        })
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => SmsError::Auth(detail),
        400 | 404 => SmsError::Invalid(detail),
        _ => SmsError::Provider(format!("HTTP {}: {}", status, detail)),
    }
}

#[async_trait]
impl SmsProvider for TwilioClient {
    fn identity(&self) -> ProviderIdentity {
        PROVIDER
    }

    async fn deliver(&self, req: &NotificationRequest<'_>) -> Result<SendResponse, SmsError> {
        let message = self.message(req);
        debug!(?message, "creating Twilio message");

        let res = self
            .http
            .post(self.messages_url())
            .basic_auth(
                self.credentials.get("account_sid"),
                Some(self.credentials.get("auth_token")),
            )
            .form(&message)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        info!(%status, response = %body, "Twilio responded");

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let raw: serde_json::Value =
            serde_json::from_str(&body).unwrap_or_else(|_| serde_json::json!({ "raw": body }));
        let id = raw
            .get("sid")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(fallback_id);

        Ok(SendResponse::new(id, PROVIDER, raw))
    }
}

#[derive(Clone)]
pub struct TwilioFactory {
    settings: TwilioSettings,
    store: Option<Arc<dyn SecretStore>>,
}

impl TwilioFactory {
    pub fn new(settings: TwilioSettings, store: Option<Arc<dyn SecretStore>>) -> Self {
        Self { settings, store }
    }
}

#[async_trait]
impl ProviderFactory for TwilioFactory {
    fn identity(&self) -> ProviderIdentity {
        PROVIDER
    }

    async fn create(&self) -> Result<Arc<dyn SmsProvider>, GatewayError> {
        let resolver = CredentialResolver::new(PROVIDER, self.store.clone());
        let client = TwilioClient::connect(&self.settings, &resolver).await?;
        Ok(Arc::new(client))
    }
}
