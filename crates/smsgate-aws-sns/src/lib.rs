//! # AWS SNS Backend
//!
//! Publishes SMS directly to a phone number through Amazon SNS. SNS handles
//! segmentation and encoding itself; messages are sent as `Transactional`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use smsgate_aws_sns::AwsSnsClient;
//!
//! let client = AwsSnsClient::new("us-east-1", "access_key", "secret_key", None)?;
//! client.send_message(NotificationRequest::new(true, "+1", "5550001111", "Hello")).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::operation::publish::PublishError;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::{config::Credentials, Client as SnsClient, Config as SnsConfig};
use serde::{Deserialize, Serialize};
use smsgate_core::{
    fallback_id, CredentialResolver, CredentialSet, CredentialSource, FieldSpec, GatewayError,
    NotificationRequest, ProviderFactory, ProviderIdentity, SecretStore, SendResponse, SmsError,
    SmsProvider,
};
use tracing::{debug, error, info};

pub const PROVIDER: ProviderIdentity = ProviderIdentity::new("aws-sns");

const SMS_TYPE: &str = "Transactional";

/// Configuration of the SNS backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AwsSnsSettings {
    #[serde(default)]
    pub access_key_id: CredentialSource,
    #[serde(default)]
    pub secret_access_key: CredentialSource,
    #[serde(default)]
    pub region: CredentialSource,
    /// Alphanumeric sender ID, where the destination country supports one.
    #[serde(default)]
    pub sender_id: Option<String>,
    /// Endpoint override, e.g. a LocalStack URL.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// AWS SNS SMS client
#[derive(Debug, Clone)]
pub struct AwsSnsClient {
    client: SnsClient,
    region: String,
    sender_id: Option<String>,
}

impl AwsSnsClient {
    pub async fn connect(
        settings: &AwsSnsSettings,
        resolver: &CredentialResolver,
    ) -> Result<Self, GatewayError> {
        let credentials = resolver
            .resolve(&[
                FieldSpec::new("access_key_id", &settings.access_key_id),
                FieldSpec::new("secret_access_key", &settings.secret_access_key),
                FieldSpec::new("region", &settings.region),
            ])
            .await?;
        let client = Self::from_credentials(&credentials, settings.sender_id.clone());
        Ok(match settings.endpoint_url.as_deref() {
            Some(url) if !url.trim().is_empty() => client.with_endpoint_url(url),
            _ => client,
        })
    }

    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        sender_id: Option<String>,
    ) -> Result<Self, GatewayError> {
        let credentials = CredentialSet::new(
            PROVIDER,
            [
                ("access_key_id", access_key_id.into()),
                ("secret_access_key", secret_access_key.into()),
                ("region", region.into()),
            ],
        )?;
        Ok(Self::from_credentials(&credentials, sender_id))
    }

    fn from_credentials(credentials: &CredentialSet, sender_id: Option<String>) -> Self {
        let region = credentials.get("region").to_string();
        let aws_credentials = Credentials::new(
            credentials.get("access_key_id"),
            credentials.get("secret_access_key"),
            None,
            None,
            "smsgate",
        );

        let config = SnsConfig::builder()
            .region(Region::new(region.clone()))
            .credentials_provider(aws_credentials)
            .behavior_version(BehaviorVersion::latest())
            .build();

        Self {
            client: SnsClient::from_conf(config),
            region,
            sender_id: sender_id.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Send to `url` instead of the regional SNS endpoint.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        let config = self.client.config().to_builder().endpoint_url(url).build();
        self.client = SnsClient::from_conf(config);
        self
    }

    fn message_attributes(&self) -> Result<HashMap<String, MessageAttributeValue>, SmsError> {
        let mut attributes = HashMap::new();
        attributes.insert(
            "AWS.SNS.SMS.SMSType".to_string(),
            string_attribute(SMS_TYPE)?,
        );
        if let Some(sender) = &self.sender_id {
            attributes.insert("AWS.SNS.SMS.SenderID".to_string(), string_attribute(sender)?);
        }
        Ok(attributes)
    }
}

fn string_attribute(value: &str) -> Result<MessageAttributeValue, SmsError> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(value)
        .build()
        .map_err(|e| SmsError::Provider(format!("failed to build message attribute: {}", e)))
}

#[async_trait]
impl SmsProvider for AwsSnsClient {
    fn identity(&self) -> ProviderIdentity {
        PROVIDER
    }

    async fn deliver(&self, req: &NotificationRequest<'_>) -> Result<SendResponse, SmsError> {
        let destination = req.destination();
        let attributes = self.message_attributes()?;
        debug!(
            to = %destination,
            message = req.message,
            region = %self.region,
            ?attributes,
            "publishing SMS via AWS SNS"
        );

        let result = self
            .client
            .publish()
            .phone_number(&destination)
            .message(req.message)
            .set_message_attributes(Some(attributes))
            .send()
            .await
            .map_err(|e| {
                error!("AWS SNS publish failed: {}", e);
                match e.into_service_error() {
                    PublishError::AuthorizationErrorException(_) => {
                        SmsError::Auth("AWS authorization failed".to_string())
                    }
                    PublishError::InvalidParameterException(e) => {
                        SmsError::Invalid(e.message().unwrap_or("Invalid parameter").to_string())
                    }
                    PublishError::InvalidParameterValueException(e) => SmsError::Invalid(
                        e.message().unwrap_or("Invalid parameter value").to_string(),
                    ),
                    e => SmsError::Provider(format!("AWS SNS error: {}", e)),
                }
            })?;

        info!(?result, "AWS SNS accepted SMS");

        let raw = serde_json::json!({
            "MessageId": result.message_id(),
            "SequenceNumber": result.sequence_number(),
        });
        let message_id = result
            .message_id()
            .map(|id| id.to_string())
            .unwrap_or_else(fallback_id);
        Ok(SendResponse::new(message_id, PROVIDER, raw))
    }
}

#[derive(Clone)]
pub struct AwsSnsFactory {
    settings: AwsSnsSettings,
    store: Option<Arc<dyn SecretStore>>,
}

impl AwsSnsFactory {
    pub fn new(settings: AwsSnsSettings, store: Option<Arc<dyn SecretStore>>) -> Self {
        Self { settings, store }
    }
}

#[async_trait]
impl ProviderFactory for AwsSnsFactory {
    fn identity(&self) -> ProviderIdentity {
        PROVIDER
    }

    async fn create(&self) -> Result<Arc<dyn SmsProvider>, GatewayError> {
        let resolver = CredentialResolver::new(PROVIDER, self.store.clone());
        let client = AwsSnsClient::connect(&self.settings, &resolver).await?;
        Ok(Arc::new(client))
    }
}
