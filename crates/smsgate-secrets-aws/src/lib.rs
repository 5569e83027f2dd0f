//! AWS Secrets Manager backed [`SecretStore`].
//!
//! The configured secret must hold a JSON object; each credential's
//! `secret_key` names a top-level property of that object.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::Client;
use serde::{Deserialize, Serialize};
use smsgate_core::{SecretDocument, SecretStore, SecretStoreError};
use tracing::{debug, error};

/// Which secret to read, and where.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AwsSecretsSettings {
    /// Secret name or ARN.
    pub secret_id: String,
    /// Region override; the default AWS chain is used when absent.
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AwsSecretsManagerStore {
    client: Client,
    secret_id: String,
}

impl AwsSecretsManagerStore {
    /// Build a store using the default AWS credential chain.
    pub async fn from_settings(settings: &AwsSecretsSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = settings.region.clone().filter(|r| !r.trim().is_empty()) {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        Self::with_client(Client::new(&config), settings.secret_id.clone())
    }

    pub fn with_client(client: Client, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
        }
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    async fn get_secret(&self) -> Result<SecretDocument, SecretStoreError> {
        debug!(secret_id = %self.secret_id, "fetching secret");
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| {
                error!(secret_id = %self.secret_id, error = %e, "GetSecretValue failed");
                SecretStoreError::Unavailable(e.to_string())
            })?;

        let raw = output.secret_string().ok_or_else(|| {
            SecretStoreError::Malformed(format!("secret {} has no string value", self.secret_id))
        })?;
        SecretDocument::from_json_str(raw)
    }
}
