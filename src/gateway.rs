//! Wiring from [`AppConfig`] to a ready [`Dispatcher`].

use std::sync::Arc;

use smsgate_aws_sns::AwsSnsFactory;
use smsgate_core::{Dispatcher, ProviderRegistry, SecretStore};
use smsgate_http_form::HttpFormFactory;
use smsgate_secrets_aws::AwsSecretsManagerStore;
use smsgate_twilio::TwilioFactory;
use tracing::{info, warn};

use crate::config::{AppConfig, ProvidersConfig};

/// Secret store described by the configuration, if any.
pub async fn secret_store(config: &AppConfig) -> Option<Arc<dyn SecretStore>> {
    let settings = config.secret_store.as_ref()?;
    info!(secret_id = %settings.secret_id, "using AWS Secrets Manager for credentials");
    let store: Arc<dyn SecretStore> =
        Arc::new(AwsSecretsManagerStore::from_settings(settings).await);
    Some(store)
}

/// Register every configured provider, in the fixed discovery order.
pub fn registry(
    providers: &ProvidersConfig,
    store: Option<Arc<dyn SecretStore>>,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    if let Some(settings) = &providers.http_form {
        registry = registry.with(Arc::new(HttpFormFactory::new(
            settings.clone(),
            store.clone(),
        )));
    }
    if let Some(settings) = &providers.twilio {
        registry = registry.with(Arc::new(TwilioFactory::new(
            settings.clone(),
            store.clone(),
        )));
    }
    if let Some(settings) = &providers.aws_sns {
        registry = registry.with(Arc::new(AwsSnsFactory::new(settings.clone(), store)));
    }

    if registry.is_empty() {
        warn!("no SMS provider configured; sending will fail");
    } else {
        info!(providers = ?registry.identities(), "SMS providers installed");
    }
    registry
}

/// Dispatcher using the given secret store instead of the configured one.
///
/// Like [`dispatcher`], every call returns a dispatcher with a fresh adapter cell.
pub fn dispatcher_with_store(
    config: &AppConfig,
    store: Option<Arc<dyn SecretStore>>,
) -> Dispatcher {
    Dispatcher::new(registry(&config.providers, store))
}

/// Dispatcher for the configured providers and secret store.
///
/// Every call returns a dispatcher with a fresh adapter cell, so the adapter is
/// only shared across the process if the caller builds one dispatcher at
/// startup and clones it wherever messages are sent.
pub async fn dispatcher(config: &AppConfig) -> Dispatcher {
    let store = secret_store(config).await;
    dispatcher_with_store(config, store)
}
