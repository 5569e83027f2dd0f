//! Public entry point of the gateway.

use std::sync::Arc;

use tracing::info;

use crate::{
    GatewayCell, GatewayError, NotificationRequest, ProviderRegistry, SendResponse, SmsProvider,
};

/// Forwards every send to the lazily built provider adapter.
///
/// The first call selects the first installed provider and builds it; every
/// later call, from any task, reuses that adapter. Clones share the same cell.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ProviderRegistry,
    cell: Arc<GatewayCell>,
}

impl Dispatcher {
    /// Dispatcher with its own, still empty, adapter cell.
    ///
    /// Each call creates a separate cell, so two dispatchers built from the
    /// same registry build two adapters. Create one per process and clone it.
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            cell: Arc::new(GatewayCell::new()),
        }
    }

    /// The process-wide adapter, built on first use.
    pub async fn provider(&self) -> Result<Arc<dyn SmsProvider>, GatewayError> {
        self.cell
            .get_or_create(|| async {
                let factory = self.registry.select_first_available()?;
                info!(provider = %factory.identity(), "initialising SMS provider");
                factory.create().await
            })
            .await
    }

    pub async fn send_message(
        &self,
        enabled: bool,
        country_code: &str,
        number: &str,
        message: &str,
    ) -> Result<Option<SendResponse>, GatewayError> {
        self.send(NotificationRequest::new(enabled, country_code, number, message))
            .await
    }

    pub async fn send(
        &self,
        req: NotificationRequest<'_>,
    ) -> Result<Option<SendResponse>, GatewayError> {
        let provider = self.provider().await?;
        Ok(provider.send_message(req).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fallback_id, CredentialResolver, CredentialSource, FieldSpec, ProviderFactory,
        ProviderIdentity, SmsError, StaticSecretStore,
    };
    use async_trait::async_trait;
    use futures::future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PROVIDER: ProviderIdentity = ProviderIdentity::new("recording");

    #[derive(Default)]
    struct Calls {
        builds: AtomicUsize,
        sends: AtomicUsize,
    }

    struct Recording {
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl SmsProvider for Recording {
        fn identity(&self) -> ProviderIdentity {
            PROVIDER
        }

        async fn deliver(&self, req: &NotificationRequest<'_>) -> Result<SendResponse, SmsError> {
            self.calls.sends.fetch_add(1, Ordering::SeqCst);
            if req.number == "fail" {
                return Err(SmsError::Provider("rejected".into()));
            }
            Ok(SendResponse::new(
                fallback_id(),
                PROVIDER,
                serde_json::json!({ "to": req.destination() }),
            ))
        }
    }

    struct RecordingFactory {
        calls: Arc<Calls>,
        password: CredentialSource,
    }

    #[async_trait]
    impl ProviderFactory for RecordingFactory {
        fn identity(&self) -> ProviderIdentity {
            PROVIDER
        }

        async fn create(&self) -> Result<Arc<dyn SmsProvider>, GatewayError> {
            self.calls.builds.fetch_add(1, Ordering::SeqCst);
            let store = StaticSecretStore::from_value(serde_json::json!({ "pw": "s3cret" }))
                .map_err(|e| GatewayError::SecretStore {
                    provider: PROVIDER,
                    reason: e.to_string(),
                })?;
            CredentialResolver::new(PROVIDER, Some(Arc::new(store)))
                .resolve(&[FieldSpec::new("password", &self.password)])
                .await?;
            Ok(Arc::new(Recording {
                calls: self.calls.clone(),
            }))
        }
    }

    fn dispatcher(password: CredentialSource) -> (Dispatcher, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let registry = ProviderRegistry::new().with(Arc::new(RecordingFactory {
            calls: calls.clone(),
            password,
        }));
        (Dispatcher::new(registry), calls)
    }

    #[tokio::test]
    async fn sequential_sends_reuse_one_adapter() {
        let (dispatcher, calls) = dispatcher(CredentialSource::secret("pw"));

        let first = dispatcher.provider().await.ok().unwrap();
        dispatcher
            .send_message(true, "+1", "5550001111", "Hello")
            .await
            .unwrap();
        dispatcher
            .send_message(true, "+1", "5550002222", "Again")
            .await
            .unwrap();
        let second = dispatcher.provider().await.ok().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.builds.load(Ordering::SeqCst), 1);
        assert_eq!(calls.sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_sends_build_once() {
        let (dispatcher, calls) = dispatcher(CredentialSource::secret("pw"));

        let sends = (0..20).map(|i| {
            let dispatcher = dispatcher.clone();
            async move {
                let number = format!("55500{i:05}");
                dispatcher.send_message(true, "+1", &number, "hi").await
            }
        });
        let results = future::join_all(sends).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(calls.builds.load(Ordering::SeqCst), 1);
        assert_eq!(calls.sends.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn clones_share_the_adapter_but_new_dispatchers_do_not() {
        let calls = Arc::new(Calls::default());
        let registry = ProviderRegistry::new().with(Arc::new(RecordingFactory {
            calls: calls.clone(),
            password: CredentialSource::secret("pw"),
        }));
        let shared = Dispatcher::new(registry.clone());
        let clone = shared.clone();
        let separate = Dispatcher::new(registry);

        let a = shared.provider().await.ok().unwrap();
        let b = clone.provider().await.ok().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.builds.load(Ordering::SeqCst), 1);

        let c = separate.provider().await.ok().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(calls.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_send_makes_no_carrier_call() {
        let (dispatcher, calls) = dispatcher(CredentialSource::secret("pw"));

        let res = dispatcher
            .send_message(false, "+1", "5550001111", "ignored")
            .await
            .unwrap();
        assert!(res.is_none());
        assert_eq!(calls.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_send() {
        let (dispatcher, calls) = dispatcher(CredentialSource::default());

        for _ in 0..2 {
            let err = dispatcher
                .send_message(true, "+1", "5550001111", "Hello")
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::Configuration { .. }));
        }
        assert_eq!(calls.builds.load(Ordering::SeqCst), 2);
        assert_eq!(calls.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_registry_is_fatal() {
        let dispatcher = Dispatcher::new(ProviderRegistry::new());
        let err = dispatcher
            .send_message(true, "+1", "5550001111", "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NoProviderInstalled));
    }

    #[tokio::test]
    async fn transport_failures_are_propagated() {
        let (dispatcher, _) = dispatcher(CredentialSource::secret("pw"));
        let err = dispatcher
            .send_message(true, "+1", "fail", "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(SmsError::Provider(_))));
    }
}
