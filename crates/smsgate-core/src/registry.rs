//! Installed provider factories, in discovery order.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{GatewayError, ProviderIdentity, SmsProvider};

/// Builds one carrier adapter, resolving its credentials on the way.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    fn identity(&self) -> ProviderIdentity;

    /// Construct a fully usable adapter, or fail without producing one.
    async fn create(&self) -> Result<Arc<dyn SmsProvider>, GatewayError>;
}

/// Ordered list of installed providers. The first registered one is selected.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    factories: Arc<Vec<Arc<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: Arc::new(Vec::new()),
        }
    }

    pub fn with(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        let mut v = (*self.factories).clone();
        v.push(factory);
        self.factories = Arc::new(v);
        self
    }

    pub fn identities(&self) -> Vec<ProviderIdentity> {
        self.factories.iter().map(|f| f.identity()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn select_first_available(&self) -> Result<Arc<dyn ProviderFactory>, GatewayError> {
        self.factories
            .first()
            .cloned()
            .ok_or(GatewayError::NoProviderInstalled)
    }
}
