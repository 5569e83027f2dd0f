use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{GatewayError, SmsProvider};

/// Holds the single adapter built for the gateway's lifetime.
///
/// Concurrent first callers wait for one in-flight construction. A failed
/// construction stores nothing, so the next call starts over.
#[derive(Default)]
pub struct GatewayCell {
    provider: OnceCell<Arc<dyn SmsProvider>>,
}

impl GatewayCell {
    pub fn new() -> Self {
        Self {
            provider: OnceCell::new(),
        }
    }

    pub async fn get_or_create<F, Fut>(
        &self,
        create: F,
    ) -> Result<Arc<dyn SmsProvider>, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn SmsProvider>, GatewayError>>,
    {
        self.provider.get_or_try_init(create).await.cloned()
    }

    /// The cached adapter, if construction has already succeeded.
    pub fn get(&self) -> Option<Arc<dyn SmsProvider>> {
        self.provider.get().cloned()
    }
}
