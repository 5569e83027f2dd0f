//! Credential resolution for provider adapters.
//!
//! Each credential field is configured as a [`CredentialSource`]: either a key
//! into the secret store document or a static value. A configured secret key
//! always wins over the static value.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::{GatewayError, ProviderIdentity};

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed secret document: {0}")]
    Malformed(String),
}

/// Where a single credential field comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CredentialSource {
    /// Top-level property name in the secret store document.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Statically configured value.
    #[serde(default)]
    pub value: Option<String>,
}

impl CredentialSource {
    pub fn secret<S: Into<String>>(key: S) -> Self {
        Self {
            secret_key: Some(key.into()),
            value: None,
        }
    }

    pub fn value<S: Into<String>>(value: S) -> Self {
        Self {
            secret_key: None,
            value: Some(value.into()),
        }
    }

    /// The secret key, if one is configured and non-blank.
    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn static_value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// One required field of a provider's credentials.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec<'a> {
    pub name: &'static str,
    pub source: &'a CredentialSource,
}

impl<'a> FieldSpec<'a> {
    pub fn new(name: &'static str, source: &'a CredentialSource) -> Self {
        Self { name, source }
    }
}

/// JSON object returned by the secret store.
#[derive(Debug, Clone, Default)]
pub struct SecretDocument(Map<String, Value>);

impl SecretDocument {
    pub fn from_value(value: Value) -> Result<Self, SecretStoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SecretStoreError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SecretStoreError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| SecretStoreError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Value of a top-level property. Strings and numbers resolve; anything else is absent.
    pub fn resolve(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// External secret-management service holding a single JSON document.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self) -> Result<SecretDocument, SecretStoreError>;
}

/// In-memory secret store, for local setups and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    document: SecretDocument,
}

impl StaticSecretStore {
    pub fn new(document: SecretDocument) -> Self {
        Self { document }
    }

    pub fn from_value(value: Value) -> Result<Self, SecretStoreError> {
        SecretDocument::from_value(value).map(Self::new)
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self) -> Result<SecretDocument, SecretStoreError> {
        Ok(self.document.clone())
    }
}

/// Resolved credentials of one provider. Every field is non-blank.
#[derive(Clone)]
pub struct CredentialSet {
    provider: ProviderIdentity,
    values: BTreeMap<&'static str, String>,
}

impl CredentialSet {
    /// Build a set from already-known values, failing if any of them is blank.
    pub fn new<I>(provider: ProviderIdentity, fields: I) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        let fields: Vec<(&'static str, String)> = fields.into_iter().collect();
        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name.to_string())
            .collect();

        if !missing.is_empty() {
            error!(%provider, fields = ?missing, "required credentials are blank");
            return Err(GatewayError::Configuration {
                provider,
                fields: missing,
            });
        }

        Ok(Self {
            provider,
            values: fields.into_iter().collect(),
        })
    }

    pub fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    /// Value of a field, or `""` for a field that was never part of the set.
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in self.values.keys() {
            map.entry(name, &"<redacted>");
        }
        map.finish()
    }
}

/// Resolves a provider's credential fields against static config and the secret store.
#[derive(Clone)]
pub struct CredentialResolver {
    provider: ProviderIdentity,
    store: Option<Arc<dyn SecretStore>>,
}

impl CredentialResolver {
    pub fn new(provider: ProviderIdentity, store: Option<Arc<dyn SecretStore>>) -> Self {
        Self { provider, store }
    }

    /// Resolve every field, fetching the secret document at most once.
    ///
    /// A field whose secret key is missing from the document resolves to blank
    /// and fails the same way as an unconfigured field.
    pub async fn resolve(&self, specs: &[FieldSpec<'_>]) -> Result<CredentialSet, GatewayError> {
        let mut document: Option<SecretDocument> = None;
        let mut values = Vec::with_capacity(specs.len());

        for spec in specs {
            let value = match spec.source.secret_key() {
                Some(key) => {
                    if document.is_none() {
                        document = Some(self.fetch_document().await?);
                    }
                    debug!(
                        provider = %self.provider,
                        field = spec.name,
                        key,
                        "credential from secret store"
                    );
                    document
                        .as_ref()
                        .and_then(|doc| doc.resolve(key))
                        .unwrap_or_default()
                }
                None => spec.source.static_value().to_string(),
            };
            values.push((spec.name, value));
        }

        let set = CredentialSet::new(self.provider, values)?;
        info!(provider = %self.provider, fields = specs.len(), "credentials resolved");
        Ok(set)
    }

    async fn fetch_document(&self) -> Result<SecretDocument, GatewayError> {
        let store = self.store.as_ref().ok_or_else(|| GatewayError::SecretStore {
            provider: self.provider,
            reason: "a secret key is configured but no secret store is available".into(),
        })?;

        store.get_secret().await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "secret store lookup failed");
            GatewayError::SecretStore {
                provider: self.provider,
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PROVIDER: ProviderIdentity = ProviderIdentity::new("test-carrier");

    struct CountingStore {
        inner: StaticSecretStore,
        fetches: AtomicUsize,
    }

    impl CountingStore {
        fn new(doc: Value) -> Arc<Self> {
            Arc::new(Self {
                inner: StaticSecretStore::from_value(doc).unwrap(),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn get_secret(&self) -> Result<SecretDocument, SecretStoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.get_secret().await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SecretStore for BrokenStore {
        async fn get_secret(&self) -> Result<SecretDocument, SecretStoreError> {
            Err(SecretStoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn secret_store_value_wins_over_static_value() {
        let store = CountingStore::new(json!({ "sms_password": "from-store" }));
        let resolver =
            CredentialResolver::new(PROVIDER, Some(store.clone() as Arc<dyn SecretStore>));
        let source = CredentialSource {
            secret_key: Some("sms_password".into()),
            value: Some("from-config".into()),
        };

        let set = resolver
            .resolve(&[FieldSpec::new("password", &source)])
            .await
            .unwrap();
        assert_eq!(set.get("password"), "from-store");
    }

    #[tokio::test]
    async fn static_value_used_without_secret_key() {
        let resolver = CredentialResolver::new(PROVIDER, None);
        let blank_key = CredentialSource {
            secret_key: Some("   ".into()),
            value: Some("static".into()),
        };

        let set = resolver
            .resolve(&[FieldSpec::new("username", &blank_key)])
            .await
            .unwrap();
        assert_eq!(set.get("username"), "static");
    }

    #[tokio::test]
    async fn secret_document_fetched_once_per_resolution() {
        let store =
            CountingStore::new(json!({ "user": "alice", "pass": "s3cret", "sender": 12345 }));
        let resolver =
            CredentialResolver::new(PROVIDER, Some(store.clone() as Arc<dyn SecretStore>));
        let user = CredentialSource::secret("user");
        let pass = CredentialSource::secret("pass");
        let sender = CredentialSource::secret("sender");

        let set = resolver
            .resolve(&[
                FieldSpec::new("username", &user),
                FieldSpec::new("password", &pass),
                FieldSpec::new("sender_id", &sender),
            ])
            .await
            .unwrap();

        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(set.get("username"), "alice");
        assert_eq!(set.get("sender_id"), "12345");
    }

    #[tokio::test]
    async fn store_not_queried_for_static_only_fields() {
        let store = CountingStore::new(json!({}));
        let resolver =
            CredentialResolver::new(PROVIDER, Some(store.clone() as Arc<dyn SecretStore>));
        let user = CredentialSource::value("alice");

        resolver
            .resolve(&[FieldSpec::new("username", &user)])
            .await
            .unwrap();
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_fields_fail_with_configuration_error() {
        let resolver = CredentialResolver::new(PROVIDER, None);
        let user = CredentialSource::value("alice");
        let empty = CredentialSource::default();
        let blank = CredentialSource::value("  ");

        let err = resolver
            .resolve(&[
                FieldSpec::new("username", &user),
                FieldSpec::new("password", &empty),
                FieldSpec::new("sender_id", &blank),
            ])
            .await
            .unwrap_err();

        match err {
            GatewayError::Configuration { provider, fields } => {
                assert_eq!(provider, PROVIDER);
                assert_eq!(fields, vec!["password", "sender_id"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_document_property_is_treated_as_blank() {
        let store = CountingStore::new(json!({ "other": "x", "flag": true }));
        let resolver = CredentialResolver::new(PROVIDER, Some(store as Arc<dyn SecretStore>));
        let missing = CredentialSource {
            secret_key: Some("absent".into()),
            value: Some("fallback-is-ignored".into()),
        };
        let non_string = CredentialSource::secret("flag");

        let err = resolver
            .resolve(&[
                FieldSpec::new("password", &missing),
                FieldSpec::new("username", &non_string),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Configuration { ref fields, .. } if fields == &["password", "username"]
        ));
    }

    #[tokio::test]
    async fn secret_key_without_store_fails() {
        let resolver = CredentialResolver::new(PROVIDER, None);
        let source = CredentialSource::secret("pass");

        let err = resolver
            .resolve(&[FieldSpec::new("password", &source)])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SecretStore { .. }));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let resolver = CredentialResolver::new(PROVIDER, Some(Arc::new(BrokenStore)));
        let source = CredentialSource::secret("pass");

        let err = resolver
            .resolve(&[FieldSpec::new("password", &source)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn secret_document_must_be_an_object() {
        assert!(SecretDocument::from_json_str("[1, 2]").is_err());
        assert!(SecretDocument::from_json_str("not json").is_err());
        let doc = SecretDocument::from_json_str(r#"{"a": "b"}"#).unwrap();
        assert_eq!(doc.resolve("a").as_deref(), Some("b"));
        assert_eq!(doc.resolve("z"), None);
    }

    #[test]
    fn debug_output_hides_values() {
        let set = CredentialSet::new(PROVIDER, [("password", "hunter2".to_string())]).unwrap();
        let shown = format!("{set:?}");
        assert!(shown.contains("password"));
        assert!(!shown.contains("hunter2"));
    }
}
