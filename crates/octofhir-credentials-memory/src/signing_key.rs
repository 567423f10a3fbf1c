use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use octofhir_credentials::storage::KeyRepository;
use octofhir_credentials::types::{NewSigningKey, SigningKey};
use octofhir_credentials::{AuthError, AuthResult};
use time::OffsetDateTime;

/// Signing keys keyed by `kid`.
#[derive(Debug, Default)]
pub struct InMemoryKeyRepository {
    keys: DashMap<String, SigningKey>,
}

impl InMemoryKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn collect<F>(&self, filter: F) -> Vec<SigningKey>
    where
        F: Fn(&SigningKey) -> bool,
    {
        let mut keys: Vec<SigningKey> = self
            .keys
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        keys.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.kid.cmp(&b.kid))
        });
        keys
    }
}

#[async_trait]
impl KeyRepository for InMemoryKeyRepository {
    async fn find_active_keys(&self) -> AuthResult<Vec<SigningKey>> {
        Ok(self.collect(|key| key.is_active))
    }

    async fn find_all(&self) -> AuthResult<Vec<SigningKey>> {
        Ok(self.collect(|_| true))
    }

    async fn find_by_kid(&self, kid: &str) -> AuthResult<Option<SigningKey>> {
        Ok(self.keys.get(kid).map(|entry| entry.value().clone()))
    }

    async fn create(&self, key: NewSigningKey) -> AuthResult<SigningKey> {
        match self.keys.entry(key.kid.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "signing key {} already exists",
                key.kid
            ))),
            Entry::Vacant(slot) => {
                let record = key.into_record();
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn activate(&self, kid: &str) -> AuthResult<bool> {
        Ok(match self.keys.get_mut(kid) {
            Some(mut key) => {
                key.is_active = true;
                key.expires_at = None;
                true
            }
            None => false,
        })
    }

    async fn deactivate(&self, kid: &str, retain_until: OffsetDateTime) -> AuthResult<bool> {
        Ok(match self.keys.get_mut(kid) {
            Some(mut key) => {
                key.is_active = false;
                key.expires_at = Some(retain_until);
                true
            }
            None => false,
        })
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let before = self.keys.len();
        self.keys.retain(|_, key| !key.is_expired());
        Ok((before - self.keys.len()) as u64)
    }
}
