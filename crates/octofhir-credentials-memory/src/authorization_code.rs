use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use octofhir_credentials::crypto::hash_token;
use octofhir_credentials::storage::AuthorizationCodeRepository;
use octofhir_credentials::types::{AuthorizationCode, NewAuthorizationCode};
use octofhir_credentials::{AuthError, AuthResult};
use time::OffsetDateTime;

/// Authorization codes keyed by code hash.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationCodeRepository {
    codes: DashMap<String, AuthorizationCode>,
}

impl InMemoryAuthorizationCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeRepository for InMemoryAuthorizationCodeRepository {
    async fn create(&self, code: NewAuthorizationCode) -> AuthResult<AuthorizationCode> {
        let hash = hash_token(&code.code);
        match self.codes.entry(hash.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage("duplicate authorization code")),
            Entry::Vacant(slot) => {
                let record = code.into_record(hash);
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self
            .codes
            .get(&hash_token(code))
            .map(|entry| entry.value().clone()))
    }

    async fn consume(&self, code: &str) -> AuthResult<bool> {
        // Removal takes the shard lock; only one caller gets the row back.
        Ok(self.codes.remove(&hash_token(code)).is_some())
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired_at(now));
        Ok((before - self.codes.len()) as u64)
    }
}
