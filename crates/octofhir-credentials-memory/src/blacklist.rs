use async_trait::async_trait;
use dashmap::DashMap;
use octofhir_credentials::AuthResult;
use octofhir_credentials::storage::TokenBlacklistRepository;
use octofhir_credentials::types::TokenBlacklistEntry;

/// Revoked access token identifiers keyed by `jti`.
#[derive(Debug, Default)]
pub struct InMemoryTokenBlacklistRepository {
    entries: DashMap<String, TokenBlacklistEntry>,
}

impl InMemoryTokenBlacklistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenBlacklistRepository for InMemoryTokenBlacklistRepository {
    async fn add(&self, entry: &TokenBlacklistEntry) -> AuthResult<()> {
        // Re-revoking keeps the later expiry.
        self.entries
            .entry(entry.jti.clone())
            .and_modify(|existing| {
                if entry.expires_at > existing.expires_at {
                    *existing = entry.clone();
                }
            })
            .or_insert_with(|| entry.clone());
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> AuthResult<bool> {
        Ok(self.entries.contains_key(jti))
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        Ok((before - self.entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;

    #[tokio::test]
    async fn test_add_and_lookup() {
        let repo = InMemoryTokenBlacklistRepository::new();
        let entry = TokenBlacklistEntry::new(
            "jti-1",
            OffsetDateTime::now_utc() + Duration::hours(1),
            Some("logout".into()),
        );
        repo.add(&entry).await.unwrap();
        repo.add(&entry).await.unwrap();

        assert!(repo.is_blacklisted("jti-1").await.unwrap());
        assert!(!repo.is_blacklisted("jti-2").await.unwrap());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let repo = InMemoryTokenBlacklistRepository::new();
        let now = OffsetDateTime::now_utc();
        repo.add(&TokenBlacklistEntry::new("old", now - Duration::seconds(1), None))
            .await
            .unwrap();
        repo.add(&TokenBlacklistEntry::new("live", now + Duration::hours(1), None))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.is_blacklisted("live").await.unwrap());
        assert!(!repo.is_blacklisted("old").await.unwrap());
    }
}
