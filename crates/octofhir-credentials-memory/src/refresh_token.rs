use async_trait::async_trait;
use dashmap::DashMap;
use octofhir_credentials::crypto::hash_token;
use octofhir_credentials::storage::RefreshTokenRepository;
use octofhir_credentials::types::{NewRefreshToken, RefreshToken};
use octofhir_credentials::{AuthError, AuthResult};
use time::OffsetDateTime;

/// Refresh tokens keyed by token hash.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: DashMap<String, RefreshToken>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn insert_new(&self, token: NewRefreshToken) -> AuthResult<RefreshToken> {
        let hash = hash_token(&token.token);
        if self.tokens.contains_key(&hash) {
            return Err(AuthError::storage("duplicate refresh token"));
        }
        let record = token.into_record(hash.clone());
        self.tokens.insert(hash, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, token: NewRefreshToken) -> AuthResult<RefreshToken> {
        self.insert_new(token)
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .get(&hash_token(token))
            .map(|entry| entry.value().clone()))
    }

    async fn revoke(&self, token: &str) -> AuthResult<bool> {
        Ok(match self.tokens.get_mut(&hash_token(token)) {
            Some(mut record) if !record.is_revoked => {
                record.revoke();
                true
            }
            _ => false,
        })
    }

    async fn rotate(
        &self,
        old_token: &str,
        replacement: NewRefreshToken,
    ) -> AuthResult<Option<RefreshToken>> {
        let new_hash = hash_token(&replacement.token);
        if self.tokens.contains_key(&new_hash) {
            return Err(AuthError::storage("duplicate refresh token"));
        }

        {
            // The shard lock is held across check-and-revoke.
            let Some(mut old) = self.tokens.get_mut(&hash_token(old_token)) else {
                return Ok(None);
            };
            if old.is_revoked {
                return Ok(None);
            }
            old.revoke();
        }

        let record = replacement.into_record(new_hash.clone());
        self.tokens.insert(new_hash, record.clone());
        Ok(Some(record))
    }

    async fn find_active_by_user(&self, user_id: &str) -> AuthResult<Vec<RefreshToken>> {
        let mut tokens: Vec<RefreshToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.is_valid())
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn revoke_all_for_user(&self, user_id: &str) -> AuthResult<u64> {
        let mut revoked = 0;
        for mut entry in self.tokens.iter_mut() {
            if entry.user_id == user_id && !entry.is_revoked {
                entry.revoke();
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.tokens.len();
        self.tokens.retain(|_, token| token.expires_at >= now);
        Ok((before - self.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use octofhir_credentials::crypto::generate_token;
    use octofhir_credentials::types::ScopeSet;
    use time::Duration;

    use super::*;

    fn new_token(token: &str, user_id: &str, expires_in: Duration) -> NewRefreshToken {
        NewRefreshToken {
            token: token.to_string(),
            client_id: "client".into(),
            user_id: user_id.into(),
            scopes: ScopeSet::parse("read write").unwrap(),
            expires_at: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_revoke_is_one_way() {
        let repo = InMemoryRefreshTokenRepository::new();
        repo.create(new_token("rt-1", "user-1", Duration::days(1)))
            .await
            .unwrap();

        assert!(repo.revoke("rt-1").await.unwrap());
        assert!(!repo.revoke("rt-1").await.unwrap());
        assert!(!repo.revoke("unknown").await.unwrap());
        assert!(
            repo.find_by_token("rt-1")
                .await
                .unwrap()
                .unwrap()
                .is_revoked()
        );
    }

    #[tokio::test]
    async fn test_rotate_revokes_old_and_stores_new() {
        let repo = InMemoryRefreshTokenRepository::new();
        repo.create(new_token("rt-old", "user-1", Duration::days(1)))
            .await
            .unwrap();

        let rotated = repo
            .rotate("rt-old", new_token("rt-new", "user-1", Duration::days(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rotated.token_hash, hash_token("rt-new"));
        assert!(
            repo.find_by_token("rt-old")
                .await
                .unwrap()
                .unwrap()
                .is_revoked()
        );

        let again = repo
            .rotate("rt-old", new_token("rt-other", "user-1", Duration::days(1)))
            .await
            .unwrap();
        assert!(again.is_none());
        assert!(repo.find_by_token("rt-other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_leaves_one_active_token() {
        let repo = Arc::new(InMemoryRefreshTokenRepository::new());
        repo.create(new_token("rt-shared", "user-1", Duration::days(1)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.rotate(
                        "rt-shared",
                        new_token(&generate_token(), "user-1", Duration::days(1)),
                    )
                    .await
                    .unwrap()
                    .is_some()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(repo.find_active_by_user("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let repo = InMemoryRefreshTokenRepository::new();
        for token in ["a", "b", "c"] {
            repo.create(new_token(token, "user-1", Duration::days(1)))
                .await
                .unwrap();
        }
        repo.create(new_token("d", "user-2", Duration::days(1)))
            .await
            .unwrap();
        repo.revoke("a").await.unwrap();

        assert_eq!(repo.revoke_all_for_user("user-1").await.unwrap(), 2);
        assert!(repo.find_active_by_user("user-1").await.unwrap().is_empty());
        assert_eq!(repo.find_active_by_user("user-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let repo = InMemoryRefreshTokenRepository::new();
        repo.create(new_token("old", "user-1", Duration::seconds(-1)))
            .await
            .unwrap();
        repo.create(new_token("fresh", "user-1", Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert_eq!(repo.len(), 1);
    }
}
