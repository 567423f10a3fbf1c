//! Races on single-use credentials.

mod common;

use std::sync::Arc;

use common::*;
use octofhir_credentials::TokenRequest;
use octofhir_credentials::storage::RefreshTokenRepository;
use octofhir_credentials::types::SigningAlgorithm;

const RACERS: usize = 8;

async fn count_successes<F, Fut>(spawn: F) -> usize
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool> + Send + 'static,
{
    let handles: Vec<_> = (0..RACERS).map(|_| tokio::spawn(spawn())).collect();
    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("task") {
            successes += 1;
        }
    }
    successes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_code_exchange_has_one_winner() {
    let harness = Arc::new(TestHarness::new(SigningAlgorithm::ES256).await);
    let code = harness.issue_code(CONFIDENTIAL_ID, "read", false).await;
    let request = TokenRequest::new("authorization_code")
        .with_basic_auth(CONFIDENTIAL_ID, CONFIDENTIAL_SECRET)
        .with_code(code, REDIRECT_URI);

    let successes = count_successes(|| {
        let harness = harness.clone();
        let request = request.clone();
        async move { harness.engine.token(&request).await.is_ok() }
    })
    .await;
    assert_eq!(successes, 1);

    let consumed = harness
        .audit_names()
        .await
        .into_iter()
        .filter(|name| *name == "authorization_code_consumed")
        .count();
    assert_eq!(consumed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_leaves_one_active_token() {
    let harness = Arc::new(TestHarness::new(SigningAlgorithm::ES256).await);
    let token = harness
        .confidential_login("read")
        .await
        .refresh_token
        .expect("refresh token");

    let successes = count_successes(|| {
        let harness = harness.clone();
        let request = refresh_request(&token);
        async move { harness.engine.token(&request).await.is_ok() }
    })
    .await;
    assert_eq!(successes, 1);

    let active = harness
        .store
        .refresh_tokens
        .find_active_by_user(USER_ID)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert!(
        harness
            .store
            .refresh_tokens
            .find_by_token(&token)
            .await
            .unwrap()
            .unwrap()
            .is_revoked
    );
}
