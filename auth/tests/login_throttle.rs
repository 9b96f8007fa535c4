//! Login throttling and credential migration, end to end through
//! `LoginService` with a controllable clock.

#![allow(clippy::unwrap_used)]

use sessionguard_auth::mocks::{MockClock, MockCredentialRepository};
use sessionguard_auth::password::is_adaptive_hash;
use sessionguard_auth::stores::MemoryAttemptStore;
use sessionguard_auth::{AuthError, LoginService, LoginThrottle, ThrottleConfig, ThrottleState};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (
    LoginService<MockCredentialRepository, MemoryAttemptStore>,
    MockCredentialRepository,
    MockClock,
) {
    let clock = MockClock::new();
    let repo = MockCredentialRepository::new();
    repo.insert(1, "alice", "correct-horse").unwrap();

    let throttle = LoginThrottle::with_clock(
        MemoryAttemptStore::new(),
        ThrottleConfig::default(),
        Arc::new(clock.clone()),
    );
    (LoginService::new(repo.clone(), throttle), repo, clock)
}

/// Five wrong secrets lock the key; the sixth attempt is refused without a
/// credential lookup; after the window a seventh attempt is judged normally.
#[tokio::test]
async fn test_alice_lockout_scenario() {
    let (service, repo, clock) = setup();
    let key = "alice_1.2.3.4";

    for attempt in 1..=4 {
        let err = service.authenticate("alice", "wrong", "1.2.3.4").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(
            service.throttle().state(key).await.unwrap(),
            ThrottleState::Failing(attempt)
        );
    }

    let fifth = service.authenticate("alice", "wrong", "1.2.3.4").await.unwrap_err();
    assert!(matches!(fifth, AuthError::AccountLocked { .. }));
    assert!(matches!(
        service.throttle().state(key).await.unwrap(),
        ThrottleState::Locked { .. }
    ));

    // Sixth attempt, even with the right secret, never reaches the repository.
    let lookups = repo.lookup_count();
    clock.advance(Duration::from_secs(60));
    let sixth = service
        .authenticate("alice", "correct-horse", "1.2.3.4")
        .await
        .unwrap_err();
    assert!(matches!(sixth, AuthError::AccountLocked { .. }));
    assert_eq!(repo.lookup_count(), lookups);
    assert_eq!(sixth.public_message(), AuthError::InvalidCredentials.public_message());

    // Window elapsed: attempt seven is evaluated.
    clock.advance(Duration::from_secs(9 * 60));
    let identity = service
        .authenticate("alice", "correct-horse", "1.2.3.4")
        .await
        .unwrap();
    assert_eq!(identity.identity, "alice");
    assert_eq!(repo.lookup_count(), lookups + 1);
    assert_eq!(service.throttle().state(key).await.unwrap(), ThrottleState::Clean);
}

#[tokio::test]
async fn test_lock_is_scoped_to_origin() {
    let (service, _repo, _clock) = setup();

    for _ in 0..5 {
        let _ = service.authenticate("alice", "wrong", "1.2.3.4").await;
    }

    assert!(service.authenticate("alice", "correct-horse", "5.6.7.8").await.is_ok());
    assert!(service.authenticate("alice", "correct-horse", "1.2.3.4").await.is_err());
}

#[tokio::test]
async fn test_success_clears_failures() {
    let (service, _repo, _clock) = setup();

    for _ in 0..4 {
        let _ = service.authenticate("alice", "wrong", "1.2.3.4").await;
    }
    service.authenticate("alice", "correct-horse", "1.2.3.4").await.unwrap();

    // A fresh run of four failures does not lock.
    for _ in 0..4 {
        let err = service.authenticate("alice", "wrong", "1.2.3.4").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }
}

#[tokio::test]
async fn test_plaintext_secret_migrates_once() {
    let (service, repo, _clock) = setup();

    service.authenticate("alice", "correct-horse", "1.2.3.4").await.unwrap();

    let stored = repo.stored_secret("alice").unwrap().unwrap();
    assert!(is_adaptive_hash(&stored));
    assert_ne!(stored, "correct-horse");

    service.authenticate("alice", "correct-horse", "1.2.3.4").await.unwrap();
    assert_eq!(repo.update_count(), 1);
    assert_eq!(repo.stored_secret("alice").unwrap().unwrap(), stored);
}
