use std::sync::Arc;

use passkey_ceremony::{
    ChallengeStoreKind, CredentialStore, CredentialStoreKind, InMemoryChallengeStore,
    PasskeyCeremony, PasskeyError, RedisChallengeStore, SqliteCredentialStore, StoreConfig,
};

use crate::common::{
    ORIGIN, RP_ID, VirtualAuthenticator, authenticate, memory_ceremony, register, test_config,
};

#[tokio::test]
async fn test_flow_with_sqlite_credentials() {
    let credentials = Arc::new(
        SqliteCredentialStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite"),
    );
    let ceremony = PasskeyCeremony::new(
        test_config(),
        credentials.clone(),
        Arc::new(InMemoryChallengeStore::new()),
    );
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    register(&ceremony, &mut authenticator, "alice").await.unwrap();
    authenticate(&ceremony, &mut authenticator, "alice")
        .await
        .unwrap();

    let stored = credentials
        .get_by_credential_id(&authenticator.credential_id)
        .await
        .unwrap()
        .expect("credential persisted");
    assert_eq!(stored.name, "alice");
    assert_eq!(stored.sign_counter, 1);
    assert_eq!(stored.attestation_format, "none");
    assert!(stored.last_used_at.is_some());

    let mut copycat = VirtualAuthenticator::new(RP_ID, ORIGIN);
    copycat.credential_id = authenticator.credential_id.clone();
    let result = register(&ceremony, &mut copycat, "bob").await;
    assert!(matches!(
        result,
        Err(PasskeyError::CredentialAlreadyRegistered)
    ));
}

#[tokio::test]
async fn test_default_store_config_builds_memory_stores() {
    let config = StoreConfig::default();
    assert_eq!(config.challenges, ChallengeStoreKind::Memory);
    assert_eq!(config.credentials, CredentialStoreKind::Memory);

    let (credentials, challenges) = config.build().await.unwrap();
    let ceremony = PasskeyCeremony::new(test_config(), credentials, challenges);
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    register(&ceremony, &mut authenticator, "alice").await.unwrap();
    authenticate(&ceremony, &mut authenticator, "alice")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_users_are_independent() {
    let ceremony = memory_ceremony(test_config());
    let mut alice = VirtualAuthenticator::new(RP_ID, ORIGIN);
    let mut bob = VirtualAuthenticator::new(RP_ID, ORIGIN);

    register(&ceremony, &mut alice, "alice").await.unwrap();
    register(&ceremony, &mut bob, "bob").await.unwrap();

    // Bob's key cannot answer for alice's credential
    let options = ceremony.start_authentication("alice").await.unwrap();
    let assertion = bob.get(&options);
    let result = ceremony
        .finish_authentication(&passkey_ceremony::AuthenticationFinishRequest {
            name: "alice".to_string(),
            assertion_response: assertion,
        })
        .await;
    assert!(matches!(result, Err(PasskeyError::CredentialMismatch(_))));

    authenticate(&ceremony, &mut alice, "alice").await.unwrap();
    authenticate(&ceremony, &mut bob, "bob").await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server at REDIS_URL"]
async fn test_flow_with_redis_challenges() {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let challenges = RedisChallengeStore::new(&url).expect("redis client");
    let ceremony = PasskeyCeremony::new(
        test_config(),
        Arc::new(passkey_ceremony::InMemoryCredentialStore::new()),
        Arc::new(challenges),
    );
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    register(&ceremony, &mut authenticator, "redis-alice")
        .await
        .unwrap();
    authenticate(&ceremony, &mut authenticator, "redis-alice")
        .await
        .unwrap();
}
