use std::sync::Arc;
use std::time::Duration;

use passkey_ceremony::{
    AuthenticationFinishRequest, CredentialStore, InMemoryChallengeStore,
    InMemoryCredentialStore, PasskeyCeremony, PasskeyError, RegistrationFinishRequest,
};

use crate::common::{
    GatedCredentialStore, ORIGIN, RP_ID, RacingCredentialStore, StalledChallengeStore, VirtualAuthenticator,
    authenticate, memory_ceremony, register, test_config,
};

async fn registered_alice() -> (PasskeyCeremony, VirtualAuthenticator) {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);
    register(&ceremony, &mut authenticator, "alice")
        .await
        .expect("registration succeeds");
    (ceremony, authenticator)
}

fn assertion_request(
    name: &str,
    assertion: passkey_ceremony::AuthenticatorResponse,
) -> AuthenticationFinishRequest {
    AuthenticationFinishRequest {
        name: name.to_string(),
        assertion_response: assertion,
    }
}

#[tokio::test]
async fn test_replayed_assertion() {
    let (ceremony, mut authenticator) = registered_alice().await;

    let options = ceremony.start_authentication("alice").await.unwrap();
    let request = assertion_request("alice", authenticator.get(&options));

    ceremony.finish_authentication(&request).await.unwrap();
    let result = ceremony.finish_authentication(&request).await;
    assert!(matches!(result, Err(PasskeyError::ChallengeAlreadyUsed)));
}

#[tokio::test]
async fn test_stale_challenge_after_reissue() {
    let (ceremony, mut authenticator) = registered_alice().await;

    let first = ceremony.start_authentication("alice").await.unwrap();
    let _second = ceremony.start_authentication("alice").await.unwrap();

    let result = ceremony
        .finish_authentication(&assertion_request("alice", authenticator.get(&first)))
        .await;
    assert!(matches!(result, Err(PasskeyError::ChallengeMismatch)));
}

#[tokio::test]
async fn test_wrong_key_for_credential() {
    let (ceremony, authenticator) = registered_alice().await;
    let mut attacker = VirtualAuthenticator::impersonate(&authenticator);

    let result = authenticate(&ceremony, &mut attacker, "alice").await;
    assert!(matches!(result, Err(PasskeyError::InvalidSignature)));
}

#[tokio::test]
async fn test_counter_regression() {
    let (ceremony, mut authenticator) = registered_alice().await;

    authenticator.counter = Some(4);
    let result = authenticate(&ceremony, &mut authenticator, "alice")
        .await
        .unwrap();
    assert_eq!(result.sign_counter, 5);

    // A clone still holding an older counter
    authenticator.counter = Some(2);
    let result = authenticate(&ceremony, &mut authenticator, "alice").await;
    assert!(matches!(
        result,
        Err(PasskeyError::PossibleCloneDetected {
            stored: 5,
            received: 3
        })
    ));
}

#[tokio::test]
async fn test_origin_mismatch() {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new(RP_ID, "https://evil.example");

    let result = register(&ceremony, &mut authenticator, "alice").await;
    assert!(matches!(result, Err(PasskeyError::OriginMismatch { .. })));
}

#[tokio::test]
async fn test_rp_id_mismatch() {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new("evil.example", ORIGIN);

    let result = register(&ceremony, &mut authenticator, "alice").await;
    assert!(matches!(result, Err(PasskeyError::RpIdMismatch)));
}

#[tokio::test]
async fn test_expired_challenge() {
    let config = test_config().with_challenge_timeout(Duration::from_millis(50));
    let ceremony = memory_ceremony(config);
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    let options = ceremony.start_registration("alice").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = ceremony
        .finish_registration(&RegistrationFinishRequest {
            name: "alice".to_string(),
            attestation_response: authenticator.create(&options),
        })
        .await;
    assert!(matches!(result, Err(PasskeyError::ChallengeExpired)));
}

#[tokio::test]
async fn test_oversized_attestation_object() {
    let config = test_config();
    let limit = config.max_input_size;
    let ceremony = memory_ceremony(config);
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    let options = ceremony.start_registration("alice").await.unwrap();
    let mut credential = authenticator.create(&options);
    credential.response.attestation_object = vec![0xA0; limit + 1].into();

    let result = ceremony
        .finish_registration(&RegistrationFinishRequest {
            name: "alice".to_string(),
            attestation_response: credential,
        })
        .await;
    assert!(matches!(result, Err(PasskeyError::InputTooLarge { .. })));
}

#[tokio::test]
async fn test_existence_checks() {
    let (ceremony, mut authenticator) = registered_alice().await;

    let result = register(&ceremony, &mut authenticator, "alice").await;
    assert!(matches!(result, Err(PasskeyError::UserAlreadyExists)));

    let result = ceremony.start_authentication("bob").await;
    assert!(matches!(result, Err(PasskeyError::UserNotFound)));
}

#[tokio::test]
async fn test_concurrent_finish_single_winner() {
    let (ceremony, mut authenticator) = registered_alice().await;

    let options = ceremony.start_authentication("alice").await.unwrap();
    let request = assertion_request("alice", authenticator.get(&options));

    let (a, b) = tokio::join!(
        ceremony.finish_authentication(&request),
        ceremony.finish_authentication(&request)
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(PasskeyError::ChallengeAlreadyUsed)))
    );
}

#[tokio::test]
async fn test_lost_counter_race() {
    let credentials = Arc::new(RacingCredentialStore {
        inner: InMemoryCredentialStore::new(),
    });
    let ceremony = PasskeyCeremony::new(
        test_config(),
        credentials.clone(),
        Arc::new(InMemoryChallengeStore::new()),
    );
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);
    register(&ceremony, &mut authenticator, "alice").await.unwrap();

    let result = authenticate(&ceremony, &mut authenticator, "alice").await;
    assert!(matches!(
        result,
        Err(PasskeyError::PossibleCloneDetected {
            stored: 0,
            received: 1
        })
    ));

    // The counter written by the winner is kept
    let stored = credentials.get_by_name("alice").await.unwrap().unwrap();
    assert_eq!(stored.sign_counter, 11);
}

#[tokio::test]
async fn test_overlapping_counterless_authentications() {
    let credentials = Arc::new(GatedCredentialStore::new());
    let ceremony = PasskeyCeremony::new(
        test_config(),
        credentials.clone(),
        Arc::new(InMemoryChallengeStore::new()),
    );
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);
    authenticator.counter = None;
    register(&ceremony, &mut authenticator, "alice").await.unwrap();

    let options = ceremony.start_authentication("alice").await.unwrap();
    let first_request = assertion_request("alice", authenticator.get(&options));

    // The second ceremony starts once the first has read the stored record
    // and is waiting to write the counter
    let first = ceremony.finish_authentication(&first_request);
    let second = async {
        credentials.entered.notified().await;
        authenticate(&ceremony, &mut authenticator, "alice").await
    };
    let (first, second) = tokio::join!(first, second);

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(PasskeyError::PossibleCloneDetected {
            stored: 0,
            received: 0
        })
    )));

    let stored = credentials.get_by_name("alice").await.unwrap().unwrap();
    assert_eq!(stored.sign_counter, 0);
    assert_eq!(stored.use_count, 1);
}

#[tokio::test]
async fn test_store_timeout_is_retryable() {
    let config = test_config().with_store_timeout(Duration::from_millis(20));
    let ceremony = PasskeyCeremony::new(
        config,
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(StalledChallengeStore),
    );

    let result = ceremony.start_registration("alice").await;
    match result {
        Err(err) => {
            assert!(matches!(err, PasskeyError::StoreUnavailable(_)));
            assert!(err.is_retryable());
        }
        Ok(_) => panic!("stalled store should time out"),
    }
}
