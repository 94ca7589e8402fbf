use passkey_ceremony::{
    AuthenticationFinishRequest, PasskeyError, RegistrationFinishRequest, UserVerification,
};

use crate::common::{
    ORIGIN, RP_ID, VirtualAuthenticator, authenticate, memory_ceremony, register, test_config,
};

#[tokio::test]
async fn test_register_then_authenticate() {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    let registered = register(&ceremony, &mut authenticator, "alice")
        .await
        .expect("registration succeeds");
    assert_eq!(registered.name, "alice");
    assert_eq!(
        registered.credential_id.as_bytes(),
        authenticator.credential_id.as_slice()
    );

    let result = authenticate(&ceremony, &mut authenticator, "alice")
        .await
        .expect("authentication succeeds");
    assert_eq!(result.name, "alice");
    assert_eq!(result.sign_counter, 1);

    let result = authenticate(&ceremony, &mut authenticator, "alice")
        .await
        .expect("second authentication succeeds");
    assert_eq!(result.sign_counter, 2);
}

#[tokio::test]
async fn test_packed_self_attestation() {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    let options = ceremony.start_registration("alice").await.unwrap();
    let credential = authenticator.create_with_format(&options, "packed");
    ceremony
        .finish_registration(&RegistrationFinishRequest {
            name: "alice".to_string(),
            attestation_response: credential,
        })
        .await
        .expect("self attestation verifies");

    authenticate(&ceremony, &mut authenticator, "alice")
        .await
        .expect("authentication succeeds");
}

#[tokio::test]
async fn test_counterless_authenticator() {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);
    authenticator.counter = None;

    register(&ceremony, &mut authenticator, "alice").await.unwrap();
    for _ in 0..3 {
        let result = authenticate(&ceremony, &mut authenticator, "alice")
            .await
            .expect("zero counters are accepted");
        assert_eq!(result.sign_counter, 0);
    }
}

#[tokio::test]
async fn test_user_verification_required() {
    let config = test_config().with_user_verification(UserVerification::Required);
    let ceremony = memory_ceremony(config);

    let mut without_uv = VirtualAuthenticator::new(RP_ID, ORIGIN);
    let result = register(&ceremony, &mut without_uv, "alice").await;
    assert!(matches!(result, Err(PasskeyError::UserVerificationRequired)));

    let mut with_uv = VirtualAuthenticator::new(RP_ID, ORIGIN);
    with_uv.user_verified = true;
    register(&ceremony, &mut with_uv, "alice").await.unwrap();
    authenticate(&ceremony, &mut with_uv, "alice").await.unwrap();
}

#[tokio::test]
async fn test_options_shape() {
    let ceremony = memory_ceremony(test_config());
    let mut authenticator = VirtualAuthenticator::new(RP_ID, ORIGIN);

    let options = ceremony.start_registration("alice").await.unwrap();
    let json = serde_json::to_value(&options).unwrap();
    assert_eq!(json["rp"]["id"], RP_ID);
    assert_eq!(json["user"]["name"], "alice");
    assert_eq!(json["pubKeyCredParams"][0]["alg"], -7);
    assert_eq!(options.challenge.as_bytes().len(), 32);
    assert_eq!(options.user.id.as_bytes().len(), 16);
    let user_handle = options.user.id.clone();

    let credential = authenticator.create(&options);
    ceremony
        .finish_registration(&RegistrationFinishRequest {
            name: "alice".to_string(),
            attestation_response: credential,
        })
        .await
        .unwrap();

    let options = ceremony.start_authentication("alice").await.unwrap();
    let json = serde_json::to_value(&options).unwrap();
    assert_eq!(json["rpId"], RP_ID);
    assert_eq!(json["allowCredentials"][0]["type"], "public-key");

    // The user handle, when the client sends one, must be the registered one
    let mut assertion = authenticator.get(&options);
    assertion.response.user_handle = Some(user_handle);
    ceremony
        .finish_authentication(&AuthenticationFinishRequest {
            name: "alice".to_string(),
            assertion_response: assertion,
        })
        .await
        .expect("matching user handle is accepted");
}
