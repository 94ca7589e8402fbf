//! The two-step registration and authentication ceremonies.

mod state;
mod types;

use std::sync::Arc;

use chrono::Utc;

use crate::config::PasskeyConfig;
use crate::passkey::challenge::ChallengeManager;
use crate::passkey::codec::Codec;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyType, Challenge, UserCredential};
use crate::passkey::verify::{CollectedClientData, Verifier};
use crate::storage::{ChallengeStore, CredentialStore, with_timeout};
use crate::utils::base64url_decode;

use state::CeremonyAttempt;

pub use state::{CeremonyEvent, CeremonyState};
pub use types::{
    AllowCredential, AuthenticationFinishRequest, AuthenticationOptions, AuthenticationResult,
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    AuthenticatorSelection, Base64UrlBytes, PubKeyCredParam, PublicKeyCredentialUserEntity,
    RegisterCredential, RegistrationFinishRequest, RegistrationOptions, RegistrationResult,
    RelyingParty, StartRequest,
};

const MAX_NAME_LEN: usize = 256;
const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

/// Runs passkey ceremonies against injected stores.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct PasskeyCeremony {
    config: PasskeyConfig,
    codec: Codec,
    verifier: Verifier,
    challenges: ChallengeManager,
    credentials: Arc<dyn CredentialStore>,
}

impl PasskeyCeremony {
    pub fn new(
        config: PasskeyConfig,
        credentials: Arc<dyn CredentialStore>,
        challenges: Arc<dyn ChallengeStore>,
    ) -> Self {
        let challenges = ChallengeManager::new(&config, challenges, credentials.clone());
        Self {
            codec: Codec::new(config.max_input_size),
            verifier: Verifier::new(&config),
            challenges,
            credentials,
            config,
        }
    }

    pub fn config(&self) -> &PasskeyConfig {
        &self.config
    }

    /// Registration step 1: issue a challenge for a name that is not registered yet.
    pub async fn start_registration(&self, name: &str) -> Result<RegistrationOptions, PasskeyError> {
        let challenge = self.issue(name, CeremonyType::Registration).await?;
        Ok(RegistrationOptions::new(&self.config, &challenge))
    }

    /// Registration step 2: verify the attestation and store the new credential.
    pub async fn finish_registration(
        &self,
        request: &RegistrationFinishRequest,
    ) -> Result<RegistrationResult, PasskeyError> {
        let name = request.name.as_str();
        let credential = &request.attestation_response;

        let (client_data, challenge) = self
            .receive(
                name,
                CeremonyType::Registration,
                credential.response.client_data_json.as_bytes(),
            )
            .await?;

        let mut attempt =
            CeremonyAttempt::new(name, CeremonyType::Registration, CeremonyState::ChallengeIssued);
        attempt.advance(CeremonyEvent::Submit)?;

        let outcome = self
            .complete_registration(credential, &challenge, &client_data)
            .await;
        attempt.conclude(outcome)
    }

    /// Authentication step 1: issue a challenge for a registered name.
    pub async fn start_authentication(
        &self,
        name: &str,
    ) -> Result<AuthenticationOptions, PasskeyError> {
        let challenge = self.issue(name, CeremonyType::Authentication).await?;
        let credential = self.load_credential(name).await.map_err(PasskeyError::log)?;
        Ok(AuthenticationOptions::new(
            &self.config,
            &challenge,
            &credential,
        ))
    }

    /// Authentication step 2: verify the assertion and advance the stored counter.
    pub async fn finish_authentication(
        &self,
        request: &AuthenticationFinishRequest,
    ) -> Result<AuthenticationResult, PasskeyError> {
        let name = request.name.as_str();
        let credential = &request.assertion_response;

        let (client_data, challenge) = self
            .receive(
                name,
                CeremonyType::Authentication,
                credential.response.client_data_json.as_bytes(),
            )
            .await?;

        let mut attempt = CeremonyAttempt::new(
            name,
            CeremonyType::Authentication,
            CeremonyState::ChallengeIssued,
        );
        attempt.advance(CeremonyEvent::Submit)?;

        let outcome = self
            .complete_authentication(credential, &challenge, &client_data)
            .await;
        attempt.conclude(outcome)
    }

    async fn issue(&self, name: &str, ceremony: CeremonyType) -> Result<Challenge, PasskeyError> {
        validate_name(name).map_err(PasskeyError::log)?;

        let mut attempt = CeremonyAttempt::new(name, ceremony, CeremonyState::Idle);
        let challenge = self
            .challenges
            .issue(name, ceremony)
            .await
            .map_err(PasskeyError::log)?;
        attempt.advance(CeremonyEvent::Issue)?;

        Ok(challenge)
    }

    /// Parses the client data and consumes the outstanding challenge. An
    /// unreadable response still burns the challenge.
    async fn receive(
        &self,
        name: &str,
        ceremony: CeremonyType,
        raw_client_data: &[u8],
    ) -> Result<(CollectedClientData, Challenge), PasskeyError> {
        validate_name(name).map_err(PasskeyError::log)?;

        let client_data =
            match CollectedClientData::parse(raw_client_data, self.config.max_input_size) {
                Ok(client_data) => client_data,
                Err(e) => {
                    self.challenges
                        .invalidate(name, ceremony)
                        .await
                        .map_err(PasskeyError::log)?;
                    return Err(e.log());
                }
            };

        let challenge = self
            .challenges
            .consume(name, ceremony, &client_data.challenge)
            .await
            .map_err(PasskeyError::log)?;

        Ok((client_data, challenge))
    }

    async fn complete_registration(
        &self,
        credential: &RegisterCredential,
        challenge: &Challenge,
        client_data: &CollectedClientData,
    ) -> Result<RegistrationResult, PasskeyError> {
        check_credential_type(&credential.type_)?;

        let attestation = self
            .codec
            .decode_attestation_object(credential.response.attestation_object.as_bytes())?;
        let record = self
            .verifier
            .verify_registration(challenge, client_data, &attestation)?;

        check_credential_id(&credential.id, credential.raw_id.as_bytes(), &record.credential_id)?;

        let result = RegistrationResult {
            name: record.name.clone(),
            credential_id: record.credential_id.clone().into(),
        };
        with_timeout(self.config.store_timeout, self.credentials.insert(record)).await?;

        Ok(result)
    }

    async fn complete_authentication(
        &self,
        credential: &AuthenticatorResponse,
        challenge: &Challenge,
        client_data: &CollectedClientData,
    ) -> Result<AuthenticationResult, PasskeyError> {
        check_credential_type(&credential.type_)?;

        let stored = self.load_credential(&challenge.user_name).await?;
        check_credential_id(&credential.id, credential.raw_id.as_bytes(), &stored.credential_id)?;

        if let Some(user_handle) = &credential.response.user_handle {
            if user_handle.as_bytes() != stored.user_handle.as_slice() {
                return Err(PasskeyError::CredentialMismatch(
                    "userHandle does not match the stored credential".to_string(),
                ));
            }
        }

        let auth_data = self
            .codec
            .decode_authenticator_data(credential.response.authenticator_data.as_bytes())?;
        let signature = credential.response.signature.as_bytes();
        self.codec.check_size(signature.len())?;

        let sign_counter = self.verifier.verify_authentication(
            challenge,
            &stored,
            client_data,
            &auth_data,
            signature,
        )?;

        let swapped = with_timeout(
            self.config.store_timeout,
            self.credentials.update_sign_counter(
                &stored.name,
                stored.sign_counter,
                stored.use_count,
                sign_counter,
                Utc::now(),
            ),
        )
        .await?;

        // Another authentication moved the counter since it was read
        if !swapped {
            return Err(PasskeyError::PossibleCloneDetected {
                stored: stored.sign_counter,
                received: sign_counter,
            });
        }

        Ok(AuthenticationResult {
            name: stored.name,
            sign_counter,
        })
    }

    async fn load_credential(&self, name: &str) -> Result<UserCredential, PasskeyError> {
        with_timeout(self.config.store_timeout, self.credentials.get_by_name(name))
            .await?
            .ok_or(PasskeyError::UserNotFound)
    }
}

fn validate_name(name: &str) -> Result<(), PasskeyError> {
    if name.is_empty() {
        return Err(PasskeyError::MalformedInput("Name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(PasskeyError::MalformedInput(format!(
            "Name longer than {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(PasskeyError::MalformedInput(
            "Name contains control characters".to_string(),
        ));
    }
    Ok(())
}

fn check_credential_type(type_: &str) -> Result<(), PasskeyError> {
    if type_ != PUBLIC_KEY_CREDENTIAL_TYPE {
        return Err(PasskeyError::MalformedInput(format!(
            "Unexpected credential type: {type_}"
        )));
    }
    Ok(())
}

/// `rawId` must name the expected credential and `id` must be its base64url form.
fn check_credential_id(id: &str, raw_id: &[u8], expected: &[u8]) -> Result<(), PasskeyError> {
    if raw_id != expected {
        return Err(PasskeyError::CredentialMismatch(
            "rawId does not match the credential".to_string(),
        ));
    }
    match base64url_decode(id) {
        Ok(decoded) if decoded == raw_id => Ok(()),
        _ => Err(PasskeyError::CredentialMismatch(
            "id does not encode rawId".to_string(),
        )),
    }
}
