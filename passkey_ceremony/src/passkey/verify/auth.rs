use crate::passkey::codec::AuthenticatorData;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyType, Challenge, UserCredential};

use super::client_data::CollectedClientData;
use super::signature::{signed_message, verify_signature};
use super::Verifier;

impl Verifier {
    /// Verifies an assertion and returns the counter value to store.
    ///
    /// The signature is checked before the counter, so a counter regression
    /// is only reported for a response the stored key actually signed.
    pub fn verify_authentication(
        &self,
        challenge: &Challenge,
        credential: &UserCredential,
        client_data: &CollectedClientData,
        auth_data: &AuthenticatorData,
        signature: &[u8],
    ) -> Result<u32, PasskeyError> {
        self.verify_client_data(CeremonyType::Authentication, challenge, client_data)?;

        if challenge.user_name != credential.name {
            return Err(PasskeyError::CredentialMismatch(
                "Challenge was issued for another user".to_string(),
            ));
        }

        self.verify_authenticator_data(auth_data)?;

        let message = signed_message(&auth_data.raw, &client_data.hash());
        verify_signature(&credential.public_key, &message, signature)?;

        verify_counter(credential.sign_counter, auth_data.sign_counter)?;

        Ok(auth_data.sign_counter)
    }
}

/// The counter must strictly increase. Authenticators without a counter
/// always report zero, which is accepted only while the stored value is zero too.
fn verify_counter(stored: u32, received: u32) -> Result<(), PasskeyError> {
    tracing::debug!(
        "Counter verification - stored: {}, received: {}",
        stored,
        received
    );

    if received > stored || (received == 0 && stored == 0) {
        return Ok(());
    }

    Err(PasskeyError::PossibleCloneDetected { stored, received })
}
