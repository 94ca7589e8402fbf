//! Pure verification of ceremony responses. Nothing here touches a store.

mod auth;
mod client_data;
mod register;
mod signature;

pub use client_data::CollectedClientData;

use subtle::ConstantTimeEq;

use crate::config::{PasskeyConfig, UserVerification};
use crate::passkey::codec::AuthenticatorData;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyType, Challenge};

/// Checks responses against the relying party configuration.
#[derive(Debug, Clone)]
pub struct Verifier {
    origin: String,
    rp_id_hash: [u8; 32],
    user_verification: UserVerification,
}

impl Verifier {
    pub fn new(config: &PasskeyConfig) -> Self {
        Self {
            origin: config.origin.clone(),
            rp_id_hash: config.rp_id_hash(),
            user_verification: config.user_verification,
        }
    }

    fn verify_client_data(
        &self,
        ceremony: CeremonyType,
        challenge: &Challenge,
        client_data: &CollectedClientData,
    ) -> Result<(), PasskeyError> {
        let expected = ceremony.client_data_type();
        if client_data.type_ != expected {
            return Err(PasskeyError::InvalidClientDataType {
                expected,
                got: client_data.type_.clone(),
            });
        }

        if challenge.ceremony != ceremony
            || !bool::from(client_data.challenge.as_slice().ct_eq(challenge.value.as_slice()))
        {
            return Err(PasskeyError::ChallengeMismatch);
        }

        if client_data.origin != self.origin {
            return Err(PasskeyError::OriginMismatch {
                expected: self.origin.clone(),
                got: client_data.origin.clone(),
            });
        }

        if client_data.cross_origin == Some(true) {
            return Err(PasskeyError::OriginMismatch {
                expected: self.origin.clone(),
                got: format!("{} (cross-origin)", client_data.origin),
            });
        }

        Ok(())
    }

    fn verify_authenticator_data(&self, auth_data: &AuthenticatorData) -> Result<(), PasskeyError> {
        if !bool::from(auth_data.rp_id_hash.as_slice().ct_eq(self.rp_id_hash.as_slice())) {
            return Err(PasskeyError::RpIdMismatch);
        }

        if !auth_data.flags.user_present() {
            return Err(PasskeyError::UserNotPresent);
        }

        if self.user_verification == UserVerification::Required
            && !auth_data.flags.user_verified()
        {
            return Err(PasskeyError::UserVerificationRequired);
        }

        Ok(())
    }
}
