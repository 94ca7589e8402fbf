use chrono::Utc;
use ciborium::value::Value as CborValue;

use crate::passkey::codec::AttestationObject;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyType, Challenge, UserCredential};

use super::client_data::CollectedClientData;
use super::signature::{signed_message, verify_signature};
use super::Verifier;

// Formats whose statements carry a certificate chain. Their trust chain is
// not evaluated, so they are accepted on the strength of the other checks.
const CHAIN_FORMATS: [&str; 6] = [
    "fido-u2f",
    "tpm",
    "android-key",
    "android-safetynet",
    "apple",
    "compound",
];

impl Verifier {
    /// Verifies a registration response and builds the credential record to store.
    pub fn verify_registration(
        &self,
        challenge: &Challenge,
        client_data: &CollectedClientData,
        attestation: &AttestationObject,
    ) -> Result<UserCredential, PasskeyError> {
        self.verify_client_data(CeremonyType::Registration, challenge, client_data)?;
        self.verify_authenticator_data(&attestation.auth_data)?;

        let user_handle = challenge
            .user_handle
            .clone()
            .ok_or(PasskeyError::ChallengeMismatch)?;
        let credential = attestation.credential()?;

        verify_attestation_statement(attestation, &client_data.hash())?;

        tracing::debug!(
            "Registration verified for {} with {:?} key, fmt={}",
            challenge.user_name,
            credential.public_key.algorithm(),
            attestation.fmt
        );

        Ok(UserCredential {
            name: challenge.user_name.clone(),
            credential_id: credential.credential_id.clone(),
            user_handle,
            public_key: credential.public_key.clone(),
            sign_counter: attestation.auth_data.sign_counter,
            use_count: 0,
            aaguid: credential.aaguid,
            attestation_format: attestation.fmt.clone(),
            created_at: Utc::now(),
            last_used_at: None,
        })
    }
}

fn verify_attestation_statement(
    attestation: &AttestationObject,
    client_data_hash: &[u8; 32],
) -> Result<(), PasskeyError> {
    match attestation.fmt.as_str() {
        "none" => {
            if !attestation.att_stmt.is_empty() {
                return Err(PasskeyError::InvalidAttestation(
                    "attStmt must be empty for none attestation".to_string(),
                ));
            }
            Ok(())
        }
        "packed" if attestation.statement_entry("x5c").is_some() => {
            tracing::debug!("Packed attestation with x5c; trust chain not evaluated");
            Ok(())
        }
        "packed" => verify_packed_self_attestation(attestation, client_data_hash),
        fmt if CHAIN_FORMATS.contains(&fmt) => {
            tracing::debug!("Attestation format {}; trust chain not evaluated", fmt);
            Ok(())
        }
        fmt => Err(PasskeyError::InvalidAttestation(format!(
            "Unsupported attestation format: {fmt}"
        ))),
    }
}

/// Self attestation: the credential key signs its own registration.
fn verify_packed_self_attestation(
    attestation: &AttestationObject,
    client_data_hash: &[u8; 32],
) -> Result<(), PasskeyError> {
    let public_key = &attestation.credential()?.public_key;

    let alg = match attestation.statement_entry("alg") {
        Some(CborValue::Integer(i)) => i64::try_from(*i).ok(),
        _ => None,
    }
    .ok_or_else(|| {
        PasskeyError::InvalidAttestation("Missing or invalid alg in packed attStmt".to_string())
    })?;

    if alg != public_key.algorithm().cose_id() {
        return Err(PasskeyError::InvalidAttestation(format!(
            "Packed attStmt alg {alg} does not match credential key"
        )));
    }

    let Some(CborValue::Bytes(sig)) = attestation.statement_entry("sig") else {
        return Err(PasskeyError::InvalidAttestation(
            "Missing or invalid sig in packed attStmt".to_string(),
        ));
    };

    let message = signed_message(&attestation.auth_data.raw, client_data_hash);
    verify_signature(public_key, &message, sig)
}
