//! Decoders for the binary structures an authenticator returns.
//!
//! All three entry points check the configured size ceiling before touching
//! the input and fail as a whole with `MalformedInput`; no partially decoded
//! record is ever returned.

mod attestation;
mod authenticator_data;
mod cose;
mod reader;

pub use attestation::AttestationObject;
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};

use crate::config::DEFAULT_MAX_INPUT_SIZE;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::PublicKey;

use reader::ByteReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    max_input_size: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_SIZE)
    }
}

impl Codec {
    pub fn new(max_input_size: usize) -> Self {
        Self { max_input_size }
    }

    pub(crate) fn check_size(&self, size: usize) -> Result<(), PasskeyError> {
        if size > self.max_input_size {
            return Err(PasskeyError::InputTooLarge {
                size,
                limit: self.max_input_size,
            });
        }
        Ok(())
    }

    /// Decodes a registration attestation object. The attested credential
    /// data flag must be set.
    pub fn decode_attestation_object(
        &self,
        bytes: &[u8],
    ) -> Result<AttestationObject, PasskeyError> {
        self.check_size(bytes.len())?;
        attestation::decode(bytes)
    }

    pub fn decode_authenticator_data(
        &self,
        bytes: &[u8],
    ) -> Result<AuthenticatorData, PasskeyError> {
        self.check_size(bytes.len())?;
        authenticator_data::decode(bytes)
    }

    /// Decodes a standalone CBOR COSE_Key.
    pub fn decode_credential_public_key(&self, bytes: &[u8]) -> Result<PublicKey, PasskeyError> {
        self.check_size(bytes.len())?;
        let mut reader = ByteReader::new(bytes);
        let value = reader.cbor("credentialPublicKey")?;
        reader.finish("credentialPublicKey")?;
        cose::public_key_from_cbor(&value)
    }
}
