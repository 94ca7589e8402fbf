use ciborium::value::Value as CborValue;

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::PublicKey;

use super::cose::public_key_from_cbor;
use super::reader::ByteReader;

const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// Authenticator data flags byte (WebAuthn §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorFlags(pub u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKUP_STATE: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    fn has(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn user_present(&self) -> bool {
        self.has(Self::USER_PRESENT)
    }

    pub fn user_verified(&self) -> bool {
        self.has(Self::USER_VERIFIED)
    }

    pub fn backup_eligible(&self) -> bool {
        self.has(Self::BACKUP_ELIGIBLE)
    }

    pub fn backup_state(&self) -> bool {
        self.has(Self::BACKUP_STATE)
    }

    pub fn attested_credential_data(&self) -> bool {
        self.has(Self::ATTESTED_CREDENTIAL_DATA)
    }

    pub fn extension_data(&self) -> bool {
        self.has(Self::EXTENSION_DATA)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    pub public_key: PublicKey,
}

/// Decoded authenticator data. `raw` is the exact input, which is what the
/// authenticator signed over.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: AuthenticatorFlags,
    pub sign_counter: u32,
    pub attested_credential: Option<AttestedCredentialData>,
    pub extensions: Option<CborValue>,
    pub raw: Vec<u8>,
}

pub(super) fn decode(bytes: &[u8]) -> Result<AuthenticatorData, PasskeyError> {
    let mut reader = ByteReader::new(bytes);

    let rp_id_hash = reader.array::<32>("rpIdHash")?;
    let flags = AuthenticatorFlags(reader.u8("flags")?);
    let sign_counter = reader.u32_be("signCount")?;

    if flags.backup_state() && !flags.backup_eligible() {
        return Err(PasskeyError::MalformedInput(
            "Backup state set without backup eligibility".to_string(),
        ));
    }

    let attested_credential = if flags.attested_credential_data() {
        Some(decode_attested_credential(&mut reader)?)
    } else {
        None
    };

    let extensions = if flags.extension_data() {
        let value = reader.cbor("extensions")?;
        if !value.is_map() {
            return Err(PasskeyError::MalformedInput(
                "Extensions are not a CBOR map".to_string(),
            ));
        }
        Some(value)
    } else {
        None
    };

    reader.finish("authenticator data")?;

    Ok(AuthenticatorData {
        rp_id_hash,
        flags,
        sign_counter,
        attested_credential,
        extensions,
        raw: bytes.to_vec(),
    })
}

fn decode_attested_credential(
    reader: &mut ByteReader<'_>,
) -> Result<AttestedCredentialData, PasskeyError> {
    let aaguid = reader.array::<16>("aaguid")?;

    let credential_id_len = reader.u16_be("credentialIdLength")? as usize;
    if credential_id_len == 0 || credential_id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(PasskeyError::MalformedInput(format!(
            "Credential ID length {credential_id_len} out of range"
        )));
    }
    let credential_id = reader.take(credential_id_len, "credentialId")?.to_vec();

    let public_key = public_key_from_cbor(&reader.cbor("credentialPublicKey")?)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        public_key,
    })
}
