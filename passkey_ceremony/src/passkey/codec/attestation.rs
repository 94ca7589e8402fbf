use ciborium::value::Value as CborValue;

use crate::passkey::errors::PasskeyError;

use super::authenticator_data::{self, AttestedCredentialData, AuthenticatorData};
use super::reader::ByteReader;

/// Decoded attestation object returned by `navigator.credentials.create()`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    /// Attestation statement format identifier, e.g. `none` or `packed`
    pub fmt: String,
    pub auth_data: AuthenticatorData,
    /// Format-specific attestation statement entries
    pub att_stmt: Vec<(CborValue, CborValue)>,
}

impl AttestationObject {
    /// The attested credential, which decoding guarantees is present.
    pub fn credential(&self) -> Result<&AttestedCredentialData, PasskeyError> {
        self.auth_data.attested_credential.as_ref().ok_or_else(|| {
            PasskeyError::MalformedInput("Attested credential data missing".to_string())
        })
    }

    /// Looks up a text-keyed entry of the attestation statement.
    pub fn statement_entry(&self, name: &str) -> Option<&CborValue> {
        self.att_stmt
            .iter()
            .find(|(k, _)| k.as_text() == Some(name))
            .map(|(_, v)| v)
    }
}

pub(super) fn decode(bytes: &[u8]) -> Result<AttestationObject, PasskeyError> {
    let mut reader = ByteReader::new(bytes);
    let value = reader.cbor("attestationObject")?;
    reader.finish("attestationObject")?;

    let CborValue::Map(entries) = value else {
        return Err(PasskeyError::MalformedInput(
            "Attestation object is not a CBOR map".to_string(),
        ));
    };

    let mut fmt = None;
    let mut auth_data = None;
    let mut att_stmt = None;

    for (key, value) in entries {
        let slot = match key.as_text() {
            Some("fmt") => &mut fmt,
            Some("authData") => &mut auth_data,
            Some("attStmt") => &mut att_stmt,
            _ => continue,
        };
        if slot.replace(value).is_some() {
            return Err(PasskeyError::MalformedInput(
                "Duplicate key in attestation object".to_string(),
            ));
        }
    }

    let fmt = match fmt {
        Some(CborValue::Text(fmt)) => fmt,
        Some(_) => return Err(PasskeyError::MalformedInput("fmt is not text".to_string())),
        None => return Err(PasskeyError::MalformedInput("Missing fmt".to_string())),
    };

    let auth_data = match auth_data {
        Some(CborValue::Bytes(raw)) => authenticator_data::decode(&raw)?,
        Some(_) => {
            return Err(PasskeyError::MalformedInput(
                "authData is not a byte string".to_string(),
            ));
        }
        None => return Err(PasskeyError::MalformedInput("Missing authData".to_string())),
    };

    let att_stmt = match att_stmt {
        Some(CborValue::Map(stmt)) => stmt,
        Some(_) => {
            return Err(PasskeyError::MalformedInput(
                "attStmt is not a map".to_string(),
            ));
        }
        None => return Err(PasskeyError::MalformedInput("Missing attStmt".to_string())),
    };

    if auth_data.attested_credential.is_none() {
        return Err(PasskeyError::MalformedInput(
            "Attested credential data flag not set".to_string(),
        ));
    }

    Ok(AttestationObject {
        fmt,
        auth_data,
        att_stmt,
    })
}
