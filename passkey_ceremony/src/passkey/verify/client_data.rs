use serde::Deserialize;

use crate::passkey::errors::PasskeyError;
use crate::utils::{base64url_decode, sha256};

#[derive(Deserialize)]
struct ClientDataWire {
    #[serde(rename = "type")]
    type_: String,
    challenge: String,
    origin: String,
    #[serde(rename = "crossOrigin")]
    cross_origin: Option<bool>,
}

/// Parsed `clientDataJSON`, keeping the exact bytes the client hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedClientData {
    pub type_: String,
    /// Challenge bytes as echoed by the client
    pub challenge: Vec<u8>,
    pub origin: String,
    pub cross_origin: Option<bool>,
    pub raw: Vec<u8>,
}

impl CollectedClientData {
    pub fn parse(raw: &[u8], max_input_size: usize) -> Result<Self, PasskeyError> {
        if raw.len() > max_input_size {
            return Err(PasskeyError::InputTooLarge {
                size: raw.len(),
                limit: max_input_size,
            });
        }

        let wire: ClientDataWire = serde_json::from_slice(raw)
            .map_err(|e| PasskeyError::MalformedInput(format!("Invalid client data: {e}")))?;

        let challenge = base64url_decode(&wire.challenge).map_err(|_| {
            PasskeyError::MalformedInput("Client data challenge is not base64url".to_string())
        })?;

        Ok(Self {
            type_: wire.type_,
            challenge,
            origin: wire.origin,
            cross_origin: wire.cross_origin,
            raw: raw.to_vec(),
        })
    }

    /// SHA-256 of the raw JSON, the second half of every signed message.
    pub fn hash(&self) -> [u8; 32] {
        sha256(&self.raw)
    }
}
