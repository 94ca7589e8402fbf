use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::PasskeyConfig;
use crate::passkey::types::{Challenge, CoseAlgorithm, UserCredential};
use crate::utils::{base64url_decode, base64url_encode};

/// Binary field as carried in JSON: a base64url string or an array of bytes.
/// Always serialized as unpadded base64url.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Base64UrlBytes(pub Vec<u8>);

impl Base64UrlBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Base64UrlBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Base64UrlBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base64UrlBytes(<{} bytes>)", self.0.len())
    }
}

impl Serialize for Base64UrlBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64url_encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64UrlBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Array(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => base64url_decode(&text)
                .map(Self)
                .map_err(serde::de::Error::custom),
            Repr::Array(bytes) => Ok(Self(bytes)),
        }
    }
}

/// Body of both start steps.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StartRequest {
    pub name: String,
}

/// `PublicKeyCredential` returned by `navigator.credentials.create()`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCredential {
    pub id: String,
    pub raw_id: Base64UrlBytes,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AuthenticatorAttestationResponse,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    pub attestation_object: Base64UrlBytes,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFinishRequest {
    pub name: String,
    pub attestation_response: RegisterCredential,
}

/// `PublicKeyCredential` returned by `navigator.credentials.get()`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorResponse {
    pub id: String,
    pub raw_id: Base64UrlBytes,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AuthenticatorAssertionResponse,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    pub authenticator_data: Base64UrlBytes,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    pub signature: Base64UrlBytes,
    #[serde(default)]
    pub user_handle: Option<Base64UrlBytes>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationFinishRequest {
    pub name: String,
    pub assertion_response: AuthenticatorResponse,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialUserEntity {
    pub id: Base64UrlBytes,
    pub name: String,
    pub display_name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub alg: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<&'static str>,
    pub resident_key: &'static str,
    pub user_verification: &'static str,
}

/// Options for `navigator.credentials.create()`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: Base64UrlBytes,
    pub rp: RelyingParty,
    pub user: PublicKeyCredentialUserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Milliseconds
    pub timeout: u32,
    pub attestation: &'static str,
    pub authenticator_selection: AuthenticatorSelection,
}

impl RegistrationOptions {
    pub(crate) fn new(config: &PasskeyConfig, challenge: &Challenge) -> Self {
        Self {
            challenge: challenge.value.clone().into(),
            rp: RelyingParty {
                name: config.rp_name.clone(),
                id: config.rp_id.clone(),
            },
            user: PublicKeyCredentialUserEntity {
                id: challenge.user_handle.clone().unwrap_or_default().into(),
                name: challenge.user_name.clone(),
                display_name: challenge.user_name.clone(),
            },
            pub_key_cred_params: CoseAlgorithm::SUPPORTED
                .iter()
                .map(|alg| PubKeyCredParam {
                    type_: "public-key",
                    alg: alg.cose_id(),
                })
                .collect(),
            timeout: config.timeout_ms(),
            attestation: config.attestation.as_str(),
            authenticator_selection: AuthenticatorSelection {
                authenticator_attachment: config.authenticator_attachment.map(|a| a.as_str()),
                resident_key: "preferred",
                user_verification: config.user_verification.as_str(),
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AllowCredential {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub id: Base64UrlBytes,
}

/// Options for `navigator.credentials.get()`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: Base64UrlBytes,
    /// Milliseconds
    pub timeout: u32,
    pub rp_id: String,
    pub allow_credentials: Vec<AllowCredential>,
    pub user_verification: &'static str,
}

impl AuthenticationOptions {
    pub(crate) fn new(
        config: &PasskeyConfig,
        challenge: &Challenge,
        credential: &UserCredential,
    ) -> Self {
        Self {
            challenge: challenge.value.clone().into(),
            timeout: config.timeout_ms(),
            rp_id: config.rp_id.clone(),
            allow_credentials: vec![AllowCredential {
                type_: "public-key",
                id: credential.credential_id.clone().into(),
            }],
            user_verification: config.user_verification.as_str(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub name: String,
    pub credential_id: Base64UrlBytes,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    pub name: String,
    pub sign_counter: u32,
}
