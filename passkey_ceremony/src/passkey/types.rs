use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::base64url_encode;

/// Which of the two ceremonies a challenge belongs to.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyType {
    Registration,
    Authentication,
}

impl CeremonyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Authentication => "authentication",
        }
    }

    /// The clientDataJSON `type` member the browser sets for this ceremony.
    pub fn client_data_type(&self) -> &'static str {
        match self {
            Self::Registration => "webauthn.create",
            Self::Authentication => "webauthn.get",
        }
    }
}

impl fmt::Display for CeremonyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-time challenge bound to a user and a ceremony.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
    /// Raw random bytes; the client sees them base64url encoded
    pub value: Vec<u8>,
    pub ceremony: CeremonyType,
    pub user_name: String,
    /// WebAuthn user id advertised in registration options
    pub user_handle: Option<Vec<u8>>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// Transport form of the challenge value.
    pub fn encoded(&self) -> String {
        base64url_encode(&self.value)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Keeps challenge bytes out of debug logs.
impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge")
            .field("value", &format_args!("<{} bytes>", self.value.len()))
            .field("ceremony", &self.ceremony)
            .field("user_name", &self.user_name)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// COSE algorithm identifiers accepted for credential keys.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum CoseAlgorithm {
    /// ECDSA with SHA-256 on P-256 (-7)
    Es256,
    /// ECDSA with SHA-384 on P-384 (-35)
    Es384,
    /// Ed25519 (-8)
    EdDsa,
    /// RSASSA-PKCS1-v1_5 with SHA-256 (-257)
    Rs256,
}

impl CoseAlgorithm {
    /// Algorithms offered to the client, in order of preference.
    pub const SUPPORTED: [CoseAlgorithm; 4] = [Self::Es256, Self::EdDsa, Self::Es384, Self::Rs256];

    pub fn from_cose(id: i64) -> Option<Self> {
        match id {
            -7 => Some(Self::Es256),
            -35 => Some(Self::Es384),
            -8 => Some(Self::EdDsa),
            -257 => Some(Self::Rs256),
            _ => None,
        }
    }

    pub fn cose_id(&self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::EdDsa => -8,
            Self::Rs256 => -257,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
}

impl EcCurve {
    pub(crate) fn coordinate_len(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }
}

/// Decoded credential public key. Never holds private material.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "kty")]
pub enum PublicKey {
    /// Elliptic curve key with affine coordinates
    Ec2 {
        alg: CoseAlgorithm,
        curve: EcCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    /// Ed25519 key
    Okp { alg: CoseAlgorithm, x: Vec<u8> },
    /// RSA key as big-endian modulus and exponent
    Rsa {
        alg: CoseAlgorithm,
        n: Vec<u8>,
        e: Vec<u8>,
    },
}

impl PublicKey {
    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Ec2 { alg, .. } | Self::Okp { alg, .. } | Self::Rsa { alg, .. } => *alg,
        }
    }
}

/// Stored credential record, one per registered user.
///
/// `credential_id` and `public_key` are written once at registration.
/// `sign_counter` only moves forward, through a successful authentication,
/// and every such authentication bumps `use_count`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserCredential {
    /// Unique user name, primary lookup key
    pub name: String,
    /// Authenticator-chosen credential identifier
    pub credential_id: Vec<u8>,
    /// WebAuthn user handle issued at registration
    pub user_handle: Vec<u8>,
    pub public_key: PublicKey,
    pub sign_counter: u32,
    /// Accepted authentications so far. The counter swap compares it, so it
    /// still detects a lost race when the authenticator reports no counter.
    #[serde(default)]
    pub use_count: u64,
    /// AAGUID of the authenticator model
    pub aaguid: [u8; 16],
    /// Attestation statement format seen at registration
    pub attestation_format: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl UserCredential {
    pub fn aaguid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.aaguid).hyphenated().to_string()
    }
}
