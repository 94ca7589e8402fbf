//! A software authenticator for driving ceremonies end to end.
//!
//! It holds a P-256 key and answers registration and authentication options
//! the way a browser plus platform authenticator would, with knobs for the
//! fields the failure tests need to get wrong.

use ciborium::value::Value as CborValue;
use passkey_ceremony::{
    AuthenticationOptions, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    AuthenticatorResponse, RegisterCredential, RegistrationOptions,
};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

const FLAG_UP: u8 = 0x01;
const FLAG_UV: u8 = 0x04;
const FLAG_AT: u8 = 0x40;

pub struct VirtualAuthenticator {
    key: EcdsaKeyPair,
    rng: SystemRandom,
    pub credential_id: Vec<u8>,
    pub aaguid: [u8; 16],
    pub rp_id: String,
    pub origin: String,
    pub user_verified: bool,
    /// Next counter to report; `None` for an authenticator without a counter
    pub counter: Option<u32>,
}

impl VirtualAuthenticator {
    pub fn new(rp_id: &str, origin: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .expect("generate P-256 key");
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
            .expect("load P-256 key");

        let mut credential_id = vec![0u8; 16];
        rng.fill(&mut credential_id).expect("credential id");

        Self {
            key,
            rng,
            credential_id,
            aaguid: [0; 16],
            rp_id: rp_id.to_string(),
            origin: origin.to_string(),
            user_verified: false,
            counter: Some(0),
        }
    }

    /// Same credential id, different key: what an attacker holding only the id has.
    pub fn impersonate(other: &Self) -> Self {
        let mut auth = Self::new(&other.rp_id, &other.origin);
        auth.credential_id = other.credential_id.clone();
        auth
    }

    pub fn create(&mut self, options: &RegistrationOptions) -> RegisterCredential {
        self.create_with_format(options, "none")
    }

    /// `fmt` is "none" or "packed" (self attestation).
    pub fn create_with_format(
        &mut self,
        options: &RegistrationOptions,
        fmt: &str,
    ) -> RegisterCredential {
        let client_data = self.client_data("webauthn.create", options.challenge.as_bytes());
        let auth_data = self.auth_data(FLAG_AT, Some(self.attested_credential_data()));

        let att_stmt = match fmt {
            "packed" => vec![
                (
                    CborValue::Text("alg".into()),
                    CborValue::Integer((-7i64).into()),
                ),
                (
                    CborValue::Text("sig".into()),
                    CborValue::Bytes(self.sign(&auth_data, &client_data)),
                ),
            ],
            _ => vec![],
        };
        let attestation_object = cbor(&CborValue::Map(vec![
            (CborValue::Text("fmt".into()), CborValue::Text(fmt.into())),
            (CborValue::Text("attStmt".into()), CborValue::Map(att_stmt)),
            (
                CborValue::Text("authData".into()),
                CborValue::Bytes(auth_data),
            ),
        ]));

        RegisterCredential {
            id: URL_SAFE_NO_PAD.encode(&self.credential_id),
            raw_id: self.credential_id.clone().into(),
            type_: "public-key".to_string(),
            response: AuthenticatorAttestationResponse {
                attestation_object: attestation_object.into(),
                client_data_json: client_data.into(),
            },
        }
    }

    pub fn get(&mut self, options: &AuthenticationOptions) -> AuthenticatorResponse {
        let client_data = self.client_data("webauthn.get", options.challenge.as_bytes());
        let auth_data = self.auth_data(0, None);
        let signature = self.sign(&auth_data, &client_data);

        AuthenticatorResponse {
            id: URL_SAFE_NO_PAD.encode(&self.credential_id),
            raw_id: self.credential_id.clone().into(),
            type_: "public-key".to_string(),
            response: AuthenticatorAssertionResponse {
                authenticator_data: auth_data.into(),
                client_data_json: client_data.into(),
                signature: signature.into(),
                user_handle: None,
            },
        }
    }

    fn client_data(&self, type_: &str, challenge: &[u8]) -> Vec<u8> {
        serde_json::json!({
            "type": type_,
            "challenge": URL_SAFE_NO_PAD.encode(challenge),
            "origin": self.origin,
            "crossOrigin": false
        })
        .to_string()
        .into_bytes()
    }

    fn auth_data(&mut self, extra_flags: u8, attested: Option<Vec<u8>>) -> Vec<u8> {
        let mut flags = FLAG_UP | extra_flags;
        if self.user_verified {
            flags |= FLAG_UV;
        }

        let counter = match self.counter {
            Some(counter) => {
                // Registration reports the current value, assertions advance it
                let reported = if attested.is_some() { counter } else { counter + 1 };
                self.counter = Some(reported);
                reported
            }
            None => 0,
        };

        let mut out = digest::digest(&digest::SHA256, self.rp_id.as_bytes())
            .as_ref()
            .to_vec();
        out.push(flags);
        out.extend_from_slice(&counter.to_be_bytes());
        if let Some(attested) = attested {
            out.extend_from_slice(&attested);
        }
        out
    }

    fn attested_credential_data(&self) -> Vec<u8> {
        let mut out = self.aaguid.to_vec();
        out.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        out.extend_from_slice(&self.cose_key());
        out
    }

    fn cose_key(&self) -> Vec<u8> {
        // Uncompressed SEC1 point: 0x04 || x || y
        let point = self.key.public_key().as_ref();
        cbor(&CborValue::Map(vec![
            (CborValue::Integer(1.into()), CborValue::Integer(2.into())),
            (
                CborValue::Integer(3.into()),
                CborValue::Integer((-7i64).into()),
            ),
            (
                CborValue::Integer((-1i64).into()),
                CborValue::Integer(1.into()),
            ),
            (
                CborValue::Integer((-2i64).into()),
                CborValue::Bytes(point[1..33].to_vec()),
            ),
            (
                CborValue::Integer((-3i64).into()),
                CborValue::Bytes(point[33..65].to_vec()),
            ),
        ]))
    }

    fn sign(&self, auth_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut message = auth_data.to_vec();
        message.extend_from_slice(digest::digest(&digest::SHA256, client_data).as_ref());
        self.key
            .sign(&self.rng, &message)
            .expect("sign assertion")
            .as_ref()
            .to_vec()
    }
}

fn cbor(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).expect("encode CBOR");
    out
}
