use std::collections::BTreeMap;

use ciborium::value::Value as CborValue;

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CoseAlgorithm, EcCurve, PublicKey};

// COSE key common parameters (RFC 9052 §7.1)
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
// Key type specific parameters (RFC 9053 §7)
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;
const LABEL_RSA_N: i64 = -1;
const LABEL_RSA_E: i64 = -2;

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

const CRV_P256: i64 = 1;
const CRV_P384: i64 = 2;
const CRV_ED25519: i64 = 6;

const ED25519_KEY_LEN: usize = 32;
const RSA_MIN_MODULUS_LEN: usize = 256;
const RSA_MAX_MODULUS_LEN: usize = 1024;
const RSA_MAX_EXPONENT_LEN: usize = 8;

fn malformed(msg: impl Into<String>) -> PasskeyError {
    PasskeyError::MalformedInput(msg.into())
}

struct CoseKeyMap<'a> {
    params: BTreeMap<i64, &'a CborValue>,
}

impl<'a> CoseKeyMap<'a> {
    fn new(value: &'a CborValue) -> Result<Self, PasskeyError> {
        let entries = value
            .as_map()
            .ok_or_else(|| malformed("COSE key is not a map"))?;

        let mut params = BTreeMap::new();
        for (label, param) in entries {
            let label = match label {
                CborValue::Integer(i) => i64::try_from(*i)
                    .map_err(|_| malformed("COSE key label out of range"))?,
                _ => return Err(malformed("COSE key label is not an integer")),
            };
            if params.insert(label, param).is_some() {
                return Err(malformed(format!("Duplicate COSE key label {label}")));
            }
        }
        Ok(Self { params })
    }

    fn int(&self, label: i64, name: &str) -> Result<i64, PasskeyError> {
        match self.params.get(&label) {
            Some(CborValue::Integer(i)) => {
                i64::try_from(*i).map_err(|_| malformed(format!("COSE {name} out of range")))
            }
            Some(_) => Err(malformed(format!("COSE {name} is not an integer"))),
            None => Err(malformed(format!("COSE key missing {name}"))),
        }
    }

    fn bytes(&self, label: i64, name: &str) -> Result<Vec<u8>, PasskeyError> {
        match self.params.get(&label) {
            Some(CborValue::Bytes(b)) => Ok(b.clone()),
            Some(_) => Err(malformed(format!("COSE {name} is not a byte string"))),
            None => Err(malformed(format!("COSE key missing {name}"))),
        }
    }

    fn fixed_bytes(&self, label: i64, name: &str, len: usize) -> Result<Vec<u8>, PasskeyError> {
        let bytes = self.bytes(label, name)?;
        if bytes.len() != len {
            return Err(malformed(format!(
                "COSE {name} must be {len} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

/// Interprets a decoded CBOR item as a COSE_Key.
pub(super) fn public_key_from_cbor(value: &CborValue) -> Result<PublicKey, PasskeyError> {
    let key = CoseKeyMap::new(value)?;

    let kty = key.int(LABEL_KTY, "kty")?;
    let alg_id = key.int(LABEL_ALG, "alg")?;
    let alg = CoseAlgorithm::from_cose(alg_id)
        .ok_or_else(|| malformed(format!("Unsupported COSE algorithm {alg_id}")))?;

    match (kty, alg) {
        (KTY_EC2, CoseAlgorithm::Es256 | CoseAlgorithm::Es384) => {
            let crv = key.int(LABEL_CRV, "crv")?;
            let curve = match (crv, alg) {
                (CRV_P256, CoseAlgorithm::Es256) => EcCurve::P256,
                (CRV_P384, CoseAlgorithm::Es384) => EcCurve::P384,
                _ => {
                    return Err(malformed(format!(
                        "Curve {crv} does not match algorithm {alg_id}"
                    )));
                }
            };
            let len = curve.coordinate_len();
            Ok(PublicKey::Ec2 {
                alg,
                curve,
                x: key.fixed_bytes(LABEL_X, "x", len)?,
                y: key.fixed_bytes(LABEL_Y, "y", len)?,
            })
        }
        (KTY_OKP, CoseAlgorithm::EdDsa) => {
            let crv = key.int(LABEL_CRV, "crv")?;
            if crv != CRV_ED25519 {
                return Err(malformed(format!("Unsupported OKP curve {crv}")));
            }
            Ok(PublicKey::Okp {
                alg,
                x: key.fixed_bytes(LABEL_X, "x", ED25519_KEY_LEN)?,
            })
        }
        (KTY_RSA, CoseAlgorithm::Rs256) => {
            let n = key.bytes(LABEL_RSA_N, "n")?;
            if !(RSA_MIN_MODULUS_LEN..=RSA_MAX_MODULUS_LEN).contains(&n.len()) {
                return Err(malformed(format!(
                    "Unsupported RSA modulus length {}",
                    n.len()
                )));
            }
            let e = key.bytes(LABEL_RSA_E, "e")?;
            if e.is_empty() || e.len() > RSA_MAX_EXPONENT_LEN {
                return Err(malformed("Invalid RSA exponent length"));
            }
            Ok(PublicKey::Rsa { alg, n, e })
        }
        _ => Err(malformed(format!(
            "Key type {kty} does not match algorithm {alg_id}"
        ))),
    }
}
