use ring::signature::{
    ECDSA_P256_SHA256_ASN1, ECDSA_P384_SHA384_ASN1, ED25519, RSA_PKCS1_2048_8192_SHA256,
    RsaPublicKeyComponents, UnparsedPublicKey,
};

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CoseAlgorithm, PublicKey};

/// The bytes an authenticator signs: `authData || SHA-256(clientDataJSON)`.
pub(crate) fn signed_message(auth_data: &[u8], client_data_hash: &[u8; 32]) -> Vec<u8> {
    let mut message = Vec::with_capacity(auth_data.len() + client_data_hash.len());
    message.extend_from_slice(auth_data);
    message.extend_from_slice(client_data_hash);
    message
}

/// Verifies `signature` over `message` with the algorithm the key is tagged with.
pub(crate) fn verify_signature(
    key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), PasskeyError> {
    let result = match key {
        PublicKey::Ec2 { alg, x, y, .. } => {
            let algorithm = match alg {
                CoseAlgorithm::Es256 => &ECDSA_P256_SHA256_ASN1,
                CoseAlgorithm::Es384 => &ECDSA_P384_SHA384_ASN1,
                _ => return Err(PasskeyError::InvalidSignature),
            };
            let mut point = Vec::with_capacity(1 + x.len() + y.len());
            point.push(0x04);
            point.extend_from_slice(x);
            point.extend_from_slice(y);
            UnparsedPublicKey::new(algorithm, &point).verify(message, signature)
        }
        PublicKey::Okp { x, .. } => UnparsedPublicKey::new(&ED25519, x).verify(message, signature),
        PublicKey::Rsa { n, e, .. } => RsaPublicKeyComponents {
            n: n.as_slice(),
            e: e.as_slice(),
        }
        .verify(&RSA_PKCS1_2048_8192_SHA256, message, signature),
    };

    result.map_err(|_| {
        tracing::debug!(
            "Signature verification failed for {:?} key",
            key.algorithm()
        );
        PasskeyError::InvalidSignature
    })
}
