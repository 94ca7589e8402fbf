mod ceremony;
mod challenge;
mod codec;
pub(crate) mod errors;
mod types;
mod verify;


pub use ceremony::{
    AllowCredential, AuthenticationFinishRequest, AuthenticationOptions, AuthenticationResult,
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    AuthenticatorSelection, Base64UrlBytes, CeremonyEvent, CeremonyState, PasskeyCeremony,
    PubKeyCredParam, PublicKeyCredentialUserEntity, RegisterCredential,
    RegistrationFinishRequest, RegistrationOptions, RegistrationResult, RelyingParty,
    StartRequest,
};
pub use challenge::ChallengeManager;
pub use codec::{AttestationObject, AttestedCredentialData, AuthenticatorData, AuthenticatorFlags, Codec};
pub use errors::PasskeyError;
pub use types::{CeremonyType, Challenge, CoseAlgorithm, EcCurve, PublicKey, UserCredential};
pub use verify::{CollectedClientData, Verifier};
