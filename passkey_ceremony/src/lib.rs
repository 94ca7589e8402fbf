//! passkey_ceremony - WebAuthn ceremony engine
//!
//! This crate implements the server side of the two passkey ceremonies
//! (registration and authentication): challenge issuance, decoding of the
//! binary structures returned by authenticators, and verification of the
//! signed responses against stored key material.
//!
//! Storage is injected through the [`CredentialStore`] and [`ChallengeStore`]
//! traits, so the same engine runs against the in-memory stores in tests and
//! against SQLite/Redis in a deployment.

mod config;
mod passkey;
mod storage;
mod utils;

pub use config::{
    AttestationPreference, AuthenticatorAttachment, DEFAULT_MAX_INPUT_SIZE, PasskeyConfig,
    UserVerification,
};

pub use passkey::{
    AllowCredential, AttestationObject, AttestedCredentialData, AuthenticationFinishRequest,
    AuthenticationOptions, AuthenticationResult, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorData, AuthenticatorFlags,
    AuthenticatorResponse, AuthenticatorSelection, Base64UrlBytes, CeremonyEvent, CeremonyState,
    CeremonyType, Challenge, ChallengeManager, Codec, CollectedClientData, CoseAlgorithm, EcCurve,
    PasskeyCeremony, PasskeyError, PubKeyCredParam, PublicKey, PublicKeyCredentialUserEntity,
    RegisterCredential, RegistrationFinishRequest, RegistrationOptions, RegistrationResult,
    RelyingParty, StartRequest, UserCredential, Verifier,
};

pub use storage::{
    ChallengeKey, ChallengeSlot, ChallengeStore, ChallengeStoreKind, CredentialStore,
    CredentialStoreKind, InMemoryChallengeStore, InMemoryCredentialStore, RedisChallengeStore,
    SqliteCredentialStore, StorageError, StoreConfig,
};
