//! passkey_ceremony_axum - HTTP endpoints for the passkey ceremonies
//!
//! Mounts the four ceremony steps as JSON endpoints on an axum [`Router`]:
//!
//! - `POST /register/start` and `POST /register/finish`
//! - `POST /auth/start` and `POST /auth/finish`
//!
//! [`Router`]: axum::Router

mod error;
mod passkey;

pub use error::IntoResponseError;
pub use passkey::passkey_router;

// Re-export the engine so applications need a single dependency
pub use passkey_ceremony::{PasskeyCeremony, PasskeyConfig, StoreConfig};
