use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{Router, post},
};

use passkey_ceremony::{
    AuthenticationFinishRequest, AuthenticationOptions, AuthenticationResult, PasskeyCeremony,
    RegistrationFinishRequest, RegistrationOptions, RegistrationResult, StartRequest,
};

use crate::IntoResponseError;

type CeremonyState = Arc<PasskeyCeremony>;

/// Routes for both ceremonies, bound to one engine instance.
pub fn passkey_router(ceremony: Arc<PasskeyCeremony>) -> Router {
    Router::new()
        .nest("/register", router_register())
        .nest("/auth", router_auth())
        .with_state(ceremony)
}

fn router_register() -> Router<CeremonyState> {
    Router::new()
        .route("/start", post(handle_start_registration))
        .route("/finish", post(handle_finish_registration))
}

fn router_auth() -> Router<CeremonyState> {
    Router::new()
        .route("/start", post(handle_start_authentication))
        .route("/finish", post(handle_finish_authentication))
}

pub(crate) async fn handle_start_registration(
    State(ceremony): State<CeremonyState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<RegistrationOptions>, (StatusCode, String)> {
    let options = ceremony
        .start_registration(&request.name)
        .await
        .into_start_response_error()?;
    Ok(Json(options))
}

pub(crate) async fn handle_finish_registration(
    State(ceremony): State<CeremonyState>,
    Json(request): Json<RegistrationFinishRequest>,
) -> Result<Json<RegistrationResult>, (StatusCode, String)> {
    let result = ceremony
        .finish_registration(&request)
        .await
        .into_response_error()?;
    tracing::info!("Registered passkey for {}", result.name);
    Ok(Json(result))
}

pub(crate) async fn handle_start_authentication(
    State(ceremony): State<CeremonyState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<AuthenticationOptions>, (StatusCode, String)> {
    let options = ceremony
        .start_authentication(&request.name)
        .await
        .into_start_response_error()?;
    Ok(Json(options))
}

pub(crate) async fn handle_finish_authentication(
    State(ceremony): State<CeremonyState>,
    Json(request): Json<AuthenticationFinishRequest>,
) -> Result<Json<AuthenticationResult>, (StatusCode, String)> {
    let result = ceremony
        .finish_authentication(&request)
        .await
        .into_response_error()?;
    tracing::info!("Authenticated {}", result.name);
    Ok(Json(result))
}
