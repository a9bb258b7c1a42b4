//! Session and self-service endpoints: sign-in, sign-out, own settings.

use axum::{extract::State, response::Json, Extension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dto::{build_self_dto, SelfDto};
use crate::auth::{generate_jwt, Claims};
use crate::database::models::InterfaceMode;
use crate::error::ApiError;
use crate::middleware::CurrentModerator;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub moderator: SelfDto,
}

/// POST /mub/sign-in - authenticate with username/password, receive a JWT.
///
/// The two failure reasons stay distinguishable for UI messaging.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let moderator = state
        .moderators()
        .find_by_name(&payload.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Moderator does not exist"))?;

    if !state.moderators().verify_password(&moderator, &payload.password) {
        return Err(ApiError::unauthorized("Wrong password"));
    }

    let claims = Claims::new(moderator.id, moderator.username.clone());
    let token = generate_jwt(&claims)?;

    tracing::info!(moderator = %moderator.username, "moderator signed in");

    let moderator_dto = build_self_dto(&state, &moderator).await?;
    Ok(Json(SignInResponse {
        token,
        moderator: moderator_dto,
    }))
}

/// POST /mub/sign-out - block the presented token's jti so the session can
/// not be replayed before its natural expiry.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
) -> Result<Json<Value>, ApiError> {
    state.sessions().block(&current.jti).await?;
    tracing::info!(moderator = %current.moderator.username, "moderator signed out");
    Ok(Json(json!({ "success": true })))
}

/// GET /mub/my-settings - own account view with per-section permissions.
pub async fn my_settings_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
) -> Result<Json<SelfDto>, ApiError> {
    let dto = build_self_dto(&state, &current.moderator).await?;
    Ok(Json(dto))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub mode: Option<String>,
}

/// POST /mub/my-settings - update the cosmetic interface mode.
pub async fn my_settings_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(raw) = payload.mode {
        let mode = InterfaceMode::from_str(&raw)
            .ok_or_else(|| ApiError::bad_request("Wrong interface mode"))?;
        state.moderators().set_mode(current.moderator.id, mode).await?;
    }
    Ok(Json(json!({ "success": true })))
}
