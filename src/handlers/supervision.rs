//! Moderator and permission management endpoints, gated behind the
//! `super manage mods` permission.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::dto::{
    build_index_dto, group_by_section, ModeratorIndexDto, PermissionDto, SectionDto,
};
use crate::catalog::{CatalogError, PermissionCatalog, PermissionRef};
use crate::database::models::Moderator;
use crate::error::ApiError;
use crate::middleware::CurrentModerator;
use crate::state::AppState;

/// Permissions this feature gates on, declared at startup.
#[derive(Clone)]
pub struct SupervisionPermissions {
    pub manage_mods: PermissionRef,
}

pub fn declare(catalog: &mut PermissionCatalog) -> Result<SupervisionPermissions, CatalogError> {
    let section = catalog.add_section("super")?;
    let manage_mods = catalog.add_permission(&section, "manage mods")?;
    Ok(SupervisionPermissions { manage_mods })
}

/// GET /mub/sections - the full taxonomy, each section with its permissions.
pub async fn sections_list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
) -> Result<Json<Vec<SectionDto>>, ApiError> {
    state
        .evaluator
        .require(&current.moderator, &state.permissions.manage_mods)
        .await?;

    let store = state.permissions_store();
    let sections = store.all_sections().await?;
    let permissions = store.all_permissions().await?;
    Ok(Json(group_by_section(sections, permissions)))
}

/// GET /mub/permissions - flat permission listing.
pub async fn permissions_list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
) -> Result<Json<Vec<PermissionDto>>, ApiError> {
    state
        .evaluator
        .require(&current.moderator, &state.permissions.manage_mods)
        .await?;

    let permissions = state
        .permissions_store()
        .all_permissions()
        .await?
        .into_iter()
        .map(PermissionDto::from)
        .collect();
    Ok(Json(permissions))
}

#[derive(Debug, Deserialize)]
pub struct ModeratorSearchQuery {
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// GET /mub/moderators - paginated listing, acting moderator excluded.
pub async fn moderators_list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
    Query(query): Query<ModeratorSearchQuery>,
) -> Result<Json<Vec<ModeratorIndexDto>>, ApiError> {
    state
        .evaluator
        .require(&current.moderator, &state.permissions.manage_mods)
        .await?;

    let max_limit = crate::config::config().api.max_page_limit;
    let limit = query.limit.unwrap_or(20).clamp(1, max_limit);
    let offset = query.offset.max(0);

    let moderators = state
        .moderators()
        .search(offset, limit, query.search.as_deref(), Some(current.moderator.id))
        .await?;

    let mut dtos = Vec::with_capacity(moderators.len());
    for moderator in &moderators {
        dtos.push(build_index_dto(&state, moderator).await?);
    }
    Ok(Json(dtos))
}

#[derive(Debug, Deserialize)]
pub struct CreateModeratorRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub append_perms: Vec<i64>,
}

/// POST /mub/moderators - create an account with optional initial grants.
///
/// Every requested permission is validated (it must exist, and the actor must
/// be allowed to pass it on) inside the creating transaction, so a validation
/// failure never leaves a partially granted moderator behind.
pub async fn moderator_create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
    Json(payload): Json<CreateModeratorRequest>,
) -> Result<Json<ModeratorIndexDto>, ApiError> {
    state
        .evaluator
        .require(&current.moderator, &state.permissions.manage_mods)
        .await?;

    let target = state
        .moderators()
        .create_with_grants(
            &current.moderator,
            &payload.username,
            &payload.password,
            &payload.append_perms,
        )
        .await?;

    tracing::info!(
        actor = %current.moderator.username,
        target = %target.username,
        grants = payload.append_perms.len(),
        "moderator created"
    );

    let dto = build_index_dto(&state, &target).await?;
    Ok(Json(dto))
}

#[derive(Debug, Deserialize)]
pub struct UpdateModeratorRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub append_perms: Vec<i64>,
    #[serde(default)]
    pub remove_perms: Vec<i64>,
}

/// POST /mub/moderators/:id - rename, reset password, edit grants.
///
/// Self-targeting is refused, and superuser accounts can only be changed
/// through the CLI. Credential changes do not revoke the target's existing
/// sessions.
pub async fn moderator_update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
    Path(moderator_id): Path<i64>,
    Json(payload): Json<UpdateModeratorRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .evaluator
        .require(&current.moderator, &state.permissions.manage_mods)
        .await?;

    let target = find_target(&state, moderator_id).await?;
    if current.moderator.id == target.id {
        return Err(ApiError::bad_request("Target is the source"));
    }
    if target.superuser {
        return Err(ApiError::forbidden("Can't edit a superuser via the web api"));
    }

    state
        .moderators()
        .apply_edits(
            &current.moderator,
            target.id,
            payload.username.as_deref(),
            payload.password.as_deref(),
            &payload.append_perms,
            &payload.remove_perms,
        )
        .await?;

    tracing::info!(
        actor = %current.moderator.username,
        target = %target.username,
        "moderator updated"
    );
    Ok(Json(json!({ "success": true })))
}

/// DELETE /mub/moderators/:id
pub async fn moderator_delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentModerator>,
    Path(moderator_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state
        .evaluator
        .require(&current.moderator, &state.permissions.manage_mods)
        .await?;

    let target = find_target(&state, moderator_id).await?;
    if current.moderator.id == target.id {
        return Err(ApiError::bad_request("Target is the source"));
    }
    if target.superuser {
        return Err(ApiError::forbidden("Can't delete a superuser via the web api"));
    }

    state.moderators().delete(target.id).await?;
    tracing::info!(
        actor = %current.moderator.username,
        target = %target.username,
        "moderator deleted"
    );
    Ok(Json(json!({ "success": true })))
}

async fn find_target(state: &AppState, moderator_id: i64) -> Result<Moderator, ApiError> {
    state
        .moderators()
        .find_by_id(moderator_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Moderator not found"))
}
