pub mod base;
pub mod dto;
pub mod supervision;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/mub/sign-in", post(base::sign_in));

    let protected = Router::new()
        .route("/mub/sign-out", post(base::sign_out))
        .route(
            "/mub/my-settings",
            get(base::my_settings_get).post(base::my_settings_post),
        )
        .route("/mub/sections", get(supervision::sections_list))
        .route("/mub/permissions", get(supervision::permissions_list))
        .route(
            "/mub/moderators",
            get(supervision::moderators_list).post(supervision::moderator_create),
        )
        .route(
            "/mub/moderators/:moderator_id",
            post(supervision::moderator_update).delete(supervision::moderator_delete),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "MUB API",
            "version": version,
            "description": "Moderator admin backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "sign_in": "/mub/sign-in (public - token acquisition)",
                "sign_out": "/mub/sign-out (protected)",
                "my_settings": "/mub/my-settings (protected)",
                "sections": "/mub/sections (protected, requires 'super manage mods')",
                "permissions": "/mub/permissions (protected, requires 'super manage mods')",
                "moderators": "/mub/moderators[/:moderator_id] (protected, requires 'super manage mods')",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::health_check(&state.pool).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
