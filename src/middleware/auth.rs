use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::auth::Claims;
use crate::config;
use crate::database::models::Moderator;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated moderator context extracted from a bearer token.
#[derive(Clone, Debug)]
pub struct CurrentModerator {
    pub moderator: Moderator,
    /// Token id of the presenting session, recorded on sign-out.
    pub jti: String,
}

/// Bearer-token authentication middleware. Validates the JWT, refuses tokens
/// whose `jti` was blocked by a sign-out, loads the moderator row and injects
/// it into the request.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token).map_err(ApiError::unauthorized)?;

    if state.sessions().is_blocked(&claims.jti).await? {
        return Err(ApiError::unauthorized("Session has been signed out"));
    }

    let moderator = state
        .moderators()
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Moderator account no longer exists"))?;

    request.extensions_mut().insert(CurrentModerator {
        moderator,
        jti: claims.jti,
    });

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate JWT token and extract claims
fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert!(extract_jwt_from_headers(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert!(extract_jwt_from_headers(&headers).is_err());
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn issued_tokens_validate_round_trip() {
        let claims = Claims::new(42, "alice".to_string());
        let token = crate::auth::generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.sub, 42);
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.jti, claims.jti);
    }
}
