pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

/// Claims carried by a moderator session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Moderator id
    pub sub: i64,
    pub username: String,
    /// Token id, recorded in blocked_tokens on sign-out
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(moderator_id: i64, username: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: moderator_id,
            username,
            jti: Uuid::new_v4().to_string(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_carry_a_unique_jti() {
        let a = Claims::new(1, "alice".to_string());
        let b = Claims::new(1, "alice".to_string());
        assert_ne!(a.jti, b.jti);
        assert!(a.exp > a.iat);
    }

    #[test]
    fn generates_a_token_with_dev_secret() {
        let claims = Claims::new(7, "bob".to_string());
        let token = generate_jwt(&claims).expect("dev config has a secret");
        assert_eq!(token.split('.').count(), 3);
    }
}
