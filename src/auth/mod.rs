pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::User;

pub use password::{hash_password, hash_password_blocking, verify_password, verify_password_blocking};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Short-lived token carried in the `accessToken` cookie or a Bearer header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "_id")]
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub exp: i64,
    pub iat: i64,
}

impl AccessClaims {
    pub fn new(user: &User, config: &SecurityConfig) -> Self {
        let now = Utc::now();
        Self {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            exp: (now + Duration::minutes(config.access_token_expiry_minutes)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Long-lived token used only to mint a new token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "_id")]
    pub user_id: Uuid,
    /// Unique per issue so two refreshes in the same second still rotate
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, config: &SecurityConfig) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            jti: Uuid::new_v4(),
            exp: (now + Duration::days(config.refresh_token_expiry_days)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn generate_access_token(user: &User, config: &SecurityConfig) -> Result<String, AuthError> {
    sign(&AccessClaims::new(user, config), &config.access_token_secret)
}

pub fn generate_refresh_token(user_id: Uuid, config: &SecurityConfig) -> Result<String, AuthError> {
    sign(&RefreshClaims::new(user_id, config), &config.refresh_token_secret)
}

pub fn generate_token_pair(user: &User, config: &SecurityConfig) -> Result<TokenPair, AuthError> {
    Ok(TokenPair {
        access_token: generate_access_token(user, config)?,
        refresh_token: generate_refresh_token(user.id, config)?,
    })
}

pub fn verify_access_token(token: &str, config: &SecurityConfig) -> Result<AccessClaims, AuthError> {
    verify(token, &config.access_token_secret)
}

pub fn verify_refresh_token(token: &str, config: &SecurityConfig) -> Result<RefreshClaims, AuthError> {
    verify(token, &config.refresh_token_secret)
}

/// Digest stored in place of the raw refresh token
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

fn verify<C: for<'de> Deserialize<'de>>(token: &str, secret: &str) -> Result<C, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<C>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "_id": Uuid::new_v4(),
            "username": "alice",
            "email": "alice@example.com",
            "fullName": "Alice Liddell",
            "avatar": "http://localhost/media/a.png",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap()
    }

    #[test]
    fn access_token_round_trip() {
        let config = AppConfig::development().security;
        let user = user();
        let token = generate_access_token(&user, &config).unwrap();
        let claims = verify_access_token(&token, &config).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn access_and_refresh_secrets_are_not_interchangeable() {
        let config = AppConfig::development().security;
        let user = user();
        let refresh = generate_refresh_token(user.id, &config).unwrap();
        assert!(verify_refresh_token(&refresh, &config).is_ok());
        assert!(matches!(verify_access_token(&refresh, &config), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let mut config = AppConfig::development().security;
        config.refresh_token_expiry_days = -1;
        let token = generate_refresh_token(Uuid::new_v4(), &config).unwrap();
        assert!(matches!(verify_refresh_token(&token, &config), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn refresh_tokens_rotate() {
        let config = AppConfig::development().security;
        let id = Uuid::new_v4();
        let a = generate_refresh_token(id, &config).unwrap();
        let b = generate_refresh_token(id, &config).unwrap();
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), hash_token(&b));
        assert_eq!(hash_token(&a).len(), 64);
    }
}
