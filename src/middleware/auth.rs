use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{self, AuthError};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::database::Repository;
use crate::error::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authenticated user context injected by [`jwt_auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self { id: user.id, username: user.username, email: user.email, full_name: user.full_name }
    }
}

/// Validates the access token, loads its user and injects an [`AuthUser`]
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = auth::verify_access_token(&token, &state.config.security).map_err(|e| {
        warn!("Rejected access token: {}", e);
        match e {
            AuthError::ExpiredToken => ApiError::unauthorized("Access token expired"),
            _ => ApiError::unauthorized("Invalid access token"),
        }
    })?;

    let users: Repository<User> = Repository::new(state.store.clone());
    let user = users
        .find_by_id(claims.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load user {} for auth: {}", claims.user_id, e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?
        .ok_or_else(|| {
            warn!("Access token for unknown user {}", claims.user_id);
            ApiError::unauthorized("Invalid access token")
        })?;

    request.extensions_mut().insert(AuthUser::from(user));
    Ok(next.run(request).await)
}

/// Access token from the `accessToken` cookie, else a Bearer header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_token(&CookieJar::from_headers(headers), ACCESS_TOKEN_COOKIE).or_else(|| {
        headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

/// Non-empty cookie value, with RFC 6265 surrounding quotes removed
pub fn cookie_token(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(name: &'static str, value: String, max_age_secs: i64, security: &SecurityConfig) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(security.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// A cookie that makes the browser drop `name`
pub fn expired_cookie(name: &'static str, security: &SecurityConfig) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), 0, security);
    cookie.make_removal();
    cookie
}
