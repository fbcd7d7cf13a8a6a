use axum::extract::{Extension, State};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::auth::{
    cookie_token, expired_cookie, session_cookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, UploadForm};
use crate::services::{AuthSession, RegisterInput, UserService};

/// A response that also updates the session cookies
type CookieResult<T> = Result<(CookieJar, ApiResponse<T>), ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBody {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// POST /api/v1/users/register (multipart)
pub async fn register(State(state): State<AppState>, form: UploadForm) -> ApiResult<User> {
    let input = RegisterInput {
        username: form.text("username").map(str::to_string),
        email: form.text("email").map(str::to_string),
        full_name: form.text("fullName").map(str::to_string),
        password: form.text("password").map(str::to_string),
        avatar: form.file("avatar"),
        cover_image: form.file("coverImage"),
    };
    let user = UserService::new(&state).register(input).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

/// POST /api/v1/users/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginBody>,
) -> CookieResult<AuthSession> {
    let session = UserService::new(&state)
        .login(body.username.as_deref(), body.email.as_deref(), body.password.as_deref())
        .await?;
    let jar = with_session_cookies(jar, &session, &state);
    Ok((jar, ApiResponse::ok(session, "User logged in successfully")))
}

/// POST /api/v1/users/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> CookieResult<Value> {
    UserService::new(&state).logout(user.id).await?;
    let security = &state.config.security;
    let jar = jar
        .add(expired_cookie(ACCESS_TOKEN_COOKIE, security))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE, security));
    Ok((jar, ApiResponse::ok(json!({}), "User logged out successfully")))
}

/// POST /api/v1/users/refresh-token; the cookie takes precedence over the body
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<RefreshBody>,
) -> CookieResult<AuthSession> {
    let token = cookie_token(&jar, REFRESH_TOKEN_COOKIE).or(body.refresh_token);
    let session = UserService::new(&state).refresh(token.as_deref()).await?;
    let jar = with_session_cookies(jar, &session, &state);
    Ok((jar, ApiResponse::ok(session, "Access token refreshed")))
}

/// GET /api/v1/users/current-user
pub async fn current_user(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<User> {
    let user = UserService::new(&state).current_user(user.id).await?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}

/// POST /api/v1/users/update-account-details
pub async fn update_account_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<AccountBody>,
) -> ApiResult<User> {
    let user = UserService::new(&state)
        .update_account(user.id, body.full_name.as_deref(), body.email.as_deref())
        .await?;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

/// POST /api/v1/users/update-user-avatar (multipart `avatar`)
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    form: UploadForm,
) -> ApiResult<User> {
    let user = UserService::new(&state).update_avatar(user.id, form.file("avatar")).await?;
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

/// POST /api/v1/users/update-user-cover-image (multipart `coverImage`)
pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    form: UploadForm,
) -> ApiResult<User> {
    let user = UserService::new(&state).update_cover_image(user.id, form.file("coverImage")).await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

fn with_session_cookies(jar: CookieJar, session: &AuthSession, state: &AppState) -> CookieJar {
    let security = &state.config.security;
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        session.access_token.clone(),
        security.access_token_expiry_minutes * 60,
        security,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        session.refresh_token.clone(),
        security.refresh_token_expiry_days * 24 * 60 * 60,
        security,
    ))
}
