use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{optional, required, ServiceError, ServiceResult};
use crate::app::AppState;
use crate::auth::{self, AuthError, TokenPair};
use crate::config::SecurityConfig;
use crate::database::models::{NewUser, User};
use crate::database::{Repository, Update};
use crate::filter::Filter;
use crate::media::MediaStorage;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Registration form after multipart extraction
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<PathBuf>,
    pub cover_image: Option<PathBuf>,
}

/// Login / refresh result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthSession {
    fn new(user: User, tokens: TokenPair) -> Self {
        Self { user, access_token: tokens.access_token, refresh_token: tokens.refresh_token }
    }
}

pub struct UserService {
    users: Repository<User>,
    media: Arc<dyn MediaStorage>,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: Repository::new(state.store.clone()),
            media: state.media.clone(),
            security: state.config.security.clone(),
        }
    }

    pub async fn register(&self, input: RegisterInput) -> ServiceResult<User> {
        let (Some(username), Some(email), Some(full_name), Some(password)) = (
            optional(input.username.as_deref()),
            optional(input.email.as_deref()),
            optional(input.full_name.as_deref()),
            optional(input.password.as_deref()),
        ) else {
            return Err(ServiceError::validation("All fields are required"));
        };
        let username = username.to_lowercase();
        let email = validate_email(&email)?;
        let avatar_path = input.avatar.ok_or_else(|| ServiceError::validation("Avatar file is required"))?;

        let clash = Filter::parse(&json!({ "$or": [ { "username": username }, { "email": email } ] }))
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if self.users.select_one(&clash).await?.is_some() {
            return Err(ServiceError::conflict("User with email or username already exists"));
        }

        let avatar = self.media.upload(&avatar_path).await?;
        let cover_image = match input.cover_image {
            Some(path) => self.media.upload(&path).await?.url,
            None => String::new(),
        };

        let user = self
            .users
            .create(&NewUser {
                username,
                email,
                full_name,
                avatar: avatar.url,
                cover_image,
                watch_history: vec![],
                password: auth::hash_password_blocking(password).await?,
            })
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::Conflict(_) => ServiceError::conflict("User with email or username already exists"),
                other => other,
            })?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> ServiceResult<AuthSession> {
        let filter = match (optional(username), optional(email)) {
            (Some(u), _) => Filter::eq("username", u.to_lowercase()),
            (None, Some(e)) => Filter::eq("email", e.to_lowercase()),
            (None, None) => return Err(ServiceError::validation("username or email is required")),
        };
        let password = required(password, "password")?;

        let user = self
            .users
            .select_one(&filter)
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))?;

        match auth::verify_password_blocking(password, user.password.clone()).await {
            Ok(()) => {}
            Err(AuthError::InvalidCredentials) => {
                warn!("Failed login for {}", user.username);
                return Err(ServiceError::authorization("Invalid user credentials"));
            }
            Err(e) => {
                error!("Stored password hash for {} is unusable: {}", user.username, e);
                return Err(ServiceError::Internal(e.to_string()));
            }
        }

        let session = self.issue_session(user).await?;
        info!("User {} logged in", session.user.username);
        Ok(session)
    }

    pub async fn logout(&self, user_id: Uuid) -> ServiceResult<()> {
        self.users
            .update(user_id, &Update::Unset(vec!["refreshToken".to_string()]))
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))?;
        info!("User {} logged out", user_id);
        Ok(())
    }

    /// Exchange a refresh token for a new token pair; the old token stops working
    pub async fn refresh(&self, token: Option<&str>) -> ServiceResult<AuthSession> {
        let token = optional(token).ok_or_else(|| ServiceError::authorization("Unauthorized request"))?;

        let claims = auth::verify_refresh_token(&token, &self.security).map_err(|e| {
            warn!("Rejected refresh token: {}", e);
            ServiceError::authorization("Invalid refresh token")
        })?;

        let user = self
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or_else(|| ServiceError::authorization("Invalid refresh token"))?;

        if user.refresh_token.as_deref() != Some(auth::hash_token(&token).as_str()) {
            warn!("Stale refresh token presented for user {}", user.id);
            return Err(ServiceError::authorization("Refresh token is expired or used"));
        }

        self.issue_session(user).await
    }

    pub async fn current_user(&self, user_id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))
    }

    pub async fn update_account(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> ServiceResult<User> {
        let (Some(full_name), Some(email)) = (optional(full_name), optional(email)) else {
            return Err(ServiceError::validation("All fields are required"));
        };
        let email = validate_email(&email)?;

        let mut fields = serde_json::Map::new();
        fields.insert("fullName".to_string(), full_name.into());
        fields.insert("email".to_string(), email.into());

        self.users
            .update(user_id, &Update::Set(fields))
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::Conflict(_) => ServiceError::conflict("Email is already in use"),
                other => other,
            })?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))
    }

    pub async fn update_avatar(&self, user_id: Uuid, file: Option<PathBuf>) -> ServiceResult<User> {
        let path = file.ok_or_else(|| ServiceError::validation("Avatar file is missing"))?;
        self.replace_image(user_id, "avatar", path).await
    }

    pub async fn update_cover_image(&self, user_id: Uuid, file: Option<PathBuf>) -> ServiceResult<User> {
        let path = file.ok_or_else(|| ServiceError::validation("Cover image file is missing"))?;
        self.replace_image(user_id, "coverImage", path).await
    }

    async fn replace_image(&self, user_id: Uuid, field: &str, path: PathBuf) -> ServiceResult<User> {
        let current = self.current_user(user_id).await?;
        let previous = match field {
            "avatar" => current.avatar,
            _ => current.cover_image,
        };

        let asset = self.media.upload(&path).await?;
        let user = self
            .users
            .update(user_id, &Update::set(field, asset.url))
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))?;

        if !previous.is_empty() {
            if let Err(e) = self.media.delete(&previous).await {
                warn!("Could not delete previous {} for user {}: {}", field, user_id, e);
            }
        }
        Ok(user)
    }

    async fn issue_session(&self, user: User) -> ServiceResult<AuthSession> {
        let tokens = auth::generate_token_pair(&user, &self.security)?;
        let digest = auth::hash_token(&tokens.refresh_token);
        let user = self
            .users
            .update(user.id, &Update::set("refreshToken", digest))
            .await?
            .ok_or_else(|| ServiceError::not_found("User does not exist"))?;
        Ok(AuthSession::new(user, tokens))
    }
}

fn validate_email(email: &str) -> ServiceResult<String> {
    let email = email.to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(ServiceError::validation("Invalid email address"));
    }
    Ok(email)
}
