use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Collection, Entity};

/// A registered account. Secrets are stored but never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub watch_history: Vec<Uuid>,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<Uuid>,
    /// argon2 PHC string
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secrets_are_not_serialized() {
        let user: User = serde_json::from_value(json!({
            "_id": Uuid::new_v4(),
            "username": "alice",
            "email": "alice@example.com",
            "fullName": "Alice",
            "avatar": "http://localhost/media/a.png",
            "password": "$argon2id$v=19$...",
            "refreshToken": "digest",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("digest"));

        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("password").is_none());
        assert!(out.get("refreshToken").is_none());
        assert_eq!(out["fullName"], json!("Alice"));
        assert_eq!(out["coverImage"], json!(""));
    }
}
