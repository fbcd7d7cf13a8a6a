#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use uuid::Uuid;

use vidtube_api::config::AppConfig;
use vidtube_api::database::{Collection, Document, FindOptions, MemoryStore, Store, StoreError, Update};
use vidtube_api::filter::Filter;
use vidtube_api::media::LocalMediaStorage;
use vidtube_api::{router, AppState};

pub const PASSWORD: &str = "correct horse battery staple";

/// The real router served on a free local port over an in-memory store
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    _media: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn spawn_with_store(store: Arc<dyn Store>) -> Result<Self> {
        let media_dir = tempfile::tempdir().context("failed to create media dir")?;
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.port = port;
        config.media.public_dir = media_dir.path().join("public");
        config.media.upload_dir = media_dir.path().join("uploads");
        config.media.public_base_url = base_url.clone();

        let media = LocalMediaStorage::from_config(&config.media)?;
        let app = router(AppState::new(store, Arc::new(media), config));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { base_url, client: reqwest::Client::new(), _media: media_dir })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str) -> Result<Value> {
        let res = self.client.post(self.url("/api/v1/users/register")).multipart(register_form(username)).send().await?;
        let status = res.status();
        let body = envelope(res).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register {} failed: {}", username, body);
        Ok(body["data"].clone())
    }

    /// Login and return `(user, accessToken, refreshToken)`
    pub async fn login(&self, username: &str) -> Result<(Value, String, String)> {
        let res = self
            .client
            .post(self.url("/api/v1/users/login"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await?;
        let status = res.status();
        let body = envelope(res).await?;
        anyhow::ensure!(status == StatusCode::OK, "login {} failed: {}", username, body);
        let data = &body["data"];
        Ok((
            data["user"].clone(),
            data["accessToken"].as_str().context("accessToken")?.to_string(),
            data["refreshToken"].as_str().context("refreshToken")?.to_string(),
        ))
    }

    /// Register then login; returns `(userId, accessToken)`
    pub async fn sign_up(&self, username: &str) -> Result<(String, String)> {
        self.register(username).await?;
        let (user, token, _) = self.login(username).await?;
        Ok((user["_id"].as_str().context("user id")?.to_string(), token))
    }

    pub async fn publish(&self, token: &str, title: &str) -> Result<Value> {
        let form = Form::new()
            .text("title", title.to_string())
            .text("description", format!("About {}", title))
            .part("videoFile", file_part("clip.mp4", b"not really a video"))
            .part("thumbnail", file_part("thumb.png", b"not really an image"));
        let res = self.client.post(self.url("/api/v1/videos")).bearer_auth(token).multipart(form).send().await?;
        let status = res.status();
        let body = envelope(res).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "publish {} failed: {}", title, body);
        Ok(body["data"].clone())
    }
}

pub fn register_form(username: &str) -> Form {
    Form::new()
        .text("username", username.to_string())
        .text("email", format!("{}@example.com", username))
        .text("fullName", format!("{} Tester", username))
        .text("password", PASSWORD)
        .part("avatar", file_part("avatar.png", b"avatar bytes"))
}

pub fn file_part(name: &str, bytes: &'static [u8]) -> Part {
    Part::bytes(bytes).file_name(name.to_string())
}

/// Parse a response body and check the envelope shape matches the status
pub async fn envelope(res: Response) -> Result<Value> {
    let status = res.status();
    let body: Value = res.json().await.context("response is not JSON")?;
    anyhow::ensure!(body["statusCode"] == status.as_u16(), "statusCode mismatch: {}", body);
    anyhow::ensure!(body["success"] == status.is_success(), "success flag mismatch: {}", body);
    anyhow::ensure!(body.get("message").is_some(), "missing message: {}", body);
    Ok(body)
}

/// A store whose database has gone away
pub struct UnreachableStore;

fn unreachable_store() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl Store for UnreachableStore {
    async fn insert(&self, _: Collection, _: Map<String, Value>) -> Result<Document, StoreError> {
        Err(unreachable_store())
    }

    async fn find_by_id(&self, _: Collection, _: Uuid) -> Result<Option<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn find_one(&self, _: Collection, _: &Filter) -> Result<Option<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn find(&self, _: Collection, _: &Filter, _: &FindOptions) -> Result<Vec<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn count(&self, _: Collection, _: &Filter) -> Result<u64, StoreError> {
        Err(unreachable_store())
    }

    async fn update_by_id(&self, _: Collection, _: Uuid, _: &Update) -> Result<Option<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn delete_by_id(&self, _: Collection, _: Uuid) -> Result<bool, StoreError> {
        Err(unreachable_store())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(unreachable_store())
    }
}
