use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers;
use crate::media::{MediaStorage, MEDIA_ROUTE};
use crate::middleware::{jwt_auth_middleware, ApiResponse, ApiResult};

pub const API_PREFIX: &str = "/api/v1";

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaStorage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaStorage>, config: AppConfig) -> Self {
        Self { store, media, config: Arc::new(config) }
    }
}

pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.media.max_upload_bytes);

    let api = Router::new()
        .nest("/users", user_routes(upload_limit))
        .nest("/videos", video_routes(upload_limit))
        .nest("/tweets", tweet_routes())
        .nest("/comments", comment_routes())
        .nest("/likes", like_routes())
        .nest("/playlist", playlist_routes())
        .nest("/subscriptions", subscription_routes())
        .nest("/dashboard", dashboard_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .merge(public_routes(upload_limit))
        .route("/healthcheck", get(healthcheck));

    Router::new()
        .route("/", get(root))
        .nest(API_PREFIX, api)
        .nest_service(MEDIA_ROUTE, ServeDir::new(&state.config.media.public_dir))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(DefaultBodyLimit::max(state.config.server.json_max_bytes)),
        )
        .with_state(state)
}

fn public_routes(upload_limit: DefaultBodyLimit) -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/users/register", post(users::register).layer(upload_limit))
        .route("/users/login", post(users::login))
        .route("/users/refresh-token", post(users::refresh_token))
}

fn user_routes(upload_limit: DefaultBodyLimit) -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/logout", post(users::logout))
        .route("/current-user", get(users::current_user))
        .route("/update-account-details", post(users::update_account_details))
        .route("/update-user-avatar", post(users::update_avatar).layer(upload_limit))
        .route("/update-user-cover-image", post(users::update_cover_image).layer(upload_limit))
}

fn video_routes(upload_limit: DefaultBodyLimit) -> Router<AppState> {
    use handlers::videos;

    Router::new()
        .route("/", get(videos::list).post(videos::publish).layer(upload_limit))
        .route(
            "/:video_id",
            get(videos::get).patch(videos::update).delete(videos::delete).layer(upload_limit),
        )
        .route("/toggle/publish/:video_id", patch(videos::toggle_publish))
}

fn tweet_routes() -> Router<AppState> {
    use axum::routing::delete;
    use handlers::tweets;

    Router::new()
        .route("/create-tweet", post(tweets::create))
        .route("/get-tweets", get(tweets::list))
        .route("/update-tweet", patch(tweets::update))
        .route("/delete-tweet", delete(tweets::delete))
}

fn comment_routes() -> Router<AppState> {
    use handlers::comments;

    Router::new()
        .route("/:video_id", get(comments::list).post(comments::add))
        .route("/c/:comment_id", patch(comments::update).delete(comments::delete))
}

fn like_routes() -> Router<AppState> {
    use handlers::likes;

    Router::new()
        .route("/toggle/v/:video_id", post(likes::toggle_video))
        .route("/toggle/c/:comment_id", post(likes::toggle_comment))
        .route("/toggle/t/:tweet_id", post(likes::toggle_tweet))
        .route("/videos", get(likes::liked_videos))
}

fn playlist_routes() -> Router<AppState> {
    use handlers::playlists;

    Router::new()
        .route("/", post(playlists::create))
        .route("/user/:user_id", get(playlists::for_user))
        .route(
            "/:playlist_id",
            get(playlists::get).patch(playlists::update).delete(playlists::delete),
        )
        .route("/add/:video_id/:playlist_id", patch(playlists::add_video))
        .route("/remove/:video_id/:playlist_id", patch(playlists::remove_video))
}

fn subscription_routes() -> Router<AppState> {
    use handlers::subscriptions;

    Router::new()
        .route("/c/:channel_id", post(subscriptions::toggle).get(subscriptions::subscribers))
        .route("/u/:subscriber_id", get(subscriptions::channels))
}

fn dashboard_routes() -> Router<AppState> {
    use handlers::dashboard;

    Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/videos", get(dashboard::videos))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "VidTube API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/api/v1/healthcheck (public)",
                "users": "/api/v1/users/register, /login, /refresh-token (public); the rest require auth",
                "videos": "/api/v1/videos[/:videoId] (protected)",
                "tweets": "/api/v1/tweets/* (protected)",
                "comments": "/api/v1/comments/:videoId, /api/v1/comments/c/:commentId (protected)",
                "likes": "/api/v1/likes/toggle/{v,c,t}/:id, /api/v1/likes/videos (protected)",
                "playlist": "/api/v1/playlist/* (protected)",
                "subscriptions": "/api/v1/subscriptions/{c,u}/:id (protected)",
                "dashboard": "/api/v1/dashboard/stats, /api/v1/dashboard/videos (protected)",
                "media": "/media/* (public, static)",
            }
        }
    }))
}

async fn healthcheck(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.ping().await.map_err(|e| {
        error!("Health check failed: {}", e);
        ApiError::service_unavailable("Store unavailable")
    })?;

    Ok(ApiResponse::ok(
        json!({ "status": "ok", "timestamp": chrono::Utc::now(), "store": "ok" }),
        "Health check passed",
    ))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
