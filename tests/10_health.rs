mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn healthcheck_reports_store_ok() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/v1/healthcheck")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::envelope(res).await?;
    assert_eq!(body["data"]["store"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_lists_endpoints() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let body: serde_json::Value = server.client.get(server.url("/")).send().await?.json().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["endpoints"]["videos"].is_string());
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/v1/videos")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = common::envelope(res).await?;
    assert!(body["data"].is_null());
    assert!(body["errors"].is_array());

    let res = server
        .client
        .get(server.url("/api/v1/dashboard/stats"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn healthcheck_reports_unreachable_store() -> Result<()> {
    let server = common::TestServer::spawn_with_store(std::sync::Arc::new(common::UnreachableStore)).await?;

    let res = server.client.get(server.url("/api/v1/healthcheck")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = common::envelope(res).await?;
    assert!(body["data"].is_null());
    assert_eq!(body["message"], "Store unavailable");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    for path in ["/api/v1/nope", "/nowhere"] {
        let res = server.client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = common::envelope(res).await?;
        assert_eq!(body["message"], "Route not found");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_query_strings_use_the_error_envelope() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (_, token) = server.sign_up("quinn").await?;

    let res = server
        .client
        .get(server.url("/api/v1/videos?page=1&page=2"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = common::envelope(res).await?;
    assert_eq!(body["message"], "Invalid query string");
    assert!(body["errors"][0].as_str().unwrap_or_default().contains("page"));
    Ok(())
}
