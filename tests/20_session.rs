mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn current_user_comes_from_the_session_cache() -> Result<()> {
    let app = common::test_app().await?;
    app.register("neo_anderson", "matrix1").await?;

    let (status, body) = app
        .send(
            Method::POST,
            "/user/api/login",
            None,
            Some(json!({ "username": "neo_anderson", "password": "matrix1" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["data"]["userInfo"]["nickname"], "neo_anderson");

    let before = app.store.stats();
    let (status, body) = app.send(Method::POST, "/user/api/info", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "neo_anderson");
    assert_eq!(app.store.stats().reads, before.reads, "session lookup must not touch the store");

    Ok(())
}

#[tokio::test]
async fn logout_ends_the_session() -> Result<()> {
    let app = common::test_app().await?;
    let token = app.register("trinity1", "matrix1").await?;

    let (status, _) = app.send(Method::GET, "/user/api/logOut", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::POST, "/user/api/info", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_validation_errors() -> Result<()> {
    let app = common::test_app().await?;
    app.register("morpheus", "redpill").await?;

    let (status, body) = app
        .send(
            Method::POST,
            "/user/api/login",
            None,
            Some(json!({ "username": "morpheus", "password": "bluepill" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app.send(Method::POST, "/user/api/login", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/user/api/register",
            None,
            Some(json!({ "username": "morpheus", "password": "another1" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let app = common::test_app().await?;
    let (status, body) = app.send(Method::POST, "/user/api/info", Some("not-a-jwt"), None).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn profile_update_refreshes_session_and_skips_protected_fields() -> Result<()> {
    let app = common::test_app().await?;
    let token = app.register("oracle01", "cookies").await?;

    let (status, body) = app
        .send(
            Method::PUT,
            "/user/api/current/update",
            Some(&token),
            Some(json!({ "nickname": "The Oracle", "access": "admin" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nickname"], "The Oracle");
    assert!(body["data"].get("access").is_none());

    let (_, body) = app.send(Method::POST, "/user/api/info", Some(&token), None).await?;
    assert_eq!(body["data"]["nickname"], "The Oracle");
    assert_eq!(body["data"]["access"], "user");

    let (status, _) = app
        .send(
            Method::PUT,
            "/user/api/current/update",
            Some(&token),
            Some(json!({ "nickname": "   " })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn password_change_takes_effect_on_next_login() -> Result<()> {
    let app = common::test_app().await?;
    let token = app.register("tank0001", "operator").await?;

    let (status, _) = app
        .send(
            Method::PUT,
            "/user/api/current/update/password",
            Some(&token),
            Some(json!({ "password": "short" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PUT,
            "/user/api/current/update/password",
            Some(&token),
            Some(json!({ "password": "newpass1" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let login = |password: &'static str| json!({ "username": "tank0001", "password": password });
    let (status, _) = app.send(Method::POST, "/user/api/login", None, Some(login("operator"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.send(Method::POST, "/user/api/login", None, Some(login("newpass1"))).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn user_info_lookup_hides_password() -> Result<()> {
    let app = common::test_app().await?;
    let token = app.register("switch01", "matrix1").await?;
    app.register("apoc0001", "matrix1").await?;

    let (status, body) = app
        .send(Method::POST, "/user/api/info", Some(&token), Some(json!({ "username": "apoc0001" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "apoc0001");
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("_id").is_none());

    let (_, body) = app
        .send(Method::POST, "/user/api/info", Some(&token), Some(json!({ "username": "nobody" })))
        .await?;
    assert_eq!(body["data"], json!({}));

    Ok(())
}
