//! Tests for the reqwest transport against a local mock server

use sdkd_core::{HttpRequest, HttpTransport, ReqwestTransport};

#[tokio::test]
async fn test_post_json_reaches_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users")
        .match_header("content-type", "application/json")
        .match_header("x-sdkd-api-client-key", "key")
        .match_body(r#"{"email":"user@example.com"}"#)
        .with_status(201)
        .with_body(r#"{"jwt":"token"}"#)
        .create_async()
        .await;

    let transport = ReqwestTransport::new(5_000).unwrap();
    let request = HttpRequest::post_json(
        format!("{}/users", server.url()),
        &serde_json::json!({"email": "user@example.com"}),
    )
    .unwrap()
    .with_header("X-SDKD-API-Client-Key", "key");

    let response = transport.send(request).await.unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.body, r#"{"jwt":"token"}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/notifications")
        .with_status(401)
        .with_body(r#"{"error":"unauthorized"}"#)
        .create_async()
        .await;

    let transport = ReqwestTransport::new(5_000).unwrap();
    let response = transport
        .send(HttpRequest::get(format!("{}/notifications", server.url())))
        .await
        .unwrap();
    assert_eq!(response.status, 401);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_unreachable_host_is_an_error() {
    let transport = ReqwestTransport::new(2_000).unwrap();
    let result = transport
        .send(HttpRequest::get("http://127.0.0.1:1/unreachable"))
        .await;
    assert!(result.is_err());
}
