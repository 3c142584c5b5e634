use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::util::ServiceExt; // for oneshot
use uuid::Uuid;

mod common;
use common::{body_json, post_json, spawn_app, spawn_app_with_config};
use minepool_accounts::AccountsConfig;

fn post_json_from_ip(uri: &str, body: serde_json::Value, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn send_code_is_limited_per_email() {
    let (app, _, _) = spawn_app();
    let email = format!("rate_limit_{}@example.com", Uuid::new_v4());

    // 3 allowed attempts (default config)
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json("/request-code", json!({ "email": email })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // 4th attempt should fail
    let response = app
        .clone()
        .oneshot(post_json("/request-code", json!({ "email": email })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["reason"], "rate_limited");
}

#[tokio::test]
async fn send_code_is_limited_per_ip_across_emails() {
    let (app, _, _) = spawn_app();
    let ip = "203.0.113.9";

    // 10 allowed per IP (default config), each under a fresh address
    for i in 0..10 {
        let response = app
            .clone()
            .oneshot(post_json_from_ip(
                "/request-code",
                json!({ "email": format!("miner{i}@example.com") }),
                ip,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json_from_ip(
            "/request-code",
            json!({ "email": "miner10@example.com" }),
            ip,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // a different IP is unaffected
    let response = app
        .oneshot(post_json_from_ip(
            "/request-code",
            json!({ "email": "miner11@example.com" }),
            "203.0.113.10",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn window_elapse_resets_the_counter() {
    let mut config = AccountsConfig::default();
    config.send_code_limits.per_email = 1;
    config.send_code_limits.window_seconds = 1;
    let (app, _, _) = spawn_app_with_config(config);
    let email = "reset@example.com";

    let response = app
        .clone()
        .oneshot(post_json("/request-code", json!({ "email": email })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json("/request-code", json!({ "email": email })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

    let response = app
        .oneshot(post_json("/request-code", json!({ "email": email })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verify_code_is_throttled_independently_of_attempts() {
    let (app, _, _) = spawn_app();
    let email = "guesser@example.com";

    app.clone()
        .oneshot(post_json("/request-code", json!({ "email": email })))
        .await
        .unwrap();

    // five verify calls pass the throttle (default limit); the per-code
    // attempt counter runs its own course underneath
    let mut reasons = Vec::new();
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/verify-code",
                json!({ "email": email, "code": "000000" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        reasons.push(body_json(response).await["reason"].as_str().unwrap().to_string());
    }
    assert_eq!(
        reasons,
        vec![
            "invalid_code",
            "invalid_code",
            "invalid_code",
            "too_many_attempts",
            "code_not_found",
        ]
    );

    // the sixth call is cut off by the throttle before any lookup
    let response = app
        .oneshot(post_json(
            "/verify-code",
            json!({ "email": email, "code": "000000" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
