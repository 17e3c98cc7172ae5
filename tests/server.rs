//! HTTP API tests driven through the router with `oneshot`.

#![cfg(feature = "server")]


use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use seedance::server::{router, USER_HEADER};
use serde_json::{json, Value};
use test_helpers::*;
use tower::ServiceExt;

fn request(method: &str, uri: &str, user: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match user {
        Some(user) => builder.header(USER_HEADER, user),
        None => builder,
    }
}

fn json_request(uri: &str, user: &str, body: Value) -> Request<Body> {
    request("POST", uri, Some(user))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_user() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    let response = app
        .oneshot(request("GET", "/api/health", None).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    for uri in ["/api/credits", "/api/gallery", "/api/generate/status?taskId=t"] {
        let response = app
            .clone()
            .oneshot(request("GET", uri, None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(response_json(response).await["error"], "Unauthorized");
    }

    let response = app
        .oneshot(
            request("GET", "/api/credits", Some("   "))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_generate() {
    let mock = MockEvolink::start().await;
    let studio = studio(&mock).await;
    grant(&studio, "alice", 100).await;
    let app = router(studio);

    let response = app
        .oneshot(json_request(
            "/api/generate",
            "alice",
            json!({
                "prompt": "A hummingbird in slow motion",
                "duration": 10,
                "quality": "1080p",
                "aspectRatio": "9:16",
                "generateAudio": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["taskId"], "task-1");
    assert_eq!(body["status"], "processing");
    assert_eq!(body["cost"], 25);
    assert_eq!(body["balance"], 75);
    assert_eq!(mock.submissions()[0]["aspect_ratio"], "9:16");
}

#[tokio::test]
async fn test_generate_errors() {
    let mock = MockEvolink::start().await;
    let studio = studio(&mock).await;
    grant(&studio, "alice", 5).await;
    let app = router(studio);

    let response = app
        .clone()
        .oneshot(json_request("/api/generate", "alice", json!({ "prompt": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], "Prompt is required");

    let response = app
        .oneshot(json_request("/api/generate", "alice", json!({ "prompt": "Clouds" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert!(mock.submissions().is_empty());
}

#[tokio::test]
async fn test_generate_submit_failure_refunds() {
    let mock = MockEvolink::start().await;
    let studio = studio(&mock).await;
    grant(&studio, "alice", 10).await;
    mock.fail_submit(503, json!({ "error": { "message": "overloaded" } }));
    let app = router(studio.clone());

    let response = app
        .oneshot(json_request("/api/generate", "alice", json!({ "prompt": "Clouds" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response_json(response).await["error"], "overloaded");
    assert_eq!(studio.balance("alice").await.unwrap(), 10);
}

#[tokio::test]
async fn test_task_status() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/generate/status", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], "taskId is required");

    mock.set_task(json!({
        "status": "completed",
        "results": [{ "url": "https://cdn.evolink.test/s.mp4" }]
    }));
    let response = app
        .oneshot(
            request("GET", "/api/generate/status?taskId=task-7", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["id"], "task-7");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"], 100);
    assert_eq!(body["videoUrl"], "https://cdn.evolink.test/s.mp4");
}

#[tokio::test]
async fn test_upload() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    let boundary = "seedance-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/upload", Some("alice"))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let file = response_json(response).await;
    assert_eq!(file["url"], "https://files.evolink.test/cat.png");
    assert_eq!(file["fileName"], "cat.png");
    assert_eq!(file["hosted"], true);

    let empty = format!("--{boundary}--\r\n");
    let response = app
        .oneshot(
            request("POST", "/api/upload", Some("alice"))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(empty))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_credits() {
    let mock = MockEvolink::start().await;
    let studio = studio(&mock).await;
    grant(&studio, "alice", 12).await;
    let app = router(studio);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/credits", Some("alice")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response_json(response).await["balance"], 12);

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/credits/check", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["required"], 10);
    assert_eq!(body["enough"], true);

    let response = app
        .oneshot(
            request("GET", "/api/credits/check?required=15", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response_json(response).await["enough"], false);
}

#[tokio::test]
async fn test_pricing() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/pricing", None).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["plans"].as_array().unwrap().len(), 3);
    assert_eq!(body["packages"].as_array().unwrap().len(), 3);
    assert_eq!(body["baseCost"], 10);
    assert_eq!(body["resolutionAddon"], 5);

    let response = app
        .clone()
        .oneshot(
            request(
                "GET",
                "/api/pricing/quote?duration=10&quality=1080p&generateAudio=true",
                None,
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response_json(response).await["cost"], 25);

    for quality in ["4k", "1080P", "%201080p%20"] {
        let response = app
            .clone()
            .oneshot(
                request("GET", &format!("/api/pricing/quote?quality={quality}"), None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response_json(response).await["cost"], 10, "{quality}");
    }

    let response = app
        .oneshot(
            request("GET", "/api/pricing/quote?quality=1080p", None)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response_json(response).await["cost"], 15);
}

#[tokio::test]
async fn test_gallery_lifecycle() {
    let mock = MockEvolink::start().await;
    let studio = studio(&mock).await;
    grant(&studio, "alice", 100).await;
    let app = router(studio.clone());

    let generation = studio
        .generate("alice", seedance::VideoGenerationRequest::new("Lanterns"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/gallery?status=processing", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let list = response_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], generation.id.as_str());
    assert_eq!(list[0]["taskId"], "task-1");

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/gallery?status=bogus", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    mock.set_task(json!({
        "status": "completed",
        "results": [{ "url": "https://cdn.evolink.test/l.mp4" }]
    }));
    let uri = format!("/api/gallery/{}/refresh", generation.id);
    let response = app
        .clone()
        .oneshot(request("POST", &uri, Some("alice")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let refreshed = response_json(response).await;
    assert_eq!(refreshed["status"], "completed");
    assert_eq!(refreshed["videoUrl"], "https://cdn.evolink.test/l.mp4");

    let uri = format!("/api/gallery/{}", generation.id);
    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some("bob")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("DELETE", &uri, Some("alice")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request("GET", &uri, Some("alice")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_templates() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/templates", None).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["categories"][0], "All");
    assert_eq!(body["templates"].as_array().unwrap().len(), 6);

    let response = app
        .oneshot(
            request("GET", "/api/templates?category=nature", None)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    let templates = body["templates"].as_array().unwrap();
    assert!(!templates.is_empty());
    assert!(templates.iter().all(|t| t["category"] == "Nature"));
}

async fn assert_json_error(response: Response, status: StatusCode) {
    assert_eq!(response.status(), status);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");
    let body = response_json(response).await;
    assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()), "{body}");
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let mock = MockEvolink::start().await;
    let studio = studio(&mock).await;
    grant(&studio, "alice", 100).await;
    let app = router(studio);

    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/generate", Some("alice"))
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_json_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .clone()
        .oneshot(json_request("/api/generate", "alice", json!({ "prompt": 5 })))
        .await
        .unwrap();
    assert_json_error(response, StatusCode::UNPROCESSABLE_ENTITY).await;

    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/generate", Some("alice"))
                .body(Body::from(r#"{"prompt":"Clouds"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_json_error(response, StatusCode::UNSUPPORTED_MEDIA_TYPE).await;

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/credits/check?required=abc", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_json_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/pricing/quote?duration=-1", None)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_json_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .oneshot(
            request("POST", "/api/upload", Some("alice"))
                .header("content-type", "text/plain")
                .body(Body::from("not a form"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["error"].is_string());
    assert!(mock.submissions().is_empty());
}

#[tokio::test]
async fn test_oversized_body_gets_json_error() {
    let mock = MockEvolink::start().await;
    let app = router(studio(&mock).await);

    let prompt = "a".repeat(seedance::video::MAX_UPLOAD_BYTES + 2 * 1024 * 1024);
    let response = app
        .oneshot(json_request("/api/generate", "alice", json!({ "prompt": prompt })))
        .await
        .unwrap();
    assert_json_error(response, StatusCode::PAYLOAD_TOO_LARGE).await;
}
