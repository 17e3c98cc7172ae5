//! Evolink provider against a local mock of the API.


use seedance::{
    GenerationMode, ImageUpload, ReferenceKind, Resolution, SeedanceError, TaskState,
    VideoGenerationRequest, VideoProvider, VideoProviderExt,
};
use serde_json::json;
use std::time::Duration;
use test_helpers::*;

#[tokio::test]
async fn test_submit_sends_generation_request() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();

    let request = VideoGenerationRequest::new("  A drone shot over a glacier  ")
        .with_mode(GenerationMode::ReferenceToVideo)
        .with_duration(10)
        .with_resolution(Resolution::P1080)
        .with_aspect_ratio("16:9")
        .with_audio(true)
        .with_reference(ReferenceKind::Face, "https://files.evolink.test/face.png");

    let task_id = provider.submit(&request).await.unwrap();
    assert_eq!(task_id, "task-1");
    assert_eq!(mock.last_auth().as_deref(), Some("Bearer ev-test-key"));

    let body = &mock.submissions()[0];
    assert_eq!(body["model"], "seedance-2.0");
    assert_eq!(body["prompt"], "A drone shot over a glacier");
    assert_eq!(body["duration"], 10);
    assert_eq!(body["quality"], "1080p");
    assert_eq!(body["aspect_ratio"], "16:9");
    assert_eq!(body["generate_audio"], true);
    assert_eq!(body["references"][0]["type"], "face");
    assert!(body.get("image_urls").is_none());
}

#[tokio::test]
async fn test_submit_defaults() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();

    provider
        .submit(&VideoGenerationRequest::new("Rain on a window"))
        .await
        .unwrap();

    let body = &mock.submissions()[0];
    assert_eq!(body["duration"], 5);
    assert_eq!(body["quality"], "720p");
    assert!(body.get("generate_audio").is_none());
    assert!(body.get("aspect_ratio").is_none());
}

#[tokio::test]
async fn test_submit_rejects_invalid_request_locally() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();

    let err = provider
        .submit(&VideoGenerationRequest::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, SeedanceError::InvalidRequest(ref m) if m == "Prompt is required"));

    let err = provider
        .submit(&VideoGenerationRequest::new("a").with_mode(GenerationMode::ImageToVideo))
        .await
        .unwrap_err();
    assert!(matches!(err, SeedanceError::InvalidRequest(_)));

    assert!(mock.submissions().is_empty());
}

#[tokio::test]
async fn test_submit_error_mapping() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();
    let request = VideoGenerationRequest::new("A fox in the snow");

    mock.fail_submit(401, json!({ "error": { "message": "invalid api key" } }));
    let err = provider.submit(&request).await.unwrap_err();
    assert!(matches!(err, SeedanceError::Auth(ref m) if m == "invalid api key"));

    mock.fail_submit(400, json!({ "error": "duration out of range" }));
    let err = provider.submit(&request).await.unwrap_err();
    assert!(matches!(err, SeedanceError::InvalidRequest(ref m) if m == "duration out of range"));

    mock.fail_submit(429, json!({ "error": { "message": "slow down" } }));
    let err = provider.submit(&request).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));

    mock.fail_submit(500, json!({ "error": { "message": "Prompt blocked by safety system" } }));
    let err = provider.submit(&request).await.unwrap_err();
    assert!(matches!(err, SeedanceError::ContentBlocked(_)));

    mock.fail_submit(503, json!({ "error": { "message": "overloaded" } }));
    let err = provider.submit(&request).await.unwrap_err();
    assert!(matches!(err, SeedanceError::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_status_processing() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();

    let status = provider.status("task-9").await.unwrap();
    assert_eq!(status.id, "task-9");
    assert_eq!(status.status, TaskState::Processing);
    assert_eq!(status.progress, 40);
    assert!(status.video_url.is_none());
}

#[tokio::test]
async fn test_status_completed() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();
    mock.set_task(json!({
        "status": "completed",
        "progress": 100,
        "results": [{ "url": "https://cdn.evolink.test/v.mp4" }],
        "task_info": { "estimated_time": 0 }
    }));

    let status = provider.status("task-1").await.unwrap();
    assert_eq!(status.status, TaskState::Completed);
    assert_eq!(status.progress, 100);
    assert_eq!(
        status.video_url.as_deref(),
        Some("https://cdn.evolink.test/v.mp4")
    );
}

#[tokio::test]
async fn test_status_failed() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();
    mock.set_task(json!({
        "status": "failed",
        "error": { "message": "generation rejected" }
    }));

    let status = provider.status("task-1").await.unwrap();
    assert_eq!(status.status, TaskState::Failed);
    assert_eq!(status.error.as_deref(), Some("generation rejected"));
}

#[tokio::test]
async fn test_status_requires_task_id() {
    let mock = MockEvolink::start().await;
    let err = mock.provider().status(" ").await.unwrap_err();
    assert!(matches!(err, SeedanceError::InvalidRequest(ref m) if m == "taskId is required"));
    assert_eq!(mock.status_calls(), 0);
}

#[tokio::test]
async fn test_status_rejects_task_ids_that_leave_the_tasks_path() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();
    for task_id in ["../files/upload/base64", "..", "a/b", "a?x=1", "a#b", "a%2F.."] {
        let err = provider.status(task_id).await.unwrap_err();
        assert!(matches!(err, SeedanceError::InvalidRequest(_)), "{task_id}");
    }
    assert_eq!(mock.status_calls(), 0);
    assert!(mock.uploads().is_empty());
}

#[tokio::test]
async fn test_wait_for_completion() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();
    mock.set_task(json!({
        "status": "succeeded",
        "results": ["https://cdn.evolink.test/done.mp4"]
    }));

    let status = provider
        .wait_for_completion("task-1", Duration::from_millis(10), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(
        status.video_url.as_deref(),
        Some("https://cdn.evolink.test/done.mp4")
    );
}

#[tokio::test]
async fn test_wait_for_completion_times_out() {
    let mock = MockEvolink::start().await;
    let err = mock
        .provider()
        .wait_for_completion("task-1", Duration::from_millis(20), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, SeedanceError::Timeout(_)));
    assert!(mock.status_calls() >= 1);
}

#[tokio::test]
async fn test_upload_hosted() {
    let mock = MockEvolink::start().await;
    let upload = ImageUpload::new(png_bytes(), "image/png", "cat.png");

    let file = mock.provider().upload_image(&upload).await.unwrap();
    assert!(file.hosted);
    assert_eq!(file.url, "https://files.evolink.test/cat.png");
    assert_eq!(file.file_name, "cat.png");

    let body = &mock.uploads()[0];
    assert!(body["file"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_upload_falls_back_to_data_uri() {
    let mock = MockEvolink::start().await;
    mock.fail_uploads();
    let upload = ImageUpload::new(png_bytes(), "image/png", "cat.png");

    let file = mock.provider().upload_image(&upload).await.unwrap();
    assert!(!file.hosted);
    assert_eq!(file.url, upload.to_data_url());
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let mock = MockEvolink::start().await;
    let upload = ImageUpload::new(b"GIF89a".to_vec(), "image/gif", "cat.gif");

    let err = mock.provider().upload_image(&upload).await.unwrap_err();
    assert!(matches!(err, SeedanceError::InvalidRequest(_)));
    assert!(mock.uploads().is_empty());
}

#[tokio::test]
async fn test_download() {
    let mock = MockEvolink::start().await;
    let provider = mock.provider();

    let err = provider
        .download(&format!("{}/missing.mp4", mock.base_url))
        .await
        .unwrap_err();
    assert!(matches!(err, SeedanceError::Api { status: 404, .. }));
}
