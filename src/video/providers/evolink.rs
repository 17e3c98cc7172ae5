//! Evolink video generation provider (Seedance models).

use crate::error::{parse_retry_after, sanitize_error_message, Result, SeedanceError};
use crate::video::provider::VideoProvider;
use crate::video::types::{
    ImageUpload, TaskState, TaskStatus, UploadedFile, VideoGenerationRequest, VideoProviderKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Public Evolink API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.evolink.ai";

const GENERATIONS_PATH: &str = "/v1/videos/generations";
const TASKS_PATH: &str = "/v1/tasks";
const UPLOAD_PATH: &str = "/v1/files/upload/base64";

/// Seedance model variants served by Evolink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvolinkModel {
    /// Seedance 2.0 - default model, multi-modal references.
    #[default]
    Seedance20,
    /// Seedance 1.0 Pro.
    Seedance10Pro,
    /// Seedance 1.0 Lite - faster, cheaper.
    Seedance10Lite,
}

impl EvolinkModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seedance20 => "seedance-2.0",
            Self::Seedance10Pro => "seedance-1.0-pro",
            Self::Seedance10Lite => "seedance-1.0-lite",
        }
    }
}

impl std::str::FromStr for EvolinkModel {
    type Err = SeedanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "seedance-2.0" => Ok(Self::Seedance20),
            "seedance-1.0-pro" => Ok(Self::Seedance10Pro),
            "seedance-1.0-lite" => Ok(Self::Seedance10Lite),
            other => Err(SeedanceError::InvalidRequest(format!(
                "unknown model: {other}"
            ))),
        }
    }
}

/// Builder for `EvolinkProvider`.
#[derive(Debug, Clone)]
pub struct EvolinkProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: EvolinkModel,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for EvolinkProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: EvolinkModel::default(),
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600), // 10 minutes for video
        }
    }
}

impl EvolinkProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `EVOLINK_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API base URL. Falls back to `EVOLINK_API_BASE_URL`, then
    /// [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the default model for requests that do not name one.
    pub fn model(mut self, model: EvolinkModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the polling interval used while waiting for tasks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for a task.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider, resolving the API key and base URL.
    pub fn build(self) -> Result<EvolinkProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("EVOLINK_API_KEY").ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                SeedanceError::Auth("EVOLINK_API_KEY not set and no API key provided".into())
            })?;

        let base_url = self
            .base_url
            .or_else(|| std::env::var("EVOLINK_API_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(EvolinkProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model: self.model,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        })
    }
}

/// Evolink video generation provider.
#[derive(Debug)]
pub struct EvolinkProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: EvolinkModel,
    poll_interval: Duration,
    timeout: Duration,
}

impl EvolinkProvider {
    /// Creates a new `EvolinkProviderBuilder`.
    pub fn builder() -> EvolinkProviderBuilder {
        EvolinkProviderBuilder::new()
    }

    /// Default model for requests without one.
    pub fn model(&self) -> EvolinkModel {
        self.model
    }

    /// Configured polling interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Configured polling timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error_from_response(&self, response: reqwest::Response) -> SeedanceError {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        tracing::error!(status, body = %sanitize_error_message(&text), "Evolink API error");
        self.parse_error(status, &text, &headers)
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> SeedanceError {
        let message = serde_json::from_str::<EvolinkErrorResponse>(text)
            .ok()
            .and_then(|r| r.error.message())
            .unwrap_or_else(|| text.to_string());
        let message = sanitize_error_message(&message);

        match status {
            401 | 403 => return SeedanceError::Auth(message),
            400 | 422 => return SeedanceError::InvalidRequest(message),
            404 => return SeedanceError::NotFound(message),
            429 => {
                let retry_after = parse_retry_after(headers).map(Duration::from_secs);
                return SeedanceError::RateLimited { retry_after };
            }
            _ => {}
        }
        let lower = message.to_lowercase();
        if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("content_policy")
            || lower.contains("moderat")
        {
            return SeedanceError::ContentBlocked(message);
        }
        SeedanceError::Api { status, message }
    }

    async fn try_hosted_upload(&self, upload: &ImageUpload, data_url: &str) -> Option<UploadedFile> {
        let body = EvolinkUploadRequest {
            file: data_url,
            file_name: &upload.file_name,
        };
        let response = match self
            .client
            .post(self.url(UPLOAD_PATH))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Evolink upload connection failed, falling back to data URI");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                status = response.status().as_u16(),
                "Evolink upload failed, falling back to data URI"
            );
            return None;
        }

        match response.json::<EvolinkUploadResponse>().await {
            Ok(data) => {
                let url = data.url.or(data.file_url).or(data.download_url)?;
                Some(UploadedFile {
                    url,
                    file_name: data.file_name.unwrap_or_else(|| upload.file_name.clone()),
                    hosted: true,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable Evolink upload response, falling back to data URI");
                None
            }
        }
    }
}

#[async_trait]
impl VideoProvider for EvolinkProvider {
    async fn submit(&self, request: &VideoGenerationRequest) -> Result<String> {
        request.validate()?;
        let body = EvolinkVideoRequest::from_request(request, self.model);

        let response = self
            .client
            .post(self.url(GENERATIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let task: EvolinkTaskResponse = response.json().await?;
        if task.id.is_empty() {
            return Err(SeedanceError::UnexpectedResponse(
                "Evolink returned an empty task id".into(),
            ));
        }
        tracing::info!(task_id = %task.id, model = %body.model, "submitted Evolink video generation");
        Ok(task.id)
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatus> {
        let task_id = task_path_segment(task_id)?;
        let response = self
            .client
            .get(self.url(&format!("{TASKS_PATH}/{task_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let task: EvolinkTaskResponse = response.json().await?;
        Ok(task.into_status())
    }

    async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedFile> {
        upload.validate()?;
        let data_url = upload.to_data_url();

        if let Some(file) = self.try_hosted_upload(upload, &data_url).await {
            return Ok(file);
        }
        Ok(UploadedFile {
            url: data_url,
            file_name: upload.file_name.clone(),
            hosted: false,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SeedanceError::Api {
                status: response.status().as_u16(),
                message: "Failed to download video".into(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn kind(&self) -> VideoProviderKind {
        VideoProviderKind::Evolink
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.is_empty() {
            Err(SeedanceError::Auth("API key is empty".into()))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EvolinkVideoRequest {
    model: String,
    prompt: String,
    duration: u32,
    quality: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generate_audio: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<EvolinkReference>,
}

#[derive(Debug, Serialize)]
struct EvolinkReference {
    #[serde(rename = "type")]
    ref_type: &'static str,
    url: String,
}

fn reference_type(kind: crate::video::ReferenceKind) -> &'static str {
    use crate::video::ReferenceKind;
    match kind {
        ReferenceKind::Face => "face",
        ReferenceKind::Motion => "motion",
        ReferenceKind::Structure => "structure",
        ReferenceKind::Style => "style",
        ReferenceKind::Audio => "audio",
    }
}

/// Task ids become a URL path segment, so only plain id characters pass.
fn task_path_segment(task_id: &str) -> Result<&str> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(SeedanceError::InvalidRequest("taskId is required".into()));
    }
    let plain = task_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !plain || task_id.chars().all(|c| c == '.') {
        return Err(SeedanceError::InvalidRequest(format!(
            "invalid taskId: {task_id}"
        )));
    }
    Ok(task_id)
}

impl EvolinkVideoRequest {
    fn from_request(req: &VideoGenerationRequest, model: EvolinkModel) -> Self {
        Self {
            model: req
                .model
                .clone()
                .unwrap_or_else(|| model.as_str().to_string()),
            prompt: req.prompt.trim().to_string(),
            duration: req.duration_secs.unwrap_or(crate::pricing::BASE_DURATION_SECS),
            quality: req.resolution.unwrap_or_default().as_str(),
            aspect_ratio: req.aspect_ratio.clone(),
            generate_audio: req.generate_audio.then_some(true),
            image_urls: req.image_urls.clone(),
            references: req
                .references
                .iter()
                .map(|r| EvolinkReference {
                    ref_type: reference_type(r.kind),
                    url: r.url.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EvolinkUploadRequest<'a> {
    file: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct EvolinkUploadResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    file_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
}

// Task response, shared by submit and status queries
#[derive(Debug, Deserialize)]
struct EvolinkTaskResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    results: Option<Vec<Value>>,
    #[serde(default)]
    task_info: Option<EvolinkTaskInfo>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EvolinkTaskInfo {
    #[serde(default)]
    estimated_time: Option<u64>,
}

impl EvolinkTaskResponse {
    /// Video URL of the first result: `url`, then `video_url`, then a bare string.
    fn video_url(&self) -> Option<String> {
        let first = self.results.as_ref()?.first()?;
        match first {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("url")
                .or_else(|| obj.get("video_url"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::String(s) => Some(sanitize_error_message(s)),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(sanitize_error_message),
            _ => None,
        }
    }

    fn into_status(self) -> TaskStatus {
        let state = TaskState::from_api(&self.status);
        let video_url = match state {
            TaskState::Completed => self.video_url(),
            _ => None,
        };
        let progress = match state {
            TaskState::Completed => 100,
            _ => self.progress.unwrap_or(0.0).clamp(0.0, 100.0) as u8,
        };
        let error = match state {
            TaskState::Failed => self.error_message(),
            _ => None,
        };
        TaskStatus {
            estimated_time: self.task_info.as_ref().and_then(|i| i.estimated_time),
            id: self.id,
            status: state,
            progress,
            video_url,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EvolinkErrorResponse {
    error: EvolinkErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EvolinkErrorBody {
    Message(String),
    Detailed {
        #[serde(default)]
        message: Option<String>,
    },
}

impl EvolinkErrorBody {
    fn message(self) -> Option<String> {
        match self {
            Self::Message(m) => Some(m),
            Self::Detailed { message } => message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
