//! HTTP API for the studio.
//!
//! User identity is established by the auth gateway in front of this
//! service and forwarded in the [`USER_HEADER`] header.

use crate::error::SeedanceError;
use crate::gallery::{Generation, StatusFilter};
use crate::pricing::{
    self, credit_packages, price_plans, CreditPackage, GenerationCostParams, PricePlan,
};
use crate::studio::Studio;
use crate::templates::{self, Template};
use crate::video::{
    GenerationMode, ImageUpload, Reference, Resolution, TaskStatus, UploadedFile,
    VideoGenerationRequest, MAX_UPLOAD_BYTES,
};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Error body: `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<SeedanceError> for ApiError {
    fn from(err: SeedanceError) -> Self {
        let status = match &err {
            SeedanceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SeedanceError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            SeedanceError::NotFound(_) => StatusCode::NOT_FOUND,
            SeedanceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            SeedanceError::ContentBlocked(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SeedanceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SeedanceError::Api { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            SeedanceError::Auth(_)
            | SeedanceError::Network(_)
            | SeedanceError::UnexpectedResponse(_)
            | SeedanceError::VideoGeneration(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(%err, "internal error");
            return Self::new(status, "Internal server error");
        }
        let message = match &err {
            SeedanceError::InvalidRequest(m)
            | SeedanceError::NotFound(m)
            | SeedanceError::ContentBlocked(m)
            | SeedanceError::VideoGeneration(m) => m.clone(),
            SeedanceError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::new(status, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// The user id forwarded by the auth gateway.
#[derive(Debug, Clone)]
pub struct AuthUser(
    /// Trimmed user id.
    pub String,
);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| AuthUser(v.to_string()))
            .ok_or_else(ApiError::unauthorized)
    }
}

#[derive(Clone)]
struct AppState {
    studio: Studio,
}

/// Builds the API router.
pub fn router(studio: Studio) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/generate/status", get(task_status))
        .route("/api/upload", post(upload))
        .route("/api/credits", get(credits))
        .route("/api/credits/check", get(check_credits))
        .route("/api/pricing", get(pricing))
        .route("/api/pricing/quote", get(quote))
        .route("/api/gallery", get(gallery))
        .route("/api/gallery/:id", get(generation).delete(delete_generation))
        .route("/api/gallery/:id/refresh", post(refresh_generation))
        .route("/api/templates", get(list_templates))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .with_state(AppState { studio })
}

/// Serves the API until Ctrl-C.
pub async fn serve(studio: Studio, addr: SocketAddr) -> crate::Result<()> {
    let app = router(studio);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "studio API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    prompt: Option<String>,
    #[serde(default)]
    mode: Option<GenerationMode>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default, alias = "quality")]
    resolution: Option<Resolution>,
    #[serde(default)]
    aspect_ratio: Option<String>,
    #[serde(default)]
    generate_audio: bool,
    #[serde(default)]
    image_urls: Vec<String>,
    #[serde(default)]
    refs: Vec<Reference>,
}

impl GenerateBody {
    fn into_request(self) -> Result<VideoGenerationRequest, ApiError> {
        let prompt = self
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Prompt is required"))?;
        let mut request = VideoGenerationRequest::new(prompt)
            .with_mode(self.mode.unwrap_or_default())
            .with_audio(self.generate_audio);
        request.model = self.model;
        request.duration_secs = self.duration;
        request.resolution = self.resolution;
        request.aspect_ratio = self.aspect_ratio;
        request.image_urls = self.image_urls;
        request.references = self.refs;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    id: String,
    task_id: Option<String>,
    status: crate::gallery::GenerationStatus,
    cost: u32,
    balance: i64,
}

async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> ApiResult<GenerateResponse> {
    let Json(body) = body?;
    let request = body.into_request()?;
    let generation = state.studio.generate(&user_id, request).await?;
    let balance = state.studio.balance(&user_id).await?;
    Ok(Json(GenerateResponse {
        id: generation.id,
        task_id: generation.task_id,
        status: generation.status,
        cost: generation.cost,
        balance,
    }))
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    #[serde(rename = "taskId")]
    task_id: Option<String>,
}

async fn task_status(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<TaskStatus> {
    let Query(query) = query?;
    let task_id = query
        .task_id
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("taskId is required"))?;
    Ok(Json(state.studio.task_status(&task_id).await?))
}

async fn upload(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadedFile> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        let upload = ImageUpload::new(data.to_vec(), mime_type, file_name);
        let file = state.studio.upload(&upload).await?;
        tracing::info!(user_id = %user_id, hosted = file.hosted, "image uploaded");
        return Ok(Json(file));
    }
    Err(ApiError::bad_request("No file provided"))
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    balance: i64,
}

async fn credits(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> ApiResult<BalanceResponse> {
    let balance = state.studio.balance(&user_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    required: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    enough: bool,
    required: u32,
    balance: i64,
}

async fn check_credits(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ApiResult<CheckResponse> {
    let Query(query) = query?;
    let required = query.required.unwrap_or(pricing::BASE_CREDIT_COST);
    let balance = state.studio.balance(&user_id).await?;
    Ok(Json(CheckResponse {
        enough: balance >= i64::from(required),
        required,
        balance,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PricingResponse {
    plans: Vec<PricePlan>,
    packages: Vec<CreditPackage>,
    base_cost: u32,
    duration_addon: u32,
    resolution_addon: u32,
    audio_addon: u32,
}

async fn pricing() -> Json<PricingResponse> {
    Json(PricingResponse {
        plans: price_plans(),
        packages: credit_packages(),
        base_cost: pricing::BASE_CREDIT_COST,
        duration_addon: pricing::DURATION_ADDON_COST,
        resolution_addon: pricing::RESOLUTION_ADDON_COST,
        audio_addon: pricing::AUDIO_ADDON_COST,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteQuery {
    duration: Option<u32>,
    #[serde(alias = "resolution")]
    quality: Option<String>,
    generate_audio: Option<bool>,
}

async fn quote(
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> ApiResult<serde_json::Value> {
    let Query(query) = query?;
    // Anything but an exact wire name is priced like 720p.
    let resolution = query.quality.as_deref().and_then(Resolution::from_wire);
    let cost = pricing::calculate_generation_cost(&GenerationCostParams {
        duration_secs: query.duration,
        resolution,
        generate_audio: query.generate_audio,
    });
    Ok(Json(serde_json::json!({ "cost": cost })))
}

#[derive(Debug, Deserialize)]
struct GalleryQuery {
    status: Option<String>,
}

async fn gallery(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> ApiResult<Vec<Generation>> {
    let Query(query) = query?;
    let filter = match query.status.as_deref() {
        None => StatusFilter::All,
        Some(s) => s.parse()?,
    };
    Ok(Json(state.studio.gallery(&user_id, filter).await))
}

async fn generation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Generation> {
    let Path(id) = id?;
    Ok(Json(state.studio.generation(&user_id, &id).await?))
}

async fn refresh_generation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Generation> {
    let Path(id) = id?;
    Ok(Json(state.studio.refresh(&user_id, &id).await?))
}

async fn delete_generation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.studio.delete(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct TemplateQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct TemplatesResponse {
    categories: Vec<&'static str>,
    templates: Vec<&'static Template>,
}

async fn list_templates(
    query: Result<Query<TemplateQuery>, QueryRejection>,
) -> ApiResult<TemplatesResponse> {
    let Query(query) = query?;
    let category = query.category.unwrap_or_else(|| "All".to_string());
    Ok(Json(TemplatesResponse {
        categories: templates::categories(),
        templates: templates::templates_in(&category),
    }))
}
