//! Core types for video generation.

use crate::error::{Result, SeedanceError};
use crate::pricing::{calculate_generation_cost, GenerationCostParams};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest video the studio will request, in seconds.
pub const MAX_DURATION_SECS: u32 = 15;
/// Number of reference slots available in the studio.
pub const MAX_REFERENCES: usize = 12;
/// Largest image accepted for upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Image MIME types accepted for upload.
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Video provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProviderKind {
    /// Evolink, serving the Seedance models.
    Evolink,
}

impl std::fmt::Display for VideoProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evolink => write!(f, "evolink"),
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// 480p.
    #[serde(rename = "480p")]
    P480,
    /// 720p, the default.
    #[default]
    #[serde(rename = "720p")]
    P720,
    /// 1080p, priced with an add-on.
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// Returns the wire string ("720p").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }

    /// Exact wire match; unlike [`FromStr`] no trimming or case folding.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "480p" => Some(Self::P480),
            "720p" => Some(Self::P720),
            "1080p" => Some(Self::P1080),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = SeedanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "480p" => Ok(Self::P480),
            "720p" => Ok(Self::P720),
            "1080p" => Ok(Self::P1080),
            other => Err(SeedanceError::InvalidRequest(format!(
                "unsupported resolution: {other}"
            ))),
        }
    }
}

/// How the prompt is combined with input media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Prompt only.
    #[default]
    TextToVideo,
    /// Animates one input image.
    ImageToVideo,
    /// Interpolates between a first and a last frame.
    FirstLastFrame,
    /// Steered by reference files.
    ReferenceToVideo,
}

impl GenerationMode {
    /// Returns the wire string ("text-to-video").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextToVideo => "text-to-video",
            Self::ImageToVideo => "image-to-video",
            Self::FirstLastFrame => "first-last-frame",
            Self::ReferenceToVideo => "reference-to-video",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = SeedanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text-to-video" => Ok(Self::TextToVideo),
            "image-to-video" => Ok(Self::ImageToVideo),
            "first-last-frame" => Ok(Self::FirstLastFrame),
            "reference-to-video" => Ok(Self::ReferenceToVideo),
            other => Err(SeedanceError::InvalidRequest(format!(
                "unsupported mode: {other}"
            ))),
        }
    }
}

/// What a reference file should steer in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Keep a person's face.
    Face,
    /// Copy movement.
    Motion,
    /// Follow layout or composition.
    Structure,
    /// Match the visual style.
    Style,
    /// Use as the soundtrack.
    Audio,
}

/// A reference file passed alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// What the file steers.
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    /// Hosted URL or data URI of the file.
    pub url: String,
}

/// A request to generate a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    /// The text prompt describing the desired video.
    pub prompt: String,
    /// Generation mode.
    #[serde(default)]
    pub mode: GenerationMode,
    /// Model override; the provider default is used when unset.
    #[serde(default)]
    pub model: Option<String>,
    /// Desired video duration in seconds.
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Output resolution.
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// Aspect ratio (e.g., "16:9", "9:16").
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Generate an audio track alongside the video.
    #[serde(default)]
    pub generate_audio: bool,
    /// Input images (first frame, or first and last frame).
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Reference files.
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl VideoGenerationRequest {
    /// Creates a new text-to-video request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: GenerationMode::default(),
            model: None,
            duration_secs: None,
            resolution: None,
            aspect_ratio: None,
            generate_audio: false,
            image_urls: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Sets the generation mode.
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the desired video duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets the output resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    /// Enables or disables audio generation.
    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.generate_audio = enabled;
        self
    }

    /// Adds an input image.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_urls.push(url.into());
        self
    }

    /// Adds a reference file.
    pub fn with_reference(mut self, kind: ReferenceKind, url: impl Into<String>) -> Self {
        self.references.push(Reference {
            kind,
            url: url.into(),
        });
        self
    }

    /// Parameters of the pricing formula for this request.
    pub fn cost_params(&self) -> GenerationCostParams {
        GenerationCostParams {
            duration_secs: self.duration_secs,
            resolution: self.resolution,
            generate_audio: Some(self.generate_audio),
        }
    }

    /// Credit cost of this request.
    pub fn cost(&self) -> u32 {
        calculate_generation_cost(&self.cost_params())
    }

    /// Checks the request before any credits are spent.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(SeedanceError::InvalidRequest("Prompt is required".into()));
        }
        if let Some(d) = self.duration_secs {
            if d == 0 || d > MAX_DURATION_SECS {
                return Err(SeedanceError::InvalidRequest(format!(
                    "duration must be between 1 and {MAX_DURATION_SECS} seconds"
                )));
            }
        }
        if self.references.len() > MAX_REFERENCES {
            return Err(SeedanceError::InvalidRequest(format!(
                "at most {MAX_REFERENCES} reference files are supported"
            )));
        }
        match self.mode {
            GenerationMode::ImageToVideo if self.image_urls.is_empty() => Err(
                SeedanceError::InvalidRequest("image-to-video requires an input image".into()),
            ),
            GenerationMode::FirstLastFrame if self.image_urls.len() != 2 => {
                Err(SeedanceError::InvalidRequest(
                    "first-last-frame requires exactly two images".into(),
                ))
            }
            GenerationMode::ReferenceToVideo if self.references.is_empty() => Err(
                SeedanceError::InvalidRequest("reference-to-video requires a reference".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// Lifecycle state of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Queued at the provider.
    Pending,
    /// Rendering.
    Processing,
    /// Finished with a result.
    Completed,
    /// Finished without a result.
    Failed,
}

impl TaskState {
    /// Parses the provider's status string. Unknown values are treated as
    /// still running so polling continues.
    pub fn from_api(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "pending" | "queued" => Self::Pending,
            "completed" | "succeeded" | "success" => Self::Completed,
            "failed" | "error" | "cancelled" => Self::Failed,
            "processing" | "running" => Self::Processing,
            other => {
                tracing::debug!(status = %other, "unknown task status, treating as processing");
                Self::Processing
            }
        }
    }

    /// True once the task will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot of a remote generation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Remote task id.
    pub id: String,
    /// Current state.
    pub status: TaskState,
    /// Progress percentage, 0-100.
    pub progress: u8,
    /// Result URL once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Provider's estimate of remaining seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
    /// Failure message once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An image to upload for use as an input frame or reference.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Original file name.
    pub file_name: String,
}

impl ImageUpload {
    /// Creates a new upload.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Infers the MIME type from the file extension.
    pub fn mime_from_extension(file_name: &str) -> Option<&'static str> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// Checks type and size limits.
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_IMAGE_TYPES.contains(&self.mime_type.as_str()) {
            return Err(SeedanceError::InvalidRequest(
                "Invalid file type. Supported: JPG, PNG, WebP".into(),
            ));
        }
        if self.data.is_empty() {
            return Err(SeedanceError::InvalidRequest("No file provided".into()));
        }
        if self.data.len() > MAX_UPLOAD_BYTES {
            return Err(SeedanceError::InvalidRequest(
                "File too large. Max 10MB.".into(),
            ));
        }
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Result of an image upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Hosted URL or data URI.
    pub url: String,
    /// File name sent with the upload.
    pub file_name: String,
    /// False when the provider upload failed and `url` is an inline data URI.
    pub hosted: bool,
}
