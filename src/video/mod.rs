//! Video generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::{VideoProvider, VideoProviderExt};
pub use types::{
    GenerationMode, ImageUpload, Reference, ReferenceKind, Resolution, TaskState, TaskStatus,
    UploadedFile, VideoGenerationRequest, VideoProviderKind, ALLOWED_IMAGE_TYPES,
    MAX_DURATION_SECS, MAX_REFERENCES, MAX_UPLOAD_BYTES,
};
