#![warn(missing_docs)]
//! Seedance - back end of an AI video studio.
//!
//! Video synthesis happens at Evolink; this crate submits generation
//! requests, polls task status, charges credits for each generation and
//! keeps a gallery of past results.
//!
//! # Quick Start
//!
//! ```no_run
//! use seedance::{EvolinkProvider, Resolution, VideoGenerationRequest, VideoProvider, VideoProviderExt};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> seedance::Result<()> {
//!     let provider = EvolinkProvider::builder().build()?;
//!     let request = VideoGenerationRequest::new("A cat playing with a ball")
//!         .with_duration(5)
//!         .with_resolution(Resolution::P1080);
//!     println!("this costs {} credits", request.cost());
//!
//!     let task_id = provider.submit(&request).await?;
//!     let status = provider
//!         .wait_for_completion(&task_id, Duration::from_secs(3), Duration::from_secs(600))
//!         .await?;
//!     println!("video: {:?}", status.video_url);
//!     Ok(())
//! }
//! ```
//!
//! # Studio
//!
//! [`Studio`] ties the provider to a [`CreditLedger`] and a
//! [`GalleryStore`]: credits are consumed before submission and refunded
//! when the provider rejects or fails the generation.
//!
//! # Features
//!
//! - `server`: axum HTTP API ([`server::router`])
//! - `cli`: the `seedance` command-line tool (implies `server`)

pub mod config;
pub mod credits;
mod error;
pub mod gallery;
pub mod pricing;
pub mod studio;
pub mod templates;
pub mod video;

#[cfg(feature = "server")]
pub mod server;

pub use config::Config;
pub use credits::{AddCredits, CreditLedger, CreditTransaction, CreditTransactionKind};
pub use error::{parse_retry_after, sanitize_error_message, Result, SeedanceError};
pub use gallery::{GalleryStore, Generation, GenerationStatus, StatusFilter};
pub use pricing::{calculate_generation_cost, GenerationCostParams};
pub use studio::Studio;
pub use video::providers::{EvolinkModel, EvolinkProvider, EvolinkProviderBuilder};
pub use video::{
    GenerationMode, ImageUpload, Reference, ReferenceKind, Resolution, TaskState, TaskStatus,
    UploadedFile, VideoGenerationRequest, VideoProvider, VideoProviderExt, VideoProviderKind,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::credits::CreditLedger;
    pub use crate::error::{Result, SeedanceError};
    pub use crate::gallery::{GalleryStore, StatusFilter};
    pub use crate::studio::Studio;
    pub use crate::video::providers::EvolinkProvider;
    pub use crate::video::{VideoGenerationRequest, VideoProvider, VideoProviderExt};
}
