//! Video provider trait and utilities.

use crate::error::{Result, SeedanceError};
use crate::video::types::{
    ImageUpload, TaskState, TaskStatus, UploadedFile, VideoGenerationRequest, VideoProviderKind,
};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Trait for video generation providers.
///
/// Generation is asynchronous on the provider side: [`submit`](Self::submit)
/// returns a task id which is then polled with [`status`](Self::status).
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Submits a generation request, returning the remote task id.
    async fn submit(&self, request: &VideoGenerationRequest) -> Result<String>;

    /// Queries the current state of a task.
    async fn status(&self, task_id: &str) -> Result<TaskStatus>;

    /// Uploads an image so it can be referenced by URL in a request.
    async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedFile>;

    /// Downloads a finished video.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;

    /// Returns the kind of this provider.
    fn kind(&self) -> VideoProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            VideoProviderKind::Evolink => "Evolink (Seedance)",
        }
    }

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

/// Extension trait for providers with retry and polling logic.
#[async_trait]
pub trait VideoProviderExt: VideoProvider {
    /// Submits with automatic retries on transient failures.
    async fn submit_with_retries(
        &self,
        request: &VideoGenerationRequest,
        max_retries: u32,
    ) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.submit(request).await {
                Ok(task_id) => return Ok(task_id),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    let delay = e.retry_after().unwrap_or(Duration::from_secs(1));
                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis(),
                        "retrying after transient error: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polls a task at a fixed interval until it completes or fails.
    ///
    /// A failed task is returned as [`SeedanceError::VideoGeneration`].
    async fn wait_for_completion(
        &self,
        task_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TaskStatus> {
        let start = Instant::now();

        loop {
            let status = self.status(task_id).await?;
            match status.status {
                TaskState::Completed => return Ok(status),
                TaskState::Failed => {
                    return Err(SeedanceError::VideoGeneration(
                        status
                            .error
                            .unwrap_or_else(|| "video generation failed".into()),
                    ))
                }
                TaskState::Pending | TaskState::Processing => {
                    tracing::debug!(
                        task_id = %task_id,
                        progress = status.progress,
                        elapsed_secs = start.elapsed().as_secs(),
                        "polling video generation"
                    );
                }
            }

            if start.elapsed() + poll_interval > timeout {
                return Err(SeedanceError::Timeout(timeout));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl<T: VideoProvider + ?Sized> VideoProviderExt for T {}
