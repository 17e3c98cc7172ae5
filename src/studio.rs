//! The studio flow: charge credits, submit to the provider, track the result.

use crate::credits::CreditLedger;
use crate::error::{Result, SeedanceError};
use crate::gallery::{GalleryStore, Generation, GenerationStatus, StatusFilter};
use crate::video::providers::EvolinkModel;
use crate::video::{
    ImageUpload, TaskState, TaskStatus, UploadedFile, VideoGenerationRequest, VideoProvider,
    VideoProviderExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Coordinates the video provider, the credit ledger and the gallery.
#[derive(Clone)]
pub struct Studio {
    provider: Arc<dyn VideoProvider>,
    ledger: CreditLedger,
    gallery: Arc<Mutex<GalleryStore>>,
    default_model: String,
    submit_retries: u32,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("provider", &self.provider.name())
            .field("default_model", &self.default_model)
            .field("submit_retries", &self.submit_retries)
            .finish_non_exhaustive()
    }
}

impl Studio {
    /// Creates a studio over the given provider, ledger and gallery.
    pub fn new(provider: Arc<dyn VideoProvider>, ledger: CreditLedger, gallery: GalleryStore) -> Self {
        Self {
            provider,
            ledger,
            gallery: Arc::new(Mutex::new(gallery)),
            default_model: EvolinkModel::default().as_str().to_string(),
            submit_retries: 0,
        }
    }

    /// Model recorded for requests that do not name one.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Retries for transient submit failures.
    pub fn with_submit_retries(mut self, retries: u32) -> Self {
        self.submit_retries = retries;
        self
    }

    /// The credit ledger.
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// The video provider.
    pub fn provider(&self) -> &dyn VideoProvider {
        self.provider.as_ref()
    }

    /// Credit cost of a request.
    pub fn quote(&self, request: &VideoGenerationRequest) -> u32 {
        request.cost()
    }

    /// The credit check run before a generation.
    pub async fn check_credits(&self, user_id: &str, required: u32) -> Result<bool> {
        self.ledger
            .has_enough_credits(user_id, i64::from(required))
            .await
    }

    /// Spendable credits of a user.
    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        self.ledger.balance(user_id).await
    }

    /// Charges the user and submits the request.
    ///
    /// If the provider rejects the submission the charge is refunded, the
    /// generation is recorded as failed and the provider error is returned.
    pub async fn generate(
        &self,
        user_id: &str,
        mut request: VideoGenerationRequest,
    ) -> Result<Generation> {
        request.validate()?;
        if request.model.is_none() {
            request.model = Some(self.default_model.clone());
        }
        let cost = request.cost();
        let model = request.model.clone().unwrap_or_default();

        self.ledger
            .consume_credits(
                user_id,
                i64::from(cost),
                &format!("Video generation ({cost} credits)"),
            )
            .await?;

        let mut generation = Generation::new(
            user_id,
            request.prompt.trim(),
            model,
            request.mode.as_str(),
            cost,
        );

        match self
            .provider
            .submit_with_retries(&request, self.submit_retries)
            .await
        {
            Ok(task_id) => {
                tracing::info!(
                    user_id = %user_id,
                    generation_id = %generation.id,
                    task_id = %task_id,
                    cost,
                    "generation submitted"
                );
                generation.task_id = Some(task_id);
                let persisted = self.gallery.lock().await.insert(generation.clone());
                log_persist_failure(&generation.id, persisted);
                Ok(generation)
            }
            Err(err) => {
                tracing::error!(user_id = %user_id, generation_id = %generation.id, %err, "generation submit failed");
                generation.mark_failed(err.to_string());
                self.refund(&mut generation).await;
                let generation_id = generation.id.clone();
                let persisted = self.gallery.lock().await.insert(generation);
                log_persist_failure(&generation_id, persisted);
                Err(err)
            }
        }
    }

    /// Polls the provider once for a processing generation.
    ///
    /// Terminal generations are returned unchanged. A generation that failed
    /// remotely is refunded exactly once.
    pub async fn refresh(&self, user_id: &str, generation_id: &str) -> Result<Generation> {
        let current = self.generation(user_id, generation_id).await?;
        if current.is_terminal() {
            return Ok(current);
        }
        let Some(task_id) = current.task_id.clone() else {
            return Ok(current);
        };

        let status = self.provider.status(&task_id).await?;
        if !status.status.is_terminal() {
            return Ok(current);
        }

        let mut gallery = self.gallery.lock().await;
        let mut generation = gallery
            .get(user_id, generation_id)
            .cloned()
            .ok_or_else(|| SeedanceError::NotFound(format!("generation {generation_id}")))?;
        // Another refresh may have finished it while we were polling.
        if generation.is_terminal() {
            return Ok(generation);
        }

        match status.status {
            TaskState::Completed => {
                tracing::info!(generation_id = %generation.id, task_id = %task_id, "generation completed");
                generation.mark_completed(status.video_url);
            }
            _ => {
                let message = status
                    .error
                    .unwrap_or_else(|| "video generation failed".to_string());
                tracing::warn!(generation_id = %generation.id, task_id = %task_id, error = %message, "generation failed");
                generation.mark_failed(message);
                self.refund(&mut generation).await;
            }
        }
        let persisted = gallery.update(generation.clone());
        log_persist_failure(&generation.id, persisted);
        Ok(generation)
    }

    /// Polls at a fixed interval until the generation completes or fails.
    ///
    /// Dropping the returned future stops polling.
    pub async fn wait(
        &self,
        user_id: &str,
        generation_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Generation> {
        let start = Instant::now();
        loop {
            let generation = self.refresh(user_id, generation_id).await?;
            if generation.is_terminal() {
                return Ok(generation);
            }
            if start.elapsed() + poll_interval > timeout {
                return Err(SeedanceError::Timeout(timeout));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Raw task status from the provider.
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        self.provider.status(task_id).await
    }

    /// Uploads an input image.
    pub async fn upload(&self, upload: &ImageUpload) -> Result<UploadedFile> {
        self.provider.upload_image(upload).await
    }

    /// A single generation.
    pub async fn generation(&self, user_id: &str, generation_id: &str) -> Result<Generation> {
        self.gallery
            .lock()
            .await
            .get(user_id, generation_id)
            .cloned()
            .ok_or_else(|| SeedanceError::NotFound(format!("generation {generation_id}")))
    }

    /// A user's generations, newest first.
    pub async fn gallery(&self, user_id: &str, filter: StatusFilter) -> Vec<Generation> {
        self.gallery.lock().await.list(user_id, filter)
    }

    /// Deletes a generation from the gallery.
    pub async fn delete(&self, user_id: &str, generation_id: &str) -> Result<Generation> {
        self.gallery.lock().await.remove(user_id, generation_id)
    }

    async fn refund(&self, generation: &mut Generation) {
        if generation.refunded || generation.status != GenerationStatus::Failed {
            return;
        }
        let description = format!("Refund for failed generation {}", generation.id);
        match self
            .ledger
            .refund(&generation.user_id, i64::from(generation.cost), &description)
            .await
        {
            Ok(()) => generation.refunded = true,
            Err(err) => {
                tracing::error!(generation_id = %generation.id, %err, "refund failed, needs manual credit grant");
            }
        }
    }
}

/// The store keeps the record in memory when the file write fails, so the
/// generation is still returned.
fn log_persist_failure(generation_id: &str, result: Result<()>) {
    if let Err(err) = result {
        tracing::error!(generation_id = %generation_id, %err, "failed to persist gallery");
    }
}
