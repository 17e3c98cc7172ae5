//! Past generations, persisted as a JSON file.

use crate::error::{Result, SeedanceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Client-visible state of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Submitted and waiting on the provider.
    Processing,
    /// Finished with a video.
    Completed,
    /// Rejected at submission or failed remotely.
    Failed,
}

/// Which generations to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Every generation.
    #[default]
    All,
    /// Only completed ones.
    Completed,
    /// Only ones still processing.
    Processing,
    /// Only failed ones.
    Failed,
}

impl StatusFilter {
    fn matches(&self, status: GenerationStatus) -> bool {
        match self {
            Self::All => true,
            Self::Completed => status == GenerationStatus::Completed,
            Self::Processing => status == GenerationStatus::Processing,
            Self::Failed => status == GenerationStatus::Failed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = SeedanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "completed" => Ok(Self::Completed),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            other => Err(SeedanceError::InvalidRequest(format!(
                "unknown status filter: {other}"
            ))),
        }
    }
}

/// One requested video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    /// Local id, a UUID.
    pub id: String,
    /// Owner of the generation.
    pub user_id: String,
    /// Remote task id, absent when submission failed.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Trimmed prompt text.
    pub prompt: String,
    /// Current state.
    pub status: GenerationStatus,
    /// Result URL once completed.
    #[serde(default)]
    pub video_url: Option<String>,
    /// Failure message once failed.
    #[serde(default)]
    pub error: Option<String>,
    /// When the generation was requested.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// Model id sent to the provider.
    pub model: String,
    /// Generation mode, e.g. `text-to-video`.
    pub mode: String,
    /// Credits charged.
    pub cost: u32,
    /// Whether the charge was returned after a failure.
    #[serde(default)]
    pub refunded: bool,
}

impl Generation {
    /// A new processing generation with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        mode: impl Into<String>,
        cost: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            task_id: None,
            prompt: prompt.into(),
            status: GenerationStatus::Processing,
            video_url: None,
            error: None,
            created_at: now,
            updated_at: now,
            model: model.into(),
            mode: mode.into(),
            cost,
            refunded: false,
        }
    }

    /// Marks the generation completed and clears any error.
    pub fn mark_completed(&mut self, video_url: Option<String>) {
        self.status = GenerationStatus::Completed;
        self.video_url = video_url;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Marks the generation failed and clears the video URL.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = GenerationStatus::Failed;
        self.error = Some(error.into());
        self.video_url = None;
        self.updated_at = Utc::now();
    }

    /// True once the generation has completed or failed.
    pub fn is_terminal(&self) -> bool {
        self.status != GenerationStatus::Processing
    }
}

/// Generations of all users, newest first, written through to a JSON file.
#[derive(Debug)]
pub struct GalleryStore {
    path: Option<PathBuf>,
    generations: Vec<Generation>,
}

impl GalleryStore {
    /// Opens the gallery file. A missing file starts empty; an unreadable
    /// one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let generations = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(generations) => generations,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "ignoring corrupt gallery file");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: Some(path),
            generations,
        })
    }

    /// A gallery that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            generations: Vec::new(),
        }
    }

    /// File backing this gallery, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Adds a generation at the front. The record stays in memory even when
    /// the file write fails.
    pub fn insert(&mut self, generation: Generation) -> Result<()> {
        self.generations.insert(0, generation);
        self.persist()
    }

    /// Looks up a user's generation.
    pub fn get(&self, user_id: &str, id: &str) -> Option<&Generation> {
        self.generations
            .iter()
            .find(|g| g.id == id && g.user_id == user_id)
    }

    /// Replaces a stored generation with the given value.
    pub fn update(&mut self, generation: Generation) -> Result<()> {
        let slot = self
            .generations
            .iter_mut()
            .find(|g| g.id == generation.id && g.user_id == generation.user_id)
            .ok_or_else(|| SeedanceError::NotFound(format!("generation {}", generation.id)))?;
        *slot = generation;
        self.persist()
    }

    /// Removes a user's generation, returning it.
    pub fn remove(&mut self, user_id: &str, id: &str) -> Result<Generation> {
        let index = self
            .generations
            .iter()
            .position(|g| g.id == id && g.user_id == user_id)
            .ok_or_else(|| SeedanceError::NotFound(format!("generation {id}")))?;
        let removed = self.generations.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// A user's generations matching the filter, newest first.
    pub fn list(&self, user_id: &str, filter: StatusFilter) -> Vec<Generation> {
        self.generations
            .iter()
            .filter(|g| g.user_id == user_id && filter.matches(g.status))
            .cloned()
            .collect()
    }

    /// Removes all of a user's generations, returning how many were dropped.
    pub fn clear(&mut self, user_id: &str) -> Result<usize> {
        let before = self.generations.len();
        self.generations.retain(|g| g.user_id != user_id);
        let removed = before - self.generations.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&self.generations)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
