//! Drives a job through the external tools and records the outcome.
//!
//! Every job runs in its own task. The task boundary is the catch-all: an
//! error from any step, or a panic, ends in a `failed` record, so no job is
//! left `processing` once its task finishes.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::Settings;
use crate::cookies::CookieJar;
use crate::error::ExtractError;
use crate::extract::command::{ffmpeg_args, resolve_clip_window, ytdlp_args};
use crate::extract::probe::probe_duration;
use crate::extract::runner::{first_non_blank_line, run_tool, truncate_chars, STDERR_LIMIT};
use crate::extract::tools::{Tool, ToolResolver};
use crate::jobs::{JobStore, JobUpdate};
use crate::storage::{remove_file_if_exists, StagedUpload};

/// Title recorded when the downloader prints none.
pub const UNKNOWN_TITLE: &str = "unknown";

/// A URL extraction request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlRequest {
    pub url: String,
    #[serde(default)]
    pub start_sec: Option<u64>,
    #[serde(default)]
    pub end_sec: Option<u64>,
}

impl UrlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_sec: None,
            end_sec: None,
        }
    }
}

/// Successful extraction, before it is written to the store.
#[derive(Debug, Clone, PartialEq)]
struct Extracted {
    file_path: PathBuf,
    title: Option<String>,
    duration: Option<f64>,
}

/// Runs extraction jobs against a shared [`JobStore`].
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<JobStore>,
    settings: Arc<Settings>,
    tools: Arc<ToolResolver>,
    cookies: Arc<CookieJar>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<JobStore>,
        settings: Arc<Settings>,
        tools: Arc<ToolResolver>,
        cookies: Arc<CookieJar>,
    ) -> Self {
        Self {
            store,
            settings,
            tools,
            cookies,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Spawns URL extraction for `job_id` on the runtime.
    pub fn spawn_url(&self, job_id: String, request: UrlRequest) -> JoinHandle<()> {
        let span = tracing::info_span!("extract.url", job_id = %job_id);
        let this = self.clone();
        let id = job_id.clone();
        self.spawn_supervised(job_id, span, async move {
            this.extract_from_url(&id, &request).await;
        })
    }

    /// Spawns transcoding of the staged upload at `input_path`.
    pub fn spawn_file(&self, job_id: String, input_path: PathBuf) -> JoinHandle<()> {
        let span = tracing::info_span!("extract.file", job_id = %job_id);
        let this = self.clone();
        let id = job_id.clone();
        self.spawn_supervised(job_id, span, async move {
            this.extract_from_file(&id, &input_path).await;
        })
    }

    fn spawn_supervised<F>(&self, job_id: String, span: tracing::Span, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let artifact = self.settings.artifact_path(&job_id);

        tokio::spawn(
            async move {
                if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                    let err = ExtractError::Panicked(panic_message(panic.as_ref()));
                    log::error!("Job {} aborted: {}", job_id, err);
                    discard(&artifact);
                    store.update(&job_id, JobUpdate::failed(err.to_string()));
                }
            }
            .instrument(span),
        )
    }

    /// Extracts audio from `request.url` and records the outcome.
    pub async fn extract_from_url(&self, job_id: &str, request: &UrlRequest) {
        let result = self.try_extract_url(job_id, request).await;
        self.record_outcome(job_id, result);
    }

    /// Transcodes the uploaded video at `input_path` and records the outcome.
    ///
    /// The staged input is removed when this returns, whatever the outcome.
    pub async fn extract_from_file(&self, job_id: &str, input_path: &Path) {
        let staged = StagedUpload::new(input_path);
        let result = self.try_extract_file(job_id, staged.path()).await;
        self.record_outcome(job_id, result);
        drop(staged);
    }

    async fn try_extract_url(
        &self,
        job_id: &str,
        request: &UrlRequest,
    ) -> Result<Extracted, ExtractError> {
        let invocation = self.tools.resolve(Tool::YtDlp)?;
        tokio::fs::create_dir_all(&self.settings.temp_dir).await?;

        self.store.update(job_id, JobUpdate::processing());
        log::info!("Extracting audio for job {} from {}", job_id, request.url);

        let window = resolve_clip_window(
            request.start_sec,
            request.end_sec,
            self.settings.clip_length(),
        );
        let cookies = self.cookies.current().filter(|path| {
            let exists = path.is_file();
            if !exists {
                log::warn!("Cookie file {} is missing, skipping", path.display());
            }
            exists
        });

        let args = ytdlp_args(
            &self.settings,
            job_id,
            &request.url,
            cookies.as_deref(),
            window,
        );
        let output = run_tool(&invocation, &args, self.settings.process_timeout(), true).await?;

        let title = first_non_blank_line(&output.stdout)
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();

        // Filters reject a source with a clean exit and no file
        let file_path = self.settings.artifact_path(job_id);
        if !file_path.is_file() {
            return Err(ExtractError::MissingOutput {
                path: file_path,
                reason: output.reason(),
            });
        }

        let duration =
            probe_duration(&self.tools, &file_path, self.settings.process_timeout()).await;

        Ok(Extracted {
            file_path,
            title: Some(title),
            duration,
        })
    }

    async fn try_extract_file(
        &self,
        job_id: &str,
        input_path: &Path,
    ) -> Result<Extracted, ExtractError> {
        let invocation = self.tools.resolve(Tool::Ffmpeg)?;
        tokio::fs::create_dir_all(&self.settings.temp_dir).await?;

        self.store.update(job_id, JobUpdate::processing());
        log::info!(
            "Transcoding upload for job {} from {}",
            job_id,
            input_path.display()
        );

        let file_path = self.settings.artifact_path(job_id);
        let args = ffmpeg_args(&self.settings, input_path, &file_path);
        let output = run_tool(&invocation, &args, self.settings.process_timeout(), false).await?;

        if !file_path.is_file() {
            return Err(ExtractError::MissingOutput {
                path: file_path,
                reason: output.reason(),
            });
        }

        let duration =
            probe_duration(&self.tools, &file_path, self.settings.process_timeout()).await;

        Ok(Extracted {
            file_path,
            title: None,
            duration,
        })
    }

    fn record_outcome(&self, job_id: &str, result: Result<Extracted, ExtractError>) {
        match result {
            Ok(extracted) => {
                log::info!(
                    "Job {} done: {} ({})",
                    job_id,
                    extracted.file_path.display(),
                    match extracted.duration {
                        Some(secs) => format!("{:.1}s", secs),
                        None => "duration unknown".to_string(),
                    }
                );
                let file_path = extracted.file_path.clone();
                let recorded = self.store.update(
                    job_id,
                    JobUpdate::done(extracted.file_path, extracted.title, extracted.duration),
                );
                // Swept while running: nothing references the artifact anymore
                if !recorded {
                    log::warn!("Job {} vanished before completion, discarding output", job_id);
                    discard(&file_path);
                }
            }
            Err(e) => {
                log::warn!("Job {} failed: {}", job_id, e);
                discard(&self.settings.artifact_path(job_id));
                self.store.update(
                    job_id,
                    JobUpdate::failed(truncate_chars(&e.to_string(), STDERR_LIMIT)),
                );
            }
        }
    }
}

/// Best-effort removal of an artifact no record points at.
fn discard(path: &Path) {
    if let Err(e) = remove_file_if_exists(path) {
        log::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
