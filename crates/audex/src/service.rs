//! Intake boundary used by the HTTP layer.
//!
//! [`ExtractionService`] owns one registry per process and hands out handles to
//! it; nothing in the crate reaches the registry through global state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::cookies::CookieJar;
use crate::error::{IntakeError, LookupError};
use crate::extract::{Orchestrator, ToolResolver, UrlRequest};
use crate::jobs::{JobCounts, JobResponse, JobStatus, JobStore};
use crate::storage::stage_upload;
use crate::sweeper::{SweepReport, Sweeper};

/// A submitted job and the task working on it.
///
/// Dropping `task` detaches it; the job still reaches a terminal state.
#[derive(Debug)]
pub struct Dispatched {
    pub response: JobResponse,
    pub task: JoinHandle<()>,
}

impl Dispatched {
    pub fn job_id(&self) -> &str {
        &self.response.job_id
    }
}

/// Downloadable artifact of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub media_type: String,
    pub filename: String,
}

/// Liveness summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub jobs: JobCounts,
}

pub struct ExtractionService {
    settings: Arc<Settings>,
    store: Arc<JobStore>,
    cookies: Arc<CookieJar>,
    orchestrator: Orchestrator,
}

impl ExtractionService {
    pub fn new(settings: Settings, tools: ToolResolver) -> Self {
        let settings = Arc::new(settings);
        let store = Arc::new(JobStore::new());
        let cookies = Arc::new(CookieJar::new(
            &settings.temp_dir,
            settings.cookies_file.clone(),
        ));
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&settings),
            Arc::new(tools),
            Arc::clone(&cookies),
        );

        Self {
            settings,
            store,
            cookies,
            orchestrator,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Creates a job and starts extracting from the URL.
    pub fn submit_url(&self, request: UrlRequest) -> Dispatched {
        let job_id = self.store.create();
        log::info!("Accepted URL job {}", job_id);

        let response = JobResponse::pending(&job_id);
        let task = self.orchestrator.spawn_url(job_id, request);
        Dispatched { response, task }
    }

    /// Stages an uploaded video, creates a job and starts transcoding.
    ///
    /// A rejected upload leaves no job behind.
    pub async fn submit_upload(
        &self,
        original_filename: Option<&str>,
        content: &[u8],
    ) -> Result<Dispatched, IntakeError> {
        let job_id = self.store.create();

        let input_path =
            match stage_upload(&self.settings, &job_id, original_filename, content).await {
                Ok(path) => path,
                Err(e) => {
                    self.store.delete(&job_id);
                    return Err(e);
                }
            };
        log::info!("Accepted upload job {} ({} bytes)", job_id, content.len());

        let response = JobResponse::pending(&job_id);
        let task = self.orchestrator.spawn_file(job_id, input_path);
        Ok(Dispatched { response, task })
    }

    /// Current status of a job.
    pub fn status(&self, job_id: &str) -> Option<JobResponse> {
        self.store.get(job_id).map(|job| JobResponse::from(&job))
    }

    /// Polls the job every `poll` until it is terminal or `shutdown` fires.
    ///
    /// Returns the last observed status, or `NotFound` once the job is gone.
    pub async fn wait_for_terminal(
        &self,
        job_id: &str,
        poll: Duration,
        shutdown: &CancellationToken,
    ) -> Result<JobResponse, LookupError> {
        loop {
            let response = self
                .status(job_id)
                .ok_or_else(|| LookupError::NotFound(job_id.to_string()))?;
            if response.status.is_terminal() {
                return Ok(response);
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::warn!("Stopped waiting for job {} ({})", job_id, response.status);
                    return Ok(response);
                }
                _ = tokio::time::sleep(poll) => {}
            }
        }
    }

    /// Artifact of a finished job, if it is still on disk.
    pub fn artifact(&self, job_id: &str) -> Result<Artifact, LookupError> {
        let job = self
            .store
            .get(job_id)
            .ok_or_else(|| LookupError::NotFound(job_id.to_string()))?;

        let path = match (job.status, job.file_path) {
            (JobStatus::Done, Some(path)) => path,
            (status, _) => {
                return Err(LookupError::NotReady {
                    job_id: job_id.to_string(),
                    status,
                })
            }
        };

        if !path.is_file() {
            return Err(LookupError::FileMissing(path));
        }

        let format = &self.settings.audio_format;
        Ok(Artifact {
            path,
            media_type: mime_guess::from_ext(format)
                .first_or_octet_stream()
                .to_string(),
            filename: format!("{}.{}", job_id, format),
        })
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok",
            jobs: self.store.counts(),
        }
    }

    fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            Arc::clone(&self.store),
            self.settings.job_ttl(),
            self.settings.sweep_interval(),
        )
        .with_work_dir(self.settings.temp_dir.clone())
    }

    /// Starts the background sweeper; it stops when `shutdown` is cancelled.
    pub fn start_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        log::info!(
            "Starting sweeper (ttl {}s, every {}s)",
            self.settings.job_ttl_seconds,
            self.settings.sweep_interval_seconds
        );
        self.sweeper().start(shutdown)
    }

    /// Runs a single sweep pass now.
    pub fn sweep_now(&self) -> SweepReport {
        self.sweeper().sweep()
    }
}
