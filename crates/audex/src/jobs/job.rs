//! Job record and status model.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    /// Returns true for `done` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One extraction request and its tracked outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier, also the stem of every file the job owns.
    pub id: String,
    /// Current status.
    pub status: JobStatus,
    /// When the job was created. Never changes.
    pub created_at: DateTime<Utc>,
    /// Produced audio artifact (set on `done`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Failure description (set on `failed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Source media title, URL jobs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Probed duration of the artifact in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Job {
    /// Creates a pending job.
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            file_path: None,
            error: None,
            title: None,
            duration: None,
        }
    }

    /// Merges an update into the record.
    ///
    /// `created_at` and `id` are not part of [`JobUpdate`] and cannot change.
    /// Entering `done` clears any error, entering `failed` clears any artifact,
    /// so a record never carries both.
    pub fn apply(&mut self, update: JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
            match status {
                JobStatus::Done => self.error = None,
                JobStatus::Failed => self.file_path = None,
                JobStatus::Pending | JobStatus::Processing => {}
            }
        }

        if let Some(file_path) = update.file_path {
            self.file_path = Some(file_path);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(title) = update.title {
            self.title = Some(title);
        }
        if let Some(duration) = update.duration {
            self.duration = Some(duration);
        }
    }

    /// Age of the job relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
    }

    /// Returns true if this job is finished (done or failed).
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Partial update merged into a [`Job`] by the store.
///
/// Only built through [`JobUpdate::processing`], [`JobUpdate::done`] and
/// [`JobUpdate::failed`], so an artifact only arrives with `done` and an
/// error only with `failed`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    status: Option<JobStatus>,
    file_path: Option<PathBuf>,
    error: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
}

impl JobUpdate {
    /// Transition to `processing`.
    pub fn processing() -> Self {
        Self {
            status: Some(JobStatus::Processing),
            ..Default::default()
        }
    }

    /// Transition to `done` with the produced artifact.
    pub fn done(file_path: PathBuf, title: Option<String>, duration: Option<f64>) -> Self {
        Self {
            status: Some(JobStatus::Done),
            file_path: Some(file_path),
            title,
            duration,
            ..Default::default()
        }
    }

    /// Transition to `failed`.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Status view handed to the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Download link, only once the job is `done`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl JobResponse {
    /// Response for a freshly submitted job.
    pub fn pending(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Pending,
            error: None,
            audio_url: None,
            duration: None,
            title: None,
        }
    }
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        let audio_url = match job.status {
            JobStatus::Done => Some(download_url(&job.id)),
            _ => None,
        };

        Self {
            job_id: job.id.clone(),
            status: job.status,
            error: job.error.clone(),
            audio_url,
            duration: job.duration,
            title: job.title.clone(),
        }
    }
}

/// Relative download link for a job's artifact.
pub fn download_url(job_id: &str) -> String {
    format!("/jobs/{}/download", job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending_and_empty() {
        let job = Job::new("job-1".to_string());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.file_path.is_none());
        assert!(job.error.is_none());
        assert!(job.title.is_none());
        assert!(job.duration.is_none());
    }

    #[test]
    fn test_apply_done() {
        let mut job = Job::new("job-1".to_string());
        job.apply(JobUpdate::processing());
        assert_eq!(job.status, JobStatus::Processing);

        job.apply(JobUpdate::done(
            PathBuf::from("/tmp/job-1.mp3"),
            Some("Title".to_string()),
            Some(12.5),
        ));
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.file_path, Some(PathBuf::from("/tmp/job-1.mp3")));
        assert_eq!(job.title.as_deref(), Some("Title"));
        assert_eq!(job.duration, Some(12.5));
        assert!(job.error.is_none());
    }

    #[test]
    fn test_failed_and_done_are_exclusive() {
        let mut job = Job::new("job-1".to_string());
        job.apply(JobUpdate::done(PathBuf::from("/tmp/a.mp3"), None, None));
        job.apply(JobUpdate::failed("boom"));
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.file_path.is_none());
        assert_eq!(job.error.as_deref(), Some("boom"));

        job.apply(JobUpdate::done(PathBuf::from("/tmp/a.mp3"), None, None));
        assert!(job.error.is_none());
        assert!(job.file_path.is_some());
    }

    #[test]
    fn test_updates_carry_one_outcome() {
        let processing = JobUpdate::processing();
        assert!(processing.file_path.is_none());
        assert!(processing.error.is_none());

        let done = JobUpdate::done(PathBuf::from("/tmp/a.mp3"), None, None);
        assert_eq!(done.status, Some(JobStatus::Done));
        assert!(done.error.is_none());

        let failed = JobUpdate::failed("boom");
        assert_eq!(failed.status, Some(JobStatus::Failed));
        assert!(failed.file_path.is_none());

        // An empty update leaves the record untouched
        let mut job = Job::new("job-1".to_string());
        job.apply(JobUpdate::default());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.file_path.is_none());
    }

    #[test]
    fn test_created_at_survives_updates() {
        let mut job = Job::new("job-1".to_string());
        let created_at = job.created_at;
        job.apply(JobUpdate::processing());
        job.apply(JobUpdate::failed("x"));
        assert_eq!(job.created_at, created_at);
    }

    #[test]
    fn test_response_audio_url_only_when_done() {
        let mut job = Job::new("abc".to_string());
        assert!(JobResponse::from(&job).audio_url.is_none());

        job.apply(JobUpdate::done(PathBuf::from("/tmp/abc.mp3"), None, Some(3.0)));
        let response = JobResponse::from(&job);
        assert_eq!(response.audio_url.as_deref(), Some("/jobs/abc/download"));
        assert_eq!(response.duration, Some(3.0));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");

        let response = JobResponse::pending("xyz");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["job_id"], "xyz");
        assert_eq!(value["status"], "pending");
        assert!(value.get("audio_url").is_none());
    }
}
