//! Periodic reclamation of expired jobs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::jobs::{Job, JobStore};
use crate::storage::{owning_job_id, remove_file_if_exists};

/// Outcome of a single sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Jobs inspected.
    pub scanned: usize,
    /// Records removed.
    pub removed: usize,
    /// Artifact files removed.
    pub files_removed: usize,
    /// Expired job files in the work directory that no record referenced.
    pub orphans_removed: usize,
}

/// Removes jobs older than the TTL together with their artifacts.
pub struct Sweeper {
    store: Arc<JobStore>,
    ttl: Duration,
    interval: Duration,
    work_dir: Option<PathBuf>,
}

impl Sweeper {
    pub fn new(store: Arc<JobStore>, ttl: Duration, interval: Duration) -> Self {
        Self {
            store,
            ttl,
            interval,
            work_dir: None,
        }
    }

    /// Also reclaims expired job files in `dir` that no live job owns, such as
    /// output of a process that outlived its job or files left by a previous
    /// run of the service.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Runs one pass against the current time.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// Runs one pass treating `now` as the current time.
    ///
    /// The artifact is removed before the record. A missing file, or a record
    /// that disappeared since the snapshot, is not an error.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let _span = tracing::info_span!("sweeper.pass").entered();
        let mut report = SweepReport::default();

        for (job_id, job) in self.store.list_all() {
            report.scanned += 1;
            // Negative ages (clock skew) never expire
            let expired = job
                .age(now)
                .to_std()
                .map(|age| age > self.ttl)
                .unwrap_or(false);
            if expired {
                self.reclaim(&job_id, &job, &mut report);
            }
        }

        if let Some(dir) = self.work_dir.as_deref() {
            self.sweep_orphans(dir, SystemTime::from(now), &mut report);
        }

        if report.removed > 0 || report.orphans_removed > 0 {
            log::info!(
                "Swept {} expired jobs ({} files, {} orphans)",
                report.removed,
                report.files_removed,
                report.orphans_removed
            );
        }
        report
    }

    /// Removes the snapshot's artifact, then the record. The record may have
    /// gained an artifact since the snapshot; that one goes too.
    fn reclaim(&self, job_id: &str, snapshot: &Job, report: &mut SweepReport) {
        if let Some(path) = snapshot.file_path.as_deref() {
            remove_artifact(path, report);
        }

        if let Some(removed) = self.store.delete(job_id) {
            report.removed += 1;
            if let Some(path) = removed.file_path.as_deref() {
                if snapshot.file_path.as_deref() != Some(path) {
                    remove_artifact(path, report);
                }
            }
        }
    }

    fn sweep_orphans(&self, dir: &Path, now: SystemTime, report: &mut SweepReport) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                log::warn!("Failed to scan {}: {}", dir.display(), e);
                return;
            }
        };

        let live: HashSet<String> = self.store.list_all().into_iter().map(|(id, _)| id).collect();

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let owner = match path.file_name().and_then(|n| n.to_str()).and_then(owning_job_id) {
                Some(id) => id,
                None => continue,
            };
            if live.contains(owner) {
                continue;
            }

            let expired = entry
                .metadata()
                .ok()
                .filter(|m| m.is_file())
                .and_then(|m| m.modified().ok())
                .and_then(|modified| now.duration_since(modified).ok())
                .map(|age| age > self.ttl)
                .unwrap_or(false);
            if !expired {
                continue;
            }

            match remove_file_if_exists(&path) {
                Ok(true) => {
                    log::debug!("Removed orphaned {}", path.display());
                    report.orphans_removed += 1;
                }
                Ok(false) => {}
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    /// Runs passes every interval until `shutdown` is cancelled.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(self.interval);
            interval_timer.tick().await; // skip immediate first tick

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval_timer.tick() => {}
                }
                self.sweep();
            }

            log::info!("Sweeper stopped");
        })
    }
}

fn remove_artifact(path: &Path, report: &mut SweepReport) {
    match remove_file_if_exists(path) {
        Ok(true) => report.files_removed += 1,
        Ok(false) => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
