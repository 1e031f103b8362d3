//! In-memory job registry.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::jobs::job::{Job, JobStatus, JobUpdate};

/// Concurrency-safe registry of jobs keyed by id.
///
/// Uses a single `std::sync::RwLock` around the map. Every operation holds the
/// lock only for an in-memory map access, so callers never need their own
/// locking and readers never observe a half-applied update.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

/// Number of jobs per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
}

impl JobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Allocates a fresh id and inserts a pending job for it.
    pub fn create(&self) -> String {
        let mut jobs = self.write();
        let mut id = uuid::Uuid::new_v4().to_string();
        while jobs.contains_key(&id) {
            id = uuid::Uuid::new_v4().to_string();
        }
        jobs.insert(id.clone(), Job::new(id.clone()));
        id
    }

    /// Returns a copy of the current record.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    /// Merges `update` into the job. Unknown ids are ignored.
    ///
    /// Returns whether the job existed.
    pub fn update(&self, job_id: &str, update: JobUpdate) -> bool {
        let mut jobs = self.write();
        match jobs.get_mut(job_id) {
            Some(job) => {
                job.apply(update);
                true
            }
            None => {
                log::debug!("Ignoring update for unknown job {}", job_id);
                false
            }
        }
    }

    /// Removes the job. Removing an unknown id is a no-op.
    pub fn delete(&self, job_id: &str) -> Option<Job> {
        self.write().remove(job_id)
    }

    /// Snapshot of every job.
    pub fn list_all(&self) -> Vec<(String, Job)> {
        self.read()
            .iter()
            .map(|(id, job)| (id.clone(), job.clone()))
            .collect()
    }

    /// Number of jobs in the store.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the store holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Counts jobs by status.
    pub fn counts(&self) -> JobCounts {
        let jobs = self.read();
        let mut counts = JobCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_store_creation() {
        let store = JobStore::new();
        assert!(store.is_empty());
        assert_eq!(store.list_all().len(), 0);
    }

    #[test]
    fn test_create_and_get() {
        let store = JobStore::new();
        let id = store.create();

        let job = store.get(&id).unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.file_path.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_update_merges_fields() {
        let store = JobStore::new();
        let id = store.create();
        let created_at = store.get(&id).unwrap().created_at;

        store.update(&id, JobUpdate::processing());
        store.update(
            &id,
            JobUpdate::done(PathBuf::from("/tmp/x.mp3"), Some("Test Title".into()), None),
        );

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.title.as_deref(), Some("Test Title"));
        assert_eq!(job.created_at, created_at);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let store = JobStore::new();
        assert!(!store.update("missing", JobUpdate::failed("nope")));
        assert!(store.get("missing").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = JobStore::new();
        let id = store.create();

        assert!(store.delete(&id).is_some());
        assert!(store.delete(&id).is_none());
        assert!(store.delete("never-existed").is_none());
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_list_all_contains_created() {
        let store = JobStore::new();
        let a = store.create();
        let b = store.create();

        let ids: HashSet<String> = store.list_all().into_iter().map(|(id, _)| id).collect();
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_counts() {
        let store = JobStore::new();
        let a = store.create();
        let b = store.create();
        let _c = store.create();

        store.update(&a, JobUpdate::processing());
        store.update(&b, JobUpdate::failed("x"));

        let counts = store.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.done, 0);
    }

    #[test]
    fn test_concurrent_creation_yields_distinct_ids() {
        let store = Arc::new(JobStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || (0..25).map(|_| store.create()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 400);
        assert_eq!(store.len(), 400);
    }

    #[test]
    fn test_concurrent_transitions_do_not_interfere() {
        let store = Arc::new(JobStore::new());
        let ids: Vec<String> = (0..32).map(|_| store.create()).collect();

        let handles: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    store.update(&id, JobUpdate::processing());
                    if i % 2 == 0 {
                        store.update(
                            &id,
                            JobUpdate::done(PathBuf::from(format!("/tmp/{}.mp3", id)), None, None),
                        );
                    } else {
                        store.update(&id, JobUpdate::failed(format!("error {}", i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for (i, id) in ids.iter().enumerate() {
            let job = store.get(id).unwrap();
            if i % 2 == 0 {
                assert_eq!(job.status, JobStatus::Done);
                assert_eq!(job.file_path, Some(PathBuf::from(format!("/tmp/{}.mp3", id))));
                assert!(job.error.is_none());
            } else {
                assert_eq!(job.status, JobStatus::Failed);
                assert_eq!(job.error, Some(format!("error {}", i)));
                assert!(job.file_path.is_none());
            }
        }
    }
}
