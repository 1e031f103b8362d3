//! Job model and the in-memory registry that owns it.

pub mod job;
pub mod store;

pub use job::{download_url, Job, JobResponse, JobStatus, JobUpdate};
pub use store::{JobCounts, JobStore};
