//! Files owned by jobs under the temp directory.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::IntakeError;

/// Suffix assumed for uploads whose name carries no extension.
pub const DEFAULT_UPLOAD_SUFFIX: &str = ".mp4";

/// Removes `path`, treating a missing file as success.
///
/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Id of the job a work-directory file belongs to.
///
/// Job files are `{id}.{ext}` (artifacts and downloader leftovers such as
/// `{id}.f251.webm.part`) or `{id}_input{suffix}`. Anything whose stem is
/// not a job id, like the cookie file, belongs to no job.
pub fn owning_job_id(file_name: &str) -> Option<&str> {
    let stem = file_name.split('.').next()?;
    let id = stem.strip_suffix("_input").unwrap_or(stem);
    uuid::Uuid::parse_str(id).ok().map(|_| id)
}

/// Extension of the uploaded file name including the dot, e.g. `.webm`.
pub fn upload_suffix(original_filename: Option<&str>) -> String {
    original_filename
        .map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_UPLOAD_SUFFIX.to_string())
}

/// Writes an uploaded video to `{temp_dir}/{job_id}_input{suffix}`.
pub async fn stage_upload(
    settings: &Settings,
    job_id: &str,
    original_filename: Option<&str>,
    content: &[u8],
) -> Result<PathBuf, IntakeError> {
    let limit = settings.max_file_size_bytes();
    if content.len() as u64 > limit {
        return Err(IntakeError::TooLarge {
            limit_mb: settings.max_file_size_mb,
        });
    }

    let path = settings.upload_staging_path(job_id, &upload_suffix(original_filename));

    tokio::fs::create_dir_all(&settings.temp_dir)
        .await
        .map_err(|e| IntakeError::Stage {
            path: path.clone(),
            source: e,
        })?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| IntakeError::Stage {
            path: path.clone(),
            source: e,
        })?;

    log::debug!("Staged upload for job {} at {}", job_id, path.display());
    Ok(path)
}

/// Deletes a staged upload when dropped, including during unwinding.
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match remove_file_if_exists(&self.path) {
            Ok(true) => log::debug!("Removed staged upload {}", self.path.display()),
            Ok(false) => {}
            Err(e) => log::warn!(
                "Failed to remove staged upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
