use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::JobStatus;

#[derive(Error, Debug)]
pub enum AudexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failures of a single extraction run. Every variant ends the job in `failed`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("'{tool}' not found. Install it or add it to PATH.")]
    ToolUnavailable { tool: String },

    #[error("Failed to start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", tool_failed_message(.tool, .code, .stderr))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// The tool exited cleanly without producing the artifact, e.g. a source
    /// rejected by a download filter. `reason` is the tool's own message.
    #[error("{}", missing_output_message(.path, .reason))]
    MissingOutput { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task panicked: {0}")]
    Panicked(String),
}

fn tool_failed_message(tool: &str, code: &Option<i32>, stderr: &str) -> String {
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    match code {
        Some(code) => format!("'{}' exited with status {}", tool, code),
        None => format!("'{}' was terminated by a signal", tool),
    }
}

fn missing_output_message(path: &std::path::Path, reason: &str) -> String {
    if reason.trim().is_empty() {
        format!("Expected output file is missing: {}", path.display())
    } else {
        format!(
            "{} (expected output file is missing: {})",
            reason.trim(),
            path.display()
        )
    }
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Job not found or expired: {0}")]
    NotFound(String),

    #[error("Job {job_id} is not ready (status: {status})")]
    NotReady { job_id: String, status: JobStatus },

    #[error("Artifact no longer exists on disk: {0}")]
    FileMissing(PathBuf),
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Upload exceeds {limit_mb}MB")]
    TooLarge { limit_mb: u64 },

    #[error("Failed to stage upload at '{path}': {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CookieError {
    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to write cookie file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove cookie file '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AudexError>;
