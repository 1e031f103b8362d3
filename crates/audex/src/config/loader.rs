use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_str(content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Loads settings from the process environment, reading a `.env` file first
/// if one exists. Unset variables keep their defaults.
pub fn load_settings_from_env() -> Result<Settings, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Failed to read .env file: {}", e),
    }

    let mut settings = Settings::default();

    if let Some(dir) = path_var("TEMP_DIR") {
        settings.temp_dir = dir;
    }
    if let Some(v) = parse_var("MAX_DURATION_SECONDS")? {
        settings.max_duration_seconds = v;
    }
    if let Some(v) = parse_var("MAX_FILE_SIZE_MB")? {
        settings.max_file_size_mb = v;
    }
    if let Some(v) = parse_var("JOB_TTL_SECONDS")? {
        settings.job_ttl_seconds = v;
    }
    if let Some(v) = string_var("AUDIO_FORMAT") {
        settings.audio_format = v;
    }
    if let Some(v) = string_var("AUDIO_QUALITY") {
        settings.audio_quality = v;
    }
    if let Some(v) = parse_var("AUDIO_SAMPLE_RATE")? {
        settings.audio_sample_rate = v;
    }
    if let Some(v) = parse_var("AUDIO_CLIP_SECONDS")? {
        settings.audio_clip_seconds = v;
    }
    if let Some(v) = parse_var("PROCESS_TIMEOUT_SECONDS")? {
        settings.process_timeout_seconds = v;
    }
    if let Some(v) = parse_var("SWEEP_INTERVAL_SECONDS")? {
        settings.sweep_interval_seconds = v;
    }

    settings.cookies_file = path_var("COOKIES_FILE");
    settings.proxy = string_var("PROXY");
    settings.tools.ytdlp = path_var("YTDLP_PATH");
    settings.tools.ffmpeg = path_var("FFMPEG_PATH");
    settings.tools.ffprobe = path_var("FFPROBE_PATH");
    settings.tools.python = path_var("PYTHON_PATH");

    validate_settings(&settings)?;
    Ok(settings)
}

/// Non-empty string value of an environment variable.
fn string_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn path_var(name: &str) -> Option<PathBuf> {
    string_var(name).map(PathBuf::from)
}

fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string_var(name) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
                reason: e.to_string(),
            }),
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let format = settings.audio_format.as_str();
    if format.is_empty() {
        return Err(ConfigError::Validation {
            message: "audio_format must not be empty".to_string(),
        });
    }
    // The format doubles as a file extension in artifact paths
    if !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidValue {
            name: "audio_format".to_string(),
            value: format.to_string(),
            reason: "must be a plain file extension".to_string(),
        });
    }

    if settings.audio_quality.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "audio_quality must not be empty".to_string(),
        });
    }

    let positive = [
        ("job_ttl_seconds", settings.job_ttl_seconds),
        ("process_timeout_seconds", settings.process_timeout_seconds),
        ("sweep_interval_seconds", settings.sweep_interval_seconds),
        ("audio_sample_rate", u64::from(settings.audio_sample_rate)),
    ];
    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
    }

    if settings.job_ttl_seconds <= settings.process_timeout_seconds {
        log::warn!(
            "job_ttl_seconds ({}) does not exceed process_timeout_seconds ({}); \
             jobs may be swept while still running",
            settings.job_ttl_seconds,
            settings.process_timeout_seconds
        );
    }

    Ok(())
}
