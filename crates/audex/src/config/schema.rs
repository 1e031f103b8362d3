use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Service settings. Every field has a default so partial JSON files and
/// sparse environments both load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Working directory for artifacts, staged uploads and cookies.
    pub temp_dir: PathBuf,
    /// Sources longer than this are rejected by the downloader.
    pub max_duration_seconds: u64,
    /// Download and upload size limit in megabytes.
    pub max_file_size_mb: u64,
    /// Age after which a job and its artifact are reclaimed.
    pub job_ttl_seconds: u64,
    /// Output audio format, also the artifact extension.
    pub audio_format: String,
    /// Output bitrate, e.g. `128k`.
    pub audio_quality: String,
    pub audio_sample_rate: u32,
    /// Global clip length cap in seconds. `0` disables clipping.
    pub audio_clip_seconds: u64,
    pub cookies_file: Option<PathBuf>,
    pub proxy: Option<String>,
    /// Wall-clock bound for every subprocess.
    pub process_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub tools: ToolPaths,
}

/// Explicit executable locations that bypass search-path discovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolPaths {
    pub ytdlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    /// Interpreter used for package-style invocations.
    pub python: Option<PathBuf>,
}

pub const DEFAULT_TEMP_DIR: &str = "./tmp/audio_jobs";
pub const DEFAULT_PROCESS_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 600;

impl Default for Settings {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            max_duration_seconds: 1800,
            max_file_size_mb: 200,
            job_ttl_seconds: 3600,
            audio_format: "mp3".to_string(),
            audio_quality: "128k".to_string(),
            audio_sample_rate: 44100,
            audio_clip_seconds: 30,
            cookies_file: None,
            proxy: None,
            process_timeout_seconds: DEFAULT_PROCESS_TIMEOUT_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
            tools: ToolPaths::default(),
        }
    }
}

impl Settings {
    /// Global clip length, `None` when clipping is disabled.
    pub fn clip_length(&self) -> Option<u64> {
        match self.audio_clip_seconds {
            0 => None,
            secs => Some(secs),
        }
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_seconds)
    }

    /// Upload size limit in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Final artifact location for a job.
    pub fn artifact_path(&self, job_id: &str) -> PathBuf {
        self.temp_dir
            .join(format!("{}.{}", job_id, self.audio_format))
    }

    /// Output template handed to the downloader; it substitutes the extension.
    pub fn download_template(&self, job_id: &str) -> PathBuf {
        self.temp_dir.join(format!("{}.%(ext)s", job_id))
    }

    /// Staging location for an uploaded video.
    pub fn upload_staging_path(&self, job_id: &str, suffix: &str) -> PathBuf {
        self.temp_dir.join(format!("{}_input{}", job_id, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.audio_format, "mp3");
        assert_eq!(settings.clip_length(), Some(30));
        assert_eq!(settings.process_timeout(), Duration::from_secs(300));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(600));
        assert_eq!(settings.max_file_size_bytes(), 200 * 1024 * 1024);
    }

    #[test]
    fn test_zero_clip_disables_cap() {
        let settings = Settings {
            audio_clip_seconds: 0,
            ..Default::default()
        };
        assert_eq!(settings.clip_length(), None);
    }

    #[test]
    fn test_paths() {
        let settings = Settings {
            temp_dir: PathBuf::from("/data"),
            audio_format: "m4a".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.artifact_path("abc"), PathBuf::from("/data/abc.m4a"));
        assert_eq!(
            settings.download_template("abc"),
            PathBuf::from("/data/abc.%(ext)s")
        );
        assert_eq!(
            settings.upload_staging_path("abc", ".webm"),
            PathBuf::from("/data/abc_input.webm")
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"audio_format": "opus", "tools": {"ffmpeg": "/opt/ffmpeg"}}"#)
                .unwrap();
        assert_eq!(settings.audio_format, "opus");
        assert_eq!(settings.job_ttl_seconds, 3600);
        assert_eq!(settings.tools.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
        assert!(settings.tools.ytdlp.is_none());
    }
}
