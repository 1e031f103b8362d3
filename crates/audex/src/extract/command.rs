//! Argument construction for the downloader, transcoder and prober.
//!
//! Everything here is pure: the same settings and request always produce the
//! same argument vector.

use std::ffi::OsString;
use std::path::Path;

use crate::config::Settings;

/// Loudness normalization applied to uploaded videos.
pub const LOUDNORM_FILTER: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// Time range of the source to extract. `end == None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipWindow {
    pub start: u64,
    pub end: Option<u64>,
}

impl ClipWindow {
    /// Downloader section spec, `*START-END` with `inf` for an open end.
    pub fn section_spec(&self) -> String {
        match self.end {
            Some(end) => format!("*{}-{}", self.start, end),
            None => format!("*{}-inf", self.start),
        }
    }
}

/// Resolves the clip window for a URL job.
///
/// With a requested start or end the window is `[start, end]`, where a
/// missing start is `0` and a missing end is open. A configured clip length
/// caps the end at `start + clip_length`. Without a request the window is
/// `[0, clip_length]`, or `None` (full source) when no cap is configured.
/// An end at or before the start is treated as missing.
pub fn resolve_clip_window(
    start_sec: Option<u64>,
    end_sec: Option<u64>,
    clip_length: Option<u64>,
) -> Option<ClipWindow> {
    if start_sec.is_none() && end_sec.is_none() {
        return clip_length.map(|clip| ClipWindow {
            start: 0,
            end: Some(clip),
        });
    }

    let start = start_sec.unwrap_or(0);
    let requested_end = match end_sec {
        Some(end) if end > start => Some(end),
        Some(end) => {
            log::warn!(
                "Ignoring clip end {}s at or before start {}s",
                end,
                start
            );
            None
        }
        None => None,
    };

    let capped = clip_length.map(|clip| start.saturating_add(clip));
    let end = match (requested_end, capped) {
        (Some(end), Some(cap)) => Some(end.min(cap)),
        (Some(end), None) => Some(end),
        (None, cap) => cap,
    };

    Some(ClipWindow { start, end })
}

/// Downloader arguments for a URL job.
pub fn ytdlp_args(
    settings: &Settings,
    job_id: &str,
    url: &str,
    cookies_file: Option<&Path>,
    window: Option<ClipWindow>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--extract-audio",
        "--audio-format",
        settings.audio_format.as_str(),
        "--audio-quality",
        settings.audio_quality.as_str(),
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push("--max-filesize".into());
    args.push(format!("{}m", settings.max_file_size_mb).into());
    args.push("--match-filter".into());
    args.push(format!("duration <= {}", settings.max_duration_seconds).into());
    args.push("--no-playlist".into());
    args.push("--output".into());
    args.push(settings.download_template(job_id).into_os_string());
    args.push("--print".into());
    args.push("title".into());
    // --print implies --simulate unless told otherwise
    args.push("--no-simulate".into());

    if let Some(cookies) = cookies_file {
        args.push("--cookies".into());
        args.push(cookies.as_os_str().to_os_string());
    }
    if let Some(proxy) = settings.proxy.as_deref() {
        args.push("--proxy".into());
        args.push(proxy.into());
    }

    args.push(url.into());

    if let Some(window) = window {
        args.push("--download-sections".into());
        args.push(window.section_spec().into());
    }

    args
}

/// Encoder matching an output format.
pub fn audio_codec(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "m4a" | "aac" => "aac",
        "opus" => "libopus",
        "ogg" | "oga" => "libvorbis",
        "flac" => "flac",
        "wav" => "pcm_s16le",
        _ => "libmp3lame",
    }
}

/// Transcoder arguments for an uploaded video.
pub fn ffmpeg_args(settings: &Settings, input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.as_os_str().to_os_string()];

    if let Some(clip) = settings.clip_length() {
        args.push("-t".into());
        args.push(clip.to_string().into());
    }

    args.extend(
        [
            "-vn",
            "-af",
            LOUDNORM_FILTER,
            "-acodec",
            audio_codec(&settings.audio_format),
            "-ab",
            settings.audio_quality.as_str(),
        ]
        .iter()
        .map(OsString::from),
    );
    args.push("-ar".into());
    args.push(settings.audio_sample_rate.to_string().into());
    args.push("-y".into());
    args.push(output.as_os_str().to_os_string());

    args
}

/// Prober arguments that print only the container duration.
pub fn ffprobe_args(file: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(file.as_os_str().to_os_string());
    args
}
