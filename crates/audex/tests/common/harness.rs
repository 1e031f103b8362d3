//! Test harness for isolated extraction runs.
//!
//! The `TestHarness` struct provides:
//! - A temporary work directory used as `temp_dir`
//! - A `bin/` directory of fake tool scripts injected through a static lookup
//! - An `ExtractionService` wired to both

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use audex::config::{Settings, ToolPaths};
use audex::extract::{StaticLookup, ToolResolver};
use audex::ExtractionService;

use super::scripts;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory jobs write into.
    pub work_dir: PathBuf,
    /// Directory holding the fake tools.
    pub bin_dir: PathBuf,
    settings: Settings,
    lookup: StaticLookup,
}

impl TestHarness {
    /// Harness with no tools installed.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let work_dir = temp_dir.path().join("jobs");
        let bin_dir = temp_dir.path().join("bin");
        fs::create_dir_all(&work_dir).expect("Failed to create work directory");
        fs::create_dir_all(&bin_dir).expect("Failed to create bin directory");

        let settings = Settings {
            temp_dir: work_dir.clone(),
            ..Default::default()
        };

        Self {
            temp_dir,
            work_dir,
            bin_dir,
            settings,
            lookup: StaticLookup::new(),
        }
    }

    /// Harness with a working downloader, transcoder and probe.
    pub fn with_working_tools() -> Self {
        let harness = Self::new();
        let downloader = scripts::downloader(&harness.args_log(), "Test Title");
        harness
            .with_tool("yt-dlp", &downloader)
            .with_tool("ffmpeg", scripts::TRANSCODER)
            .with_tool("ffprobe", scripts::PROBE)
    }

    /// Installs `body` as an executable script resolved for `name`.
    pub fn with_tool(mut self, name: &str, body: &str) -> Self {
        let path = self.bin_dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write tool script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make tool script executable");

        self.lookup = self.lookup.with(name, path);
        self
    }

    /// Adjusts settings before the service is built.
    pub fn configure(mut self, f: impl FnOnce(&mut Settings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Builds a service over the current settings and tools.
    pub fn service(&self) -> ExtractionService {
        let tools = ToolResolver::new(Box::new(self.lookup.clone()), ToolPaths::default());
        ExtractionService::new(self.settings.clone(), tools)
    }

    /// File the fake downloader writes its arguments to, one per line.
    pub fn args_log(&self) -> PathBuf {
        self.temp_dir.path().join("ytdlp.args")
    }

    /// Arguments of the last downloader run.
    pub fn downloader_args(&self) -> Vec<String> {
        fs::read_to_string(self.args_log())
            .expect("Downloader was not run")
            .lines()
            .map(String::from)
            .collect()
    }

    /// Bytes standing in for an uploaded video.
    pub fn video_bytes(&self) -> Vec<u8> {
        b"\x00\x00\x00\x18ftypmp42 fake video".to_vec()
    }

    /// Files currently in the work directory.
    pub fn work_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.work_dir)
            .expect("Failed to read work directory")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
