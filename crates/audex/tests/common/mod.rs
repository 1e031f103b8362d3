//! Shared test utilities for audex integration tests.
//!
//! - `TestHarness` with an isolated work directory and fake external tools
//! - Shell script bodies standing in for yt-dlp, ffmpeg and ffprobe

pub mod harness;
pub mod scripts;

pub use harness::TestHarness;
