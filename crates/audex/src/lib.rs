pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod service;
pub mod storage;
pub mod sweeper;
pub mod telemetry;

pub use config::{load_settings, load_settings_from_env, Settings, ToolPaths};
pub use cookies::{CookieJar, InstalledCookies};
pub use error::{
    AudexError, ConfigError, CookieError, ExtractError, IntakeError, LookupError, Result,
};
pub use extract::{Orchestrator, StaticLookup, Tool, ToolResolver, UrlRequest};
pub use jobs::{JobCounts, JobResponse, JobStatus, JobStore};
pub use service::{Artifact, Dispatched, ExtractionService, Health};
pub use sweeper::{SweepReport, Sweeper};
pub use telemetry::{init_tracing, LogFormat};
