//! Extraction through external tools: argument building, tool discovery,
//! bounded execution, probing, and the per-job orchestration on top.

pub mod command;
pub mod orchestrator;
pub mod probe;
pub mod runner;
pub mod tools;

pub use command::{resolve_clip_window, ClipWindow};
pub use orchestrator::{Orchestrator, UrlRequest, UNKNOWN_TITLE};
pub use probe::probe_duration;
pub use runner::{run_tool, ProcessOutput};
pub use tools::{
    Invocation, InvocationStyle, SearchPathLookup, StaticLookup, Tool, ToolLookup, ToolResolver,
};
