//! External tool discovery.
//!
//! Each tool is resolved to an [`Invocation`]: the program to execute plus any
//! leading arguments its invocation style needs. Discovery goes through the
//! [`ToolLookup`] trait so tests can swap the search path for a fixed map.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command as TokioCommand;

use crate::config::ToolPaths;
use crate::error::ExtractError;

/// Interpreters tried, in order, for package-style invocations.
const PYTHON_INTERPRETERS: &[&str] = &["python3", "python"];

/// External executables the orchestrator depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Video downloader.
    YtDlp,
    /// Media transcoder.
    Ffmpeg,
    /// Media prober.
    Ffprobe,
}

impl Tool {
    /// Executable name on the search path.
    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    /// Python module name when the tool also ships as a package.
    pub fn python_module(self) -> Option<&'static str> {
        match self {
            Tool::YtDlp => Some("yt_dlp"),
            Tool::Ffmpeg | Tool::Ffprobe => None,
        }
    }

    fn override_path(self, paths: &ToolPaths) -> Option<&Path> {
        match self {
            Tool::YtDlp => paths.ytdlp.as_deref(),
            Tool::Ffmpeg => paths.ffmpeg.as_deref(),
            Tool::Ffprobe => paths.ffprobe.as_deref(),
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// How a resolved tool is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStyle {
    /// The program is the tool itself.
    Binary,
    /// The program is an interpreter running the tool as a module (`-m`).
    PythonModule { module: String },
}

/// A resolved executable plus the arguments that must precede tool arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: String,
    pub program: PathBuf,
    pub prefix_args: Vec<OsString>,
    pub style: InvocationStyle,
}

impl Invocation {
    /// Direct binary invocation.
    pub fn binary(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            prefix_args: Vec::new(),
            style: InvocationStyle::Binary,
        }
    }

    /// `interpreter -m module` invocation.
    pub fn python_module(
        tool: impl Into<String>,
        interpreter: impl Into<PathBuf>,
        module: &str,
    ) -> Self {
        Self {
            tool: tool.into(),
            program: interpreter.into(),
            prefix_args: vec![OsString::from("-m"), OsString::from(module)],
            style: InvocationStyle::PythonModule {
                module: module.to_string(),
            },
        }
    }

    /// Builds a command with the prefix arguments followed by `args`.
    pub fn command<I, S>(&self, args: I) -> TokioCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.prefix_args).args(args);
        cmd
    }
}

/// Finds executables by name.
pub trait ToolLookup: Send + Sync {
    fn find(&self, name: &str) -> Option<PathBuf>;
}

/// Looks executables up on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchPathLookup;

impl ToolLookup for SearchPathLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Fixed name-to-path table, used where the search path must not leak in.
#[derive(Debug, Default, Clone)]
pub struct StaticLookup {
    entries: HashMap<String, PathBuf>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(name.to_string(), path.into());
        self
    }
}

impl ToolLookup for StaticLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        self.entries.get(name).cloned()
    }
}

/// Resolves [`Tool`]s to [`Invocation`]s.
///
/// Order per tool: configured override path, binary on the lookup, then a
/// package-style invocation through a Python interpreter for tools that ship
/// as a module.
pub struct ToolResolver {
    lookup: Box<dyn ToolLookup>,
    overrides: ToolPaths,
}

impl ToolResolver {
    pub fn new(lookup: Box<dyn ToolLookup>, overrides: ToolPaths) -> Self {
        Self { lookup, overrides }
    }

    /// Resolver over `PATH` with the given overrides.
    pub fn from_search_path(overrides: ToolPaths) -> Self {
        Self::new(Box::new(SearchPathLookup), overrides)
    }

    pub fn resolve(&self, tool: Tool) -> Result<Invocation, ExtractError> {
        let name = tool.binary_name();

        if let Some(path) = tool.override_path(&self.overrides) {
            if path.is_file() {
                return Ok(Invocation::binary(name, path));
            }
            log::warn!(
                "Configured path for {} does not exist: {}",
                name,
                path.display()
            );
        }

        if let Some(path) = self.lookup.find(name) {
            return Ok(Invocation::binary(name, path));
        }

        if let Some(module) = tool.python_module() {
            if let Some(interpreter) = self.python() {
                log::debug!(
                    "Using package-style invocation for {}: {} -m {}",
                    name,
                    interpreter.display(),
                    module
                );
                return Ok(Invocation::python_module(name, interpreter, module));
            }
        }

        Err(ExtractError::ToolUnavailable {
            tool: name.to_string(),
        })
    }

    fn python(&self) -> Option<PathBuf> {
        if let Some(path) = self.overrides.python.as_deref() {
            if path.is_file() {
                return Some(path.to_path_buf());
            }
        }
        PYTHON_INTERPRETERS
            .iter()
            .find_map(|name| self.lookup.find(name))
    }
}
