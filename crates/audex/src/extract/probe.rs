//! Duration probing. Never fails: any problem means "duration unknown".

use std::path::Path;
use std::time::Duration;

use crate::extract::command::ffprobe_args;
use crate::extract::runner::run_tool;
use crate::extract::tools::{Tool, ToolResolver};

/// Probes the container duration of `file` in seconds.
pub async fn probe_duration(
    tools: &ToolResolver,
    file: &Path,
    timeout: Duration,
) -> Option<f64> {
    let invocation = match tools.resolve(Tool::Ffprobe) {
        Ok(inv) => inv,
        Err(e) => {
            log::debug!("Skipping duration probe: {}", e);
            return None;
        }
    };

    match run_tool(&invocation, &ffprobe_args(file), timeout, true).await {
        Ok(output) => {
            let duration = parse_duration(&output.stdout);
            if duration.is_none() {
                log::debug!(
                    "Unparseable duration for {}: {:?}",
                    file.display(),
                    output.stdout.trim()
                );
            }
            duration
        }
        Err(e) => {
            log::debug!("Duration probe failed for {}: {}", file.display(), e);
            None
        }
    }
}

/// Parses the prober's plain-text duration output.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    let value: f64 = stdout.trim().parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolPaths;
    use crate::extract::tools::StaticLookup;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("42.000000\n"), Some(42.0));
        assert_eq!(parse_duration("  3.5 "), Some(3.5));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-1"), None);
        assert_eq!(parse_duration("inf"), None);
        assert_eq!(parse_duration("NaN"), None);
    }

    #[tokio::test]
    async fn test_missing_prober_is_unknown() {
        let tools = ToolResolver::new(Box::new(StaticLookup::new()), ToolPaths::default());
        let duration =
            probe_duration(&tools, Path::new("/nonexistent.mp3"), Duration::from_secs(1)).await;
        assert!(duration.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_prober_is_unknown() {
        let tools = ToolResolver::new(
            Box::new(StaticLookup::new().with("ffprobe", "/bin/false")),
            ToolPaths::default(),
        );
        let duration =
            probe_duration(&tools, Path::new("/nonexistent.mp3"), Duration::from_secs(5)).await;
        assert!(duration.is_none());
    }
}
