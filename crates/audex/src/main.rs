use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use audex::{
    init_tracing, load_settings, load_settings_from_env, Dispatched, ExtractionService, LogFormat,
    ToolResolver, UrlRequest,
};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "audex")]
#[command(about = "Extract audio from video URLs and files")]
#[command(version)]
struct Cli {
    /// JSON settings file; the environment is used when omitted
    #[arg(short, long, global = true, env = "AUDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a video and extract its audio
    Url {
        url: String,

        /// Clip start offset in seconds
        #[arg(long)]
        start: Option<u64>,

        /// Clip end offset in seconds
        #[arg(long)]
        end: Option<u64>,
    },

    /// Extract audio from a local video file
    File { path: PathBuf },

    /// Remove expired job files left in the work directory and exit
    Sweep,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => load_settings_from_env()?,
    };
    std::fs::create_dir_all(&settings.temp_dir)?;

    let tools = ToolResolver::from_search_path(settings.tools.clone());
    let service = ExtractionService::new(settings, tools);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("Interrupted, shutting down");
            shutdown.cancel();
        })?;
    }

    let sweeper = service.start_sweeper(shutdown.clone());

    let dispatched = match cli.command {
        Commands::Url { url, start, end } => Some(service.submit_url(UrlRequest {
            url,
            start_sec: start,
            end_sec: end,
        })),
        Commands::File { path } => {
            let content = tokio::fs::read(&path).await?;
            let filename = path.file_name().and_then(|n| n.to_str());
            Some(service.submit_upload(filename, &content).await?)
        }
        Commands::Sweep => {
            let report = service.sweep_now();
            println!("{}", serde_json::to_string_pretty(&report)?);
            None
        }
    };

    if let Some(dispatched) = dispatched {
        wait_for_job(&service, dispatched, &shutdown).await?;
    }

    shutdown.cancel();
    sweeper.await?;
    Ok(())
}

/// Waits for the job to finish, or for Ctrl-C, then prints its status.
async fn wait_for_job(
    service: &ExtractionService,
    dispatched: Dispatched,
    shutdown: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let job_id = dispatched.job_id().to_string();
    log::info!("Submitted job {}", job_id);

    let response = service
        .wait_for_terminal(&job_id, POLL_INTERVAL, shutdown)
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
