use anyhow::Context;
use clap::{Parser, Subcommand};
use pageshot::capture::{CaptureRequest, Capturer};
use pageshot::cdp::CdpBackend;
use pageshot::config::{EngineArgs, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pageshot", version, about = "Render a URL in headless Chrome and return a PNG")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    server: ServerConfig,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Capture a single page and write it to disk
    Capture {
        /// Page to render
        url: String,
        /// Output file
        #[arg(short, long, default_value = "screenshot.png")]
        output: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pageshot=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => pageshot::server::serve(&cli.server, CdpBackend).await,
        Command::Capture { url, output, engine } => {
            let capturer = Capturer::new(CdpBackend, engine.engine_config()?);
            // Same query parsing as the service so both paths accept the same input.
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("url", &url)
                .finish();
            let request = CaptureRequest::from_query(Some(&query))?;

            let shot = capturer.capture(&request).await?;
            std::fs::write(&output, &shot.png)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!("wrote {}x{} PNG to {}", shot.width, shot.height, output.display());
            Ok(())
        }
    }
}
