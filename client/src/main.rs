use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use starmark_client::config::Config;
use starmark_client::{ImageReference, Orchestrator, UiEvent, UiHandle};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upload a sky photo to the star annotation service and save the labelled result.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Image to annotate: a path, `file://` URI, or `-` for standard input.
    image: String,

    /// Annotation service upload URL.
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Where to write the annotated image. Defaults to `<stem>_annotated.png`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds allowed to establish the connection.
    #[arg(long, value_name = "S")]
    connect_timeout: Option<u64>,

    /// Seconds allowed for the transport to accept each chunk of the upload.
    #[arg(long, value_name = "S")]
    write_timeout: Option<u64>,

    /// Seconds allowed for each read of the response.
    #[arg(long, value_name = "S")]
    read_timeout: Option<u64>,

    /// Directory for temporary copies of piped input.
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Print the parsed annotations as JSON on stdout.
    #[arg(long)]
    emit_json: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Overlay command-line flags on the environment configuration
    fn apply(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.upload.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.connect_timeout {
            config.upload.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.write_timeout {
            config.upload.write_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout {
            config.upload.read_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.temp_dir {
            config.source.temp_dir = dir.clone();
        }
    }
}

/// `photo.jpg` becomes `photo_annotated.png` in the working directory
fn default_output(reference: &ImageReference) -> PathBuf {
    let stem = match reference {
        ImageReference::File(path) => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string(),
        _ => "image".to_string(),
    };
    PathBuf::from(format!("{stem}_annotated.png"))
}

/// Console stand-in for the UI: logs progress and saves the displayed image
async fn console_ui(
    mut events: mpsc::UnboundedReceiver<UiEvent>,
    output: PathBuf,
) -> anyhow::Result<()> {
    while let Some(event) = events.recv().await {
        match event {
            UiEvent::Busy(busy) => debug!("Busy indicator: {}", busy),
            UiEvent::ControlsEnabled(enabled) => debug!("Controls enabled: {}", enabled),
            UiEvent::DisplayImage(image) => {
                let target = output.clone();
                tokio::task::spawn_blocking(move || image.save(&target))
                    .await
                    .context("Image writer did not complete")?
                    .with_context(|| format!("Failed to save {:?}", output))?;
                info!("Saved annotated image to {:?}", output);
            }
            UiEvent::DisplayError(message) => eprintln!("{message}"),
        }
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = Config::from_env();
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: endpoint={}, timeouts connect={:?} write={:?} read={:?}",
        config.upload.endpoint,
        config.upload.connect_timeout,
        config.upload.write_timeout,
        config.upload.read_timeout
    );

    let reference = ImageReference::parse(&args.image);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&reference));
    ensure_parent(&output)
        .with_context(|| format!("Cannot create directory for {:?}", output))?;

    let (ui, events) = UiHandle::channel();
    let console = tokio::spawn(console_ui(events, output));

    let mut orchestrator =
        Orchestrator::new(&config, ui).context("Failed to build HTTP client")?;
    let result = orchestrator.run(reference).await;

    if args.emit_json
        && let Some(annotations) = orchestrator.last_annotations()
    {
        println!("{}", annotations.to_json()?);
    }

    // Closes the UI channel so the console task can finish
    drop(orchestrator);
    console.await.context("Console task failed")??;

    Ok(result.is_ok())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "starmark=debug"
    } else {
        "starmark=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
