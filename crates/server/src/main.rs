mod app_state;
mod channel_writer;
mod routes;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use nearsight_core::alerting::domain::alert_gate::AlertGate;
use nearsight_core::alerting::infrastructure::announcer_factory::{
    create_announcer, AnnouncerKind,
};
use nearsight_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use nearsight_core::detection::infrastructure::detector_factory::create_detector;
use nearsight_core::detection::infrastructure::shared_detector::SharedDetector;
use nearsight_core::shared::constants::DEFAULT_JPEG_QUALITY;
use nearsight_core::shared::proximity_config::ProximityConfig;

use app_state::AppState;

/// HTTP front-end: single-shot proximity reports and a live annotated stream.
#[derive(Parser)]
#[command(name = "nearsight-server")]
struct ServerArgs {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: String,

    /// Video file, stream URL, or camera index used by /detect and /video_feed.
    #[arg(long, default_value = "0")]
    source: String,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// ONNX model file (skips the model cache).
    #[arg(long)]
    model: Option<PathBuf>,

    /// TrueType font for captions (default: bundled DejaVu Sans).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Announcer: espeak, log or none.
    #[arg(long, default_value = "log")]
    announcer: AnnouncerKind,

    /// JPEG quality of streamed frames (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();
    let state = build_state(&args)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(&args.bind, state))
}

/// Loads the model before the runtime starts; model download is blocking.
fn build_state(args: &ServerArgs) -> Result<AppState, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ProximityConfig::load(path)?,
        None => ProximityConfig::default(),
    };
    if args.model.is_some() {
        config.model_path = args.model.clone();
    }
    if args.font.is_some() {
        config.font_path = args.font.clone();
    }
    config.validate()?;

    let detector = create_detector(&config, None)?;
    let annotator = OverlayAnnotator::from_optional_font(config.font_path.as_deref())?;

    Ok(AppState {
        gate: Arc::new(AlertGate::new(config.cooldown())),
        announcer: create_announcer(args.announcer),
        detector: SharedDetector::new(detector),
        annotator: Arc::new(annotator),
        source: Arc::from(args.source.as_str()),
        jpeg_quality: args.jpeg_quality,
        config: Arc::new(config),
    })
}

async fn serve(bind: &str, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
