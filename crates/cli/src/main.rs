use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use nearsight_core::alerting::domain::alert_gate::AlertGate;
use nearsight_core::alerting::infrastructure::announcer_factory::{
    create_announcer, AnnouncerKind,
};
use nearsight_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use nearsight_core::detection::infrastructure::detector_factory::create_detector;
use nearsight_core::pipeline::detect_image_use_case::DetectImageUseCase;
use nearsight_core::pipeline::frame_processor::FrameProcessor;
use nearsight_core::pipeline::infrastructure::multipart_stream_sink::MultipartStreamSink;
use nearsight_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use nearsight_core::pipeline::proximity_session::{ProximitySession, SessionState};
use nearsight_core::shared::constants::DEFAULT_JPEG_QUALITY;
use nearsight_core::shared::proximity_config::ProximityConfig;
use nearsight_core::video::domain::image_writer::ImageWriter;
use nearsight_core::video::domain::video_reader::VideoReader;
use nearsight_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use nearsight_core::video::infrastructure::image_file_writer::ImageFileWriter;
use nearsight_core::video::infrastructure::jpeg_encoder::JpegEncoder;
use nearsight_core::video::infrastructure::prefetching_reader::PrefetchingReader;

const PREFETCH_FRAMES: usize = 4;
const PROGRESS_THROTTLE: usize = 30;

/// Object proximity alerts for videos, cameras and images.
#[derive(Parser)]
#[command(name = "nearsight")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Stream annotated frames from a video file, URL or camera index.
    Watch {
        /// Video file, stream URL, or camera index (e.g. 0).
        source: String,

        /// Write the multipart stream here ("-" for stdout).
        #[arg(long, default_value = "-")]
        output: String,

        /// JPEG quality of streamed frames (1-100).
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        jpeg_quality: u8,

        /// Emit a JSON part for frames that fail instead of skipping them.
        #[arg(long)]
        error_parts: bool,
    },
    /// Run detection once on an image and print the JSON report.
    Predict {
        /// Input image (PNG, JPEG, ...).
        image: PathBuf,

        /// Also save the annotated image to this path.
        #[arg(long)]
        annotated: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Settings {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ONNX model file (skips the model cache).
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Download URL used when the model is not cached.
    #[arg(long, global = true)]
    model_url: Option<String>,

    /// Detection confidence floor (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f64>,

    /// Objects closer than this many centimetres are NOT SAFE.
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Camera focal length in pixels.
    #[arg(long, global = true)]
    focal_length: Option<f64>,

    /// Real-world object width in centimetres.
    #[arg(long, global = true)]
    known_width: Option<f64>,

    /// Minimum milliseconds between two announcements.
    #[arg(long, global = true)]
    cooldown_ms: Option<u64>,

    /// Per-frame detection deadline in milliseconds.
    #[arg(long, global = true)]
    detect_timeout_ms: Option<u64>,

    /// Resize frames to this width before detection (needs --height).
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Resize frames to this height before detection (needs --width).
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Emit at most this many frames per second.
    #[arg(long, global = true)]
    fps: Option<f64>,

    /// TrueType font for captions (default: bundled DejaVu Sans).
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// Announcer: espeak, log or none.
    #[arg(long, global = true, default_value = "log")]
    announcer: AnnouncerKind,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.settings)?;

    match cli.command {
        Command::Watch {
            source,
            output,
            jpeg_quality,
            error_parts,
        } => run_watch(
            &config,
            cli.settings.announcer,
            &source,
            &output,
            jpeg_quality,
            error_parts,
        ),
        Command::Predict { image, annotated } => run_predict(
            &config,
            cli.settings.announcer,
            &image,
            annotated.as_deref(),
        ),
    }
}

fn run_watch(
    config: &ProximityConfig,
    announcer: AnnouncerKind,
    source: &str,
    output: &str,
    jpeg_quality: u8,
    error_parts: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let processor = build_processor(config, announcer)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let handler_flag = cancelled.clone();
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, stopping");
        handler_flag.store(true, Ordering::Relaxed);
    })?;

    let mut ffmpeg = FfmpegReader::new();
    let metadata = ffmpeg.open(source)?;
    log::info!(
        "Opened {source}: {}x{} @ {:.1} fps",
        metadata.width,
        metadata.height,
        metadata.fps
    );
    let mut reader = PrefetchingReader::new(Box::new(ffmpeg), PREFETCH_FRAMES, cancelled.clone());

    let out = open_output(output)?;
    let mut sink = MultipartStreamSink::new(out, Box::new(JpegEncoder::new(jpeg_quality)))
        .with_error_parts(error_parts);

    let mut session = ProximitySession::new(
        processor,
        Box::new(StdoutPipelineLogger::new(PROGRESS_THROTTLE)),
        Some(cancelled),
    )
    .with_target_size(config.target_size())
    .with_frame_interval(config.frame_interval());

    let summary = session.run(&mut reader, metadata.total_frames, &mut sink);
    sink.into_inner().flush().ok();

    log::info!(
        "Session {:?}: {} frames read, {} emitted, {} errors, {} alerts",
        summary.state,
        summary.frames_read,
        summary.frames_emitted,
        summary.frame_errors,
        summary.alerts_emitted
    );
    match (summary.state, summary.failure) {
        (SessionState::Failed, Some(reason)) => Err(reason.into()),
        (SessionState::Failed, None) => Err("session failed".into()),
        _ => Ok(()),
    }
}

fn run_predict(
    config: &ProximityConfig,
    announcer: AnnouncerKind,
    image: &Path,
    annotated_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(image)
        .map_err(|e| format!("Cannot read image {}: {e}", image.display()))?;

    let mut use_case = DetectImageUseCase::new(build_processor(config, announcer)?);
    let outcome = use_case.execute(&bytes);

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);

    if let (Some(path), Some(frame)) = (annotated_path, outcome.annotated.as_ref()) {
        ImageFileWriter::new().write(path, frame)?;
        log::info!("Annotated image written to {}", path.display());
    }
    if let Some(error) = outcome.report.error {
        return Err(error.into());
    }
    Ok(())
}

fn build_processor(
    config: &ProximityConfig,
    announcer: AnnouncerKind,
) -> Result<FrameProcessor, Box<dyn std::error::Error>> {
    let detector = create_detector(config, Some(Box::new(download_progress)))?;
    let annotator = OverlayAnnotator::from_optional_font(config.font_path.as_deref())?;
    Ok(FrameProcessor::from_config(
        config,
        detector,
        Arc::new(AlertGate::new(config.cooldown())),
        create_announcer(announcer),
        Box::new(annotator),
    ))
}

fn load_config(settings: &Settings) -> Result<ProximityConfig, Box<dyn std::error::Error>> {
    let mut config = match &settings.config {
        Some(path) => ProximityConfig::load(path)?,
        None => ProximityConfig::default(),
    };
    apply_overrides(&mut config, settings);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut ProximityConfig, settings: &Settings) {
    if let Some(v) = settings.focal_length {
        config.focal_length_px = v;
    }
    if let Some(v) = settings.known_width {
        config.known_width_cm = v;
    }
    if let Some(v) = settings.threshold {
        config.safe_distance_cm = v;
    }
    if let Some(v) = settings.confidence {
        config.min_confidence = v;
    }
    if let Some(v) = settings.cooldown_ms {
        config.cooldown_ms = v;
    }
    if settings.detect_timeout_ms.is_some() {
        config.detect_timeout_ms = settings.detect_timeout_ms;
    }
    if settings.width.is_some() {
        config.frame_width = settings.width;
    }
    if settings.height.is_some() {
        config.frame_height = settings.height;
    }
    if settings.fps.is_some() {
        config.target_fps = settings.fps;
    }
    if settings.font.is_some() {
        config.font_path = settings.font.clone();
    }
    if settings.model.is_some() {
        config.model_path = settings.model.clone();
    }
    if settings.model_url.is_some() {
        config.model_url = settings.model_url.clone();
    }
}

fn open_output(output: &str) -> Result<Box<dyn Write + Send>, Box<dyn std::error::Error>> {
    if output == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(output).map_err(|e| format!("Cannot create {output}: {e}"))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
