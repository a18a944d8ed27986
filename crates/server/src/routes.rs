use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tokio::sync::mpsc;

use nearsight_core::pipeline::detect_image_use_case::DetectImageUseCase;
use nearsight_core::pipeline::infrastructure::multipart_stream_sink::{
    stream_content_type, MultipartStreamSink,
};
use nearsight_core::pipeline::pipeline_error::PipelineError;
use nearsight_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use nearsight_core::pipeline::proximity_report::ProximityReport;
use nearsight_core::pipeline::proximity_session::ProximitySession;
use nearsight_core::shared::frame::Frame;
use nearsight_core::shared::video_metadata::VideoMetadata;
use nearsight_core::video::domain::video_reader::VideoReader;
use nearsight_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use nearsight_core::video::infrastructure::jpeg_encoder::JpegEncoder;
use nearsight_core::video::infrastructure::prefetching_reader::PrefetchingReader;

use crate::app_state::AppState;
use crate::channel_writer::ChannelWriter;

const UPLOAD_FIELD: &str = "file";
const STREAM_CHUNKS: usize = 8;
const PREFETCH_FRAMES: usize = 2;
const PROGRESS_THROTTLE: usize = 300;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/predict", post(predict))
        .route("/detect", get(detect))
        .route("/video_feed", get(video_feed))
        .with_state(state)
}

fn report_response(status: StatusCode, report: ProximityReport) -> Response {
    (status, Json(report)).into_response()
}

fn failure(status: StatusCode, error: PipelineError) -> Response {
    report_response(status, ProximityReport::failed(&error))
}

/// `POST /predict`: multipart upload with the image in the `file` field.
async fn predict(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(bytes) => bytes,
        Err(message) => return failure(StatusCode::BAD_REQUEST, PipelineError::Decode(message)),
    };

    let job = tokio::task::spawn_blocking(move || {
        DetectImageUseCase::new(state.processor()).execute(&upload)
    });
    match job.await {
        Ok(outcome) => report_response(StatusCode::OK, outcome.report),
        Err(e) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Setup(format!("detection task failed: {e}")),
        ),
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Bytes, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() == Some(UPLOAD_FIELD) {
            return field.bytes().await.map_err(|e| e.to_string());
        }
    }
    Err(format!("missing multipart field '{UPLOAD_FIELD}'"))
}

/// `GET /detect`: grabs one frame from the configured source.
async fn detect(State(state): State<AppState>) -> Response {
    let job = tokio::task::spawn_blocking(move || {
        let frame = grab_frame(&state.source)?;
        Ok::<_, PipelineError>(DetectImageUseCase::new(state.processor()).execute_frame(&frame))
    });
    match job.await {
        Ok(Ok(outcome)) => report_response(StatusCode::OK, outcome.report),
        Ok(Err(e)) => failure(StatusCode::SERVICE_UNAVAILABLE, e),
        Err(e) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Setup(format!("detection task failed: {e}")),
        ),
    }
}

fn grab_frame(source: &str) -> Result<Frame, PipelineError> {
    let (mut reader, _) = open_source(source)?;
    let next = reader.frames().next();
    let frame = match next {
        Some(Ok(frame)) => Ok(frame),
        Some(Err(e)) => Err(PipelineError::SourceRead(e.to_string())),
        None => Err(PipelineError::SourceRead(format!("{source} produced no frames"))),
    };
    reader.close();
    frame
}

fn open_source(source: &str) -> Result<(FfmpegReader, VideoMetadata), PipelineError> {
    let mut reader = FfmpegReader::new();
    let metadata = reader
        .open(source)
        .map_err(|e| PipelineError::SourceRead(e.to_string()))?;
    Ok((reader, metadata))
}

/// `GET /video_feed`: endless `multipart/x-mixed-replace` stream of
/// annotated JPEG frames. Dropping the connection ends the session.
async fn video_feed(State(state): State<AppState>) -> Response {
    let source = state.source.clone();
    let opened = tokio::task::spawn_blocking(move || open_source(&source)).await;
    let (reader, metadata) = match opened {
        Ok(Ok(opened)) => opened,
        Ok(Err(e)) => return failure(StatusCode::SERVICE_UNAVAILABLE, e),
        Err(e) => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                PipelineError::Setup(format!("failed to open source: {e}")),
            )
        }
    };
    log::info!(
        "Streaming {} ({}x{} @ {:.1} fps)",
        state.source,
        metadata.width,
        metadata.height,
        metadata.fps
    );

    let (tx, rx) = mpsc::channel::<Bytes>(STREAM_CHUNKS);
    tokio::task::spawn_blocking(move || stream_session(state, reader, metadata, tx));

    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });
    (
        [(header::CONTENT_TYPE, stream_content_type())],
        Body::from_stream(body),
    )
        .into_response()
}

fn stream_session(
    state: AppState,
    reader: FfmpegReader,
    metadata: VideoMetadata,
    tx: mpsc::Sender<Bytes>,
) {
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut reader = PrefetchingReader::new(Box::new(reader), PREFETCH_FRAMES, cancelled.clone());
    let mut sink = MultipartStreamSink::new(
        ChannelWriter::new(tx),
        Box::new(JpegEncoder::new(state.jpeg_quality)),
    );

    let mut session = ProximitySession::new(
        state.processor(),
        Box::new(StdoutPipelineLogger::new(PROGRESS_THROTTLE)),
        Some(cancelled.clone()),
    )
    .with_target_size(state.config.target_size())
    .with_frame_interval(state.config.frame_interval());

    let summary = session.run(&mut reader, metadata.total_frames, &mut sink);
    cancelled.store(true, Ordering::Relaxed);
    log::info!(
        "Stream ended {:?} after {} frames ({} alerts)",
        summary.state,
        summary.frames_emitted,
        summary.alerts_emitted
    );
}
