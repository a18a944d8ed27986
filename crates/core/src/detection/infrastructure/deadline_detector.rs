use std::fmt;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;

/// Returned when a frame's detection misses its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionTimeout {
    pub frame_index: usize,
    pub deadline: Duration,
}

impl fmt::Display for DetectionTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "detection for frame {} exceeded {} ms",
            self.frame_index,
            self.deadline.as_millis()
        )
    }
}

impl std::error::Error for DetectionTimeout {}

type DetectResult = Result<Vec<Detection>, String>;

struct Request {
    seq: u64,
    frame: Frame,
    min_confidence: f64,
}

/// Decorator that bounds each detection call by a per-frame deadline.
///
/// The wrapped detector runs on a dedicated thread. When a call times out
/// the caller gets [`DetectionTimeout`] and moves on; the late result is
/// discarded when it eventually arrives. A detector still busy with a stale
/// frame counts against the next frame's deadline.
pub struct DeadlineDetector {
    deadline: Duration,
    next_seq: u64,
    request_tx: Option<Sender<Request>>,
    result_rx: Receiver<(u64, DetectResult)>,
    worker: Option<JoinHandle<()>>,
}

impl DeadlineDetector {
    pub fn new(inner: Box<dyn ObjectDetector>, deadline: Duration) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::bounded::<Request>(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<(u64, DetectResult)>(1);
        let worker = std::thread::spawn(move || run_worker(inner, request_rx, result_tx));

        Self {
            deadline,
            next_seq: 0,
            request_tx: Some(request_tx),
            result_rx,
            worker: Some(worker),
        }
    }
}

fn run_worker(
    mut inner: Box<dyn ObjectDetector>,
    request_rx: Receiver<Request>,
    result_tx: Sender<(u64, DetectResult)>,
) {
    for req in request_rx {
        let result = inner
            .detect(&req.frame, req.min_confidence)
            .map_err(|e| e.to_string());
        // Results for abandoned frames are drained by the caller; a full
        // slot means nobody is waiting on this one.
        let _ = result_tx.try_send((req.seq, result));
    }
}

impl ObjectDetector for DeadlineDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let started = Instant::now();
        let timeout = DetectionTimeout {
            frame_index: frame.index(),
            deadline: self.deadline,
        };

        // Drop any late result left over from an abandoned frame.
        while self.result_rx.try_recv().is_ok() {}

        let seq = self.next_seq;
        self.next_seq += 1;
        let tx = self
            .request_tx
            .as_ref()
            .ok_or("deadline detector is shut down")?;
        let request = Request {
            seq,
            frame: frame.clone(),
            min_confidence,
        };
        match tx.send_timeout(request, self.deadline) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(Box::new(timeout)),
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err("detector worker stopped".into())
            }
        }

        loop {
            let remaining = self.deadline.saturating_sub(started.elapsed());
            match self.result_rx.recv_timeout(remaining) {
                Ok((id, result)) if id == seq => return result.map_err(|e| e.into()),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(Box::new(timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err("detector worker stopped".into())
                }
            }
        }
    }
}

impl Drop for DeadlineDetector {
    fn drop(&mut self) {
        self.request_tx = None;
        // Drain so a worker blocked on a full result slot can exit.
        while self.result_rx.try_recv().is_ok() {}
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Detector worker panicked");
            }
        }
    }
}
