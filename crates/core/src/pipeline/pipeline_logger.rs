use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for session events: stage timings, per-frame metrics, progress.
///
/// Keeps the loop free of output concerns; the CLI logs a summary, the
/// server stays quiet, tests discard everything.
pub trait PipelineLogger: Send {
    /// `total` is 0 for live sources with no known length.
    fn progress(&mut self, current: usize, total: usize);

    /// Duration of one stage (`detect`, `annotate`, `emit`) for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Per-frame sample such as `detections` or `alerts`.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Default)]
struct Series {
    count: usize,
    sum: f64,
    max: f64,
}

impl Series {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregates timings and metrics and reports through `log::info!`.
///
/// Progress lines are throttled to one every `throttle_frames` frames.
/// Aggregates are running sums so unbounded live sessions stay constant
/// in memory.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    start_time: Instant,
    frames: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Session summary ({} frames, {:.1}s):",
            self.frames,
            elapsed_ms / 1000.0
        )];

        for (stage, series) in &self.timings {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                series.mean(),
                series.max,
                series.sum
            ));
        }
        for (name, series) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.2}  total {:.0}",
                series.mean(),
                series.sum
            ));
        }
        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Series::mean)
    }

    pub fn metric_total(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(|s| s.sum)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames = current;
        let due = current % self.throttle_frames == 0;
        if total > 0 {
            if due || current == total {
                let pct = current as f64 / total as f64 * 100.0;
                log::info!("Processed {current}/{total} frames ({pct:.1}%)");
            }
        } else if due {
            log::info!("Processed {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 0);
        logger.timing("detect", 5.0);
        logger.metric("alerts", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_mean() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 10.0);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        assert_relative_eq!(logger.mean_timing("detect").unwrap(), 20.0);
        assert!(logger.mean_timing("annotate").is_none());
    }

    #[test]
    fn test_metric_total() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("alerts", 1.0);
        logger.metric("alerts", 0.0);
        logger.metric("alerts", 1.0);
        assert_relative_eq!(logger.metric_total("alerts").unwrap(), 2.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(12, 0);
        logger.timing("detect", 20.0);
        logger.timing("emit", 2.0);
        logger.metric("detections", 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("12 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("emit"));
        assert!(summary.contains("detections"));
    }

    #[test]
    fn test_empty_summary_is_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_throttle_never_zero() {
        let mut logger = StdoutPipelineLogger::new(0);
        logger.progress(5, 0);
        assert_eq!(logger.throttle_frames, 1);
        assert_eq!(logger.frames, 5);
    }
}
