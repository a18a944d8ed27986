use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::alerting::domain::announcer::Announcer;

/// Process-wide throttle on audible alerts.
///
/// At most one alert is emitted per cooldown window, regardless of label or
/// safety status. The last-emission timestamp is checked and advanced under
/// one lock, so concurrent callers observing the same instant produce
/// exactly one emission. Announcing happens after the lock is released.
pub struct AlertGate {
    cooldown: Duration,
    last_emission: Mutex<Option<Instant>>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_emission: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_emission(&self) -> Option<Instant> {
        *self.last_emission.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Emits `message` if more than the cooldown has elapsed since the last
    /// emission. Returns whether the gate opened.
    ///
    /// A failing announcer is logged and does not undo the emission: the
    /// timestamp still advances and the call still returns `true`.
    pub fn try_emit(&self, now: Instant, message: &str, announcer: &dyn Announcer) -> bool {
        {
            let mut last = self.last_emission.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(prev) = *last {
                if now.saturating_duration_since(prev) <= self.cooldown {
                    return false;
                }
            }
            *last = Some(now);
        }

        log::debug!("Alert: {message}");
        if let Err(e) = announcer.announce(message) {
            log::warn!("Failed to announce alert '{message}': {e}");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::domain::announcer::AnnounceError;
    use rstest::rstest;
    use std::sync::{Arc, Barrier};

    #[derive(Default)]
    struct RecordingAnnouncer {
        messages: Mutex<Vec<String>>,
    }

    impl Announcer for RecordingAnnouncer {
        fn announce(&self, message: &str) -> Result<(), AnnounceError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct BrokenAnnouncer;

    impl Announcer for BrokenAnnouncer {
        fn announce(&self, _message: &str) -> Result<(), AnnounceError> {
            Err("speaker unplugged".into())
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Increasing millisecond offsets with gaps in `0..max_gap_ms`, from a
    /// fixed-seed LCG so every run sees the same sequence.
    fn increasing_offsets(seed: u64, count: usize, max_gap_ms: u64) -> Vec<u64> {
        let mut state = seed;
        let mut t = 0;
        (0..count)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                t += (state >> 33) % max_gap_ms;
                t
            })
            .collect()
    }

    /// Straight-line reading of the rule: emit when nothing was emitted yet
    /// or strictly more than the cooldown has passed since the last one.
    fn expected_emissions(offsets: &[u64], cooldown_ms: u64) -> usize {
        let mut last: Option<u64> = None;
        offsets
            .iter()
            .filter(|&&t| {
                let open = last.map_or(true, |l| t - l > cooldown_ms);
                if open {
                    last = Some(t);
                }
                open
            })
            .count()
    }

    #[test]
    fn test_first_call_always_passes() {
        let gate = AlertGate::new(Duration::from_secs(3600));
        let announcer = RecordingAnnouncer::default();
        assert!(gate.try_emit(Instant::now(), "hello", &announcer));
        assert_eq!(*announcer.messages.lock().unwrap(), vec!["hello"]);
    }

    #[test]
    fn test_cooldown_sequence() {
        let gate = AlertGate::new(secs(2.0));
        let announcer = RecordingAnnouncer::default();
        let t0 = Instant::now();

        assert!(gate.try_emit(t0, "a", &announcer));
        assert!(!gate.try_emit(t0 + secs(1.0), "b", &announcer));
        assert!(gate.try_emit(t0 + secs(2.5), "c", &announcer));
        assert_eq!(*announcer.messages.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_exactly_cooldown_is_suppressed() {
        let gate = AlertGate::new(secs(2.0));
        let announcer = RecordingAnnouncer::default();
        let t0 = Instant::now();

        assert!(gate.try_emit(t0, "a", &announcer));
        assert!(!gate.try_emit(t0 + secs(2.0), "b", &announcer));
        assert_eq!(gate.last_emission(), Some(t0));
    }

    #[test]
    fn test_failing_announcer_still_advances_gate() {
        let gate = AlertGate::new(secs(2.0));
        let t0 = Instant::now();

        assert!(gate.try_emit(t0, "a", &BrokenAnnouncer));
        assert_eq!(gate.last_emission(), Some(t0));
        assert!(!gate.try_emit(t0 + secs(1.0), "b", &BrokenAnnouncer));
    }

    #[test]
    fn test_earlier_timestamp_does_not_reopen_gate() {
        let gate = AlertGate::new(secs(2.0));
        let announcer = RecordingAnnouncer::default();
        let t0 = Instant::now();

        assert!(gate.try_emit(t0 + secs(5.0), "a", &announcer));
        assert!(!gate.try_emit(t0, "b", &announcer));
        assert_eq!(gate.last_emission(), Some(t0 + secs(5.0)));
    }

    #[rstest]
    #[case(1, 2000, 700)]
    #[case(42, 2000, 2500)]
    #[case(7, 500, 120)]
    #[case(99, 0, 3)]
    fn test_generated_sequence_matches_reference_count(
        #[case] seed: u64,
        #[case] cooldown_ms: u64,
        #[case] max_gap_ms: u64,
    ) {
        let offsets = increasing_offsets(seed, 500, max_gap_ms);
        let gate = AlertGate::new(Duration::from_millis(cooldown_ms));
        let announcer = RecordingAnnouncer::default();
        let t0 = Instant::now();

        let emitted = offsets
            .iter()
            .filter(|&&ms| gate.try_emit(t0 + Duration::from_millis(ms), "near", &announcer))
            .count();

        assert_eq!(emitted, expected_emissions(&offsets, cooldown_ms));
        assert_eq!(announcer.messages.lock().unwrap().len(), emitted);
        assert!(emitted >= 1);
    }

    #[test]
    fn test_concurrent_callers_emit_once() {
        let gate = Arc::new(AlertGate::new(secs(2.0)));
        let announcer = Arc::new(RecordingAnnouncer::default());
        let barrier = Arc::new(Barrier::new(8));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                let announcer = Arc::clone(&announcer);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    gate.try_emit(now, &format!("t{i}"), announcer.as_ref())
                })
            })
            .collect();

        let opened = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|emitted| *emitted)
            .count();
        assert_eq!(opened, 1);
        assert_eq!(announcer.messages.lock().unwrap().len(), 1);
    }
}
