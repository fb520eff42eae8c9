//! Sound-level meter core: capture lifecycle, per-frame sampling and alerting
//!
//! [`Meter`] owns the single capture session, the latest loudness reading and
//! the threshold monitor. The application loop calls [`Meter::tick`] once per
//! display frame and [`Meter::expire_alert`] when the reset deadline passes;
//! everything runs on that one task.

use crate::alert::ThresholdMonitor;
use crate::capture::{CaptureProvider, FrequencySource};
use crate::constants::loudness::BAR_COUNT;
use crate::error::ThresholdError;
use crate::loudness::{self, LoudnessSample};
use crate::tone::{Tone, ToneSink};
use std::time::Instant;
use tracing::warn;

pub struct Meter<P: CaptureProvider, T: ToneSink> {
    provider: P,
    tone_sink: T,
    session: Option<P::Session>,
    bins: Vec<u8>,
    sample: LoudnessSample,
    monitor: ThresholdMonitor,
}

impl<P: CaptureProvider, T: ToneSink> Meter<P, T> {
    pub fn new(provider: P, tone_sink: T, threshold: u32) -> Self {
        Self {
            provider,
            tone_sink,
            session: None,
            bins: Vec::new(),
            sample: LoudnessSample::default(),
            monitor: ThresholdMonitor::new(threshold),
        }
    }

    /// Open the capture stream. Failures are logged and leave the meter idle.
    pub fn start(&mut self) -> bool {
        if self.session.is_some() {
            return true;
        }

        match self.provider.open() {
            Ok(session) => {
                self.bins = vec![0; session.frequency_bin_count()];
                self.session = Some(session);
                true
            }
            Err(e) => {
                warn!("Microphone capture unavailable: {}", e);
                false
            }
        }
    }

    /// Release the capture stream, cancel the pending alert reset and zero
    /// the reading. Safe to call at any time.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.monitor.cancel();
        self.sample = LoudnessSample::default();
        self.bins.clear();
    }

    /// Start when idle, stop when capturing
    pub fn toggle(&mut self) -> bool {
        if self.is_capturing() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Process one display frame. Does nothing unless capturing.
    pub fn tick(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.byte_frequency_data(&mut self.bins);
        self.sample = loudness::estimate(&self.bins);

        if self.monitor.observe(self.sample.level, now) {
            self.tone_sink.play(&Tone::alert());
        }
    }

    /// Clear the alert if its reset deadline has passed
    pub fn expire_alert(&mut self, now: Instant) -> bool {
        self.monitor.expire(now)
    }

    pub fn set_threshold(&mut self, value: u32) -> Result<(), ThresholdError> {
        self.monitor.set_threshold(value)
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.device_name())
    }

    pub fn level(&self) -> u32 {
        self.sample.level
    }

    pub fn bars(&self) -> &[f32; BAR_COUNT] {
        &self.sample.bars
    }

    pub fn threshold(&self) -> u32 {
        self.monitor.threshold()
    }

    pub fn alert_active(&self) -> bool {
        self.monitor.is_active()
    }

    pub fn alert_deadline(&self) -> Option<Instant> {
        self.monitor.reset_deadline()
    }
}

impl<P: CaptureProvider, T: ToneSink> Drop for Meter<P, T> {
    fn drop(&mut self) {
        self.stop();
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{bins_for_level, harness};
    use super::*;
    use std::rc::Rc;
    use std::time::Duration;

    fn assert_zeroed<P: CaptureProvider, T: ToneSink>(meter: &Meter<P, T>) {
        assert_eq!(meter.level(), 0);
        assert!(meter.bars().iter().all(|&b| b == 0.0));
        assert!(!meter.is_capturing());
    }

    #[test]
    fn test_start_then_tick_updates_reading() {
        let mut h = harness(30, false);
        assert!(h.meter.start());
        assert!(h.meter.is_capturing());
        assert_eq!(h.meter.device_name(), Some("fake mic"));

        *h.feed.borrow_mut() = vec![153; 128];
        h.meter.tick(Instant::now());
        assert_eq!(h.meter.level(), 92);
        assert!((h.meter.bars()[0] - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_start_is_single_session() {
        let mut h = harness(30, false);
        assert!(h.meter.start());
        assert!(h.meter.start());
        assert_eq!(h.opened.get(), 1);
    }

    #[test]
    fn test_denied_capture_leaves_state_unchanged() {
        let mut h = harness(30, true);
        assert!(!h.meter.start());
        assert_zeroed(&h.meter);

        h.meter.tick(Instant::now());
        assert_zeroed(&h.meter);
        assert!(h.played.borrow().is_empty());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut h = harness(30, false);
        h.meter.stop();
        assert_zeroed(&h.meter);
        assert_eq!(h.closed.get(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut h = harness(30, false);
        h.meter.start();
        *h.feed.borrow_mut() = vec![200; 128];
        h.meter.tick(Instant::now());
        assert!(h.meter.level() > 0);

        h.meter.stop();
        assert_zeroed(&h.meter);
        h.meter.stop();
        assert_zeroed(&h.meter);
        assert_eq!(h.closed.get(), 1);
    }

    #[test]
    fn test_tick_after_stop_is_noop() {
        let mut h = harness(30, false);
        h.meter.start();
        h.meter.stop();

        *h.feed.borrow_mut() = vec![255; 128];
        h.meter.tick(Instant::now());
        assert_zeroed(&h.meter);
        assert!(!h.meter.alert_active());
    }

    #[test]
    fn test_alert_cycle_from_20_to_35() {
        let start = Instant::now();
        let mut h = harness(30, false);
        h.meter.start();

        *h.feed.borrow_mut() = bins_for_level(20);
        h.meter.tick(start);
        assert_eq!(h.meter.level(), 20);
        assert!(!h.meter.alert_active());

        *h.feed.borrow_mut() = bins_for_level(35);
        let trigger = start + Duration::from_millis(16);
        h.meter.tick(trigger);
        assert_eq!(h.meter.level(), 35);
        assert!(h.meter.alert_active());
        assert_eq!(h.played.borrow().as_slice(), &[Tone::alert()]);

        // Quiet again, but the alert only ends on its timer
        *h.feed.borrow_mut() = bins_for_level(20);
        h.meter.tick(trigger + Duration::from_secs(1));
        assert!(h.meter.alert_active());

        assert_eq!(h.meter.alert_deadline(), Some(trigger + Duration::from_secs(5)));
        assert!(h.meter.expire_alert(trigger + Duration::from_secs(5)));
        assert!(!h.meter.alert_active());
    }

    #[test]
    fn test_tone_fires_once_per_alert() {
        let start = Instant::now();
        let mut h = harness(30, false);
        h.meter.start();
        *h.feed.borrow_mut() = vec![255; 128];

        for frame in 0..300u64 {
            h.meter.tick(start + Duration::from_millis(frame * 16));
        }
        assert_eq!(h.played.borrow().len(), 1);

        let reset = start + Duration::from_secs(5);
        h.meter.expire_alert(reset);
        h.meter.tick(reset);
        assert_eq!(h.played.borrow().len(), 2);
    }

    #[test]
    fn test_threshold_locked_until_reset() {
        let start = Instant::now();
        let mut h = harness(30, false);
        h.meter.start();
        *h.feed.borrow_mut() = vec![255; 128];
        h.meter.tick(start);

        assert_eq!(h.meter.set_threshold(80), Err(ThresholdError::AlertActive));
        assert!(!h.meter.expire_alert(start + Duration::from_millis(4999)));
        assert_eq!(h.meter.set_threshold(80), Err(ThresholdError::AlertActive));
        assert_eq!(h.meter.threshold(), 30);

        assert!(h.meter.expire_alert(start + Duration::from_secs(5)));
        assert_eq!(h.meter.set_threshold(80), Ok(()));
        assert_eq!(h.meter.threshold(), 80);
    }

    #[test]
    fn test_stop_cancels_pending_reset() {
        let start = Instant::now();
        let mut h = harness(30, false);
        h.meter.start();
        *h.feed.borrow_mut() = vec![255; 128];
        h.meter.tick(start);
        assert!(h.meter.alert_deadline().is_some());

        h.meter.stop();
        assert_eq!(h.meter.alert_deadline(), None);
        assert!(!h.meter.alert_active());
        assert!(h.meter.set_threshold(50).is_ok());
    }

    #[test]
    fn test_toggle_and_drop_release_capture() {
        let mut h = harness(30, false);
        assert!(h.meter.toggle());
        assert!(h.meter.is_capturing());
        assert!(!h.meter.toggle());
        assert!(!h.meter.is_capturing());
        assert_eq!(h.closed.get(), 1);

        h.meter.toggle();
        let closed = Rc::clone(&h.closed);
        drop(h);
        assert_eq!(closed.get(), 2);
    }

    #[test]
    fn test_empty_snapshot_never_alerts() {
        let mut h = harness(10, false);
        *h.feed.borrow_mut() = Vec::new();
        h.meter.start();
        h.meter.tick(Instant::now());
        assert_eq!(h.meter.level(), 0);
        assert!(!h.meter.alert_active());
    }
}
