//! Threshold comparison and the timed alert lifecycle

use crate::constants::alert::RESET_DELAY;
use crate::constants::threshold;
use crate::error::ThresholdError;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Alert lifecycle. An active alert carries its own reset deadline, so at
/// most one pending reset can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Active { reset_at: Instant },
}

/// Compares loudness against the threshold and owns the alert state
#[derive(Debug)]
pub struct ThresholdMonitor {
    threshold: u32,
    state: AlertState,
    reset_delay: Duration,
}

impl ThresholdMonitor {
    pub fn new(initial: u32) -> Self {
        Self {
            threshold: initial.clamp(threshold::MIN, threshold::MAX),
            state: AlertState::Idle,
            reset_delay: RESET_DELAY,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, AlertState::Active { .. })
    }

    /// Pending reset deadline, if an alert is active
    pub fn reset_deadline(&self) -> Option<Instant> {
        match self.state {
            AlertState::Active { reset_at } => Some(reset_at),
            AlertState::Idle => None,
        }
    }

    /// Change the threshold; refused while an alert is active
    pub fn set_threshold(&mut self, value: u32) -> Result<(), ThresholdError> {
        if self.is_active() {
            debug!(value, "Threshold change rejected: alert active");
            return Err(ThresholdError::AlertActive);
        }
        if !(threshold::MIN..=threshold::MAX).contains(&value) {
            debug!(value, "Threshold change rejected: out of range");
            return Err(ThresholdError::OutOfRange {
                value,
                min: threshold::MIN,
                max: threshold::MAX,
            });
        }
        self.threshold = value;
        Ok(())
    }

    /// Evaluate one reading. Returns `true` only on the Idle to Active edge.
    pub fn observe(&mut self, level: u32, now: Instant) -> bool {
        if level > self.threshold && !self.is_active() {
            self.trigger(now);
            info!(level, threshold = self.threshold, "Alert triggered");
            return true;
        }
        false
    }

    /// Enter the active state, replacing any pending reset
    fn trigger(&mut self, now: Instant) {
        self.state = AlertState::Active {
            reset_at: now + self.reset_delay,
        };
    }

    /// Clear the alert once its reset deadline has passed
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            AlertState::Active { reset_at } if now >= reset_at => {
                self.state = AlertState::Idle;
                info!("Alert reset");
                true
            }
            _ => false,
        }
    }

    /// Drop the pending reset and return to idle
    pub fn cancel(&mut self) {
        self.state = AlertState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triggers_on_idle_to_active_edge_only() {
        let start = Instant::now();
        let mut monitor = ThresholdMonitor::new(30);

        assert!(!monitor.observe(20, start));
        assert!(!monitor.observe(30, start));
        assert!(monitor.observe(35, start));
        assert_eq!(monitor.reset_deadline(), Some(start + Duration::from_secs(5)));

        // Still loud: no retrigger and the deadline does not move
        for ms in [16, 1000, 4999] {
            assert!(!monitor.observe(90, start + Duration::from_millis(ms)));
        }
        assert_eq!(monitor.reset_deadline(), Some(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_resets_five_seconds_after_trigger() {
        let start = Instant::now();
        let mut monitor = ThresholdMonitor::new(30);
        monitor.observe(35, start);

        assert!(!monitor.expire(start + Duration::from_millis(4999)));
        assert!(monitor.is_active());
        assert!(monitor.expire(start + Duration::from_secs(5)));
        assert!(!monitor.is_active());
        assert_eq!(monitor.reset_deadline(), None);
        assert!(!monitor.expire(start + Duration::from_secs(6)));
    }

    #[test]
    fn test_threshold_locked_while_active() {
        let start = Instant::now();
        let mut monitor = ThresholdMonitor::new(30);
        monitor.observe(50, start);

        assert_eq!(monitor.set_threshold(60), Err(ThresholdError::AlertActive));
        assert_eq!(monitor.threshold(), 30);

        monitor.expire(start + Duration::from_secs(5));
        assert_eq!(monitor.set_threshold(60), Ok(()));
        assert_eq!(monitor.threshold(), 60);
    }

    #[test]
    fn test_threshold_range() {
        let mut monitor = ThresholdMonitor::new(30);
        assert_eq!(
            monitor.set_threshold(9),
            Err(ThresholdError::OutOfRange { value: 9, min: 10, max: 100 })
        );
        assert!(monitor.set_threshold(101).is_err());
        assert!(monitor.set_threshold(10).is_ok());
        assert!(monitor.set_threshold(100).is_ok());
        assert_eq!(ThresholdMonitor::new(500).threshold(), 100);
    }

    #[test]
    fn test_retrigger_after_reset_schedules_new_deadline() {
        let start = Instant::now();
        let mut monitor = ThresholdMonitor::new(30);
        monitor.observe(40, start);
        let later = start + Duration::from_secs(5);
        monitor.expire(later);

        assert!(monitor.observe(40, later));
        assert_eq!(monitor.reset_deadline(), Some(later + Duration::from_secs(5)));
    }

    #[test]
    fn test_cancel_clears_pending_reset() {
        let start = Instant::now();
        let mut monitor = ThresholdMonitor::new(30);
        monitor.observe(40, start);
        monitor.cancel();
        assert!(!monitor.is_active());
        assert_eq!(monitor.reset_deadline(), None);
    }
}
