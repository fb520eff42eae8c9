//! Application state management

use crate::capture::CaptureProvider;
use crate::error::ThresholdError;
use crate::meter::Meter;
use crate::tone::ToneSink;
use crate::ui::UiState;
use std::time::Instant;

const HELP: &str = "[space] start/stop  [up/down] threshold  [q] quit";

/// Presentation-side state kept between frames
pub struct AppState {
    pub status: String,
}

impl AppState {
    /// Create a new application state with default values
    pub fn new() -> Self {
        Self {
            status: format!("Idle. {}", HELP),
        }
    }

    /// Record the outcome of a capture toggle
    pub fn toggled(&mut self, was_capturing: bool, capturing: bool) {
        self.status = match (was_capturing, capturing) {
            (_, true) => format!("Listening. {}", HELP),
            (true, false) => format!("Stopped. {}", HELP),
            (false, false) => format!("Microphone unavailable. {}", HELP),
        };
    }

    /// Record the outcome of a threshold change
    pub fn threshold_result(&mut self, result: Result<(), ThresholdError>) {
        if let Err(e) = result {
            self.status = format!("Threshold unchanged: {}", e);
        }
    }

    /// Build the UI view of the meter at `now`
    pub fn snapshot<P: CaptureProvider, T: ToneSink>(&self, meter: &Meter<P, T>, now: Instant) -> UiState {
        let alert_remaining_secs = meter
            .alert_deadline()
            .map(|deadline| deadline.saturating_duration_since(now).as_secs_f64().ceil() as u64)
            .unwrap_or(0);

        UiState {
            device_name: meter.device_name().unwrap_or_default().to_string(),
            capturing: meter.is_capturing(),
            level: meter.level(),
            bars: *meter.bars(),
            threshold: meter.threshold(),
            alert_active: meter.alert_active(),
            alert_remaining_secs,
            status: self.status.clone(),
        }
    }
}
