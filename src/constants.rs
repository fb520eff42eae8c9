//! Application constants and configuration values

/// Audio capture and analysis constants
pub mod audio {
    /// Transform size of the frequency analyzer
    pub const FFT_SIZE: usize = 256;
    /// Smoothing time constant applied between analyzer snapshots
    pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
    /// Magnitude mapped to byte value 0
    pub const MIN_DECIBELS: f32 = -100.0;
    /// Magnitude mapped to byte value 255
    pub const MAX_DECIBELS: f32 = -30.0;
    /// Preferred capture sample rate
    pub const PREFERRED_SAMPLE_RATE: u32 = 44_100;
    /// Buffer size for audio streams
    pub const BUFFER_SIZE: cpal::BufferSize = cpal::BufferSize::Default;
}

/// Loudness estimation constants
pub mod loudness {
    /// Scale from mean bin magnitude to the displayed level
    pub const LEVEL_SCALE: f64 = 0.6;
    /// Number of visualization bars
    pub const BAR_COUNT: usize = 20;
}

/// Threshold control limits
pub mod threshold {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 100;
    pub const DEFAULT: u32 = 30;
}

/// Alert tone and reset timing
pub mod alert {
    use std::time::Duration;

    pub const TONE_FREQUENCY_HZ: f32 = 800.0;
    /// Tone amplitude as a fraction of full scale
    pub const TONE_GAIN: f32 = 0.3;
    pub const TONE_DURATION: Duration = Duration::from_millis(500);
    /// Extra time the output stream stays open so buffered samples drain
    pub const TONE_DRAIN: Duration = Duration::from_millis(200);
    /// Delay from the most recent trigger until the alert clears
    pub const RESET_DELAY: Duration = Duration::from_secs(5);
}

/// UI display constants
pub mod ui {
    /// Frame interval in milliseconds (about 60 fps)
    pub const FRAME_INTERVAL_MS: u64 = 16;
    /// Bar width calculation accounts for borders
    pub const BAR_BORDER_WIDTH: usize = 2;
}
