//! Microphone capture: device setup, stream lifecycle and the analyzer it feeds

use crate::analyzer::{FrequencyAnalyzer, SampleBuffer};
use crate::constants::audio::{BUFFER_SIZE, FFT_SIZE, PREFERRED_SAMPLE_RATE, SMOOTHING_TIME_CONSTANT};
use crate::error::{AppError, AppResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{debug, info, warn};

/// Grants live audio input on request
pub trait CaptureProvider {
    type Session: FrequencySource;

    /// Open the input device and start streaming into a new session
    fn open(&mut self) -> AppResult<Self::Session>;
}

/// Periodic frequency snapshots from a live capture
pub trait FrequencySource {
    /// Name of the device being captured
    fn device_name(&self) -> &str;

    fn frequency_bin_count(&self) -> usize;

    /// Read the current snapshot, one byte per bin
    fn byte_frequency_data(&mut self, bins: &mut [u8]);

    /// Disconnect and stop the underlying stream
    fn close(self);
}

/// Audio configuration and device information
pub struct AudioConfig {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: cpal::SampleFormat,
}

/// Find and configure an audio input device
pub fn setup_audio_device(device_name: Option<&str>) -> AppResult<(cpal::Device, AudioConfig)> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AppError::AudioDevice(format!("Input device '{}' not found", name)))?
    } else {
        host.default_input_device()
            .ok_or_else(|| AppError::AudioDevice("No default input device available".to_string()))?
    };

    let device_name = device.name()?;

    let mut supported_configs = device.supported_input_configs()?;
    let config_range = supported_configs
        .next()
        .ok_or_else(|| AppError::AudioDevice("No supported input configs found".to_string()))?;

    // Prefer 44.1kHz when the range allows it
    let sample_rate = if config_range.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
        && config_range.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
    {
        PREFERRED_SAMPLE_RATE
    } else {
        config_range.min_sample_rate().0
    };

    let audio_config = AudioConfig {
        device_name,
        sample_rate,
        channels: config_range.channels(),
        sample_format: config_range.sample_format(),
    };

    Ok((device, audio_config))
}

/// Build an audio input stream that feeds `samples` in the device's native format
pub fn build_audio_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    samples: SampleBuffer,
) -> AppResult<cpal::Stream> {
    let channels = usize::from(config.channels);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_input::<f32>(device, config, samples, channels)?,
        cpal::SampleFormat::I16 => build_input::<i16>(device, config, samples, channels)?,
        cpal::SampleFormat::U16 => build_input::<u16>(device, config, samples, channels)?,
        other => {
            return Err(AppError::AudioStream(format!(
                "Unsupported input sample format: {:?}",
                other
            )));
        }
    };

    Ok(stream)
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: SampleBuffer,
    channels: usize,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + 'static,
    f32: FromSample<T>,
{
    device.build_input_stream(
        config,
        create_audio_callback::<T>(samples, channels),
        |err| warn!("Audio stream error: {}", err),
        None,
    )
}

/// Audio callback that converts input to f32 and feeds the shared sample buffer
pub fn create_audio_callback<T>(
    samples: SampleBuffer,
    channels: usize,
) -> impl FnMut(&[T], &cpal::InputCallbackInfo) + Send + 'static
where
    T: SizedSample + 'static,
    f32: FromSample<T>,
{
    let mut converted = Vec::new();
    move |data: &[T], _: &cpal::InputCallbackInfo| {
        converted.clear();
        converted.extend(data.iter().map(|&s| f32::from_sample(s)));
        samples.push_interleaved(&converted, channels);
    }
}

/// Opens the configured (or default) cpal input device
pub struct CpalCaptureProvider {
    device_name: Option<String>,
}

impl CpalCaptureProvider {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

impl CaptureProvider for CpalCaptureProvider {
    type Session = CaptureSession;

    fn open(&mut self) -> AppResult<CaptureSession> {
        let (device, audio_config) = setup_audio_device(self.device_name.as_deref())?;

        let samples = SampleBuffer::new(FFT_SIZE);
        let config = cpal::StreamConfig {
            channels: audio_config.channels,
            sample_rate: cpal::SampleRate(audio_config.sample_rate),
            buffer_size: BUFFER_SIZE,
        };
        let stream = build_audio_stream(&device, &config, audio_config.sample_format, samples.clone())?;
        stream.play()?;

        info!(
            device = %audio_config.device_name,
            sample_rate = audio_config.sample_rate,
            channels = audio_config.channels,
            "Capture started"
        );

        Ok(CaptureSession {
            device_name: audio_config.device_name,
            analyzer: FrequencyAnalyzer::new(samples.clone(), FFT_SIZE, SMOOTHING_TIME_CONSTANT),
            samples,
            stream,
        })
    }
}

/// A live microphone connection and the analyzer attached to it
pub struct CaptureSession {
    device_name: String,
    stream: cpal::Stream,
    analyzer: FrequencyAnalyzer,
    samples: SampleBuffer,
}

impl FrequencySource for CaptureSession {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn frequency_bin_count(&self) -> usize {
        self.analyzer.frequency_bin_count()
    }

    fn byte_frequency_data(&mut self, bins: &mut [u8]) {
        self.analyzer.byte_frequency_data(bins);
    }

    fn close(self) {
        if let Err(e) = self.stream.pause() {
            debug!("Failed to pause capture stream: {}", e);
        }
        drop(self.stream);
        self.samples.clear();
        info!(device = %self.device_name, "Capture stopped");
    }
}
