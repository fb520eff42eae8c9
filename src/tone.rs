//! Alert tone synthesis on a dedicated output stream

use crate::constants::alert::{TONE_DRAIN, TONE_DURATION, TONE_FREQUENCY_HZ, TONE_GAIN};
use crate::error::{AppError, AppResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::f32::consts::PI;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
}

/// A short tone: waveform, pitch, level and length
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    /// Amplitude as a fraction of full scale
    pub gain: f32,
    pub duration: Duration,
}

impl Tone {
    /// The tone played when an alert starts
    pub fn alert() -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency_hz: TONE_FREQUENCY_HZ,
            gain: TONE_GAIN,
            duration: TONE_DURATION,
        }
    }

    /// How long the output stream must stay open: the tone itself plus time
    /// for the device buffer to drain. The oscillator is silent past the end.
    pub fn playback_time(&self) -> Duration {
        self.duration + TONE_DRAIN
    }
}

/// Plays tones without blocking the caller
pub trait ToneSink {
    fn play(&mut self, tone: &Tone);
}

/// Sample generator that falls silent once the tone's stop time is reached
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    step: f32,
    gain: f32,
    remaining: u64,
}

impl Oscillator {
    pub fn new(tone: &Tone, sample_rate: u32) -> Self {
        Self {
            waveform: tone.waveform,
            phase: 0.0,
            step: 2.0 * PI * tone.frequency_hz / sample_rate as f32,
            gain: tone.gain,
            remaining: (tone.duration.as_secs_f64() * f64::from(sample_rate)).round() as u64,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.remaining == 0 {
            return 0.0;
        }
        self.remaining -= 1;

        let value = match self.waveform {
            Waveform::Sine => self.phase.sin(),
        };
        self.phase += self.step;
        if self.phase > 2.0 * PI {
            self.phase -= 2.0 * PI;
        }
        value * self.gain
    }
}

/// Plays each tone on a freshly opened default output device
#[derive(Debug, Default)]
pub struct CpalTonePlayer;

impl ToneSink for CpalTonePlayer {
    fn play(&mut self, tone: &Tone) {
        let tone = tone.clone();
        // The stream lives on its own thread for the length of the tone
        let spawned = thread::Builder::new()
            .name("alert-tone".to_string())
            .spawn(move || {
                if let Err(e) = play_blocking(&tone) {
                    warn!("Alert tone failed: {}", e);
                }
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn alert tone thread: {}", e);
        }
    }
}

fn play_blocking(tone: &Tone) -> AppResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AppError::AudioDevice("No default output device available".to_string()))?;
    let supported = device.default_output_config()?;

    let sample_format = supported.sample_format();
    let config = supported.config();
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_tone_stream::<f32>(&device, &config, tone)?,
        cpal::SampleFormat::I16 => build_tone_stream::<i16>(&device, &config, tone)?,
        cpal::SampleFormat::U16 => build_tone_stream::<u16>(&device, &config, tone)?,
        other => {
            return Err(AppError::AudioStream(format!(
                "Unsupported output sample format: {:?}",
                other
            )));
        }
    };

    stream.play()?;
    debug!(frequency = tone.frequency_hz, "Alert tone playing");
    thread::sleep(tone.playback_time());
    drop(stream);
    Ok(())
}

fn build_tone_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tone: &Tone,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32> + 'static,
{
    let channels = usize::from(config.channels);
    let mut oscillator = Oscillator::new(tone, config.sample_rate.0);

    device.build_output_stream(
        config,
        move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in out.chunks_mut(channels) {
                let value = T::from_sample(oscillator.next_sample());
                for sample in frame.iter_mut() {
                    *sample = value;
                }
            }
        },
        |err| warn!("Tone stream error: {}", err),
        None,
    )
}
