//! Frequency analysis of the captured signal
//!
//! The analyzer keeps no samples of its own; it reads the newest
//! `fft_size` mono samples from a [`SampleBuffer`] whenever a snapshot is
//! requested and reduces them to one byte per frequency bin.

use crate::smoothing::{SpectrumSmoother, amplitude_to_db, db_to_byte};
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Bounded mono sample buffer shared with the capture callback
#[derive(Clone)]
pub struct SampleBuffer {
    samples: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append interleaved frames, downmixing each frame to mono
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        let channels = channels.max(1);
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        for frame in data.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            if samples.len() == self.capacity {
                samples.pop_front();
            }
            samples.push_back(mono);
        }
    }

    /// Copy the newest samples into `out`, left-padding with silence
    fn copy_latest(&self, out: &mut [f32]) {
        let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let available = samples.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        for (dst, src) in out[pad..].iter_mut().zip(samples.iter().skip(samples.len() - available)) {
            *dst = *src;
        }
    }

    pub fn clear(&self) {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Byte-valued spectrum analyzer over a shared sample buffer
pub struct FrequencyAnalyzer {
    fft_size: usize,
    min_db: f32,
    max_db: f32,
    source: SampleBuffer,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    time_domain: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    smoother: SpectrumSmoother,
}

impl FrequencyAnalyzer {
    pub fn new(source: SampleBuffer, fft_size: usize, smoothing: f32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        // Blackman window
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            fft_size,
            min_db: crate::constants::audio::MIN_DECIBELS,
            max_db: crate::constants::audio::MAX_DECIBELS,
            source,
            fft,
            window,
            time_domain: vec![0.0; fft_size],
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; fft_size / 2],
            smoother: SpectrumSmoother::new(fft_size / 2, smoothing),
        }
    }

    /// Number of bins in a snapshot (half the transform size)
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute a fresh snapshot and write it into `bins`
    ///
    /// Writes at most [`frequency_bin_count`](Self::frequency_bin_count)
    /// values; extra slots are left untouched.
    pub fn byte_frequency_data(&mut self, bins: &mut [u8]) {
        self.source.copy_latest(&mut self.time_domain);

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(&self.time_domain).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        for (magnitude, value) in self.magnitudes.iter_mut().zip(&self.buffer) {
            *magnitude = value.norm() * scale;
        }

        let smoothed = self.smoother.update(&self.magnitudes);
        for (byte, &magnitude) in bins.iter_mut().zip(smoothed) {
            *byte = db_to_byte(amplitude_to_db(magnitude), self.min_db, self.max_db);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(bin: usize, fft_size: usize, amplitude: f32) -> Vec<f32> {
        (0..fft_size)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / fft_size as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_yields_zero_bins() {
        let buffer = SampleBuffer::new(256);
        buffer.push_interleaved(&vec![0.0; 256], 1);
        let mut analyzer = FrequencyAnalyzer::new(buffer, 256, 0.8);

        let mut bins = vec![7u8; analyzer.frequency_bin_count()];
        analyzer.byte_frequency_data(&mut bins);
        assert_eq!(bins.len(), 128);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_in_matching_bin() {
        let buffer = SampleBuffer::new(256);
        buffer.push_interleaved(&sine(32, 256, 0.001), 1);
        let mut analyzer = FrequencyAnalyzer::new(buffer, 256, 0.0);

        let mut bins = vec![0u8; 128];
        analyzer.byte_frequency_data(&mut bins);

        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| **b)
            .map(|(i, _)| i);
        assert_eq!(peak, Some(32));
        assert!(bins[32] > 80);
        assert!(bins[100] < 10);
    }

    #[test]
    fn test_smoothing_carries_previous_snapshot() {
        let buffer = SampleBuffer::new(256);
        buffer.push_interleaved(&sine(16, 256, 0.8), 1);
        let mut analyzer = FrequencyAnalyzer::new(buffer.clone(), 256, 0.8);

        let mut bins = vec![0u8; 128];
        analyzer.byte_frequency_data(&mut bins);
        let loud = bins[16];

        buffer.clear();
        analyzer.byte_frequency_data(&mut bins);
        // Decays rather than dropping straight to silence
        assert!(bins[16] > 0);
        assert!(bins[16] <= loud);
    }

    #[test]
    fn test_buffer_downmixes_and_stays_bounded() {
        let buffer = SampleBuffer::new(4);
        buffer.push_interleaved(&[1.0, 0.0, 0.5, 0.5, 0.2, 0.4, 0.0, 0.0, -1.0, 1.0, 0.3, 0.1], 2);

        let mut out = [9.0f32; 6];
        buffer.copy_latest(&mut out);
        assert_eq!(&out[..2], &[0.0, 0.0]);
        assert!((out[2] - 0.3).abs() < 1e-6);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[4], 0.0);
        assert!((out[5] - 0.2).abs() < 1e-6);
    }
}
