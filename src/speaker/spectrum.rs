//! Frequency-domain frame sources.
//!
//! The extractor consumes magnitude spectra one frame at a time through the
//! [`SpectrumSource`] trait, which stands in for the host's live analyser
//! node. [`StftFrames`] is the offline implementation used by the CLI: it
//! steps through a buffered utterance with a Hann-windowed FFT.

use async_trait::async_trait;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Source of successive frequency-domain magnitude frames.
///
/// Implementations may pace frames in real time (one per device tick) and
/// are expected to tear down gracefully: once the underlying audio is gone
/// they return `None` instead of failing.
#[async_trait]
pub trait SpectrumSource: Send {
    /// Sample rate of the underlying audio (Hz)
    fn sample_rate(&self) -> u32;

    /// Number of magnitude bins per frame
    fn bin_count(&self) -> usize;

    /// The next magnitude frame, or `None` once the source is exhausted
    async fn next_frame(&mut self) -> Option<Vec<f32>>;
}

/// Offline spectrum source over one buffered utterance.
///
/// Frames are produced immediately (no real-time pacing): Hann window,
/// forward FFT of length `2 * bin_count`, 50% hop, magnitudes of the lower
/// half of the spectrum. The final partial frame is zero-padded.
pub struct StftFrames {
    samples: Vec<f32>,
    sample_rate: u32,
    bin_count: usize,
    frame_idx: usize,
    frame_total: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl StftFrames {
    pub fn new(samples: Vec<f32>, sample_rate: u32, bin_count: usize) -> Self {
        // Misconfigured bin counts are clamped rather than rejected
        let bin_count = bin_count.max(1);
        let fft_len = bin_count * 2;
        let hop = bin_count;

        let frame_total = if samples.is_empty() {
            0
        } else if samples.len() >= fft_len {
            1 + (samples.len() - fft_len) / hop
        } else {
            1
        };

        let window: Vec<f32> = (0..fft_len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (fft_len - 1) as f32).cos()))
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);
        let buffer = vec![Complex::new(0.0, 0.0); fft_len];

        Self {
            samples,
            sample_rate,
            bin_count,
            frame_idx: 0,
            frame_total,
            fft,
            window,
            buffer,
        }
    }

    /// Number of frames this source will yield in total
    pub fn frame_count(&self) -> usize {
        self.frame_total
    }

    fn compute_frame(&mut self, frame_idx: usize) -> Vec<f32> {
        let fft_len = self.bin_count * 2;
        let start = frame_idx * self.bin_count;

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = self.samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        debug_assert_eq!(self.buffer.len(), fft_len);

        self.fft.process(&mut self.buffer);

        self.buffer[..self.bin_count]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}

#[async_trait]
impl SpectrumSource for StftFrames {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bin_count(&self) -> usize {
        self.bin_count
    }

    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.frame_idx >= self.frame_total {
            return None;
        }
        let frame = self.compute_frame(self.frame_idx);
        self.frame_idx += 1;
        Some(frame)
    }
}
