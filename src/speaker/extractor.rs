//! Acoustic feature extraction.
//!
//! Samples a short window of magnitude frames from a [`SpectrumSource`] and
//! reduces it to one [`AcousticFingerprint`]. Best-effort by design: a
//! closed or empty source resolves to the all-zero fingerprint so the
//! clustering path always receives a well-formed value.

use tokio::time::{Duration, Instant};
use tracing::debug;

use super::config::ExtractorConfig;
use super::fingerprint::AcousticFingerprint;
use super::spectrum::SpectrumSource;

/// Magnitude-weighted mean bin index over a full spectrum frame.
///
/// Returns 0.0 for an all-zero frame.
pub fn weighted_mean_bin(frame: &[f32]) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f32 = frame
        .iter()
        .enumerate()
        .map(|(bin, &mag)| bin as f32 * mag)
        .sum();
    weighted / total
}

/// Spectral centroid of a frame: the magnitude-weighted mean bin index.
///
/// Same formula as [`weighted_mean_bin`], kept as its own entry point
/// because callers treat the centroid as a distinct fingerprint field.
pub fn spectral_centroid(frame: &[f32]) -> f32 {
    weighted_mean_bin(frame)
}

/// Reduces a window of spectrum frames to one fingerprint per utterance
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Dominant pitch of one frame, if it falls inside the voice band.
    ///
    /// The estimate is the maximum-magnitude bin in the low-frequency
    /// quarter of the spectrum, converted via
    /// `hz = bin * sample_rate / (2 * bin_count)`. Out-of-band estimates
    /// are discarded entirely rather than clipped.
    fn frame_pitch_hz(&self, frame: &[f32], sample_rate: u32) -> Option<f32> {
        let quarter = frame.len() / 4;
        if quarter == 0 {
            return None;
        }

        let mut peak_bin = 0usize;
        let mut peak_mag = 0.0f32;
        for (bin, &mag) in frame[..quarter].iter().enumerate() {
            if mag > peak_mag {
                peak_mag = mag;
                peak_bin = bin;
            }
        }

        let hz = peak_bin as f32 * sample_rate as f32 / (self.config.bin_count as f32 * 2.0);
        if hz >= self.config.voice_band_low_hz && hz <= self.config.voice_band_high_hz {
            Some(hz)
        } else {
            None
        }
    }

    /// Sample the source and reduce the window to a fingerprint.
    ///
    /// Stops at the configured frame cap, at the end of the sampling window,
    /// or when the source runs dry, whichever comes first. Deterministic for
    /// identical frame sequences. Never fails: an exhausted or silent source
    /// yields [`AcousticFingerprint::ZERO`].
    ///
    /// Callers with a hard real-time deadline must additionally race this
    /// future against a timer; a paced source can suspend arbitrarily long
    /// between frames.
    pub async fn extract<S: SpectrumSource + ?Sized>(&self, source: &mut S) -> AcousticFingerprint {
        let sample_rate = source.sample_rate();
        let window_ends = Instant::now() + Duration::from_millis(self.config.window_ms);

        let mut pitches: Vec<f32> = Vec::new();
        let mut frequency_sum = 0.0f32;
        let mut centroid_sum = 0.0f32;
        let mut frames = 0usize;

        while frames < self.config.max_frames && Instant::now() < window_ends {
            let Some(frame) = source.next_frame().await else {
                break;
            };

            if let Some(hz) = self.frame_pitch_hz(&frame, sample_rate) {
                pitches.push(hz);
            }
            frequency_sum += weighted_mean_bin(&frame);
            centroid_sum += spectral_centroid(&frame);
            frames += 1;
        }

        if frames == 0 {
            debug!("no spectrum frames sampled, returning zero fingerprint");
            return AcousticFingerprint::ZERO;
        }

        let (average_pitch, pitch_range) = if pitches.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f32 = pitches.iter().sum();
            let min = pitches.iter().copied().fold(f32::INFINITY, f32::min);
            let max = pitches.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            (sum / pitches.len() as f32, max - min)
        };

        let fingerprint = AcousticFingerprint {
            average_pitch,
            pitch_range,
            average_frequency: frequency_sum / frames as f32,
            spectral_centroid: centroid_sum / frames as f32,
        };

        debug!(
            "extracted fingerprint from {} frames ({} voiced): pitch {:.1} Hz, range {:.1} Hz",
            frames,
            pitches.len(),
            fingerprint.average_pitch,
            fingerprint.pitch_range
        );

        fingerprint
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Canned source yielding a fixed sequence of frames, optionally paced
    struct CannedFrames {
        frames: std::collections::VecDeque<Vec<f32>>,
        sample_rate: u32,
        bin_count: usize,
        delay_ms: u64,
    }

    impl CannedFrames {
        fn new(frames: Vec<Vec<f32>>, sample_rate: u32, bin_count: usize) -> Self {
            Self {
                frames: frames.into(),
                sample_rate,
                bin_count,
                delay_ms: 0,
            }
        }

        fn paced(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }
    }

    #[async_trait]
    impl SpectrumSource for CannedFrames {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn bin_count(&self) -> usize {
            self.bin_count
        }

        async fn next_frame(&mut self) -> Option<Vec<f32>> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.frames.pop_front()
        }
    }

    /// A frame whose low-quarter peak sits at `peak_bin`
    fn frame_with_peak(bin_count: usize, peak_bin: usize, peak_mag: f32) -> Vec<f32> {
        let mut frame = vec![0.01f32; bin_count];
        frame[peak_bin] = peak_mag;
        frame
    }

    // 16kHz with 512 bins: hz = bin * 16000 / 1024 = bin * 15.625
    const SAMPLE_RATE: u32 = 16000;
    const BIN_COUNT: usize = 512;

    fn test_config() -> ExtractorConfig {
        ExtractorConfig {
            bin_count: BIN_COUNT,
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_weighted_mean_bin() {
        // All magnitude in bin 3
        let mut frame = vec![0.0f32; 8];
        frame[3] = 2.0;
        assert_eq!(weighted_mean_bin(&frame), 3.0);

        // Equal magnitude in bins 2 and 4 averages to 3
        let mut frame = vec![0.0f32; 8];
        frame[2] = 1.0;
        frame[4] = 1.0;
        assert_eq!(weighted_mean_bin(&frame), 3.0);

        // Silent frame
        assert_eq!(weighted_mean_bin(&[0.0; 8]), 0.0);
    }

    #[tokio::test]
    async fn test_extract_in_band_pitch() {
        let extractor = FeatureExtractor::new(test_config());
        // bin 10 -> 156.25 Hz, inside the 50-400 band
        let frames = vec![frame_with_peak(BIN_COUNT, 10, 5.0); 4];
        let mut source = CannedFrames::new(frames, SAMPLE_RATE, BIN_COUNT);

        let fp = extractor.extract(&mut source).await;
        assert!((fp.average_pitch - 156.25).abs() < 0.01);
        assert_eq!(fp.pitch_range, 0.0);
        assert!(fp.average_frequency > 0.0);
        assert!(fp.spectral_centroid > 0.0);
    }

    #[tokio::test]
    async fn test_out_of_band_frames_excluded() {
        let extractor = FeatureExtractor::new(test_config());
        // bin 1 -> 15.6 Hz: below the voice band, so no pitch statistics,
        // but the spectral means still cover the frame
        let frames = vec![frame_with_peak(BIN_COUNT, 1, 5.0); 3];
        let mut source = CannedFrames::new(frames, SAMPLE_RATE, BIN_COUNT);

        let fp = extractor.extract(&mut source).await;
        assert_eq!(fp.average_pitch, 0.0);
        assert_eq!(fp.pitch_range, 0.0);
        assert!(fp.average_frequency > 0.0);
    }

    #[tokio::test]
    async fn test_pitch_range_spans_retained_frames() {
        let extractor = FeatureExtractor::new(test_config());
        // bins 8 and 16 -> 125 Hz and 250 Hz
        let frames = vec![
            frame_with_peak(BIN_COUNT, 8, 5.0),
            frame_with_peak(BIN_COUNT, 16, 5.0),
        ];
        let mut source = CannedFrames::new(frames, SAMPLE_RATE, BIN_COUNT);

        let fp = extractor.extract(&mut source).await;
        assert!((fp.average_pitch - 187.5).abs() < 0.01);
        assert!((fp.pitch_range - 125.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_empty_source_resolves_to_zero() {
        let extractor = FeatureExtractor::new(test_config());
        let mut source = CannedFrames::new(Vec::new(), SAMPLE_RATE, BIN_COUNT);

        let fp = extractor.extract(&mut source).await;
        assert!(fp.is_silent());
    }

    #[tokio::test]
    async fn test_frame_cap_respected() {
        let mut config = test_config();
        config.max_frames = 3;
        let extractor = FeatureExtractor::new(config);

        // More frames available than the cap; the extractor must stop early
        let frames = vec![frame_with_peak(BIN_COUNT, 10, 5.0); 50];
        let mut source = CannedFrames::new(frames, SAMPLE_RATE, BIN_COUNT);

        let fp = extractor.extract(&mut source).await;
        assert!(!fp.is_silent());
        assert_eq!(source.frames.len(), 47);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_deadline_stops_sampling() {
        let extractor = FeatureExtractor::new(test_config());
        // 1s per frame against a 3s window: only a few frames get sampled
        let frames = vec![frame_with_peak(BIN_COUNT, 10, 5.0); 60];
        let mut source = CannedFrames::new(frames, SAMPLE_RATE, BIN_COUNT).paced(1000);

        let fp = extractor.extract(&mut source).await;
        assert!(!fp.is_silent());
        assert!(source.frames.len() > 50, "should have stopped well short of 60 frames");
    }

    #[tokio::test]
    async fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(test_config());
        let frames = vec![
            frame_with_peak(BIN_COUNT, 8, 5.0),
            frame_with_peak(BIN_COUNT, 12, 3.0),
            frame_with_peak(BIN_COUNT, 16, 4.0),
        ];

        let mut first = CannedFrames::new(frames.clone(), SAMPLE_RATE, BIN_COUNT);
        let mut second = CannedFrames::new(frames, SAMPLE_RATE, BIN_COUNT);

        let a = extractor.extract(&mut first).await;
        let b = extractor.extract(&mut second).await;
        assert_eq!(a, b);
    }
}
