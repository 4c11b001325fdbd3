//! Configuration structures for speaker identification.

/// Smallest accepted speaker budget
pub const MIN_EXPECTED_SPEAKERS: usize = 1;

/// Largest accepted speaker budget
pub const MAX_EXPECTED_SPEAKERS: usize = 10;

/// Clamp an operator-supplied speaker count into the supported range.
///
/// Out-of-range values are never rejected, only clamped.
pub fn clamp_expected_speakers(count: usize) -> usize {
    count.clamp(MIN_EXPECTED_SPEAKERS, MAX_EXPECTED_SPEAKERS)
}

/// Configuration for the whole identification pipeline
#[derive(Debug, Clone)]
pub struct SpeakerIdConfig {
    /// Hard deadline for one feature extraction (ms). On expiry the
    /// utterance is labelled as unknown instead of delaying the transcript.
    pub extract_timeout_ms: u64,

    /// Feature extractor parameters
    pub extractor: ExtractorConfig,

    /// Clustering parameters
    pub cluster: ClusterConfig,
}

impl Default for SpeakerIdConfig {
    fn default() -> Self {
        Self {
            extract_timeout_ms: 1000,
            extractor: ExtractorConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

/// Configuration for the acoustic feature extractor
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Number of magnitude bins per spectrum frame.
    /// The underlying FFT length is twice this.
    pub bin_count: usize,

    /// Wall-clock sampling window per utterance (ms)
    pub window_ms: u64,

    /// Maximum number of frames sampled per window
    pub max_frames: usize,

    /// Lower bound of the human-voice pitch band (Hz).
    /// Frame pitch estimates outside the band are excluded from the
    /// window's pitch statistics, not clipped.
    pub voice_band_low_hz: f32,

    /// Upper bound of the human-voice pitch band (Hz)
    pub voice_band_high_hz: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            bin_count: 2048,
            window_ms: 3000,
            max_frames: 60,
            voice_band_low_hz: 50.0,
            voice_band_high_hz: 400.0,
        }
    }
}

/// Configuration for the online speaker clustering algorithm.
///
/// The normalization scales and the similarity threshold are empirically
/// tuned values, not derived constants. Changing them changes clustering
/// behavior; they are exposed here so operators can retune rather than
/// recompile.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Distance below which a fingerprint joins an existing cluster
    pub similarity_threshold: f32,

    /// Normalization scale for the pitch difference (Hz)
    pub pitch_scale: f32,

    /// Normalization scale for the pitch-range difference (Hz)
    pub range_scale: f32,

    /// Normalization scale for the frequency-estimate difference (bins)
    pub frequency_scale: f32,

    /// Normalization scale for the spectral-centroid difference (bins)
    pub centroid_scale: f32,

    /// Weight of the pitch term. Pitch is the most discriminating cheap
    /// signal in a short sample, hence the dominant weight.
    pub pitch_weight: f32,

    /// Weight of the pitch-range term
    pub range_weight: f32,

    /// Weight of the frequency-estimate term
    pub frequency_weight: f32,

    /// Weight of the spectral-centroid term
    pub centroid_weight: f32,

    /// Confidence floor for a within-threshold match
    pub match_confidence_floor: f32,

    /// Confidence floor for a forced assignment at full budget.
    /// Lower than the match floor to signal the lower-quality merge.
    pub forced_confidence_floor: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.35,
            pitch_scale: 150.0,
            range_scale: 80.0,
            frequency_scale: 800.0,
            centroid_scale: 400.0,
            pitch_weight: 0.6,
            range_weight: 0.2,
            frequency_weight: 0.15,
            centroid_weight: 0.05,
            match_confidence_floor: 0.5,
            forced_confidence_floor: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_expected_speakers() {
        assert_eq!(clamp_expected_speakers(0), 1);
        assert_eq!(clamp_expected_speakers(1), 1);
        assert_eq!(clamp_expected_speakers(4), 4);
        assert_eq!(clamp_expected_speakers(10), 10);
        assert_eq!(clamp_expected_speakers(99), 10);
    }

    #[test]
    fn test_default_cluster_config() {
        let config = ClusterConfig::default();
        assert_eq!(config.similarity_threshold, 0.35);
        assert_eq!(config.pitch_scale, 150.0);
        assert_eq!(config.match_confidence_floor, 0.5);
        assert_eq!(config.forced_confidence_floor, 0.3);
    }

    #[test]
    fn test_default_extractor_config() {
        let config = ExtractorConfig::default();
        assert_eq!(config.bin_count, 2048);
        assert_eq!(config.max_frames, 60);
        assert_eq!(config.voice_band_low_hz, 50.0);
        assert_eq!(config.voice_band_high_hz, 400.0);
    }
}
