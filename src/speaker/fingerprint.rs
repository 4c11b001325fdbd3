use serde::{Deserialize, Serialize};

/// Acoustic summary of one utterance's audio.
///
/// Four coarse statistics, cheap to compute from magnitude spectra, carry
/// enough register information to separate voices in a short live sample.
/// All fields are non-negative. `average_pitch` is 0.0 when no voiced frame
/// was observed in the window; when non-zero it lies inside the extractor's
/// voice band, because out-of-band frame estimates are dropped from the
/// pitch statistics entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcousticFingerprint {
    /// Dominant pitch estimate across the sampling window (Hz)
    pub average_pitch: f32,

    /// Max minus min of per-frame pitch estimates in the window (Hz)
    pub pitch_range: f32,

    /// Magnitude-weighted mean frequency-bin index, a coarse timbre indicator
    pub average_frequency: f32,

    /// Magnitude-weighted mean bin index over the full spectrum (brightness)
    pub spectral_centroid: f32,
}

impl AcousticFingerprint {
    /// The well-formed degenerate value: what a failed or empty extraction
    /// resolves to, so downstream clustering always receives a fingerprint.
    pub const ZERO: Self = Self {
        average_pitch: 0.0,
        pitch_range: 0.0,
        average_frequency: 0.0,
        spectral_centroid: 0.0,
    };

    /// True when the window produced no usable audio at all
    pub fn is_silent(&self) -> bool {
        *self == Self::ZERO
    }

    /// True when at least one voiced frame contributed to the pitch statistics
    pub fn has_pitch(&self) -> bool {
        self.average_pitch > 0.0
    }
}

impl Default for AcousticFingerprint {
    fn default() -> Self {
        Self::ZERO
    }
}
