pub mod resampler;
pub mod wav;

pub use resampler::{resample_to_analysis_rate, ANALYSIS_SAMPLE_RATE};
pub use wav::{read_wav_mono, DecodedWav};

use thiserror::Error;

/// Errors from the audio support layer (decoding and resampling)
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to read WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported WAV layout: {0}")]
    UnsupportedFormat(String),

    #[error("resampler error: {0}")]
    Resampler(String),
}
