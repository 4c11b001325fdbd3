//! WAV decoding to the mono f32 stream the pipeline works on.

use std::path::Path;
use tracing::debug;

use super::AudioError;

/// Decoded recording: mono samples in [-1, 1] plus the file's sample rate
pub struct DecodedWav {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedWav {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Read a WAV file and downmix it to mono f32.
///
/// Integer formats are scaled by their bit depth; multi-channel audio is
/// averaged across channels.
pub fn read_wav_mono(path: &Path) -> Result<DecodedWav, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(AudioError::UnsupportedFormat("zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{} bits per sample",
                    spec.bits_per_sample
                )));
            }
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let samples: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    debug!(
        "decoded {:?}: {} Hz, {} channels, {} mono samples",
        path,
        spec.sample_rate,
        channels,
        samples.len()
    );

    Ok(DecodedWav {
        samples,
        sample_rate: spec.sample_rate,
    })
}
