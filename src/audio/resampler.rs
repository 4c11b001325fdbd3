//! Resampling to the fixed analysis rate.

use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use super::AudioError;

/// Sample rate the VAD and feature extraction run at
pub const ANALYSIS_SAMPLE_RATE: u32 = 16000;

/// Input chunk size fed to the resampler
const CHUNK_FRAMES: usize = 1024;

/// Resample a whole recording to the 16kHz analysis rate.
///
/// Audio already at the analysis rate passes through untouched. The final
/// partial chunk is zero-padded, which can append up to one chunk of
/// silence at the tail; the VAD treats it as such.
pub fn resample_to_analysis_rate(samples: &[f32], source_rate: u32) -> Result<Vec<f32>, AudioError> {
    if source_rate == ANALYSIS_SAMPLE_RATE {
        return Ok(samples.to_vec());
    }

    debug!(
        "resampling {} samples: {} Hz -> {} Hz",
        samples.len(),
        source_rate,
        ANALYSIS_SAMPLE_RATE
    );

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        ANALYSIS_SAMPLE_RATE as usize,
        CHUNK_FRAMES,
        2, // sub_chunks for quality
        1, // mono
    )
    .map_err(|e| AudioError::Resampler(e.to_string()))?;

    let ratio = ANALYSIS_SAMPLE_RATE as f64 / source_rate as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + CHUNK_FRAMES);

    let mut input = vec![vec![0.0f32; CHUNK_FRAMES]];
    let mut out_buf = resampler.output_buffer_allocate(true);

    for block in samples.chunks(CHUNK_FRAMES) {
        input[0][..block.len()].copy_from_slice(block);
        input[0][block.len()..].fill(0.0);

        let (_, produced) = resampler
            .process_into_buffer(&input, &mut out_buf, None)
            .map_err(|e| AudioError::Resampler(e.to_string()))?;
        output.extend_from_slice(&out_buf[0][..produced]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_at_analysis_rate() {
        let samples = vec![0.1f32, -0.2, 0.3];
        let output = resample_to_analysis_rate(&samples, ANALYSIS_SAMPLE_RATE).unwrap();
        assert_eq!(output, samples);
    }

    #[test]
    fn test_48k_to_16k_ratio() {
        let samples = vec![0.0f32; 48000];
        let output = resample_to_analysis_rate(&samples, 48000).unwrap();

        // FFT resamplers carry latency, so the ratio is approximate
        let expected = samples.len() as f64 / 3.0;
        let actual = output.len() as f64;
        assert!(
            (actual - expected).abs() / expected < 0.2,
            "expected ~{} samples, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_44100_to_16k_produces_output() {
        let samples = vec![0.0f32; 44100];
        let output = resample_to_analysis_rate(&samples, 44100).unwrap();
        assert!(!output.is_empty());
        let ratio = output.len() as f64 / samples.len() as f64;
        assert!((ratio - 16000.0 / 44100.0).abs() < 0.1);
    }
}
