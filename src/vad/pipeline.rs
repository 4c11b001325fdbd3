//! Utterance boundary detection.
//!
//! Silero-VAD-gated segmentation of a 16kHz stream into utterances. This is
//! the collaborator that decides *when* an utterance ends; who spoke it is
//! decided downstream by the speaker module.

use anyhow::Result;
use std::collections::VecDeque;
use tracing::{debug, trace};
use voice_activity_detector::VoiceActivityDetector;

/// 16kHz samples per millisecond
const SAMPLES_PER_MS: usize = 16;

/// Chunk size the VAD model predicts on, at 16kHz
const VAD_CHUNK_SIZE: usize = 512;

/// One finalized unit of speech, the granularity of speaker decisions
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Audio samples at 16kHz mono
    pub samples: Vec<f32>,
    /// Start time in milliseconds
    pub start_ms: u64,
    /// End time in milliseconds
    pub end_ms: u64,
}

impl Utterance {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Segmenter tuning, in milliseconds
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Speech probability threshold (0.0 - 1.0)
    pub vad_threshold: f32,
    /// Audio kept from before the detected speech onset
    pub pre_roll_ms: u32,
    /// Utterances shorter than this are discarded
    pub min_speech_ms: u32,
    /// Silence that finalizes an utterance
    pub silence_to_flush_ms: u32,
    /// Hard cap on utterance length; longer speech is split
    pub max_utterance_ms: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            vad_threshold: 0.5,
            pre_roll_ms: 300,
            min_speech_ms: 250,
            silence_to_flush_ms: 500,
            max_utterance_ms: 25000,
        }
    }
}

/// Streaming utterance segmenter over 16kHz mono audio.
///
/// Feed arbitrary-size sample blocks through [`push`](Self::push); finalized
/// utterances are appended to the caller's output buffer. The audio clock
/// always advances, speech or not.
pub struct UtteranceSegmenter {
    vad: VoiceActivityDetector,

    vad_threshold: f32,
    pre_roll_samples: usize,
    min_speech_samples: usize,
    silence_to_flush_samples: usize,
    max_utterance_samples: usize,

    /// Count of samples processed; sits at the END of the last chunk
    clock_samples: u64,
    in_speech: bool,
    silence_samples: u64,
    speech_buffer: Vec<f32>,
    speech_start_samples: u64,
    pre_roll: VecDeque<f32>,

    /// Partial VAD chunk carried between push calls
    staging: Vec<f32>,
}

impl UtteranceSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        let vad = VoiceActivityDetector::builder()
            .sample_rate(16000)
            .chunk_size(VAD_CHUNK_SIZE)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create VAD: {:?}", e))?;

        Ok(Self {
            vad,
            vad_threshold: config.vad_threshold,
            pre_roll_samples: config.pre_roll_ms as usize * SAMPLES_PER_MS,
            min_speech_samples: config.min_speech_ms as usize * SAMPLES_PER_MS,
            silence_to_flush_samples: config.silence_to_flush_ms as usize * SAMPLES_PER_MS,
            max_utterance_samples: config.max_utterance_ms as usize * SAMPLES_PER_MS,
            clock_samples: 0,
            in_speech: false,
            silence_samples: 0,
            speech_buffer: Vec::new(),
            speech_start_samples: 0,
            pre_roll: VecDeque::new(),
            staging: Vec::with_capacity(VAD_CHUNK_SIZE * 2),
        })
    }

    /// Feed samples; finalized utterances are pushed onto `out`
    pub fn push(&mut self, samples: &[f32], out: &mut Vec<Utterance>) {
        self.staging.extend_from_slice(samples);
        while self.staging.len() >= VAD_CHUNK_SIZE {
            let chunk: Vec<f32> = self.staging.drain(..VAD_CHUNK_SIZE).collect();
            self.process_chunk(&chunk, out);
        }
    }

    /// Flush any pending speech at end of input, bypassing the minimum
    /// length filter
    pub fn finish(&mut self) -> Option<Utterance> {
        if self.in_speech && !self.speech_buffer.is_empty() {
            debug!("flushing trailing speech at end of input");
            return self.flush(0);
        }
        None
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_samples / SAMPLES_PER_MS as u64
    }

    pub fn is_speech_active(&self) -> bool {
        self.in_speech
    }

    fn process_chunk(&mut self, chunk: &[f32], out: &mut Vec<Utterance>) {
        self.clock_samples += chunk.len() as u64;
        let chunk_start = self.clock_samples - chunk.len() as u64;

        let speech_prob = self.vad.predict(chunk.iter().copied());
        let is_speech = speech_prob > self.vad_threshold;

        trace!(
            "chunk at {}ms: prob={:.2}, in_speech={}",
            chunk_start / SAMPLES_PER_MS as u64,
            speech_prob,
            self.in_speech
        );

        // Split over-long utterances before anything else, restarting
        // immediately since speech is still running
        if self.in_speech && self.speech_buffer.len() >= self.max_utterance_samples {
            debug!("max utterance length reached at {}ms, splitting", self.clock_ms());
            if let Some(utterance) = self.flush(self.min_speech_samples) {
                out.push(utterance);
            }
            self.in_speech = true;
            self.speech_start_samples = chunk_start.saturating_sub(self.pre_roll.len() as u64);
            self.speech_buffer.extend(self.pre_roll.iter());
        }

        match (self.in_speech, is_speech) {
            // Silence -> speech: start accumulating, keeping the pre-roll
            (false, true) => {
                self.in_speech = true;
                self.silence_samples = 0;
                self.speech_start_samples =
                    chunk_start.saturating_sub(self.pre_roll.len() as u64);
                self.speech_buffer.clear();
                self.speech_buffer.extend(self.pre_roll.iter());
                self.speech_buffer.extend_from_slice(chunk);
                debug!(
                    "speech started at {}ms",
                    self.speech_start_samples / SAMPLES_PER_MS as u64
                );
            }

            (true, true) => {
                self.speech_buffer.extend_from_slice(chunk);
                self.silence_samples = 0;
            }

            // Trailing silence still belongs to the utterance until the
            // flush threshold passes
            (true, false) => {
                self.speech_buffer.extend_from_slice(chunk);
                self.silence_samples += chunk.len() as u64;
                if self.silence_samples >= self.silence_to_flush_samples as u64 {
                    if let Some(utterance) = self.flush(self.min_speech_samples) {
                        out.push(utterance);
                    }
                }
            }

            (false, false) => {}
        }

        self.pre_roll.extend(chunk.iter().copied());
        while self.pre_roll.len() > self.pre_roll_samples {
            self.pre_roll.pop_front();
        }
    }

    fn flush(&mut self, min_samples: usize) -> Option<Utterance> {
        self.in_speech = false;
        self.silence_samples = 0;

        if self.speech_buffer.len() < min_samples {
            debug!(
                "discarding short utterance: {} samples (min: {})",
                self.speech_buffer.len(),
                min_samples
            );
            self.speech_buffer.clear();
            return None;
        }

        let start_ms = self.speech_start_samples / SAMPLES_PER_MS as u64;
        let samples = std::mem::take(&mut self.speech_buffer);
        let end_ms = start_ms + samples.len() as u64 / SAMPLES_PER_MS as u64;

        debug!(
            "utterance finalized: {}ms - {}ms ({} samples)",
            start_ms,
            end_ms,
            samples.len()
        );

        Some(Utterance {
            samples,
            start_ms,
            end_ms,
        })
    }
}
