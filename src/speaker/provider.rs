//! Speaker identification facade.
//!
//! Combines feature extraction and online clustering behind one interface:
//! hand it a spectrum source per finalized utterance and it answers with a
//! `(label, confidence)` pair, degrading to "Unknown Speaker" when the
//! extraction misses its deadline. Never surfaces an error to the caller.

use tokio::time::{timeout, Duration};
use tracing::debug;

use super::clustering::{SpeakerCluster, SpeakerClusterer, UNKNOWN_SPEAKER};
use super::config::SpeakerIdConfig;
use super::extractor::FeatureExtractor;
use super::fingerprint::AcousticFingerprint;
use super::spectrum::SpectrumSource;

/// Per-session speaker identification pipeline.
///
/// One instance per recording session. All clustering state is reached
/// through `&mut self`, which serializes identification; extractions share
/// no mutable state, so a timed-out extraction can never mutate the session
/// after the deadline has already produced a label.
pub struct SpeakerIdProvider {
    extractor: FeatureExtractor,
    clusterer: SpeakerClusterer,
    extract_timeout: Duration,
}

impl SpeakerIdProvider {
    pub fn new(expected_speakers: usize, config: SpeakerIdConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config.extractor),
            clusterer: SpeakerClusterer::with_config(expected_speakers, config.cluster),
            extract_timeout: Duration::from_millis(config.extract_timeout_ms),
        }
    }

    /// Identify the speaker of one utterance from its spectrum frames.
    ///
    /// The extraction is raced against the configured deadline; on expiry
    /// the in-flight sampling is dropped and the utterance is labelled
    /// `("Unknown Speaker", 0.0)` so transcript rendering is never delayed.
    pub async fn identify_utterance<S: SpectrumSource>(&mut self, source: &mut S) -> (String, f32) {
        match timeout(self.extract_timeout, self.extractor.extract(source)).await {
            Ok(fingerprint) => self.identify_fingerprint(&fingerprint),
            Err(_) => {
                debug!(
                    "feature extraction missed the {}ms deadline, labelling utterance as unknown",
                    self.extract_timeout.as_millis()
                );
                (UNKNOWN_SPEAKER.to_string(), 0.0)
            }
        }
    }

    /// Identify the speaker for an already-extracted fingerprint
    pub fn identify_fingerprint(&mut self, fingerprint: &AcousticFingerprint) -> (String, f32) {
        let (label, confidence) = self.clusterer.identify(fingerprint);
        debug!(
            "utterance assigned to {} (confidence: {:.0}%)",
            label,
            confidence * 100.0
        );
        (label, confidence)
    }

    /// Set the expected speaker count, clamped to the supported range
    pub fn set_expected_speakers(&mut self, count: usize) {
        self.clusterer.set_expected_speakers(count);
    }

    /// Rename a detected speaker by cluster id; unknown ids are ignored
    pub fn rename_speaker(&mut self, id: &str, new_name: &str) {
        self.clusterer.rename_cluster(id, new_name);
    }

    /// Clear all detected speakers for a new session
    pub fn reset(&mut self) {
        self.clusterer.reset();
    }

    /// Read-only snapshot of the detected speakers, in creation order
    pub fn speakers(&self) -> &[SpeakerCluster] {
        self.clusterer.clusters()
    }

    pub fn speaker_count(&self) -> usize {
        self.clusterer.speaker_count()
    }
}
