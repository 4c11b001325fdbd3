//! Unsupervised online speaker identification.
//!
//! The pipeline per finalized utterance:
//! 1. Sample a short window of frequency-domain magnitude frames
//! 2. Reduce the window to a four-number acoustic fingerprint
//! 3. Assign the fingerprint to a speaker cluster online, within a
//!    bounded speaker budget
//!
//! There is no enrollment and no persistence; state lives for one session.

pub mod clustering;
pub mod config;
pub mod extractor;
pub mod fingerprint;
pub mod provider;
pub mod spectrum;

pub use clustering::{SpeakerClusterer, UNKNOWN_SPEAKER};
pub use config::{ClusterConfig, ExtractorConfig, SpeakerIdConfig};
pub use extractor::FeatureExtractor;
pub use fingerprint::AcousticFingerprint;
pub use provider::SpeakerIdProvider;
pub use spectrum::{SpectrumSource, StftFrames};
