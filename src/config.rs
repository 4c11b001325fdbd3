use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::speaker::config::{ClusterConfig, ExtractorConfig, SpeakerIdConfig};
use crate::vad::SegmenterConfig;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,

    // Speaker identification
    pub expected_speakers: usize,
    pub similarity_threshold: f32,
    pub extract_timeout_ms: u64,
    pub analysis_window_ms: u64,
    pub fft_bins: usize,
    pub voice_band_low_hz: f32,
    pub voice_band_high_hz: f32,

    // Utterance segmentation
    pub vad_threshold: f32,
    pub vad_pre_roll_ms: u32,
    pub min_speech_ms: u32,
    pub silence_to_flush_ms: u32,
    pub max_utterance_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        let extractor = ExtractorConfig::default();
        let cluster = ClusterConfig::default();
        let segmenter = SegmenterConfig::default();
        Self {
            schema_version: 1,
            expected_speakers: 4,
            similarity_threshold: cluster.similarity_threshold,
            extract_timeout_ms: 1000,
            analysis_window_ms: extractor.window_ms,
            fft_bins: extractor.bin_count,
            voice_band_low_hz: extractor.voice_band_low_hz,
            voice_band_high_hz: extractor.voice_band_high_hz,
            vad_threshold: segmenter.vad_threshold,
            vad_pre_roll_ms: segmenter.pre_roll_ms,
            min_speech_ms: segmenter.min_speech_ms,
            silence_to_flush_ms: segmenter.silence_to_flush_ms,
            max_utterance_ms: segmenter.max_utterance_ms,
        }
    }
}

impl Config {
    /// Load config from file, or fall back to defaults when it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".diarize-cli"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Identification pipeline config derived from the app settings.
    ///
    /// Out-of-range speaker counts are clamped downstream, never rejected.
    pub fn speaker_id_config(&self) -> SpeakerIdConfig {
        SpeakerIdConfig {
            extract_timeout_ms: self.extract_timeout_ms,
            extractor: ExtractorConfig {
                bin_count: self.fft_bins,
                window_ms: self.analysis_window_ms,
                voice_band_low_hz: self.voice_band_low_hz,
                voice_band_high_hz: self.voice_band_high_hz,
                ..ExtractorConfig::default()
            },
            cluster: ClusterConfig {
                similarity_threshold: self.similarity_threshold,
                ..ClusterConfig::default()
            },
        }
    }

    /// Utterance segmenter config derived from the app settings
    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            vad_threshold: self.vad_threshold,
            pre_roll_ms: self.vad_pre_roll_ms,
            min_speech_ms: self.min_speech_ms,
            silence_to_flush_ms: self.silence_to_flush_ms,
            max_utterance_ms: self.max_utterance_ms,
        }
    }
}
