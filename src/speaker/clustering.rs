//! Online incremental speaker clustering.
//!
//! Assigns utterance fingerprints to a bounded set of speaker clusters in
//! real time using a weighted per-field distance against running centroids.
//! No enrollment, no model: the first distinct voice becomes "Speaker 1",
//! the next "Speaker 2", up to the operator-configured budget, after which
//! far-away fingerprints are force-merged into the nearest cluster.

use tracing::debug;

use super::config::{clamp_expected_speakers, ClusterConfig};
use super::fingerprint::AcousticFingerprint;

/// Label returned when no clustering decision can be made at all
pub const UNKNOWN_SPEAKER: &str = "Unknown Speaker";

/// A provisional speaker identity with its full sample history
#[derive(Debug, Clone)]
pub struct SpeakerCluster {
    /// Stable identifier assigned at creation, sequential ("1", "2", ...)
    pub id: String,

    /// User-editable label, defaults to "Speaker {id}"
    pub display_name: String,

    /// Every fingerprint ever assigned to this cluster, insertion order.
    /// Unbounded by design; the centroid is recomputed from it.
    samples: Vec<AcousticFingerprint>,

    /// Per-field arithmetic mean of all samples
    centroid: AcousticFingerprint,
}

impl SpeakerCluster {
    fn new(number: usize, seed: AcousticFingerprint) -> Self {
        let id = number.to_string();
        Self {
            display_name: format!("Speaker {}", id),
            id,
            samples: vec![seed],
            centroid: seed,
        }
    }

    pub fn centroid(&self) -> &AcousticFingerprint {
        &self.centroid
    }

    pub fn samples(&self) -> &[AcousticFingerprint] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Append a sample and recompute the centroid from scratch.
    ///
    /// From-scratch recomputation keeps the centroid exactly reproducible
    /// from the sample list at O(n) per assignment; sessions are short
    /// enough that the incremental O(1) running mean isn't needed.
    fn absorb(&mut self, fingerprint: AcousticFingerprint) {
        self.samples.push(fingerprint);
        let n = self.samples.len() as f32;
        let mut sum = AcousticFingerprint::ZERO;
        for sample in &self.samples {
            sum.average_pitch += sample.average_pitch;
            sum.pitch_range += sample.pitch_range;
            sum.average_frequency += sample.average_frequency;
            sum.spectral_centroid += sample.spectral_centroid;
        }
        self.centroid = AcousticFingerprint {
            average_pitch: sum.average_pitch / n,
            pitch_range: sum.pitch_range / n,
            average_frequency: sum.average_frequency / n,
            spectral_centroid: sum.spectral_centroid / n,
        };
    }
}

/// Weighted Euclidean distance between two fingerprints.
///
/// Each field difference is normalized by its scale constant, then the
/// weighted terms are combined as an L2 norm. Symmetric in its arguments.
pub fn fingerprint_distance(
    config: &ClusterConfig,
    a: &AcousticFingerprint,
    b: &AcousticFingerprint,
) -> f32 {
    let pitch_diff = (a.average_pitch - b.average_pitch).abs() / config.pitch_scale;
    let range_diff = (a.pitch_range - b.pitch_range).abs() / config.range_scale;
    let frequency_diff = (a.average_frequency - b.average_frequency).abs() / config.frequency_scale;
    let centroid_diff = (a.spectral_centroid - b.spectral_centroid).abs() / config.centroid_scale;

    ((config.pitch_weight * pitch_diff).powi(2)
        + (config.range_weight * range_diff).powi(2)
        + (config.frequency_weight * frequency_diff).powi(2)
        + (config.centroid_weight * centroid_diff).powi(2))
    .sqrt()
}

/// Online speaker clustering session state.
///
/// One instance per recording session, explicitly constructed and owned;
/// all mutation goes through sequential calls on `&mut self`.
#[derive(Debug)]
pub struct SpeakerClusterer {
    clusters: Vec<SpeakerCluster>,
    expected_speakers: usize,
    config: ClusterConfig,
}

impl SpeakerClusterer {
    pub fn new(expected_speakers: usize) -> Self {
        Self::with_config(expected_speakers, ClusterConfig::default())
    }

    pub fn with_config(expected_speakers: usize, config: ClusterConfig) -> Self {
        Self {
            clusters: Vec::new(),
            expected_speakers: clamp_expected_speakers(expected_speakers),
            config,
        }
    }

    /// Set the cluster budget, clamped to the supported range.
    ///
    /// Pure configuration: existing clusters are untouched, even when the
    /// new budget is below the current cluster count.
    pub fn set_expected_speakers(&mut self, count: usize) {
        self.expected_speakers = clamp_expected_speakers(count);
    }

    pub fn expected_speakers(&self) -> usize {
        self.expected_speakers
    }

    /// Clear all clusters. The speaker budget is kept.
    pub fn reset(&mut self) {
        self.clusters.clear();
        debug!("speaker clusterer reset");
    }

    /// Rename a cluster by id. Unknown ids are silently ignored.
    pub fn rename_cluster(&mut self, id: &str, new_name: &str) {
        match self.clusters.iter_mut().find(|c| c.id == id) {
            Some(cluster) => cluster.display_name = new_name.to_string(),
            None => debug!("rename ignored, no cluster with id {}", id),
        }
    }

    /// Read-only snapshot of the clusters, in creation order
    pub fn clusters(&self) -> &[SpeakerCluster] {
        &self.clusters
    }

    pub fn speaker_count(&self) -> usize {
        self.clusters.len()
    }

    /// Decide which speaker an utterance fingerprint belongs to.
    ///
    /// Returns the cluster's display name and a confidence in [0, 1].
    /// Deterministic; never fails. Ties on distance go to the
    /// earliest-created cluster.
    pub fn identify(&mut self, fingerprint: &AcousticFingerprint) -> (String, f32) {
        if self.clusters.is_empty() {
            return (self.create_cluster(*fingerprint), 1.0);
        }

        let mut best: Option<(usize, f32)> = None;
        for (idx, cluster) in self.clusters.iter().enumerate() {
            let distance = fingerprint_distance(&self.config, fingerprint, cluster.centroid());
            match best {
                // Strict comparison keeps the earliest cluster on ties
                Some((_, best_distance)) if distance < best_distance => {
                    best = Some((idx, distance));
                }
                None => best = Some((idx, distance)),
                _ => {}
            }
        }

        let Some((best_idx, best_distance)) = best else {
            // Unreachable with a non-empty cluster list, but the contract is
            // to degrade rather than panic
            return (UNKNOWN_SPEAKER.to_string(), 0.0);
        };

        if best_distance < self.config.similarity_threshold {
            let cluster = &mut self.clusters[best_idx];
            cluster.absorb(*fingerprint);
            let confidence = (1.0 - best_distance).max(self.config.match_confidence_floor);
            debug!(
                "matched {} at distance {:.3} ({} samples)",
                cluster.display_name,
                best_distance,
                cluster.sample_count()
            );
            return (cluster.display_name.clone(), confidence);
        }

        if self.clusters.len() < self.expected_speakers {
            return (self.create_cluster(*fingerprint), 1.0);
        }

        // Budget exhausted: force-merge into the nearest cluster. The
        // centroid drifts and there is no later splitting; the lower
        // confidence floor is the only signal of the degraded match.
        let cluster = &mut self.clusters[best_idx];
        cluster.absorb(*fingerprint);
        let confidence = (1.0 - best_distance).max(self.config.forced_confidence_floor);
        debug!(
            "speaker budget full, forced into {} at distance {:.3}",
            cluster.display_name, best_distance
        );
        (cluster.display_name.clone(), confidence)
    }

    fn create_cluster(&mut self, seed: AcousticFingerprint) -> String {
        let cluster = SpeakerCluster::new(self.clusters.len() + 1, seed);
        let name = cluster.display_name.clone();
        self.clusters.push(cluster);
        debug!("created new speaker: {} (total: {})", name, self.clusters.len());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(pitch: f32, range: f32, frequency: f32, centroid: f32) -> AcousticFingerprint {
        AcousticFingerprint {
            average_pitch: pitch,
            pitch_range: range,
            average_frequency: frequency,
            spectral_centroid: centroid,
        }
    }

    #[test]
    fn test_first_speaker() {
        let mut clusterer = SpeakerClusterer::new(4);
        let (label, confidence) = clusterer.identify(&fp(120.0, 20.0, 300.0, 150.0));

        assert_eq!(label, "Speaker 1");
        assert_eq!(confidence, 1.0);
        assert_eq!(clusterer.speaker_count(), 1);
        assert_eq!(clusterer.clusters()[0].sample_count(), 1);
    }

    #[test]
    fn test_repeated_fingerprint_stays_in_one_cluster() {
        let mut clusterer = SpeakerClusterer::new(4);
        let sample = fp(120.0, 20.0, 300.0, 150.0);

        clusterer.identify(&sample);
        for _ in 0..5 {
            let (label, confidence) = clusterer.identify(&sample);
            assert_eq!(label, "Speaker 1");
            assert!(confidence >= 0.5);
        }
        assert_eq!(clusterer.speaker_count(), 1);
        assert_eq!(clusterer.clusters()[0].sample_count(), 6);
    }

    #[test]
    fn test_budget_respected_with_forced_assignment() {
        let mut clusterer = SpeakerClusterer::new(3);

        // Pitches far enough apart that each opens a new cluster
        clusterer.identify(&fp(100.0, 20.0, 300.0, 150.0));
        clusterer.identify(&fp(200.0, 20.0, 300.0, 150.0));
        clusterer.identify(&fp(300.0, 20.0, 300.0, 150.0));
        assert_eq!(clusterer.speaker_count(), 3);

        // A fourth distinct voice must merge into the nearest cluster
        let (label, confidence) = clusterer.identify(&fp(400.0, 20.0, 300.0, 150.0));
        assert_eq!(label, "Speaker 3");
        assert_eq!(clusterer.speaker_count(), 3);
        assert!(confidence >= 0.3);
        assert_eq!(clusterer.clusters()[2].sample_count(), 2);
    }

    #[test]
    fn test_distance_symmetry() {
        let config = ClusterConfig::default();
        let a = fp(120.0, 30.0, 500.0, 220.0);
        let b = fp(210.0, 12.0, 340.0, 160.0);
        assert_eq!(
            fingerprint_distance(&config, &a, &b),
            fingerprint_distance(&config, &b, &a)
        );
    }

    #[test]
    fn test_distance_zero_for_identical() {
        let config = ClusterConfig::default();
        let a = fp(120.0, 30.0, 500.0, 220.0);
        assert_eq!(fingerprint_distance(&config, &a, &a), 0.0);
    }

    #[test]
    fn test_centroid_is_per_field_mean() {
        let mut clusterer = SpeakerClusterer::new(1);
        clusterer.identify(&fp(100.0, 10.0, 300.0, 100.0));
        clusterer.identify(&fp(110.0, 20.0, 320.0, 140.0));
        clusterer.identify(&fp(120.0, 30.0, 340.0, 120.0));

        let centroid = clusterer.clusters()[0].centroid();
        assert!((centroid.average_pitch - 110.0).abs() < 1e-4);
        assert!((centroid.pitch_range - 20.0).abs() < 1e-4);
        assert!((centroid.average_frequency - 320.0).abs() < 1e-4);
        assert!((centroid.spectral_centroid - 120.0).abs() < 1e-4);
    }

    #[test]
    fn test_centroid_independent_of_order() {
        let samples = [
            fp(100.0, 10.0, 300.0, 100.0),
            fp(110.0, 20.0, 320.0, 140.0),
            fp(120.0, 30.0, 340.0, 120.0),
        ];

        let mut forward = SpeakerClusterer::new(1);
        for s in &samples {
            forward.identify(s);
        }
        let mut reverse = SpeakerClusterer::new(1);
        for s in samples.iter().rev() {
            reverse.identify(s);
        }

        let a = forward.clusters()[0].centroid();
        let b = reverse.clusters()[0].centroid();
        assert!((a.average_pitch - b.average_pitch).abs() < 1e-4);
        assert!((a.pitch_range - b.pitch_range).abs() < 1e-4);
        assert!((a.average_frequency - b.average_frequency).abs() < 1e-4);
        assert!((a.spectral_centroid - b.spectral_centroid).abs() < 1e-4);
    }

    #[test]
    fn test_reset_clears_clusters_keeps_budget() {
        let mut clusterer = SpeakerClusterer::new(5);
        clusterer.identify(&fp(100.0, 20.0, 300.0, 150.0));
        clusterer.identify(&fp(250.0, 20.0, 300.0, 150.0));
        assert_eq!(clusterer.speaker_count(), 2);

        clusterer.reset();
        assert_eq!(clusterer.speaker_count(), 0);
        assert_eq!(clusterer.expected_speakers(), 5);

        // Behaves exactly like a fresh session again
        let (label, confidence) = clusterer.identify(&fp(250.0, 20.0, 300.0, 150.0));
        assert_eq!(label, "Speaker 1");
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_rename_changes_label_only() {
        let mut clusterer = SpeakerClusterer::new(4);
        let sample = fp(120.0, 20.0, 300.0, 150.0);
        clusterer.identify(&sample);

        clusterer.rename_cluster("1", "Alice");
        assert_eq!(clusterer.clusters()[0].display_name, "Alice");
        assert_eq!(clusterer.clusters()[0].id, "1");

        let (label, _) = clusterer.identify(&sample);
        assert_eq!(label, "Alice");
    }

    #[test]
    fn test_rename_unknown_id_is_noop() {
        let mut clusterer = SpeakerClusterer::new(4);
        clusterer.identify(&fp(120.0, 20.0, 300.0, 150.0));
        clusterer.rename_cluster("7", "Ghost");
        assert_eq!(clusterer.clusters()[0].display_name, "Speaker 1");
    }

    #[test]
    fn test_expected_speakers_clamped() {
        let mut clusterer = SpeakerClusterer::new(0);
        assert_eq!(clusterer.expected_speakers(), 1);
        clusterer.set_expected_speakers(99);
        assert_eq!(clusterer.expected_speakers(), 10);
        clusterer.set_expected_speakers(3);
        assert_eq!(clusterer.expected_speakers(), 3);
    }

    #[test]
    fn test_tie_goes_to_earliest_cluster() {
        let mut clusterer = SpeakerClusterer::new(2);
        clusterer.identify(&fp(100.0, 20.0, 300.0, 150.0));
        clusterer.identify(&fp(300.0, 20.0, 300.0, 150.0));

        // Exactly between the two centroids, beyond the threshold both ways:
        // budget is full, so it must force into the first cluster
        let (label, _) = clusterer.identify(&fp(200.0, 20.0, 300.0, 150.0));
        assert_eq!(label, "Speaker 1");
    }

    #[test]
    fn test_zero_fingerprint_is_accepted() {
        let mut clusterer = SpeakerClusterer::new(2);
        let (label, confidence) = clusterer.identify(&AcousticFingerprint::ZERO);
        assert_eq!(label, "Speaker 1");
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_spec_scenario_two_speakers() {
        let mut clusterer = SpeakerClusterer::new(2);

        let a = fp(120.0, 20.0, 300.0, 150.0);
        let (label, confidence) = clusterer.identify(&a);
        assert_eq!((label.as_str(), confidence), ("Speaker 1", 1.0));

        // 100 Hz apart: distance ~0.4, above the 0.35 threshold
        let b = fp(220.0, 20.0, 300.0, 150.0);
        let (label, confidence) = clusterer.identify(&b);
        assert_eq!((label.as_str(), confidence), ("Speaker 2", 1.0));

        // Close to A: joins cluster 1 and pulls its centroid to 122.5 Hz
        let c = fp(125.0, 20.0, 300.0, 150.0);
        let (label, confidence) = clusterer.identify(&c);
        assert_eq!(label, "Speaker 1");
        assert!(confidence >= 0.5);

        let cluster = &clusterer.clusters()[0];
        assert_eq!(cluster.sample_count(), 2);
        assert!((cluster.centroid().average_pitch - 122.5).abs() < 1e-4);
    }
}
