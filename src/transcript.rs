use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One utterance's entry on the session timeline, annotated with the
/// speaker decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub start_ms: u64,
    pub end_ms: u64,
    pub speaker: String,
    pub confidence: f32,
}

impl Segment {
    pub fn new(start_ms: u64, end_ms: u64, speaker: String, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_ms,
            end_ms,
            speaker,
            confidence,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// A complete diarization session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub segments: Vec<Segment>,

    // Stats
    pub total_duration_ms: u64,
    pub speech_duration_ms: u64,
}

impl SessionRecord {
    pub fn new(source: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source,
            started_at: Utc::now(),
            ended_at: None,
            segments: Vec::new(),
            total_duration_ms: 0,
            speech_duration_ms: 0,
        }
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.speech_duration_ms += segment.duration_ms();
        self.segments.push(segment);
    }

    pub fn finalize(&mut self) {
        self.ended_at = Some(Utc::now());
        if let Some(last_segment) = self.segments.last() {
            self.total_duration_ms = last_segment.end_ms;
        }
    }

    /// Speaking time per label, ordered by first appearance
    pub fn speaker_totals(&self) -> Vec<(String, u64)> {
        let mut totals: Vec<(String, u64)> = Vec::new();
        for segment in &self.segments {
            match totals.iter_mut().find(|(label, _)| *label == segment.speaker) {
                Some((_, ms)) => *ms += segment.duration_ms(),
                None => totals.push((segment.speaker.clone(), segment.duration_ms())),
            }
        }
        totals
    }
}
