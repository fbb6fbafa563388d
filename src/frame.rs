use serde_derive::Serialize;
use std::collections::BTreeMap;

use crate::detection::Detection;
use crate::queue::QueueMetrics;
use crate::track::Track;
use crate::violation::Violation;

/// Everything the pipeline produced for one frame.
#[derive(Serialize, Debug, Clone)]
pub struct FrameReport {
    pub frame_id: u64,
    pub detections: Vec<Detection>,
    /// Live tracks in id order, each carrying this frame's violations
    pub tracks: Vec<Track>,
    pub queue: QueueMetrics,
    pub violations: Vec<Violation>,
    /// Speeds of the tracks matched in this frame, by track id
    pub matched_speeds: BTreeMap<u64, f32>,
}

impl FrameReport {
    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn track(&self, track_id: u64) -> Option<&Track> {
        self.tracks
            .binary_search_by_key(&track_id, |t| t.track_id)
            .ok()
            .map(|idx| &self.tracks[idx])
    }
}
