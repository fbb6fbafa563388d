use nalgebra as na;
use serde_derive::Serialize;

use crate::bbox::{BBox, Ltrb};
use crate::circular_queue::CircularQueue;
use crate::detection::{Detection, VehicleKind};
use crate::predictor;
use crate::violation::Violation;

#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub track_id: u64,
    /// Centroids, oldest first, never empty
    pub history: CircularQueue<na::Point2<f32>>,
    pub bbox: BBox<Ltrb>,
    pub first_seen: u64,
    pub last_seen: u64,

    // in px per frame
    pub speed: f32,

    pub kind: VehicleKind,
    pub confidence: f32,

    /// Filled only on the copies handed out with a frame report
    pub violations: Vec<Violation>,
}

impl Track {
    pub fn new(
        track_id: u64,
        frame_id: u64,
        det: &Detection,
        history_capacity: usize,
        default_confidence: f32,
    ) -> Self {
        let mut history = CircularQueue::with_capacity(history_capacity);
        history.push(det.centroid());

        let (kind, confidence) = match det.class {
            Some(class) => (class.kind, class.confidence),
            None => (VehicleKind::Unknown, default_confidence),
        };

        Self {
            track_id,
            history,
            bbox: det.bbox,
            first_seen: frame_id,
            last_seen: frame_id,
            speed: 0.0,
            kind,
            confidence,
            violations: Vec::new(),
        }
    }

    /// Folds a matched detection into the track.
    ///
    /// Speed becomes the distance between the last two centroids; labels are
    /// only overwritten when the detection carries one.
    pub fn update(&mut self, frame_id: u64, det: &Detection) {
        self.history.push(det.centroid());
        self.bbox = det.bbox;
        self.last_seen = frame_id;

        if let (Some(prev), Some(last)) = (self.history.previous(), self.history.latest()) {
            self.speed = na::distance(prev, last);
        }

        if let Some(class) = det.class {
            self.kind = class.kind;
            self.confidence = class.confidence;
        }
    }

    #[inline]
    pub fn position(&self) -> na::Point2<f32> {
        self.history
            .latest()
            .copied()
            .unwrap_or_else(|| self.bbox.centroid())
    }

    #[inline]
    pub fn predicted_position(&self) -> na::Point2<f32> {
        predictor::linear(self.position(), self.history.previous().copied())
    }

    #[inline]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn frames_since_seen(&self, frame_id: u64) -> u64 {
        frame_id.saturating_sub(self.last_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Classification;
    use approx::assert_relative_eq;

    fn det(x: f32, y: f32) -> Detection {
        Detection::new(BBox::ltrb(x, y, x + 50.0, y + 30.0))
    }

    #[test]
    fn unlabeled_detection_gives_unknown_track() {
        let t = Track::new(3, 10, &det(100.0, 100.0), 8, 0.8);

        assert_eq!(t.kind, VehicleKind::Unknown);
        assert_relative_eq!(t.confidence, 0.8);
        assert_eq!(t.history_len(), 1);
        assert_eq!(t.speed, 0.0);
        assert_eq!(t.first_seen, 10);
        assert_eq!(t.position(), na::Point2::new(125.0, 115.0));
    }

    #[test]
    fn update_recomputes_speed_and_label() {
        let mut t = Track::new(0, 0, &det(100.0, 100.0), 8, 0.8);
        let labeled = det(103.0, 104.0).with_class(Classification::new(VehicleKind::Bus, 0.91));
        t.update(1, &labeled);

        assert_relative_eq!(t.speed, 5.0);
        assert_eq!(t.kind, VehicleKind::Bus);
        assert_relative_eq!(t.confidence, 0.91);
        assert_eq!(t.last_seen, 1);
        assert_eq!(t.first_seen, 0);

        // an unlabeled match keeps the previous label
        t.update(2, &det(106.0, 108.0));
        assert_eq!(t.kind, VehicleKind::Bus);
    }

    #[test]
    fn prediction_uses_last_displacement() {
        let mut t = Track::new(0, 0, &det(100.0, 100.0), 8, 0.8);
        assert_eq!(t.predicted_position(), t.position());

        t.update(1, &det(110.0, 100.0));
        assert_eq!(t.predicted_position(), na::Point2::new(145.0, 115.0));
    }

    #[test]
    fn history_is_capped() {
        let mut t = Track::new(0, 0, &det(0.0, 0.0), 4, 0.8);
        for i in 1..10 {
            t.update(i, &det(i as f32, 0.0));
        }

        assert_eq!(t.history_len(), 4);
        assert_relative_eq!(t.speed, 1.0);
    }
}
