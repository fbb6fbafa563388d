use munkres::{solve_assignment, WeightMatrix};
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::AssociationConfig;
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::track::Track;

/// How detections claim tracks within one frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Each detection, in order, takes the nearest track in range. A track may be
    /// taken by several detections of the same frame.
    #[default]
    Greedy,
    /// Like `Greedy`, but a track is taken at most once per frame.
    GreedyExclusive,
    /// Minimum total distance one-to-one assignment.
    Optimal,
}

/// Owns the live track table and folds each frame's detections into it.
///
/// Matching compares detection centroids against every track's predicted
/// position (constant velocity over the last two centroids) and accepts the
/// nearest one strictly inside `search_radius`. Unmatched detections start new
/// tracks. Tracks unseen for `track_timeout` frames are evicted both before and
/// after matching, so a gap in frame ids cannot revive them. Track ids grow monotonically and
/// are never reused.
#[derive(Debug, Clone)]
pub struct TrackAssociation {
    config: AssociationConfig,
    tracks: BTreeMap<u64, Track>,
    next_id: u64,
    last_frame: Option<u64>,
    matched_speeds: BTreeMap<u64, f32>,
}

impl TrackAssociation {
    pub fn new(config: AssociationConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 0,
            last_frame: None,
            matched_speeds: BTreeMap::new(),
        })
    }

    /// Processes one frame. Frame ids must be strictly increasing.
    ///
    /// Tracks born in this frame are not candidates for later detections of
    /// the same frame.
    pub fn associate(&mut self, frame_id: u64, detections: &[Detection]) -> Result<()> {
        if let Some(last_frame_id) = self.last_frame {
            if frame_id <= last_frame_id {
                return Err(Error::FrameOutOfOrder {
                    frame_id,
                    last_frame_id,
                });
            }
        }

        self.last_frame = Some(frame_id);
        self.matched_speeds.clear();

        // tracks already past the timeout at this frame never match
        self.evict(frame_id);

        let born = self.next_id;

        match self.config.mode {
            AssignmentMode::Greedy => {
                for det in detections {
                    let matched = self.nearest(det.centroid(), |id| id < born);
                    self.apply(frame_id, det, matched);
                }
            }
            AssignmentMode::GreedyExclusive => self.associate_exclusive(frame_id, detections),
            AssignmentMode::Optimal => match self.optimal_assignment(detections) {
                Some(matches) => {
                    for (det, matched) in detections.iter().zip(matches) {
                        self.apply(frame_id, det, matched);
                    }
                }
                None => self.associate_exclusive(frame_id, detections),
            },
        }

        self.evict(frame_id);

        Ok(())
    }

    /// Live tracks in id order.
    #[inline]
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    #[inline]
    pub fn track(&self, track_id: u64) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Id the next new track will receive, also the number of tracks ever created.
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    #[inline]
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Speeds of the tracks matched in the last processed frame.
    #[inline]
    pub fn matched_speeds(&self) -> &BTreeMap<u64, f32> {
        &self.matched_speeds
    }

    #[inline]
    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    fn associate_exclusive(&mut self, frame_id: u64, detections: &[Detection]) {
        let born = self.next_id;
        let mut claimed = BTreeSet::new();

        for det in detections {
            let matched = self.nearest(det.centroid(), |id| id < born && !claimed.contains(&id));
            if let Some(id) = matched {
                claimed.insert(id);
            }

            self.apply(frame_id, det, matched);
        }
    }

    fn nearest<P>(&self, centroid: na::Point2<f32>, eligible: P) -> Option<u64>
    where
        P: Fn(u64) -> bool,
    {
        let mut best: Option<(u64, f32)> = None;

        for track in self.tracks.values().filter(|t| eligible(t.track_id)) {
            let dist = na::distance(&centroid, &track.predicted_position());

            if dist < self.config.search_radius && best.map_or(true, |(_, d)| dist < d) {
                best = Some((track.track_id, dist));
            }
        }

        best.map(|(id, _)| id)
    }

    /// Per detection, the track it is assigned to. `None` when the solver fails.
    fn optimal_assignment(&self, detections: &[Detection]) -> Option<Vec<Option<u64>>> {
        let mut matches = vec![None; detections.len()];

        if self.tracks.is_empty() || detections.is_empty() {
            return Some(matches);
        }

        let ids: Vec<u64> = self.tracks.keys().copied().collect();
        let n = ids.len().max(detections.len());

        // a miss costs exactly the gate
        let gate = self.config.search_radius as f64;
        let mut costs = vec![gate; n * n];
        for (r, track) in self.tracks.values().enumerate() {
            let predicted = track.predicted_position();

            for (c, det) in detections.iter().enumerate() {
                let dist = na::distance(&predicted, &det.centroid()) as f64;
                if dist < gate {
                    costs[r * n + c] = dist;
                }
            }
        }

        let mut weights = WeightMatrix::from_row_vec(n, costs.clone());

        match solve_assignment(&mut weights) {
            Ok(positions) => {
                for pos in positions {
                    if pos.row < ids.len()
                        && pos.column < detections.len()
                        && costs[pos.row * n + pos.column] < gate
                    {
                        matches[pos.column] = Some(ids[pos.row]);
                    }
                }

                Some(matches)
            }
            Err(err) => {
                tracing::warn!("assignment could not be solved: {:?}", err);
                None
            }
        }
    }

    fn apply(&mut self, frame_id: u64, det: &Detection, matched: Option<u64>) {
        if let Some(track) = matched.and_then(|id| self.tracks.get_mut(&id)) {
            track.update(frame_id, det);
            self.matched_speeds.insert(track.track_id, track.speed);
            return;
        }

        let id = self.next_id;
        self.next_id += 1;

        let track = Track::new(
            id,
            frame_id,
            det,
            self.config.history_capacity,
            self.config.default_confidence,
        );

        tracing::trace!(
            "frame {}: new track {} ({}) at {:?}",
            frame_id,
            id,
            track.kind,
            track.position()
        );

        self.tracks.insert(id, track);
    }

    fn evict(&mut self, frame_id: u64) {
        let timeout = self.config.track_timeout;
        let before = self.tracks.len();

        self.tracks
            .retain(|_, t| t.frames_since_seen(frame_id) < timeout);

        let evicted = before - self.tracks.len();
        if evicted > 0 {
            tracing::debug!("frame {}: evicted {} stale tracks", frame_id, evicted);
        }
    }
}

impl crate::Tracking for TrackAssociation {
    fn update(&mut self, frame_id: u64, detections: &[Detection]) -> Result<Vec<Track>> {
        self.associate(frame_id, detections)?;

        Ok(self.tracks.values().cloned().collect())
    }

    fn tracks(&self) -> Vec<Track> {
        self.tracks.values().cloned().collect()
    }
}
