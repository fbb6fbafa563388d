use serde_derive::Serialize;
use std::collections::BTreeMap;

use crate::detection::VehicleKind;
use crate::math;
use crate::track::Track;

/// Tracks faster than this count as moving for flow efficiency, px per frame
const MOVING_SPEED: f32 = 1.0;
/// Tracks faster than this count as active
const ACTIVE_SPEED: f32 = 0.5;

/// Summary of the live track set for reporting.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrafficInsights {
    pub vehicle_distribution: BTreeMap<VehicleKind, usize>,
    pub average_speed: f32,
    pub speed_variance: f32,
    /// Percentage of moving tracks
    pub flow_efficiency: f32,
    pub total_tracks: usize,
    pub active_tracks: usize,
}

impl TrafficInsights {
    /// `None` when no track is live.
    pub fn from_tracks<'a, I>(tracks: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut vehicle_distribution = BTreeMap::new();
        let mut speeds = Vec::new();

        for track in tracks {
            *vehicle_distribution.entry(track.kind).or_insert(0) += 1;
            speeds.push(track.speed);
        }

        if speeds.is_empty() {
            return None;
        }

        let moving = speeds.iter().filter(|s| **s > MOVING_SPEED).count();

        Some(Self {
            vehicle_distribution,
            average_speed: math::mean(&speeds),
            speed_variance: math::variance(&speeds),
            flow_efficiency: moving as f32 / speeds.len() as f32 * 100.0,
            total_tracks: speeds.len(),
            active_tracks: speeds.iter().filter(|s| **s > ACTIVE_SPEED).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::detection::{Classification, Detection};
    use approx::assert_relative_eq;

    fn track(id: u64, kind: VehicleKind, speed: f32) -> Track {
        let det = Detection::new(BBox::ltrb(0.0, 0.0, 50.0, 30.0))
            .with_class(Classification::new(kind, 0.9));
        let mut t = Track::new(id, 0, &det, 8, 0.8);
        t.speed = speed;
        t
    }

    #[test]
    fn no_tracks_no_insights() {
        assert!(TrafficInsights::from_tracks(std::iter::empty()).is_none());
    }

    #[test]
    fn summarizes_tracks() {
        let tracks = vec![
            track(0, VehicleKind::Car, 0.0),
            track(1, VehicleKind::Car, 0.8),
            track(2, VehicleKind::Bus, 3.0),
            track(3, VehicleKind::Truck, 4.2),
        ];
        let i = TrafficInsights::from_tracks(&tracks).unwrap();

        assert_eq!(i.total_tracks, 4);
        assert_eq!(i.active_tracks, 3);
        assert_relative_eq!(i.flow_efficiency, 50.0);
        assert_relative_eq!(i.average_speed, 2.0, epsilon = 1e-5);
        assert_eq!(i.vehicle_distribution[&VehicleKind::Car], 2);
        assert_eq!(i.vehicle_distribution[&VehicleKind::Bus], 1);
        assert!(!i.vehicle_distribution.contains_key(&VehicleKind::Bicycle));
        assert!(i.speed_variance > 0.0);
    }
}
