use proptest::prelude::*;
use qtraffic::bbox::BBox;
use qtraffic::config::AssociationConfig;
use qtraffic::queue::queue_metrics;
use qtraffic::{AssignmentMode, Detection, TrackAssociation};
use std::collections::BTreeSet;

fn det_at(cx: f32, cy: f32) -> Detection {
    Detection::new(BBox::ltrb(cx - 30.0, cy - 20.0, cx + 30.0, cy + 20.0))
}

fn mode() -> impl Strategy<Value = AssignmentMode> {
    prop_oneof![
        Just(AssignmentMode::Greedy),
        Just(AssignmentMode::GreedyExclusive),
        Just(AssignmentMode::Optimal),
    ]
}

/// Frame gaps paired with the detection centroids of that frame.
fn frames() -> impl Strategy<Value = Vec<(u64, Vec<(f32, f32)>)>> {
    prop::collection::vec(
        (
            1u64..40,
            prop::collection::vec((0f32..640.0, 0f32..480.0), 0..6),
        ),
        1..40,
    )
}

proptest! {
    #[test]
    fn association_invariants(mode in mode(), frames in frames(), line_y in 0f32..480.0) {
        let mut engine = TrackAssociation::new(AssociationConfig {
            mode,
            ..Default::default()
        })
        .unwrap();

        let mut frame_id = 0u64;
        let mut seen: BTreeSet<u64> = BTreeSet::new();
        let mut evicted: BTreeSet<u64> = BTreeSet::new();

        for (gap, centroids) in frames {
            frame_id += gap;

            let detections: Vec<_> = centroids.iter().map(|&(x, y)| det_at(x, y)).collect();
            let previous_next_id = engine.next_id();
            engine.associate(frame_id, &detections).unwrap();

            let live: BTreeSet<u64> = engine.tracks().map(|t| t.track_id).collect();

            for track in engine.tracks() {
                // eviction
                prop_assert!(frame_id - track.last_seen < 30);
                // non-negative speed
                prop_assert!(track.speed >= 0.0);
                prop_assert!(track.history_len() >= 1);
                // ids of new tracks continue the counter
                if !seen.contains(&track.track_id) {
                    prop_assert!(track.track_id >= previous_next_id);
                }
                // evicted ids never come back
                prop_assert!(!evicted.contains(&track.track_id));
            }

            evicted.extend(seen.difference(&live).copied());
            seen.extend(live.iter().copied());

            prop_assert!(engine.tracks().all(|t| t.track_id < engine.next_id()));
            prop_assert!(engine.next_id() - previous_next_id <= detections.len() as u64);

            let q = queue_metrics(engine.tracks(), line_y);
            prop_assert!((0.0..=1.0).contains(&q.density));
            prop_assert!(q.count <= engine.len());
            prop_assert!(q.avg_speed >= 0.0);
        }
    }

    #[test]
    fn matched_detection_never_spawns(mode in mode(), x in 100f32..500.0, y in 100f32..400.0, dx in -50f32..50.0, dy in -50f32..50.0) {
        let mut engine = TrackAssociation::new(AssociationConfig {
            mode,
            ..Default::default()
        })
        .unwrap();

        engine.associate(0, &[det_at(x, y)]).unwrap();
        engine.associate(1, &[det_at(x + dx, y + dy)]).unwrap();

        // |(dx, dy)| < 80 always holds here
        prop_assert_eq!(engine.len(), 1);
        prop_assert_eq!(engine.next_id(), 1);

        let track = engine.track(0).unwrap();
        prop_assert!((track.speed - (dx * dx + dy * dy).sqrt()).abs() < 1e-3);
    }
}
