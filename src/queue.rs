use serde_derive::{Deserialize, Serialize};

use crate::math;
use crate::track::Track;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct QueueMetrics {
    /// Tracks whose latest centroid lies below the queue line
    pub count: usize,
    /// `count` over the live track count, in `[0, 1]`
    pub density: f32,
    pub avg_speed: f32,
}

/// Queue figures for the tracks past the horizontal line at `line_y`.
pub fn queue_metrics<'a, I>(tracks: I, line_y: f32) -> QueueMetrics
where
    I: IntoIterator<Item = &'a Track>,
{
    let mut total = 0usize;
    let mut speeds = Vec::new();

    for track in tracks {
        total += 1;

        if track.history_len() > 0 && track.position().y > line_y {
            speeds.push(track.speed);
        }
    }

    QueueMetrics {
        count: speeds.len(),
        density: speeds.len() as f32 / total.max(1) as f32,
        avg_speed: math::mean(&speeds),
    }
}
