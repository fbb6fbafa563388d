use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::circular_queue::CircularQueue;
use crate::config::FlowConfig;
use crate::error::Result;
use crate::math;
use crate::track::Track;

/// Aggregate traffic state of one frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct FlowSnapshot {
    pub frame_id: u64,
    pub vehicle_count: usize,
    pub avg_speed: f32,
    pub speed_std: f32,
    /// Live tracks over the density scale, not a spatial density
    pub density: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CongestionTrend {
    InsufficientData,
    IncreasingCongestion,
    DecreasingCongestion,
    StableFlow,
}

impl fmt::Display for CongestionTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CongestionTrend::InsufficientData => "insufficient_data",
            CongestionTrend::IncreasingCongestion => "increasing_congestion",
            CongestionTrend::DecreasingCongestion => "decreasing_congestion",
            CongestionTrend::StableFlow => "stable_flow",
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CongestionPrediction {
    pub trend: CongestionTrend,
    pub confidence: f32,
    pub density_slope: Option<f32>,
    pub speed_slope: Option<f32>,
}

impl CongestionPrediction {
    fn insufficient() -> Self {
        Self {
            trend: CongestionTrend::InsufficientData,
            confidence: 0.0,
            density_slope: None,
            speed_slope: None,
        }
    }
}

/// Rolling window of flow snapshots with a trend based congestion forecast.
#[derive(Debug, Clone)]
pub struct FlowAnalyzer {
    config: FlowConfig,
    history: CircularQueue<FlowSnapshot>,
}

impl FlowAnalyzer {
    pub fn new(config: FlowConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            history: CircularQueue::with_capacity(config.history_capacity),
            config,
        })
    }

    /// Records the snapshot of the given live track set.
    pub fn update<'a, I>(&mut self, frame_id: u64, tracks: I)
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut vehicle_count = 0;
        let mut positioned = 0;
        let mut speeds = Vec::new();

        for track in tracks {
            vehicle_count += 1;
            speeds.push(track.speed);

            if track.history_len() > 0 {
                positioned += 1;
            }
        }

        let snapshot = FlowSnapshot {
            frame_id,
            vehicle_count,
            avg_speed: math::mean(&speeds),
            speed_std: math::std_dev(&speeds),
            density: positioned as f32 / self.config.density_scale,
        };

        tracing::trace!("flow {:?}", snapshot);

        self.record(snapshot);
    }

    /// Appends a snapshot, dropping the oldest one when full.
    #[inline]
    pub fn record(&mut self, snapshot: FlowSnapshot) {
        self.history.push(snapshot);
    }

    #[inline]
    pub fn history(&self) -> impl Iterator<Item = &FlowSnapshot> {
        self.history.iter()
    }

    #[inline]
    pub fn latest(&self) -> Option<&FlowSnapshot> {
        self.history.latest()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Classifies the density and speed trends of the latest `trend_window` snapshots.
    pub fn predict_congestion(&self) -> CongestionPrediction {
        let window = self.config.trend_window;
        if self.history.len() < window {
            return CongestionPrediction::insufficient();
        }

        let density: Vec<f32> = self.history.recent(window).map(|s| s.density).collect();
        let speed: Vec<f32> = self.history.recent(window).map(|s| s.avg_speed).collect();

        let (density_slope, speed_slope) =
            match (math::trend_slope(&density), math::trend_slope(&speed)) {
                (Some(d), Some(s)) => (d, s),
                _ => return CongestionPrediction::insufficient(),
            };

        let d_thr = self.config.density_slope_threshold;
        let s_thr = self.config.speed_slope_threshold;

        let (trend, confidence) = if density_slope > d_thr && speed_slope < -s_thr {
            (CongestionTrend::IncreasingCongestion, 0.8)
        } else if density_slope < -d_thr && speed_slope > s_thr {
            (CongestionTrend::DecreasingCongestion, 0.75)
        } else {
            (CongestionTrend::StableFlow, 0.6)
        };

        tracing::debug!(
            "congestion {} (density slope {:.4}, speed slope {:.3})",
            trend,
            density_slope,
            speed_slope
        );

        CongestionPrediction {
            trend,
            confidence,
            density_slope: Some(density_slope),
            speed_slope: Some(speed_slope),
        }
    }
}
