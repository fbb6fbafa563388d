pub mod bbox;
pub mod classifier;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod flow;
pub mod frame;
pub mod insights;
pub mod math;
pub mod queue;
pub mod track;
pub mod tracker;
pub mod violation;

mod circular_queue;
mod predictor;

pub use circular_queue::CircularQueue;
pub use classifier::{Classifier, StochasticClassifier};
pub use config::PipelineConfig;
pub use detection::{Classification, Detection, VehicleKind};
pub use detector::RegionExtractor;
pub use error::{Error, Result};
pub use flow::{CongestionPrediction, CongestionTrend, FlowAnalyzer, FlowSnapshot};
pub use frame::FrameReport;
pub use queue::QueueMetrics;
pub use track::Track;
pub use tracker::{AssignmentMode, TrackAssociation};
pub use violation::{Violation, ViolationFlagger, ViolationKind};

use config::QueueConfig;
use detector::DetectionStats;
use image::RgbImage;
use insights::TrafficInsights;
use std::borrow::Borrow;

/// Frame to frame association of detections into persistent tracks.
pub trait Tracking {
    /// Folds one frame of detections in and returns the live tracks.
    fn update(&mut self, frame_id: u64, detections: &[Detection]) -> Result<Vec<Track>>;
    fn tracks(&self) -> Vec<Track>;
}

/// Runs region extraction, track association, violation flagging, flow
/// analysis and queue metrics over a sequence of frames.
///
/// Frames get consecutive ids starting at zero.
pub struct TrafficPipeline {
    extractor: RegionExtractor,
    association: TrackAssociation,
    flagger: ViolationFlagger,
    flow: FlowAnalyzer,
    queue: QueueConfig,
    next_frame: u64,
}

impl TrafficPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let extractor = RegionExtractor::new(config.extractor.clone())?;

        Self::with_extractor(config, extractor)
    }

    /// Swaps the stochastic labeler for another classifier.
    pub fn with_classifier<C>(config: PipelineConfig, classifier: C) -> Result<Self>
    where
        C: Classifier + Send + 'static,
    {
        config.validate()?;
        let extractor = RegionExtractor::with_classifier(config.extractor.clone(), classifier)?;

        Self::with_extractor(config, extractor)
    }

    fn with_extractor(config: PipelineConfig, extractor: RegionExtractor) -> Result<Self> {
        tracing::info!(
            "traffic pipeline: {:?} assignment, radius {}px, timeout {} frames, queue line y={}",
            config.association.mode,
            config.association.search_radius,
            config.association.track_timeout,
            config.queue.line_y
        );

        Ok(Self {
            extractor,
            association: TrackAssociation::new(config.association)?,
            flagger: ViolationFlagger::new(config.violations)?,
            flow: FlowAnalyzer::new(config.flow)?,
            queue: config.queue,
            next_frame: 0,
        })
    }

    /// Extracts regions from the next frame and runs every stage on them.
    pub fn process(&mut self, frame: &RgbImage) -> Result<FrameReport> {
        let detections = self.extractor.detect(frame)?;

        self.process_detections(detections)
    }

    /// Runs the stages after extraction on detections from any source.
    pub fn process_detections(&mut self, detections: Vec<Detection>) -> Result<FrameReport> {
        let frame_id = self.next_frame;

        self.association.associate(frame_id, &detections)?;
        self.next_frame += 1;

        let violations = self.flagger.check(self.association.tracks(), frame_id);
        self.flow.update(frame_id, self.association.tracks());
        let queue = queue::queue_metrics(self.association.tracks(), self.queue.line_y);

        let tracks = self
            .association
            .tracks()
            .map(|t| {
                let mut t = t.clone();
                t.violations = violations
                    .iter()
                    .filter(|v| v.track_id == t.track_id)
                    .cloned()
                    .collect();
                t
            })
            .collect();

        tracing::debug!(
            "frame {}: {} detections, {} tracks, queue {}, {} violations",
            frame_id,
            detections.len(),
            self.association.len(),
            queue.count,
            violations.len()
        );

        Ok(FrameReport {
            frame_id,
            detections,
            tracks,
            queue,
            violations,
            matched_speeds: self.association.matched_speeds().clone(),
        })
    }

    /// Processes every frame in order, stopping at the first error.
    pub fn run<I>(&mut self, frames: I) -> Result<Vec<FrameReport>>
    where
        I: IntoIterator,
        I::Item: Borrow<RgbImage>,
    {
        frames
            .into_iter()
            .map(|frame| self.process(frame.borrow()))
            .collect()
    }

    #[inline]
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.association.tracks()
    }

    #[inline]
    pub fn queue_metrics(&self) -> QueueMetrics {
        queue::queue_metrics(self.association.tracks(), self.queue.line_y)
    }

    #[inline]
    pub fn flow_history(&self) -> impl Iterator<Item = &FlowSnapshot> {
        self.flow.history()
    }

    #[inline]
    pub fn congestion_prediction(&self) -> CongestionPrediction {
        self.flow.predict_congestion()
    }

    #[inline]
    pub fn detection_stats(&self) -> DetectionStats {
        self.extractor.detection_stats()
    }

    #[inline]
    pub fn traffic_insights(&self) -> Option<TrafficInsights> {
        TrafficInsights::from_tracks(self.association.tracks())
    }

    /// Tracks created so far, evicted ones included.
    #[inline]
    pub fn total_tracks(&self) -> u64 {
        self.association.next_id()
    }

    #[inline]
    pub fn frames_processed(&self) -> u64 {
        self.next_frame
    }
}
