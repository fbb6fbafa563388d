use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;
use imageproc::point::Point;
use serde_derive::Serialize;
use std::collections::BTreeMap;

use crate::bbox::{BBox, Ltwh};
use crate::circular_queue::CircularQueue;
use crate::classifier::{Classifier, StochasticClassifier};
use crate::config::ExtractorConfig;
use crate::detection::{Detection, VehicleKind};
use crate::error::{Error, Result};
use crate::math;

/// Geometric gate for candidate regions. All bounds are inclusive except the area,
/// which must be strictly above `min_area`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFilter {
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub min_area: f32,
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
}

impl RegionFilter {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            min_width: config.min_width as f32,
            max_width: config.max_width as f32,
            min_height: config.min_height as f32,
            max_height: config.max_height as f32,
            min_area: config.min_area,
            min_aspect_ratio: config.min_aspect_ratio,
            max_aspect_ratio: config.max_aspect_ratio,
        }
    }

    pub fn accepts(&self, rect: &BBox<Ltwh>, area: f32) -> bool {
        let (w, h) = (rect.width(), rect.height());
        let ar = rect.aspect_ratio();

        (self.min_width..=self.max_width).contains(&w)
            && (self.min_height..=self.max_height).contains(&h)
            && area > self.min_area
            && (self.min_aspect_ratio..=self.max_aspect_ratio).contains(&ar)
    }
}

/// What one frame produced, kept for aggregate reporting only.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DetectionSummary {
    pub vehicle_count: usize,
    pub mean_confidence: f32,
    pub kinds: Vec<VehicleKind>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DetectionStats {
    pub total_detections: usize,
    /// Mean of the per-frame mean confidences, frames without detections excluded
    pub avg_confidence: f32,
    pub frames_processed: usize,
    pub vehicle_distribution: BTreeMap<VehicleKind, usize>,
}

/// Turns raw frames into labeled candidate regions.
///
/// Frames go through grayscale, gaussian blur, a fixed binary threshold and one
/// morphological closing. Outermost contours are boxed, gated by [`RegionFilter`]
/// and labeled by the configured [`Classifier`].
pub struct RegionExtractor {
    config: ExtractorConfig,
    filter: RegionFilter,
    classifier: Box<dyn Classifier + Send>,
    history: CircularQueue<DetectionSummary>,
}

impl RegionExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let classifier = StochasticClassifier::new(&config)?;

        Self::with_classifier(config, classifier)
    }

    pub fn with_classifier<C>(config: ExtractorConfig, classifier: C) -> Result<Self>
    where
        C: Classifier + Send + 'static,
    {
        config.validate()?;

        Ok(Self {
            filter: RegionFilter::new(&config),
            history: CircularQueue::with_capacity(config.history_capacity),
            classifier: Box::new(classifier),
            config,
        })
    }

    #[inline]
    pub fn filter(&self) -> &RegionFilter {
        &self.filter
    }

    /// Extracts and labels the regions of one frame, recording a summary.
    pub fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let regions = self.regions(frame)?;
        let detections = self.label(regions);

        Ok(detections)
    }

    /// Unlabeled candidate regions of a frame, no side effects.
    pub fn regions(&self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        if width < self.config.min_width || height < self.config.min_height {
            return Err(Error::FrameTooSmall {
                width,
                height,
                min_width: self.config.min_width,
                min_height: self.config.min_height,
            });
        }

        let mask = self.binarize(frame);

        let regions = find_contours::<i32>(&mask)
            .into_iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .filter_map(|c| {
                let rect = bounding_rect(&c.points)?;
                let area = contour_area(&c.points);

                if self.filter.accepts(&rect, area) {
                    Some(Detection::new(rect.as_ltrb()).with_area(area))
                } else {
                    None
                }
            })
            .collect();

        Ok(regions)
    }

    /// Labels regions with the classifier and records the frame summary.
    pub fn label(&mut self, regions: Vec<Detection>) -> Vec<Detection> {
        let detections: Vec<Detection> = regions
            .into_iter()
            .map(|det| match self.classifier.classify(&det) {
                Some(class) => det.with_class(class),
                None => det,
            })
            .collect();

        let confidences: Vec<f32> = detections.iter().filter_map(|d| d.confidence()).collect();
        let summary = DetectionSummary {
            vehicle_count: detections.len(),
            mean_confidence: math::mean(&confidences),
            kinds: detections.iter().filter_map(|d| d.kind()).collect(),
        };

        tracing::debug!(
            "detected {} vehicles, mean confidence {:.2}",
            summary.vehicle_count,
            summary.mean_confidence
        );

        self.history.push(summary);

        detections
    }

    #[inline]
    pub fn history(&self) -> impl Iterator<Item = &DetectionSummary> {
        self.history.iter()
    }

    /// Aggregates over the retained summary log.
    pub fn detection_stats(&self) -> DetectionStats {
        let mut vehicle_distribution: BTreeMap<VehicleKind, usize> = VehicleKind::CATEGORIES
            .iter()
            .map(|k| (*k, 0))
            .collect();

        let mut total_detections = 0;
        let mut confidences = Vec::new();

        for summary in self.history.iter() {
            total_detections += summary.vehicle_count;

            if summary.mean_confidence > 0.0 {
                confidences.push(summary.mean_confidence);
            }

            for kind in &summary.kinds {
                *vehicle_distribution.entry(*kind).or_default() += 1;
            }
        }

        DetectionStats {
            total_detections,
            avg_confidence: math::mean(&confidences),
            frames_processed: self.history.len(),
            vehicle_distribution,
        }
    }

    fn binarize(&self, frame: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let binary = threshold(
            &blurred,
            self.config.intensity_threshold,
            ThresholdType::Binary,
        );

        close(&binary, Norm::LInf, self.config.closing_radius)
    }
}

/// Inclusive pixel extent of a contour, width counts both border pixels.
fn bounding_rect(points: &[Point<i32>]) -> Option<BBox<Ltwh>> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(BBox::ltwh(
        min_x as f32,
        min_y as f32,
        (max_x - min_x + 1) as f32,
        (max_y - min_y + 1) as f32,
    ))
}

/// Shoelace area of the polygon through the traced border pixels.
fn contour_area(points: &[Point<i32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    (twice.abs() as f32) / 2.0
}
