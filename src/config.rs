use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::tracker::AssignmentMode;

/// Region extraction and the stand-in classifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Gaussian sigma, 1.1 matches a 5x5 kernel
    pub blur_sigma: f32,
    pub intensity_threshold: u8,
    /// Radius of the square closing element, 1 is a 3x3 rect
    pub closing_radius: u8,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Strict lower bound on contour area, px^2
    pub min_area: f32,
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
    /// Selection weights for car, truck, bus, motorcycle, bicycle
    pub category_weights: [f64; 5],
    pub min_confidence: f32,
    pub max_confidence: f32,
    /// Frames kept in the detection summary log
    pub history_capacity: usize,
    pub seed: Option<u64>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            intensity_threshold: 100,
            closing_radius: 1,
            min_width: 40,
            max_width: 300,
            min_height: 25,
            max_height: 150,
            min_area: 1000.0,
            min_aspect_ratio: 0.5,
            max_aspect_ratio: 3.0,
            category_weights: [0.60, 0.15, 0.10, 0.10, 0.05],
            min_confidence: 0.75,
            max_confidence: 0.98,
            history_capacity: 1000,
            seed: None,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.blur_sigma > 0.0) || !self.blur_sigma.is_finite() {
            return Err(Error::invalid_config("blur_sigma must be positive"));
        }

        if self.min_width > self.max_width || self.min_height > self.max_height {
            return Err(Error::invalid_config(format!(
                "region size bounds are inverted: width {}..={}, height {}..={}",
                self.min_width, self.max_width, self.min_height, self.max_height
            )));
        }

        if self.min_aspect_ratio > self.max_aspect_ratio {
            return Err(Error::invalid_config(format!(
                "aspect ratio bounds are inverted: {}..={}",
                self.min_aspect_ratio, self.max_aspect_ratio
            )));
        }

        if self.category_weights.iter().any(|w| *w < 0.0 || !w.is_finite())
            || self.category_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(Error::invalid_config(
                "category_weights must be non-negative with a positive sum",
            ));
        }

        if !(0.0..=1.0).contains(&self.min_confidence)
            || !(0.0..=1.0).contains(&self.max_confidence)
            || self.min_confidence > self.max_confidence
        {
            return Err(Error::invalid_config(format!(
                "confidence range {}..={} is not inside [0, 1]",
                self.min_confidence, self.max_confidence
            )));
        }

        if self.history_capacity == 0 {
            return Err(Error::invalid_config("extractor history_capacity must be > 0"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AssociationConfig {
    /// Matches must be strictly closer than this, px
    pub search_radius: f32,
    /// Frames a track survives without a match
    pub track_timeout: u64,
    /// Centroids retained per track, at least 2
    pub history_capacity: usize,
    pub mode: AssignmentMode,
    /// Confidence given to tracks born from unlabeled detections
    pub default_confidence: f32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            search_radius: 80.0,
            track_timeout: 30,
            history_capacity: 32,
            mode: AssignmentMode::Greedy,
            default_confidence: 0.8,
        }
    }
}

impl AssociationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.search_radius > 0.0) || !self.search_radius.is_finite() {
            return Err(Error::invalid_config("search_radius must be positive"));
        }

        if self.track_timeout == 0 {
            return Err(Error::invalid_config("track_timeout must be > 0"));
        }

        if self.history_capacity < 2 {
            return Err(Error::invalid_config(
                "track history_capacity must keep at least 2 points",
            ));
        }

        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(Error::invalid_config("default_confidence must be in [0, 1]"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViolationConfig {
    /// px/frame, strictly greater is speeding
    pub speed_limit: f32,
    pub speeding_confidence: f32,
    pub speeding_jitter: f32,
    pub soft_violation_probability: f64,
    pub soft_confidence: f32,
    pub soft_jitter: f32,
    pub seed: Option<u64>,
}

impl Default for ViolationConfig {
    fn default() -> Self {
        Self {
            speed_limit: 15.0,
            speeding_confidence: 0.85,
            speeding_jitter: 0.1,
            soft_violation_probability: 0.05,
            soft_confidence: 0.75,
            soft_jitter: 0.2,
            seed: None,
        }
    }
}

impl ViolationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.soft_violation_probability) {
            return Err(Error::invalid_config(format!(
                "soft_violation_probability {} is not a probability",
                self.soft_violation_probability
            )));
        }

        if !(self.speeding_jitter >= 0.0 && self.speeding_jitter.is_finite())
            || !(self.soft_jitter >= 0.0 && self.soft_jitter.is_finite())
        {
            return Err(Error::invalid_config("confidence jitter must be finite and >= 0"));
        }

        if !self.speed_limit.is_finite() {
            return Err(Error::invalid_config("speed_limit must be finite"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FlowConfig {
    pub history_capacity: usize,
    /// Snapshots used for the congestion trend
    pub trend_window: usize,
    /// Live track count is divided by this to get density
    pub density_scale: f32,
    pub density_slope_threshold: f32,
    pub speed_slope_threshold: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            trend_window: 10,
            density_scale: 1000.0,
            density_slope_threshold: 0.01,
            speed_slope_threshold: 0.5,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trend_window < 2 {
            return Err(Error::invalid_config("trend_window must be at least 2"));
        }

        if self.history_capacity < self.trend_window {
            return Err(Error::invalid_config(format!(
                "flow history_capacity {} cannot hold a trend window of {}",
                self.history_capacity, self.trend_window
            )));
        }

        if !(self.density_scale > 0.0) || !self.density_scale.is_finite() {
            return Err(Error::invalid_config("density_scale must be positive"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Image row past which a track counts as queued
    pub line_y: f32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { line_y: 400.0 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub association: AssociationConfig,
    pub violations: ViolationConfig,
    pub flow: FlowConfig,
    pub queue: QueueConfig,
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(s)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_json_str(&contents)
    }

    /// Seeds both random sources from one value.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.extractor.seed = Some(seed);
        self.violations.seed = Some(seed.wrapping_add(1));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.extractor.validate()?;
        self.association.validate()?;
        self.violations.validate()?;
        self.flow.validate()
    }
}
