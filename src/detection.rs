use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::{BBox, Ltrb};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Car,
    Truck,
    Bus,
    Motorcycle,
    Bicycle,
    Unknown,
}

impl VehicleKind {
    /// Labels a classifier may assign, `Unknown` is reserved for tracks without one.
    pub const CATEGORIES: [VehicleKind; 5] = [
        VehicleKind::Car,
        VehicleKind::Truck,
        VehicleKind::Bus,
        VehicleKind::Motorcycle,
        VehicleKind::Bicycle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleKind::Car => "car",
            VehicleKind::Truck => "truck",
            VehicleKind::Bus => "bus",
            VehicleKind::Motorcycle => "motorcycle",
            VehicleKind::Bicycle => "bicycle",
            VehicleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: VehicleKind,
    pub confidence: f32,
}

impl Classification {
    pub fn new(kind: VehicleKind, confidence: f32) -> Self {
        Self { kind, confidence }
    }
}

/// One candidate region of a single frame.
///
/// `class` stays `None` for detections coming from a source that does not label
/// regions; the tracker falls back to `unknown` with confidence `0.8` then.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    // in px^2
    pub area: f32,
    pub aspect_ratio: f32,
    pub class: Option<Classification>,
}

impl Detection {
    pub fn new(bbox: BBox<Ltrb>) -> Self {
        let ltwh = bbox.as_ltwh();

        Self {
            bbox,
            area: ltwh.width() * ltwh.height(),
            aspect_ratio: ltwh.aspect_ratio(),
            class: None,
        }
    }

    #[inline]
    pub fn with_area(mut self, area: f32) -> Self {
        self.area = area;
        self
    }

    #[inline]
    pub fn with_class(mut self, class: Classification) -> Self {
        self.class = Some(class);
        self
    }

    #[inline]
    pub fn centroid(&self) -> na::Point2<f32> {
        self.bbox.centroid()
    }

    #[inline]
    pub fn kind(&self) -> Option<VehicleKind> {
        self.class.map(|c| c.kind)
    }

    #[inline]
    pub fn confidence(&self) -> Option<f32> {
        self.class.map(|c| c.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derives_geometry_from_bbox() {
        let det = Detection::new(BBox::ltrb(100.0, 100.0, 160.0, 130.0));

        assert_relative_eq!(det.area, 1800.0);
        assert_relative_eq!(det.aspect_ratio, 2.0);
        assert_eq!(det.kind(), None);
        assert_eq!(det.confidence(), None);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&VehicleKind::Motorcycle).unwrap();
        assert_eq!(json, "\"motorcycle\"");
        assert_eq!(VehicleKind::Unknown.to_string(), "unknown");
    }
}
