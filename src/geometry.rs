//! Value types shared by the pipeline stages.
//!
//! Two coordinate spaces are in play, both with a top-left origin and y
//! growing downwards:
//!
//! * **raster space**: pixels of a page rendered at some zoom factor;
//!   produced by the detector as [`FaceDetection`].
//! * **document space**: PDF points of the unscaled page; the detector's
//!   output after dividing by the zoom, [`ResizedDetection`].
//!
//! PDF user space (bottom-left origin) only appears inside the PDFium
//! backend, which flips quads when it writes them.

use crate::error::RedactError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An axis-aligned rectangle, top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Multiply every coordinate and dimension by `factor`.
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// A face found by the detection model, in raster space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
}

impl FaceDetection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }

    /// Rescale into document space for a raster rendered at `zoom`.
    pub fn resize(&self, zoom: f32) -> ResizedDetection {
        ResizedDetection {
            bbox: self.bbox.scale(1.0 / zoom),
            confidence: self.confidence,
        }
    }
}

/// A [`FaceDetection`] rescaled into document space (PDF points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizedDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// A point in document space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A four-point redaction region.
///
/// Points are always stored bottom-left, bottom-right, top-right, top-left;
/// annotation backends rely on that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    /// Build the quad covering `bbox` (document space, top-left origin).
    pub fn from_box(bbox: &BoundingBox) -> Self {
        Self {
            points: [
                Point::new(bbox.x, bbox.bottom()),
                Point::new(bbox.right(), bbox.bottom()),
                Point::new(bbox.right(), bbox.y),
                Point::new(bbox.x, bbox.y),
            ],
        }
    }

    pub fn bottom_left(&self) -> Point {
        self.points[0]
    }

    pub fn bottom_right(&self) -> Point {
        self.points[1]
    }

    pub fn top_right(&self) -> Point {
        self.points[2]
    }

    pub fn top_left(&self) -> Point {
        self.points[3]
    }

    /// Smallest box containing all four points.
    pub fn bounds(&self) -> BoundingBox {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// RGB stroke colour of a redaction marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StrokeColor {
    pub const RED: StrokeColor = StrokeColor { r: 255, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        Self::RED
    }
}

impl fmt::Display for StrokeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for StrokeColor {
    type Err = RedactError;

    /// Parse `#RRGGBB` (leading `#` optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || RedactError::InvalidConfig(format!("colour must be #RRGGBB, got '{s}'"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}
