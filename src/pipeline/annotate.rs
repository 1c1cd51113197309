//! Annotation building: fold a page's faces into one redaction marker.
//!
//! ## One marker per page
//!
//! Every face on a page becomes one quad inside a single multi-region
//! redaction marker. A page with no faces gets no marker at all.
//!
//! The vendor object model stays behind [`AnnotationStore`]: the builder
//! only asks the store to turn a [`Quad`] into its own quad type, wrap
//! those into a marker, and commit it.

use crate::error::RedactError;
use crate::geometry::{Quad, ResizedDetection, StrokeColor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Attributes shared by every quad of one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerHeader {
    /// 1-indexed target page.
    pub page_num: usize,
    pub author: String,
    pub stroke_color: StrokeColor,
}

/// A backend-neutral redaction marker, as held by
/// [`crate::backend::memory::MemoryAnnotationStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionMarker {
    pub header: MarkerHeader,
    pub quads: Vec<Quad>,
}

/// What was committed for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSummary {
    pub page_num: usize,
    pub author: String,
    pub quads: usize,
    pub max_confidence: f32,
}

/// Capability interface over an annotation store.
///
/// `commit` adds the marker and requests an immediate redraw so it is
/// visible without waiting for the next full repaint. After `commit` the
/// store owns the marker.
pub trait AnnotationStore {
    /// The store's native quad representation.
    type Quad;
    /// The store's native marker representation.
    type Marker;

    /// User that markers are attributed to.
    fn current_user(&self) -> String;

    /// Convert a document-space quad for `page_num` into the store's form.
    fn build_quad(&mut self, page_num: usize, quad: &Quad) -> Result<Self::Quad, RedactError>;

    /// Wrap the quads of one page into a marker.
    fn build_marker(
        &mut self,
        header: &MarkerHeader,
        quads: Vec<Self::Quad>,
    ) -> Result<Self::Marker, RedactError>;

    /// Add the marker to the store and redraw it.
    fn commit(&mut self, marker: Self::Marker) -> Result<(), RedactError>;
}

/// The annotation stage of the pipeline.
#[derive(Debug, Clone)]
pub struct AnnotationBuilder {
    stroke_color: StrokeColor,
}

impl AnnotationBuilder {
    pub fn new(stroke_color: StrokeColor) -> Self {
        Self { stroke_color }
    }

    /// Build one marker from every detection on `page_num` and commit it.
    ///
    /// Returns `Ok(None)` without touching the store when `detections` is
    /// empty. Overlapping boxes are kept as separate quads.
    pub fn build_and_commit<S, I>(
        &self,
        store: &mut S,
        page_num: usize,
        detections: I,
    ) -> Result<Option<MarkerSummary>, RedactError>
    where
        S: AnnotationStore + ?Sized,
        I: IntoIterator<Item = ResizedDetection>,
    {
        let mut detections = detections.into_iter().peekable();
        if detections.peek().is_none() {
            debug!("Page {}: no faces, no marker", page_num);
            return Ok(None);
        }

        let mut quads = Vec::with_capacity(detections.size_hint().0);
        let mut max_confidence = f32::MIN;
        for detection in detections {
            max_confidence = max_confidence.max(detection.confidence);
            quads.push(store.build_quad(page_num, &Quad::from_box(&detection.bbox))?);
        }
        let quad_count = quads.len();

        let header = MarkerHeader {
            page_num,
            author: store.current_user(),
            stroke_color: self.stroke_color,
        };
        let marker = store.build_marker(&header, quads)?;
        store.commit(marker)?;
        debug!(
            "Page {}: committed marker with {} quads for '{}'",
            page_num, quad_count, header.author
        );

        Ok(Some(MarkerSummary {
            page_num,
            author: header.author,
            quads: quad_count,
            max_confidence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryAnnotationStore;
    use crate::geometry::{BoundingBox, Point};

    fn detection(x: f32, y: f32) -> ResizedDetection {
        ResizedDetection {
            bbox: BoundingBox::new(x, y, 10.0, 20.0),
            confidence: 0.8,
        }
    }

    #[test]
    fn empty_page_is_a_no_op() {
        let mut store = MemoryAnnotationStore::new("alice");
        let builder = AnnotationBuilder::new(StrokeColor::RED);
        let out = builder
            .build_and_commit(&mut store, 1, Vec::<ResizedDetection>::new())
            .unwrap();
        assert!(out.is_none());
        assert!(store.markers().is_empty());
        assert_eq!(store.redraw_count(), 0);
    }

    #[test]
    fn one_marker_per_page() {
        let mut store = MemoryAnnotationStore::new("alice");
        let builder = AnnotationBuilder::new(StrokeColor::new(0, 0, 255));
        let summary = builder
            .build_and_commit(
                &mut store,
                3,
                vec![detection(0.0, 0.0), detection(50.0, 0.0), detection(5.0, 5.0)],
            )
            .unwrap()
            .unwrap();

        assert_eq!(summary.quads, 3);
        assert_eq!(summary.author, "alice");
        assert_eq!(store.markers().len(), 1);
        assert_eq!(store.redraw_count(), 1);

        let marker = &store.markers()[0];
        assert_eq!(marker.header.page_num, 3);
        assert_eq!(marker.header.stroke_color, StrokeColor::new(0, 0, 255));
        assert_eq!(marker.quads.len(), 3);
    }

    #[test]
    fn overlapping_boxes_are_not_merged() {
        let mut store = MemoryAnnotationStore::new("bob");
        let builder = AnnotationBuilder::new(StrokeColor::RED);
        builder
            .build_and_commit(&mut store, 1, vec![detection(1.0, 1.0), detection(1.0, 1.0)])
            .unwrap();
        assert_eq!(store.markers()[0].quads.len(), 2);
    }

    #[test]
    fn quads_follow_fixed_winding() {
        let mut store = MemoryAnnotationStore::new("bob");
        AnnotationBuilder::new(StrokeColor::RED)
            .build_and_commit(&mut store, 1, vec![detection(20.0, 40.0)])
            .unwrap();
        let q = store.markers()[0].quads[0];
        assert_eq!(
            q.points,
            [
                Point::new(20.0, 60.0),
                Point::new(30.0, 60.0),
                Point::new(30.0, 40.0),
                Point::new(20.0, 40.0),
            ]
        );
    }
}
