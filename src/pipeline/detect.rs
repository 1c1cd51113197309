//! Face detection: run the model on a page raster and rescale the results.
//!
//! ## Model lifecycle
//!
//! The model is held in an explicit [`ModelSlot`] that the caller creates,
//! fills once with [`ModelSlot::load`], and shares with the detector through
//! an `Arc`. There is no process-global model. Until the slot is filled every
//! detection fails with [`RedactError::ModelNotReady`], and the sweep checks
//! the slot before it starts the first page.
//!
//! ## Policy
//!
//! The raw model output is filtered by [`DetectionOptions::min_confidence`]
//! and capped at [`DetectionOptions::max_results`] (highest confidence
//! first) before anything reaches the annotation stage. The cap bounds the
//! size of a single page's marker on pathological inputs such as crowd
//! photos.

use crate::error::RedactError;
use crate::geometry::{FaceDetection, ResizedDetection};
use crate::pipeline::rasterize::PageRaster;
use image::GrayImage;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Error type returned by model backends.
pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

/// A loaded face-detection model.
///
/// Implementations return detections in raster space with confidence in
/// `[0, 1]`, in any order.
pub trait FaceModel: Send + Sync {
    fn infer(&self, image: &GrayImage) -> Result<Vec<FaceDetection>, ModelError>;
}

/// Filtering applied to raw model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionOptions {
    /// Inclusive lower bound on confidence.
    pub min_confidence: f32,
    /// Most detections returned per page.
    pub max_results: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.40,
            max_results: 300,
        }
    }
}

/// Holds the face model once it has been loaded.
#[derive(Default)]
pub struct ModelSlot {
    model: OnceLock<Arc<dyn FaceModel>>,
}

impl ModelSlot {
    /// An empty slot; detection fails until a model is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that is ready immediately.
    pub fn with_model(model: impl FaceModel + 'static) -> Self {
        let slot = Self::new();
        let _ = slot.model.set(Arc::new(model));
        slot
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    /// Install a model. A slot can only be filled once.
    pub fn install(&self, model: Arc<dyn FaceModel>) -> Result<(), RedactError> {
        self.model
            .set(model)
            .map_err(|_| RedactError::Internal("face model already loaded".into()))
    }

    /// The loaded model, or `ModelNotReady`.
    pub fn get(&self) -> Result<Arc<dyn FaceModel>, RedactError> {
        self.model.get().cloned().ok_or(RedactError::ModelNotReady)
    }

    /// Run `loader` on the blocking pool and install its model.
    ///
    /// Does nothing if the slot is already filled.
    pub async fn load<M, F>(&self, loader: F) -> Result<(), RedactError>
    where
        M: FaceModel + 'static,
        F: FnOnce() -> Result<M, RedactError> + Send + 'static,
    {
        if self.is_ready() {
            debug!("Face model already loaded, skipping");
            return Ok(());
        }
        let model = tokio::task::spawn_blocking(loader)
            .await
            .map_err(|e| RedactError::Internal(format!("Model load task panicked: {}", e)))??;
        // A concurrent load may have won the race; either model is fine.
        let _ = self.model.set(Arc::new(model));
        info!("Face model ready");
        Ok(())
    }
}

/// Finite, single-pass sequence of detections in document space.
///
/// Boxes are rescaled lazily as the iterator is consumed.
#[derive(Debug)]
pub struct Detections {
    inner: std::vec::IntoIter<FaceDetection>,
    zoom: f32,
}

impl Detections {
    pub fn new(detections: Vec<FaceDetection>, zoom: f32) -> Self {
        Self {
            inner: detections.into_iter(),
            zoom,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 1.0)
    }
}

impl Iterator for Detections {
    type Item = ResizedDetection;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|d| d.resize(self.zoom))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Detections {}

/// The detection stage of the pipeline.
pub struct FaceDetector {
    slot: Arc<ModelSlot>,
    options: DetectionOptions,
}

impl FaceDetector {
    pub fn new(slot: Arc<ModelSlot>, options: DetectionOptions) -> Self {
        Self { slot, options }
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    /// Fails with `ModelNotReady` until the slot has a model.
    pub fn ensure_ready(&self) -> Result<(), RedactError> {
        self.slot.get().map(|_| ())
    }

    /// Detect faces on `raster` and return them in document space.
    ///
    /// Consumes the raster; its pixel buffer is freed as soon as inference
    /// returns.
    pub fn detect(&self, raster: PageRaster) -> Result<Detections, RedactError> {
        let model = self.slot.get()?;
        let page = raster.page_num();
        let zoom = raster.zoom;

        let raw = model
            .infer(&raster.image)
            .map_err(|e| RedactError::DetectionFailure {
                page,
                detail: e.to_string(),
            })?;
        drop(raster);

        let raw_count = raw.len();
        let kept = select(raw, &self.options);
        debug!(
            "Page {}: {} raw detections, {} kept (min_confidence={}, max_results={})",
            page,
            raw_count,
            kept.len(),
            self.options.min_confidence,
            self.options.max_results
        );

        Ok(Detections::new(kept, zoom))
    }
}

/// Apply the confidence threshold and result cap.
fn select(raw: Vec<FaceDetection>, options: &DetectionOptions) -> Vec<FaceDetection> {
    let mut kept: Vec<FaceDetection> = raw
        .into_iter()
        .filter(|d| d.confidence >= options.min_confidence)
        .collect();
    if kept.len() > options.max_results {
        kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        kept.truncate(options.max_results);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::pipeline::rasterize::PageInfo;

    struct FixedModel(Vec<FaceDetection>);

    impl FaceModel for FixedModel {
        fn infer(&self, _image: &GrayImage) -> Result<Vec<FaceDetection>, ModelError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenModel;

    impl FaceModel for BrokenModel {
        fn infer(&self, _image: &GrayImage) -> Result<Vec<FaceDetection>, ModelError> {
            Err("tensor shape mismatch".into())
        }
    }

    fn face(x: f32, confidence: f32) -> FaceDetection {
        FaceDetection::new(BoundingBox::new(x, 0.0, 10.0, 10.0), confidence)
    }

    fn raster(zoom: f32) -> PageRaster {
        PageRaster {
            page: PageInfo {
                page_num: 4,
                width: 100.0,
                height: 100.0,
            },
            zoom,
            image: GrayImage::new(50, 50),
        }
    }

    #[test]
    fn empty_slot_is_not_ready() {
        let detector = FaceDetector::new(Arc::new(ModelSlot::new()), DetectionOptions::default());
        assert!(matches!(detector.ensure_ready(), Err(RedactError::ModelNotReady)));
        assert!(matches!(
            detector.detect(raster(0.5)),
            Err(RedactError::ModelNotReady)
        ));
    }

    #[test]
    fn install_twice_fails() {
        let slot = ModelSlot::new();
        slot.install(Arc::new(FixedModel(vec![]))).unwrap();
        assert!(slot.is_ready());
        assert!(slot.install(Arc::new(FixedModel(vec![]))).is_err());
    }

    #[test]
    fn filters_below_threshold() {
        let slot = ModelSlot::with_model(FixedModel(vec![
            face(0.0, 0.39),
            face(1.0, 0.40),
            face(2.0, 0.95),
        ]));
        let detector = FaceDetector::new(Arc::new(slot), DetectionOptions::default());
        let out: Vec<_> = detector.detect(raster(1.0)).unwrap().collect();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|d| d.confidence >= 0.40));
    }

    #[test]
    fn cap_keeps_most_confident() {
        let slot = ModelSlot::with_model(FixedModel(vec![
            face(0.0, 0.5),
            face(1.0, 0.9),
            face(2.0, 0.7),
            face(3.0, 0.8),
        ]));
        let options = DetectionOptions {
            min_confidence: 0.0,
            max_results: 2,
        };
        let detector = FaceDetector::new(Arc::new(slot), options);
        let mut confidences: Vec<f32> = detector
            .detect(raster(1.0))
            .unwrap()
            .map(|d| d.confidence)
            .collect();
        confidences.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(confidences, vec![0.9, 0.8]);
    }

    #[test]
    fn boxes_are_rescaled_to_document_space() {
        let slot = ModelSlot::with_model(FixedModel(vec![FaceDetection::new(
            BoundingBox::new(10.0, 20.0, 30.0, 40.0),
            0.8,
        )]));
        let detector = FaceDetector::new(Arc::new(slot), DetectionOptions::default());
        let out: Vec<_> = detector.detect(raster(0.5)).unwrap().collect();
        assert_eq!(out[0].bbox, BoundingBox::new(20.0, 40.0, 60.0, 80.0));
    }

    #[test]
    fn model_error_becomes_detection_failure() {
        let detector = FaceDetector::new(
            Arc::new(ModelSlot::with_model(BrokenModel)),
            DetectionOptions::default(),
        );
        match detector.detect(raster(0.5)) {
            Err(RedactError::DetectionFailure { page, detail }) => {
                assert_eq!(page, 4);
                assert!(detail.contains("tensor shape"));
            }
            other => panic!("expected DetectionFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_fills_slot_once() {
        let slot = ModelSlot::new();
        slot.load(|| Ok(FixedModel(vec![face(0.0, 1.0)]))).await.unwrap();
        assert!(slot.is_ready());
        // second load is a no-op, even if the loader would fail
        slot.load(|| -> Result<FixedModel, RedactError> { Err(RedactError::ModelNotReady) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn load_error_propagates() {
        let slot = ModelSlot::new();
        let err = slot
            .load(|| -> Result<FixedModel, RedactError> {
                Err(RedactError::ModelLoadFailed {
                    path: "missing.bin".into(),
                    detail: "no such file".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RedactError::ModelLoadFailed { .. }));
        assert!(!slot.is_ready());
    }
}
