//! SeetaFace frontal detector via `rustface`.
//!
//! The cascade returns an unbounded score per window; [`RustfaceModel`]
//! maps it onto `[0, 1]` with a logistic centred on [`SCORE_MIDPOINT`]. A
//! fresh detector is built per page from a clone of the loaded model.

use crate::error::RedactError;
use crate::geometry::{BoundingBox, FaceDetection};
use crate::pipeline::detect::{FaceModel, ModelError};
use image::GrayImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Raw SeetaFace score that maps to confidence 0.5.
///
/// 2.0 is the customary acceptance threshold for the frontal model.
pub const SCORE_MIDPOINT: f64 = 2.0;

/// Scores below this never leave the cascade.
///
/// Low enough that `min_confidence`, not the cascade, makes the final call
/// (confidence 0.40 ≈ score 1.6).
pub const SCORE_FLOOR: f64 = 1.0;

/// Face model backed by the `rustface` crate (SeetaFace engine).
pub struct RustfaceModel {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceModel {
    /// Read a SeetaFace model file, e.g. `seeta_fd_frontal_v1.0.bin`.
    pub fn from_file(path: &Path, min_face_size: u32) -> Result<Self, RedactError> {
        let load_failed = |detail: String| RedactError::ModelLoadFailed {
            path: path.to_path_buf(),
            detail,
        };
        let file = File::open(path).map_err(|e| load_failed(e.to_string()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| load_failed(format!("{:?}", e)))?;
        debug!("Loaded SeetaFace model from {}", path.display());
        Ok(Self {
            model,
            min_face_size: min_face_size.max(20),
        })
    }
}

impl FaceModel for RustfaceModel {
    fn infer(&self, image: &GrayImage) -> Result<Vec<FaceDetection>, ModelError> {
        let (width, height) = image.dimensions();
        if width < self.min_face_size || height < self.min_face_size {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(SCORE_FLOOR);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(image.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceDetection::new(
                    BoundingBox::new(
                        bbox.x() as f32,
                        bbox.y() as f32,
                        bbox.width() as f32,
                        bbox.height() as f32,
                    ),
                    score_to_confidence(face.score()),
                )
            })
            .collect())
    }
}

/// Logistic squash of a SeetaFace score into `[0, 1]`.
pub fn score_to_confidence(score: f64) -> f32 {
    (1.0 / (1.0 + (-(score - SCORE_MIDPOINT)).exp())) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_maps_to_half() {
        assert!((score_to_confidence(SCORE_MIDPOINT) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn confidence_is_monotonic_and_bounded() {
        let mut last = 0.0;
        for s in [-5.0, 0.0, 1.0, 1.6, 2.0, 4.0, 20.0] {
            let c = score_to_confidence(s);
            assert!((0.0..=1.0).contains(&c));
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn floor_sits_below_default_threshold() {
        assert!(score_to_confidence(SCORE_FLOOR) < 0.40);
    }

    #[test]
    fn missing_model_file() {
        let err = RustfaceModel::from_file(Path::new("/no/such/model.bin"), 20)
            .err()
            .unwrap();
        assert!(matches!(err, RedactError::ModelLoadFailed { .. }));
    }
}
