//! The page sweep: drive every selected page through rasterise → detect →
//! annotate, one page at a time.
//!
//! ## Ordering
//!
//! Pages run one at a time in ascending order. Page N+1 starts only after
//! page N reaches [`PageStage::Done`]; PDFium serialises all calls behind a
//! single lock anyway.
//!
//! ## Failure policy
//!
//! No stage retries. The first error aborts the sweep and is returned
//! unchanged. Markers committed for earlier pages stay in the store.

use crate::config::{check_zoom, PageSelection, RedactionConfig};
use crate::error::RedactError;
use crate::output::{PageReport, SweepReport, SweepStats};
use crate::pipeline::annotate::{AnnotationBuilder, AnnotationStore};
use crate::pipeline::detect::{FaceDetector, ModelSlot};
use crate::pipeline::rasterize::PageRasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a page is in its processing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageStage {
    Idle,
    Rasterizing,
    Detecting,
    Annotating,
    Done,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageStage::Idle => "idle",
            PageStage::Rasterizing => "rasterizing",
            PageStage::Detecting => "detecting",
            PageStage::Annotating => "annotating",
            PageStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Rasterise → detect → annotate, page by page.
pub struct RedactionPipeline {
    detector: FaceDetector,
    builder: AnnotationBuilder,
    zoom: f32,
    progress: Option<ProgressCallback>,
}

impl RedactionPipeline {
    /// Fails with `InvalidConfig` unless `zoom` is in `(0, 1]`.
    pub fn new(
        detector: FaceDetector,
        builder: AnnotationBuilder,
        zoom: f32,
    ) -> Result<Self, RedactError> {
        check_zoom(zoom)?;
        Ok(Self {
            detector,
            builder,
            zoom,
            progress: None,
        })
    }

    /// Assemble a pipeline from a config and a model slot.
    ///
    /// Config fields are public, so zoom is checked again here.
    pub fn from_config(slot: Arc<ModelSlot>, config: &RedactionConfig) -> Result<Self, RedactError> {
        let mut pipeline = Self::new(
            FaceDetector::new(slot, config.detection_options()),
            AnnotationBuilder::new(config.stroke_color),
            config.zoom,
        )?;
        pipeline.progress = config.progress_callback.clone();
        Ok(pipeline)
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Sweep the selected pages.
    ///
    /// Fails with `ModelNotReady` before any page is touched when the model
    /// slot is empty, and with `PageOutOfRange` when the selection matches
    /// no page.
    pub fn run<R, S>(
        &self,
        rasterizer: &R,
        store: &mut S,
        selection: &PageSelection,
    ) -> Result<SweepReport, RedactError>
    where
        R: PageRasterizer + ?Sized,
        S: AnnotationStore + ?Sized,
    {
        let sweep_start = Instant::now();
        self.detector.ensure_ready()?;

        let total_pages = rasterizer.page_count();
        let page_numbers = selection.to_page_numbers(total_pages);
        if page_numbers.is_empty() {
            return Err(RedactError::PageOutOfRange {
                page: 0,
                total: total_pages,
            });
        }
        let selected = page_numbers.len();
        debug!("Selected {} of {} pages", selected, total_pages);

        if let Some(ref cb) = self.progress {
            cb.on_sweep_start(selected);
        }

        let mut pages = Vec::with_capacity(selected);
        for page_num in page_numbers {
            if let Some(ref cb) = self.progress {
                cb.on_page_start(page_num, selected);
            }
            match self.process_page(rasterizer, store, page_num) {
                Ok(report) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_page_complete(page_num, selected, report.faces);
                    }
                    pages.push(report);
                }
                Err(e) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_page_error(page_num, selected, &e.to_string());
                    }
                    warn!(
                        "Sweep aborted at page {}; {} earlier pages keep their markers",
                        page_num,
                        pages.len()
                    );
                    return Err(e);
                }
            }
        }

        let stats = SweepStats {
            total_pages,
            selected_pages: selected,
            markers_committed: pages.iter().filter(|p| p.marker_committed).count(),
            total_faces: pages.iter().map(|p| p.faces).sum(),
            total_duration_ms: sweep_start.elapsed().as_millis() as u64,
        };
        info!(
            "Sweep complete: {} faces on {}/{} pages, {}ms",
            stats.total_faces, stats.markers_committed, selected, stats.total_duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_sweep_complete(selected, stats.markers_committed, stats.total_faces);
        }

        Ok(SweepReport { pages, stats })
    }

    /// Run one page from `Idle` to `Done`.
    pub fn process_page<R, S>(
        &self,
        rasterizer: &R,
        store: &mut S,
        page_num: usize,
    ) -> Result<PageReport, RedactError>
    where
        R: PageRasterizer + ?Sized,
        S: AnnotationStore + ?Sized,
    {
        let mut stage = PageStage::Idle;
        let result = self.run_stages(rasterizer, store, page_num, &mut stage);
        if let Err(ref e) = result {
            warn!("Page {} failed while {}: {}", page_num, stage, e);
        }
        result
    }

    fn run_stages<R, S>(
        &self,
        rasterizer: &R,
        store: &mut S,
        page_num: usize,
        stage: &mut PageStage,
    ) -> Result<PageReport, RedactError>
    where
        R: PageRasterizer + ?Sized,
        S: AnnotationStore + ?Sized,
    {
        let start = Instant::now();

        advance(stage, PageStage::Rasterizing, page_num);
        let raster = rasterizer.rasterize(page_num, self.zoom)?;
        let (raster_width, raster_height) = (raster.width(), raster.height());
        debug!(
            "Page {} rendered at zoom {} → {}x{} px",
            page_num, self.zoom, raster_width, raster_height
        );

        advance(stage, PageStage::Detecting, page_num);
        let detections = self.detector.detect(raster)?;
        let faces = detections.len();

        advance(stage, PageStage::Annotating, page_num);
        let summary = self.builder.build_and_commit(store, page_num, detections)?;

        advance(stage, PageStage::Done, page_num);
        Ok(PageReport {
            page_num,
            faces,
            marker_committed: summary.is_some(),
            max_confidence: summary.map(|s| s.max_confidence),
            raster_width,
            raster_height,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn advance(stage: &mut PageStage, next: PageStage, page_num: usize) {
    debug!("Page {}: {} → {}", page_num, stage, next);
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::StrokeColor;

    fn pipeline_with_zoom(zoom: f32) -> Result<RedactionPipeline, RedactError> {
        let detector = FaceDetector::new(
            Arc::new(ModelSlot::new()),
            RedactionConfig::default().detection_options(),
        );
        RedactionPipeline::new(detector, AnnotationBuilder::new(StrokeColor::RED), zoom)
    }

    #[test]
    fn zoom_outside_unit_interval_rejected() {
        for zoom in [0.0, -0.5, 1.5, f32::NAN] {
            let err = pipeline_with_zoom(zoom).err().unwrap();
            assert!(matches!(err, RedactError::InvalidConfig(_)), "zoom {zoom}");
        }
        assert!(pipeline_with_zoom(1.0).is_ok());
    }

    #[test]
    fn from_config_rechecks_zoom() {
        let mut config = RedactionConfig::default();
        config.zoom = 0.0;
        let result = RedactionPipeline::from_config(Arc::new(ModelSlot::new()), &config);
        assert!(matches!(result, Err(RedactError::InvalidConfig(_))));
    }

    #[test]
    fn stage_display() {
        assert_eq!(PageStage::Rasterizing.to_string(), "rasterizing");
        assert_eq!(PageStage::Done.to_string(), "done");
    }
}
