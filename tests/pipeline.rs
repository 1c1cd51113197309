//! Sweep behaviour over an in-memory document, model and annotation store.
//!
//! No PDFium or model file is needed: the fake rasterizer stamps the page
//! number into the raster's first pixel, and the fake model looks up its
//! canned detections by that pixel.

use image::{GrayImage, Luma};
use pdf_face_redact::geometry::{BoundingBox, FaceDetection};
use pdf_face_redact::pipeline::detect::ModelError;
use pdf_face_redact::{
    AnnotationBuilder, FaceDetector, FaceModel, MemoryAnnotationStore, ModelSlot, PageInfo,
    PageRaster, PageRasterizer, PageSelection, RedactError, RedactionConfig, RedactionPipeline,
    RedactionProgressCallback, StrokeColor,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeDocument {
    pages: usize,
    fail_on: HashSet<usize>,
    rasterized: RefCell<Vec<usize>>,
}

impl FakeDocument {
    fn new(pages: usize) -> Self {
        Self {
            pages,
            fail_on: HashSet::new(),
            rasterized: RefCell::new(Vec::new()),
        }
    }

    fn failing_on(mut self, page: usize) -> Self {
        self.fail_on.insert(page);
        self
    }
}

impl PageRasterizer for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_info(&self, page_num: usize) -> Result<PageInfo, RedactError> {
        Ok(PageInfo {
            page_num,
            width: 612.0,
            height: 792.0,
        })
    }

    fn rasterize(&self, page_num: usize, zoom: f32) -> Result<PageRaster, RedactError> {
        self.rasterized.borrow_mut().push(page_num);
        if self.fail_on.contains(&page_num) {
            return Err(RedactError::RenderFailure {
                page: page_num,
                detail: "simulated render failure".into(),
            });
        }
        Ok(PageRaster {
            page: self.page_info(page_num)?,
            zoom,
            image: GrayImage::from_pixel(4, 4, Luma([page_num as u8])),
        })
    }
}

#[derive(Default)]
struct CannedModel {
    by_page: HashMap<u8, Vec<FaceDetection>>,
    calls: Arc<Mutex<Vec<u8>>>,
}

impl CannedModel {
    fn with_page(mut self, page: u8, faces: Vec<FaceDetection>) -> Self {
        self.by_page.insert(page, faces);
        self
    }
}

impl FaceModel for CannedModel {
    fn infer(&self, image: &GrayImage) -> Result<Vec<FaceDetection>, ModelError> {
        let page = image.get_pixel(0, 0).0[0];
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(page);
        }
        Ok(self.by_page.get(&page).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RedactionProgressCallback for RecordingProgress {
    fn on_sweep_start(&self, total_pages: usize) {
        self.push(format!("sweep_start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.push(format!("start {page_num}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, faces: usize) {
        self.push(format!("done {page_num} faces={faces}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.push(format!("error {page_num}"));
    }
    fn on_sweep_complete(&self, _total: usize, markers: usize, faces: usize) {
        self.push(format!("sweep_complete markers={markers} faces={faces}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn face(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> FaceDetection {
    FaceDetection::new(BoundingBox::new(x, y, w, h), confidence)
}

fn pipeline_for(model: CannedModel, config: &RedactionConfig) -> RedactionPipeline {
    RedactionPipeline::from_config(Arc::new(ModelSlot::with_model(model)), config).unwrap()
}

fn default_config() -> RedactionConfig {
    RedactionConfig::builder().build().unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn page_without_faces_gets_no_marker() {
    let model = CannedModel::default().with_page(2, vec![face(0.0, 0.0, 30.0, 30.0, 0.9)]);
    let doc = FakeDocument::new(3);
    let mut store = MemoryAnnotationStore::new("alice");

    let report = pipeline_for(model, &default_config())
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap();

    assert_eq!(store.markers().len(), 1);
    assert_eq!(store.markers_for_page(1).count(), 0);
    assert_eq!(store.markers_for_page(3).count(), 0);
    assert!(!report.pages[0].marker_committed);
    assert_eq!(report.pages[0].max_confidence, None);
    assert_eq!(report.stats.markers_committed, 1);
}

#[test]
fn one_marker_per_page_with_one_quad_per_face() {
    let faces = vec![
        face(10.0, 20.0, 30.0, 40.0, 0.9),
        face(50.0, 60.0, 30.0, 30.0, 0.8),
        // overlaps the first; kept as its own quad
        face(15.0, 25.0, 30.0, 40.0, 0.7),
    ];
    let model = CannedModel::default().with_page(1, faces);
    let doc = FakeDocument::new(1);
    let mut store = MemoryAnnotationStore::new("alice");
    let config = RedactionConfig::builder()
        .stroke_color(StrokeColor::new(0, 0, 255))
        .build()
        .unwrap();

    let report = pipeline_for(model, &config)
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap();

    assert_eq!(store.markers().len(), 1);
    let marker = &store.markers()[0];
    assert_eq!(marker.quads.len(), 3);
    assert_eq!(marker.header.page_num, 1);
    assert_eq!(marker.header.author, "alice");
    assert_eq!(marker.header.stroke_color, StrokeColor::new(0, 0, 255));
    assert_eq!(store.redraw_count(), 1);
    assert_eq!(report.pages[0].faces, 3);
    assert_eq!(report.pages[0].max_confidence, Some(0.9));
}

#[test]
fn quads_are_in_document_space() {
    let model = CannedModel::default().with_page(1, vec![face(10.0, 20.0, 30.0, 40.0, 0.9)]);
    let doc = FakeDocument::new(1);
    let mut store = MemoryAnnotationStore::new("alice");

    pipeline_for(model, &default_config())
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap();

    let quad = store.markers()[0].quads[0];
    assert!(quad
        .bounds()
        .approx_eq(&BoundingBox::new(20.0, 40.0, 60.0, 80.0), 1e-4));
    // bottom-left first, in top-left-origin coordinates
    assert_eq!((quad.bottom_left().x, quad.bottom_left().y), (20.0, 120.0));
    assert_eq!((quad.top_right().x, quad.top_right().y), (80.0, 40.0));
}

#[test]
fn render_failure_stops_the_sweep_and_keeps_earlier_markers() {
    let model = CannedModel::default()
        .with_page(1, vec![face(0.0, 0.0, 30.0, 30.0, 0.9)])
        .with_page(3, vec![face(0.0, 0.0, 30.0, 30.0, 0.9)]);
    let calls = model.calls.clone();
    let doc = FakeDocument::new(3).failing_on(2);
    let mut store = MemoryAnnotationStore::new("alice");
    let progress = Arc::new(RecordingProgress::default());

    let err = pipeline_for(model, &default_config())
        .with_progress(progress.clone())
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap_err();

    assert!(matches!(err, RedactError::RenderFailure { page: 2, .. }));
    assert_eq!(store.markers().len(), 1);
    assert_eq!(store.markers()[0].header.page_num, 1);
    assert_eq!(*doc.rasterized.borrow(), vec![1, 2]);
    assert_eq!(*calls.lock().unwrap(), vec![1]);
    assert_eq!(
        progress.events(),
        vec!["sweep_start 3", "start 1", "done 1 faces=1", "start 2", "error 2"]
    );
}

#[test]
fn low_confidence_detections_never_reach_the_store() {
    let faces = vec![
        face(0.0, 0.0, 30.0, 30.0, 0.39),
        face(40.0, 0.0, 30.0, 30.0, 0.40),
        face(80.0, 0.0, 30.0, 30.0, 0.10),
    ];
    let model = CannedModel::default()
        .with_page(1, faces)
        .with_page(2, vec![face(0.0, 0.0, 30.0, 30.0, 0.2)]);
    let doc = FakeDocument::new(2);
    let mut store = MemoryAnnotationStore::new("alice");

    let report = pipeline_for(model, &default_config())
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap();

    // 0.40 is inclusive
    assert_eq!(store.markers().len(), 1);
    assert_eq!(store.markers()[0].quads.len(), 1);
    assert_eq!(report.pages[1].faces, 0);
    assert!(!report.pages[1].marker_committed);
}

#[test]
fn result_cap_keeps_highest_confidence() {
    let faces = (0..10)
        .map(|i| face(i as f32 * 40.0, 0.0, 30.0, 30.0, 0.5 + i as f32 * 0.04))
        .collect();
    let model = CannedModel::default().with_page(1, faces);
    let doc = FakeDocument::new(1);
    let mut store = MemoryAnnotationStore::new("alice");
    let config = RedactionConfig::builder().max_results(3).build().unwrap();

    let report = pipeline_for(model, &config)
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap();

    assert_eq!(report.pages[0].faces, 3);
    let mut xs: Vec<f32> = store.markers()[0]
        .quads
        .iter()
        .map(|q| q.top_left().x)
        .collect();
    xs.sort_by(f32::total_cmp);
    // faces 7, 8 and 9, rescaled by 1/0.5
    assert_eq!(xs, vec![560.0, 640.0, 720.0]);
}

#[test]
fn empty_model_slot_fails_before_any_page() {
    let doc = FakeDocument::new(2);
    let mut store = MemoryAnnotationStore::new("alice");
    let progress = Arc::new(RecordingProgress::default());
    let pipeline = RedactionPipeline::from_config(Arc::new(ModelSlot::new()), &default_config())
        .unwrap()
        .with_progress(progress.clone());

    let err = pipeline
        .run(&doc, &mut store, &PageSelection::All)
        .unwrap_err();

    assert!(matches!(err, RedactError::ModelNotReady));
    assert!(progress.events().is_empty());
    assert!(doc.rasterized.borrow().is_empty());
    assert!(store.markers().is_empty());
}

#[tokio::test]
async fn loading_the_slot_makes_the_sweep_ready() {
    let model = CannedModel::default().with_page(1, vec![face(0.0, 0.0, 30.0, 30.0, 0.9)]);
    let slot = Arc::new(ModelSlot::new());
    slot.load(move || Ok(model)).await.unwrap();
    assert!(slot.is_ready());

    let pipeline = RedactionPipeline::new(
        FaceDetector::new(slot, default_config().detection_options()),
        AnnotationBuilder::new(StrokeColor::RED),
        0.5,
    )
    .unwrap();
    let doc = FakeDocument::new(1);
    let mut store = MemoryAnnotationStore::new("alice");
    let report = pipeline.run(&doc, &mut store, &PageSelection::All).unwrap();
    assert_eq!(report.stats.total_faces, 1);
}

#[test]
fn pages_run_in_ascending_order_and_selection_is_respected() {
    let model = CannedModel::default();
    let doc = FakeDocument::new(6);
    let mut store = MemoryAnnotationStore::new("alice");
    let progress = Arc::new(RecordingProgress::default());

    let report = pipeline_for(model, &default_config())
        .with_progress(progress.clone())
        .run(&doc, &mut store, &PageSelection::Set(vec![5, 2, 2, 9]))
        .unwrap();

    assert_eq!(*doc.rasterized.borrow(), vec![2, 5]);
    assert_eq!(report.stats.selected_pages, 2);
    assert_eq!(report.stats.total_pages, 6);
    assert_eq!(
        progress.events().last().map(String::as_str),
        Some("sweep_complete markers=0 faces=0")
    );
}

#[test]
fn selection_outside_the_document_is_an_error() {
    let model = CannedModel::default();
    let doc = FakeDocument::new(2);
    let mut store = MemoryAnnotationStore::new("alice");

    let err = pipeline_for(model, &default_config())
        .run(&doc, &mut store, &PageSelection::Single(7))
        .unwrap_err();

    assert!(matches!(err, RedactError::PageOutOfRange { total: 2, .. }));
}
