//! # pdf-face-redact
//!
//! Find faces on the pages of a PDF and mark each one for redaction.
//!
//! Every page is rasterised at a reduced zoom, scanned with a SeetaFace
//! frontal-face cascade, and the detections are folded into a single
//! `/Redact` annotation per page. The annotations are *markers*: a PDF
//! editor still has to apply them before the faces are removed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file, URL or bytes
//!  ├─ 2. Model      load the cascade once (barrier before any page)
//!  ├─ 3. Rasterize  render page N at zoom (default 0.5), grayscale
//!  ├─ 4. Detect     filter by confidence, cap, rescale by 1/zoom
//!  ├─ 5. Annotate   one marker per page, one quad per face, commit
//!  └─ 6. Output     save PDF + per-page report
//! ```
//!
//! Pages run strictly one after another, and the first failure stops the
//! sweep. Markers already committed stay in the document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_face_redact::{redact, RedactionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedactionConfig::builder()
//!         .model_path("seeta_fd_frontal_v1.0.bin")
//!         .build()?;
//!     let report = redact("scan.pdf", "scan.redacted.pdf", &config).await?;
//!     eprintln!("{} faces on {} pages",
//!         report.stats.total_faces,
//!         report.stats.markers_committed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-face-redact` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-face-redact = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod redact;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::memory::MemoryAnnotationStore;
pub use backend::seetaface::RustfaceModel;
pub use config::{PageSelection, RedactionConfig, RedactionConfigBuilder};
pub use error::RedactError;
pub use geometry::{BoundingBox, FaceDetection, Point, Quad, ResizedDetection, StrokeColor};
pub use output::{DocumentInfo, PageReport, SweepReport, SweepStats};
pub use pipeline::annotate::{AnnotationBuilder, AnnotationStore, RedactionMarker};
pub use pipeline::detect::{FaceDetector, FaceModel, ModelSlot};
pub use pipeline::rasterize::{PageInfo, PageRaster, PageRasterizer};
pub use pipeline::sweep::{PageStage, RedactionPipeline};
pub use progress::{NoopProgressCallback, ProgressCallback, RedactionProgressCallback};
pub use redact::{inspect, load_model, redact, redact_bytes, redact_sync, scan};
