//! Result types returned by the sweep and by [`crate::inspect`].

use crate::pipeline::rasterize::PageInfo;
use serde::{Deserialize, Serialize};

/// Outcome of one page that reached `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Faces that passed the confidence filter and result cap.
    pub faces: usize,
    /// Whether a redaction marker was added for this page.
    pub marker_committed: bool,
    /// Highest detection confidence on the page, if any face was found.
    pub max_confidence: Option<f32>,
    /// Raster size handed to the detector, in pixels.
    pub raster_width: u32,
    pub raster_height: u32,
    pub duration_ms: u64,
}

/// Aggregate numbers for a completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages selected for the sweep.
    pub selected_pages: usize,
    pub markers_committed: usize,
    pub total_faces: usize,
    pub total_duration_ms: u64,
}

/// Everything a completed sweep produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub pages: Vec<PageReport>,
    pub stats: SweepStats,
}

impl SweepReport {
    /// Pages that received a marker.
    pub fn redacted_pages(&self) -> impl Iterator<Item = &PageReport> {
        self.pages.iter().filter(|p| p.marker_committed)
    }
}

/// Document-level metadata, available without loading a face model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// Size of every page in PDF points.
    pub pages: Vec<PageInfo>,
}
