//! Configuration types for face redaction.
//!
//! All sweep behaviour is controlled through [`RedactionConfig`], built via
//! its [`RedactionConfigBuilder`]. Detection policy (`min_confidence`,
//! `max_results`) lives here rather than in the detector so that each
//! deployment can tune it.

use crate::error::RedactError;
use crate::geometry::StrokeColor;
use crate::pipeline::detect::DetectionOptions;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Author stamped on markers when neither the config nor the environment
/// names a user.
pub const DEFAULT_AUTHOR: &str = "Guest";

/// Configuration for a redaction sweep.
///
/// # Example
/// ```rust
/// use pdf_face_redact::RedactionConfig;
///
/// let config = RedactionConfig::builder()
///     .zoom(0.5)
///     .min_confidence(0.6)
///     .model_path("models/seeta_fd_frontal_v1.0.bin")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RedactionConfig {
    /// Zoom factor used to rasterise pages for detection. Range: (0, 1]. Default: 0.5.
    ///
    /// At 1.0 one PDF point becomes one pixel. Halving it quarters the pixel
    /// count the detector has to scan; small faces on a dense page may be
    /// missed at lower zooms.
    pub zoom: f32,

    /// Minimum detection confidence in `[0, 1]`, inclusive. Default: 0.40.
    pub min_confidence: f32,

    /// Maximum number of faces redacted per page. Default: 300.
    pub max_results: usize,

    /// Smallest face edge, in raster pixels, the cascade will look for. Default: 20.
    pub min_face_size: u32,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Stroke colour of every marker. Default: red.
    pub stroke_color: StrokeColor,

    /// Marker author. If None, uses `$USER` / `$USERNAME`, then [`DEFAULT_AUTHOR`].
    pub author: Option<String>,

    /// Path to the SeetaFace model file. Required by the file-level entry points.
    pub model_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to libpdfium (file or directory). If None, uses `PDFIUM_LIB_PATH`,
    /// then the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            zoom: 0.5,
            min_confidence: 0.40,
            max_results: 300,
            min_face_size: 20,
            pages: PageSelection::default(),
            stroke_color: StrokeColor::default(),
            author: None,
            model_path: None,
            password: None,
            pdfium_lib_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RedactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionConfig")
            .field("zoom", &self.zoom)
            .field("min_confidence", &self.min_confidence)
            .field("max_results", &self.max_results)
            .field("min_face_size", &self.min_face_size)
            .field("pages", &self.pages)
            .field("stroke_color", &self.stroke_color)
            .field("author", &self.author)
            .field("model_path", &self.model_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn RedactionProgressCallback>"),
            )
            .finish()
    }
}

impl RedactionConfig {
    /// Create a new builder for `RedactionConfig`.
    pub fn builder() -> RedactionConfigBuilder {
        RedactionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Detection policy derived from this config.
    pub fn detection_options(&self) -> DetectionOptions {
        DetectionOptions {
            min_confidence: self.min_confidence,
            max_results: self.max_results,
        }
    }

    /// Resolve the marker author: explicit config, then the OS user, then
    /// [`DEFAULT_AUTHOR`].
    pub fn resolve_author(&self) -> String {
        if let Some(ref a) = self.author {
            if !a.trim().is_empty() {
                return a.clone();
            }
        }
        ["USER", "USERNAME"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
    }
}

/// Builder for [`RedactionConfig`].
pub struct RedactionConfigBuilder {
    config: RedactionConfig,
}

impl fmt::Debug for RedactionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl RedactionConfigBuilder {
    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn min_confidence(mut self, c: f32) -> Self {
        self.config.min_confidence = c;
        self
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.config.max_results = n.max(1);
        self
    }

    pub fn min_face_size(mut self, px: u32) -> Self {
        // rustface rejects anything smaller than its 20 px base window
        self.config.min_face_size = px.max(20);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn stroke_color(mut self, color: StrokeColor) -> Self {
        self.config.stroke_color = color;
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = Some(author.into());
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RedactionConfig, RedactError> {
        let c = &self.config;
        check_zoom(c.zoom)?;
        if !(0.0..=1.0).contains(&c.min_confidence) {
            return Err(RedactError::InvalidConfig(format!(
                "Minimum confidence must be 0–1, got {}",
                c.min_confidence
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-indexed
    /// page numbers within `[1, total_pages]`.
    pub fn to_page_numbers(&self, total_pages: usize) -> Vec<usize> {
        let mut pages: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![*p]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1);
                let e = (*end).min(total_pages);
                (s..=e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|&p| p >= 1 && p <= total_pages)
                .collect(),
        };
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

/// Rasterisation zoom must lie in `(0, 1]`.
pub(crate) fn check_zoom(zoom: f32) -> Result<(), RedactError> {
    if !(zoom > 0.0 && zoom <= 1.0) {
        return Err(RedactError::InvalidConfig(format!(
            "Zoom must be in (0, 1], got {}",
            zoom
        )));
    }
    Ok(())
}
