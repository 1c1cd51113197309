//! PDFium backend: rasterise pages and write `/Redact` annotations.
//!
//! ## Borrowing
//!
//! `pdfium-render` hands out pages from a shared `&PdfDocument`, and both
//! rendering and annotation creation work through those page handles. The
//! sweep needs a rasterizer (`&self`) and a store (`&mut self`) at the same
//! time, so each adapter borrows the document immutably instead of one
//! adapter owning it.
//!
//! Everything here is blocking and must run inside `spawn_blocking`.
//!
//! ## Coordinates
//!
//! The pipeline works in top-left display space: the CropBox after
//! `/Rotate`, as rendered. Annotations live in unrotated PDF user space
//! with a bottom-left origin, so [`PageGeometry`] undoes the rotation and
//! the CropBox offset for every quad.

use crate::error::RedactError;
use crate::geometry::{Quad, StrokeColor};
use crate::output::DocumentInfo;
use crate::pipeline::annotate::{AnnotationStore, MarkerHeader};
use crate::pipeline::rasterize::{check_page, PageInfo, PageRaster, PageRasterizer};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Platform file name of the PDFium shared library.
fn platform_library_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "libpdfium.dylib",
        "windows" => "pdfium.dll",
        _ => "libpdfium.so",
    }
}

/// Bind to PDFium.
///
/// Resolution order: `lib_path` (file or directory), `PDFIUM_LIB_PATH`,
/// then the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, RedactError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("PDFIUM_LIB_PATH").ok().map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(platform_library_name())
            } else {
                path
            };
            debug!("Binding PDFium from {}", path.display());
            Pdfium::bind_to_library(&path)
                .map_err(|e| RedactError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e)))?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| RedactError::PdfiumBindingFailed(format!("system library: {:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}

/// Open a PDF, mapping password failures to dedicated errors.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, RedactError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                RedactError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                RedactError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            RedactError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Save `document` to `output` via a sibling temp file and rename, so a
/// crash never leaves a half-written PDF at the destination.
pub fn save_document(document: &PdfDocument<'_>, output: &Path) -> Result<(), RedactError> {
    let write_failed = |detail: String| RedactError::OutputWriteFailed {
        path: output.to_path_buf(),
        detail,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
    }
    let tmp_path = output.with_extension("pdf.tmp");
    document
        .save_to_file(&tmp_path)
        .map_err(|e| write_failed(format!("{:?}", e)))?;
    std::fs::rename(&tmp_path, output).map_err(|e| write_failed(e.to_string()))?;

    info!("Saved redacted PDF to {}", output.display());
    Ok(())
}

/// Document metadata and page sizes.
pub fn document_info(document: &PdfDocument<'_>) -> DocumentInfo {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let pages: Vec<PageInfo> = document
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| PageInfo {
            page_num: idx + 1,
            width: page.width().value,
            height: page.height().value,
        })
        .collect();

    DocumentInfo {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        page_count: pages.len(),
        pdf_version: format!("{:?}", document.version()),
        pages,
    }
}

fn load_page<'a>(document: &PdfDocument<'a>, page_num: usize) -> Result<PdfPage<'a>, RedactError> {
    let pages = document.pages();
    check_page(page_num, pages.len() as usize)?;
    pages
        .get((page_num - 1) as PdfPageIndex)
        .map_err(|e| RedactError::RenderFailure {
            page: page_num,
            detail: format!("{:?}", e),
        })
}

// ── Rasterizer ───────────────────────────────────────────────────────────

/// [`PageRasterizer`] over an open PDFium document.
pub struct PdfiumRasterizer<'d, 'a> {
    document: &'d PdfDocument<'a>,
}

impl<'d, 'a> PdfiumRasterizer<'d, 'a> {
    pub fn new(document: &'d PdfDocument<'a>) -> Self {
        Self { document }
    }
}

impl PageRasterizer for PdfiumRasterizer<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_info(&self, page_num: usize) -> Result<PageInfo, RedactError> {
        let page = load_page(self.document, page_num)?;
        Ok(PageInfo {
            page_num,
            width: page.width().value,
            height: page.height().value,
        })
    }

    fn rasterize(&self, page_num: usize, zoom: f32) -> Result<PageRaster, RedactError> {
        let page = load_page(self.document, page_num)?;
        let info = PageInfo {
            page_num,
            width: page.width().value,
            height: page.height().value,
        };

        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RedactError::RenderFailure {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        Ok(PageRaster {
            page: info,
            zoom,
            image: bitmap.as_image().to_luma8(),
        })
    }
}

// ── Annotation store ─────────────────────────────────────────────────────

/// `FPDF_ANNOT_REDACT` from `fpdf_annot.h`; not re-exported by `pdfium-render`.
const FPDF_ANNOT_REDACT: FPDF_ANNOTATION_SUBTYPE = 28;

/// `FPDFANNOT_COLORTYPE_Color` from `fpdf_annot.h` (the `/C` entry).
const FPDFANNOT_COLORTYPE_COLOR: FPDFANNOT_COLORTYPE = 0;

/// How a page's display space maps back onto PDF user space.
///
/// `page.width()` / `page.height()` and the rendered bitmap are both in
/// display space: the CropBox with `/Rotate` applied, origin top-left.
/// Annotation coordinates are unrotated user space, where the CropBox may
/// not start at `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Clockwise quarter turns of `/Rotate` (0..=3).
    quarter_turns: u8,
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
}

impl PageGeometry {
    /// `crop` is `(left, bottom, right, top)` in user space.
    pub fn new(rotation_degrees: u16, crop: (f32, f32, f32, f32)) -> Self {
        let (left, bottom, right, top) = crop;
        Self {
            quarter_turns: ((rotation_degrees / 90) % 4) as u8,
            left,
            bottom,
            right,
            top,
        }
    }

    /// Read `/Rotate` and the CropBox (MediaBox when absent) of `page`.
    fn from_page(page: &PdfPage<'_>, page_num: usize) -> Result<Self, RedactError> {
        let degrees = match page.rotation().map_err(|e| RedactError::AnnotationFailed {
            page: page_num,
            detail: format!("reading /Rotate: {:?}", e),
        })? {
            PdfPageRenderRotation::None => 0,
            PdfPageRenderRotation::Degrees90 => 90,
            PdfPageRenderRotation::Degrees180 => 180,
            PdfPageRenderRotation::Degrees270 => 270,
        };

        let boundaries = page.boundaries();
        let crop = match boundaries.crop().or_else(|_| boundaries.media()) {
            Ok(bbox) => (
                bbox.bounds.left().value,
                bbox.bounds.bottom().value,
                bbox.bounds.right().value,
                bbox.bounds.top().value,
            ),
            Err(e) => {
                debug!("Page {}: no CropBox or MediaBox ({:?}), using page size", page_num, e);
                let (w, h) = (page.width().value, page.height().value);
                let (w, h) = if degrees % 180 == 90 { (h, w) } else { (w, h) };
                (0.0, 0.0, w, h)
            }
        };

        Ok(Self::new(degrees, crop))
    }

    /// Map a top-left display-space point into user space.
    pub fn to_user_space(&self, x: f32, y: f32) -> (f32, f32) {
        match self.quarter_turns {
            0 => (self.left + x, self.top - y),
            1 => (self.left + y, self.bottom + x),
            2 => (self.right - x, self.bottom + y),
            _ => (self.right - y, self.top - x),
        }
    }
}

/// A quad in PDF user space, BL, BR, TR, TL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfQuad {
    pub corners: [(f32, f32); 4],
}

impl PdfQuad {
    /// Map a top-left display-space quad into user space.
    ///
    /// On rotated pages the display corners land on different user-space
    /// corners, so the result is rebuilt from its extent to keep BL, BR, TR,
    /// TL order in user space.
    pub fn from_document(quad: &Quad, geometry: &PageGeometry) -> Self {
        let (mut left, mut bottom) = (f32::INFINITY, f32::INFINITY);
        let (mut right, mut top) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in &quad.points {
            let (x, y) = geometry.to_user_space(p.x, p.y);
            left = left.min(x);
            right = right.max(x);
            bottom = bottom.min(y);
            top = top.max(y);
        }
        Self {
            corners: [(left, bottom), (right, bottom), (right, top), (left, top)],
        }
    }

    fn to_quad_points(self) -> FS_QUADPOINTSF {
        let [(x1, y1), (x2, y2), (x3, y3), (x4, y4)] = self.corners;
        FS_QUADPOINTSF {
            x1,
            y1,
            x2,
            y2,
            x3,
            y3,
            x4,
            y4,
        }
    }
}

/// A marker waiting to be written into its page.
#[derive(Debug, Clone)]
pub struct PendingRedaction {
    header: MarkerHeader,
    quads: Vec<PdfQuad>,
}

impl PendingRedaction {
    /// `(bottom, left, top, right)` covering every quad.
    fn bounds(&self) -> (f32, f32, f32, f32) {
        let mut b = (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (x, y) in self.quads.iter().flat_map(|q| q.corners) {
            b.0 = b.0.min(y);
            b.1 = b.1.min(x);
            b.2 = b.2.max(y);
            b.3 = b.3.max(x);
        }
        b
    }
}

/// The raw annotation calls a commit makes.
trait RedactWriter {
    type Annot: Copy;

    fn create(&mut self) -> Option<Self::Annot>;
    fn append_quad(&mut self, annot: Self::Annot, quad: &PdfQuad) -> bool;
    /// `bounds` is `(bottom, left, top, right)`.
    fn set_rect(&mut self, annot: Self::Annot, bounds: (f32, f32, f32, f32)) -> bool;
    fn set_color(&mut self, annot: Self::Annot, color: StrokeColor) -> bool;
    fn set_string(&mut self, annot: Self::Annot, key: &str, value: &str) -> bool;
    fn remove(&mut self, annot: Self::Annot) -> bool;
    fn close(&mut self, annot: Self::Annot);
}

/// [`RedactWriter`] over one loaded PDFium page.
struct PdfiumPageWriter<'b> {
    bindings: &'b dyn PdfiumLibraryBindings,
    page: FPDF_PAGE,
}

impl RedactWriter for PdfiumPageWriter<'_> {
    type Annot = FPDF_ANNOTATION;

    fn create(&mut self) -> Option<FPDF_ANNOTATION> {
        let annot = self.bindings.FPDFPage_CreateAnnot(self.page, FPDF_ANNOT_REDACT);
        (!annot.is_null()).then_some(annot)
    }

    fn append_quad(&mut self, annot: FPDF_ANNOTATION, quad: &PdfQuad) -> bool {
        let points = quad.to_quad_points();
        self.bindings
            .is_true(self.bindings.FPDFAnnot_AppendAttachmentPoints(annot, &points))
    }

    fn set_rect(&mut self, annot: FPDF_ANNOTATION, bounds: (f32, f32, f32, f32)) -> bool {
        let (bottom, left, top, right) = bounds;
        let rect = FS_RECTF {
            left,
            top,
            right,
            bottom,
        };
        self.bindings
            .is_true(self.bindings.FPDFAnnot_SetRect(annot, &rect))
    }

    fn set_color(&mut self, annot: FPDF_ANNOTATION, color: StrokeColor) -> bool {
        self.bindings.is_true(self.bindings.FPDFAnnot_SetColor(
            annot,
            FPDFANNOT_COLORTYPE_COLOR,
            u32::from(color.r),
            u32::from(color.g),
            u32::from(color.b),
            255,
        ))
    }

    fn set_string(&mut self, annot: FPDF_ANNOTATION, key: &str, value: &str) -> bool {
        self.bindings
            .is_true(self.bindings.FPDFAnnot_SetStringValue_str(annot, key, value))
    }

    fn remove(&mut self, annot: FPDF_ANNOTATION) -> bool {
        let index = self.bindings.FPDFPage_GetAnnotIndex(self.page, annot);
        index >= 0 && self.bindings.is_true(self.bindings.FPDFPage_RemoveAnnot(self.page, index))
    }

    fn close(&mut self, annot: FPDF_ANNOTATION) {
        self.bindings.FPDFPage_CloseAnnot(annot);
    }
}

/// Create one `/Redact` annotation for `marker`.
///
/// If any step after creation fails the annotation is removed again, so a
/// page never keeps a half-built marker.
fn write_marker<W: RedactWriter>(
    writer: &mut W,
    marker: &PendingRedaction,
) -> Result<(), RedactError> {
    let page = marker.header.page_num;
    let failed = |detail: String| RedactError::AnnotationFailed { page, detail };

    let annot = writer
        .create()
        .ok_or_else(|| failed("PDFium could not create a /Redact annotation".to_string()))?;

    if let Err(step) = fill_marker(writer, annot, marker) {
        if !writer.remove(annot) {
            warn!("Page {}: could not remove incomplete /Redact annotation", page);
        }
        writer.close(annot);
        return Err(failed(format!("could not {}", step)));
    }

    writer.close(annot);
    Ok(())
}

fn fill_marker<W: RedactWriter>(
    writer: &mut W,
    annot: W::Annot,
    marker: &PendingRedaction,
) -> Result<(), &'static str> {
    for quad in &marker.quads {
        if !writer.append_quad(annot, quad) {
            return Err("append quad points");
        }
    }
    if !writer.set_rect(annot, marker.bounds()) {
        return Err("set annotation rect");
    }
    if !writer.set_color(annot, marker.header.stroke_color) {
        return Err("set stroke color");
    }
    if !writer.set_string(annot, "T", &marker.header.author) {
        return Err("set author");
    }
    let contents = format!("Face redaction ({} regions)", marker.quads.len());
    if !writer.set_string(annot, "Contents", &contents) {
        return Err("set contents");
    }
    Ok(())
}

/// [`AnnotationStore`] that writes `/Redact` annotations into the document.
///
/// PDFium writes each annotation straight into the page dictionary, which
/// is what any viewer repaints from, so committing is the redraw.
pub struct PdfiumAnnotationStore<'d, 'a> {
    document: &'d PdfDocument<'a>,
    author: String,
    committed: usize,
    /// Geometry of the page currently being built.
    geometry: Option<(usize, PageGeometry)>,
}

impl<'d, 'a> PdfiumAnnotationStore<'d, 'a> {
    pub fn new(document: &'d PdfDocument<'a>, author: impl Into<String>) -> Self {
        Self {
            document,
            author: author.into(),
            committed: 0,
            geometry: None,
        }
    }

    /// Markers written so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    fn page_geometry(&mut self, page_num: usize) -> Result<PageGeometry, RedactError> {
        if let Some((cached, geometry)) = self.geometry {
            if cached == page_num {
                return Ok(geometry);
            }
        }
        let page = load_page(self.document, page_num)?;
        let geometry = PageGeometry::from_page(&page, page_num)?;
        self.geometry = Some((page_num, geometry));
        Ok(geometry)
    }
}

impl AnnotationStore for PdfiumAnnotationStore<'_, '_> {
    type Quad = PdfQuad;
    type Marker = PendingRedaction;

    fn current_user(&self) -> String {
        self.author.clone()
    }

    fn build_quad(&mut self, page_num: usize, quad: &Quad) -> Result<PdfQuad, RedactError> {
        let geometry = self.page_geometry(page_num)?;
        Ok(PdfQuad::from_document(quad, &geometry))
    }

    fn build_marker(
        &mut self,
        header: &MarkerHeader,
        quads: Vec<PdfQuad>,
    ) -> Result<PendingRedaction, RedactError> {
        Ok(PendingRedaction {
            header: header.clone(),
            quads,
        })
    }

    fn commit(&mut self, marker: PendingRedaction) -> Result<(), RedactError> {
        let page_num = marker.header.page_num;
        let page = load_page(self.document, page_num)?;
        let bindings = self.document.bindings();
        let mut writer = PdfiumPageWriter {
            bindings,
            page: bindings.get_handle_from_page(&page),
        };
        write_marker(&mut writer, &marker)?;

        self.committed += 1;
        debug!(
            "Page {}: wrote /Redact annotation with {} quads",
            page_num,
            marker.quads.len()
        );
        Ok(())
    }
}
