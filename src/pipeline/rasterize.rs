//! Page rasterisation capability.
//!
//! The pipeline never touches a PDF library directly. It asks a
//! [`PageRasterizer`] for a grayscale bitmap of a page at a zoom factor and
//! gets back a [`PageRaster`] that also records the page's size in
//! document units, so later stages can rescale without another round trip.

use crate::error::RedactError;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Size of one page in document units (PDF points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width: f32,
    pub height: f32,
}

/// A transient bitmap of one page.
///
/// Owned by the sweep for exactly one detection call: the detector takes it
/// by value and drops it when inference returns.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub page: PageInfo,
    /// Zoom the page was rendered at; pixel = point × zoom.
    pub zoom: f32,
    pub image: GrayImage,
}

impl PageRaster {
    pub fn page_num(&self) -> usize {
        self.page.page_num
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Read-only access to a document's pages.
pub trait PageRasterizer {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Size of a 1-indexed page. Fails with `PageOutOfRange` outside
    /// `[1, page_count]`.
    fn page_info(&self, page_num: usize) -> Result<PageInfo, RedactError>;

    /// Render a 1-indexed page at `zoom` (in `(0, 1]`).
    ///
    /// Fails with `RenderFailure` when the page cannot be rendered.
    fn rasterize(&self, page_num: usize, zoom: f32) -> Result<PageRaster, RedactError>;
}

/// Reject page numbers outside `[1, page_count]`.
pub fn check_page(page_num: usize, page_count: usize) -> Result<(), RedactError> {
    if page_num == 0 || page_num > page_count {
        return Err(RedactError::PageOutOfRange {
            page: page_num,
            total: page_count,
        });
    }
    Ok(())
}

/// Pixel dimensions of a page rendered at `zoom`, never below 1×1.
pub fn raster_size(page: &PageInfo, zoom: f32) -> (u32, u32) {
    let w = (page.width * zoom).round().max(1.0) as u32;
    let h = (page.height * zoom).round().max(1.0) as u32;
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_page_bounds() {
        assert!(check_page(1, 3).is_ok());
        assert!(check_page(3, 3).is_ok());
        assert!(matches!(
            check_page(0, 3),
            Err(RedactError::PageOutOfRange { page: 0, total: 3 })
        ));
        assert!(matches!(
            check_page(4, 3),
            Err(RedactError::PageOutOfRange { page: 4, total: 3 })
        ));
    }

    #[test]
    fn raster_size_scales_letter_page() {
        let page = PageInfo {
            page_num: 1,
            width: 612.0,
            height: 792.0,
        };
        assert_eq!(raster_size(&page, 0.5), (306, 396));
        assert_eq!(raster_size(&page, 1.0), (612, 792));
        assert_eq!(raster_size(&page, 0.0001), (1, 1));
    }
}
