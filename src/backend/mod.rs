//! Concrete implementations of the pipeline's capability traits.
//!
//! | Module | Implements |
//! |--------|------------|
//! | [`pdfium`]   | `PageRasterizer`, `AnnotationStore` over a PDFium document |
//! | [`seetaface`] | `FaceModel` using the SeetaFace frontal cascade |
//! | [`memory`]   | `AnnotationStore` kept in a `Vec`, for dry runs and tests |

pub mod memory;
pub mod pdfium;
pub mod seetaface;
