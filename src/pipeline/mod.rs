//! Pipeline stages for face redaction.
//!
//! Each submodule implements one step and talks to the outside world only
//! through a capability trait, so the PDFium and rustface backends in
//! [`crate::backend`] can be swapped for fakes in tests or another toolkit.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ detect ──▶ annotate
//! (path/URL)  (PageRasterizer)  (FaceModel)  (AnnotationStore)
//!                 └──────────── sweep ───────────┘
//! ```
//!
//! 1. [`input`]     canonicalise the user-supplied path or URL to a local file
//! 2. [`rasterize`] render one page at the configured zoom
//! 3. [`detect`]    run the face model, filter and cap, rescale to document space
//! 4. [`annotate`]  fold a page's faces into one redaction marker and commit it
//! 5. [`sweep`]     drive pages one at a time through stages 2–4

pub mod annotate;
pub mod detect;
pub mod input;
pub mod rasterize;
pub mod sweep;
