//! File-level entry points.
//!
//! Every entry point follows the same shape:
//!
//! 1. resolve the input to a local PDF (path, URL or bytes)
//! 2. load the face model into a fresh [`ModelSlot`] (initialisation barrier)
//! 3. on one blocking thread: bind PDFium, open the document, run the
//!    sweep, and save the result
//!
//! PDFium handles are not `Send`, so step 3 never crosses an `.await`.

use crate::backend::memory::MemoryAnnotationStore;
use crate::backend::pdfium::{
    bind_pdfium, document_info, open_document, save_document, PdfiumAnnotationStore,
    PdfiumRasterizer,
};
use crate::backend::seetaface::RustfaceModel;
use crate::config::RedactionConfig;
use crate::error::RedactError;
use crate::output::{DocumentInfo, SweepReport};
use crate::pipeline::annotate::RedactionMarker;
use crate::pipeline::detect::ModelSlot;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::sweep::RedactionPipeline;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Detect faces in a PDF and write a copy with redaction annotations.
///
/// # Arguments
/// * `input_str`: local file path or HTTP/HTTPS URL to a PDF
/// * `output`: where to write the annotated PDF
/// * `config`: sweep configuration; `model_path` must be set
///
/// # Errors
/// Returns the first failure. If the sweep aborts after some pages were
/// annotated, the partial document is still written to `output` before the
/// error is returned.
pub async fn redact(
    input_str: impl AsRef<str>,
    output: impl AsRef<Path>,
    config: &RedactionConfig,
) -> Result<SweepReport, RedactError> {
    let input_str = input_str.as_ref();
    info!("Starting redaction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    redact_resolved(resolved, output.as_ref().to_path_buf(), config).await
}

/// Like [`redact`], for a PDF already in memory.
pub async fn redact_bytes(
    bytes: &[u8],
    output: impl AsRef<Path>,
    config: &RedactionConfig,
) -> Result<SweepReport, RedactError> {
    let resolved = input::resolve_bytes(bytes)?;
    redact_resolved(resolved, output.as_ref().to_path_buf(), config).await
}

/// Synchronous wrapper around [`redact`].
///
/// Creates a temporary tokio runtime internally.
pub fn redact_sync(
    input_str: impl AsRef<str>,
    output: impl AsRef<Path>,
    config: &RedactionConfig,
) -> Result<SweepReport, RedactError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RedactError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(redact(input_str, output, config))
}

/// Dry run: detect faces and build markers without writing a PDF.
///
/// Returns the sweep report together with the markers that would have been
/// added.
pub async fn scan(
    input_str: impl AsRef<str>,
    config: &RedactionConfig,
) -> Result<(SweepReport, Vec<RedactionMarker>), RedactError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let slot = load_model(config).await?;
    let config = config.clone();

    tokio::task::spawn_blocking(move || -> Result<_, RedactError> {
        let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;
        let document = open_document(&pdfium, resolved.path(), config.password.as_deref())?;
        let rasterizer = PdfiumRasterizer::new(&document);
        let mut store = MemoryAnnotationStore::new(config.resolve_author());

        let report = RedactionPipeline::from_config(slot, &config)?.run(
            &rasterizer,
            &mut store,
            &config.pages,
        )?;
        Ok((report, store.into_markers()))
    })
    .await
    .map_err(|e| RedactError::Internal(format!("Scan task panicked: {}", e)))?
}

/// Page count, page sizes and basic metadata. Needs no face model.
pub async fn inspect(
    input_str: impl AsRef<str>,
    password: Option<&str>,
    pdfium_lib_path: Option<&Path>,
) -> Result<DocumentInfo, RedactError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let password = password.map(str::to_string);
    let lib_path = pdfium_lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || -> Result<_, RedactError> {
        let pdfium = bind_pdfium(lib_path.as_deref())?;
        let document = open_document(&pdfium, resolved.path(), password.as_deref())?;
        Ok(document_info(&document))
    })
    .await
    .map_err(|e| RedactError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Load the configured SeetaFace model into a new slot.
///
/// Fails with `ModelNotReady` when `config.model_path` is unset.
pub async fn load_model(config: &RedactionConfig) -> Result<Arc<ModelSlot>, RedactError> {
    let path = config.model_path.clone().ok_or(RedactError::ModelNotReady)?;
    let min_face_size = config.min_face_size;
    let start = Instant::now();

    let slot = ModelSlot::new();
    slot.load(move || RustfaceModel::from_file(&path, min_face_size))
        .await?;
    info!("Model loaded in {}ms", start.elapsed().as_millis());
    Ok(Arc::new(slot))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn redact_resolved(
    resolved: ResolvedInput,
    output: PathBuf,
    config: &RedactionConfig,
) -> Result<SweepReport, RedactError> {
    let slot = load_model(config).await?;
    let config = config.clone();

    // `resolved` moves into the task so temp inputs outlive the sweep.
    tokio::task::spawn_blocking(move || sweep_to_file(&resolved, &output, slot, &config))
        .await
        .map_err(|e| RedactError::Internal(format!("Redaction task panicked: {}", e)))?
}

/// Blocking body of [`redact`].
fn sweep_to_file(
    resolved: &ResolvedInput,
    output: &Path,
    slot: Arc<ModelSlot>,
    config: &RedactionConfig,
) -> Result<SweepReport, RedactError> {
    let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;
    let document = open_document(&pdfium, resolved.path(), config.password.as_deref())?;

    let rasterizer = PdfiumRasterizer::new(&document);
    let mut store = PdfiumAnnotationStore::new(&document, config.resolve_author());
    let result = RedactionPipeline::from_config(slot, config)?.run(
        &rasterizer,
        &mut store,
        &config.pages,
    );

    match result {
        Ok(report) => {
            save_document(&document, output)?;
            Ok(report)
        }
        Err(e) => Err(save_partial(e, store.committed(), output, || {
            save_document(&document, output)
        })),
    }
}

/// Save the markers committed before `error`, then hand `error` back.
///
/// A failed save is logged; the sweep's error is what the caller sees.
fn save_partial(
    error: RedactError,
    committed: usize,
    output: &Path,
    save: impl FnOnce() -> Result<(), RedactError>,
) -> RedactError {
    if committed > 0 {
        warn!(
            "Saving {} markers committed before the failure to {}",
            committed,
            output.display()
        );
        if let Err(save_err) = save() {
            warn!("Partial output not saved: {}", save_err);
        }
    }
    error
}
