//! Input resolution: normalise a user-supplied path, URL or byte buffer to
//! a local PDF file.
//!
//! PDFium opens documents from a file-system path, so remote and in-memory
//! inputs are written to a temporary location that lives exactly as long
//! as the returned [`ResolvedInput`]. Every input is checked for the `%PDF`
//! magic bytes before PDFium sees it.

use crate::error::RedactError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF on the local file system, plus whatever keeps it alive.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was a byte buffer written to a temp file.
    Buffered(NamedTempFile),
}

impl ResolvedInput {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Buffered(tmp) => tmp.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, RedactError> {
    if input.trim().is_empty() {
        return Err(RedactError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Write an in-memory PDF to a temp file.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, RedactError> {
    let mut tmp = NamedTempFile::new().map_err(|e| RedactError::Internal(format!("tempfile: {e}")))?;
    check_magic(bytes, tmp.path())?;
    tmp.write_all(bytes)
        .map_err(|e| RedactError::Internal(format!("tempfile write: {e}")))?;
    Ok(ResolvedInput::Buffered(tmp))
}

/// Fail with `NotAPdf` unless `bytes` start with `%PDF`.
///
/// Inputs shorter than the magic are rejected too; `magic` then holds what
/// was there, zero-padded.
fn check_magic(bytes: &[u8], path: &Path) -> Result<(), RedactError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(magic.len());
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(RedactError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, RedactError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(RedactError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(PDF_MAGIC.len());
            if let Err(e) = f.take(PDF_MAGIC.len() as u64).read_to_end(&mut head) {
                debug!("Could not read header of {}: {}", path.display(), e);
            }
            check_magic(&head, &path)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RedactError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(RedactError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, RedactError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| RedactError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            RedactError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let temp_dir = TempDir::new().map_err(|e| RedactError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| RedactError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment if it looks like a file name, else `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
