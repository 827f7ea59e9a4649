//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! pdfium needs a file-system path, so a URL input is downloaded into a
//! `TempDir` that lives as long as the [`ResolvedInput`]. The `%PDF` magic
//! bytes are checked up front so callers get a meaningful error rather than
//! a pdfium failure deep inside text extraction.
//!
//! [`archive_pdf`] keeps a dated copy of whatever was resolved, which is how
//! successive roster snapshots are retained.

use crate::error::RosterError;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// File-name stem used for archived roster snapshots.
pub const ARCHIVE_STEM: &str = "CommunityPharmacyRoster";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, RosterError> {
    if input.trim().is_empty() {
        return Err(RosterError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Stage in-memory PDF bytes as a temporary file.
///
/// The file lives in its own `TempDir`, removed when the returned
/// [`ResolvedInput`] is dropped.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, RosterError> {
    let temp_dir = TempDir::new().map_err(|e| RosterError::Internal(format!("tempdir: {e}")))?;
    let path = temp_dir.path().join("input.pdf");
    check_pdf_magic(&path, bytes)?;

    std::fs::write(&path, bytes)
        .map_err(|e| RosterError::Internal(format!("tempfile write: {e}")))?;
    debug!("Staged {} bytes at {}", bytes.len(), path.display());

    Ok(ResolvedInput::Downloaded {
        path,
        _temp_dir: temp_dir,
    })
}

/// Reject anything whose first four bytes are not `%PDF`, including
/// content shorter than that. `path` only labels the error.
fn check_pdf_magic(path: &Path, head: &[u8]) -> Result<(), RosterError> {
    if head.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    Err(RosterError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

/// A roster already on disk: it must exist, be readable and start with `%PDF`.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, RosterError> {
    use std::io::Read;

    let path = PathBuf::from(path_str);
    let file = std::fs::File::open(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => RosterError::PermissionDenied {
            path: path.clone(),
        },
        _ => RosterError::FileNotFound { path: path.clone() },
    })?;

    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    file.take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .map_err(|_| RosterError::FileNotFound { path: path.clone() })?;
    check_pdf_magic(&path, &head)?;

    debug!("Resolved local roster: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Fetch the published roster (or any PDF URL) into a fresh `TempDir`.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, RosterError> {
    info!("Downloading roster from: {}", url);

    let failed = |reason: String| RosterError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let fetch_err = |e: reqwest::Error| {
        if e.is_timeout() {
            RosterError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;
    let response = client.get(url).send().await.map_err(&fetch_err)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    let body = response.bytes().await.map_err(&fetch_err)?;

    let temp_dir = TempDir::new().map_err(|e| RosterError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(filename_from_url(url));
    check_pdf_magic(&path, &body)?;

    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| RosterError::Internal(format!("Failed to write temp file: {}", e)))?;
    info!("Downloaded {} bytes to: {}", body.len(), path.display());

    Ok(ResolvedInput::Downloaded {
        path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Path of the dated snapshot for `date` inside `dir`.
pub fn archive_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_{}.pdf", ARCHIVE_STEM, date.format("%Y-%m-%d")))
}

/// Copy the resolved PDF to `<dir>/CommunityPharmacyRoster_<date>.pdf`,
/// creating `dir` if needed. An existing snapshot for the same day is
/// overwritten.
pub async fn archive_pdf(
    source: &ResolvedInput,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, RosterError> {
    let dest = archive_path(dir, date);
    let write_err = |e| RosterError::OutputWriteFailed {
        path: dest.clone(),
        source: e,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;
    tokio::fs::copy(source.path(), &dest)
        .await
        .map_err(write_err)?;

    info!("Saved PDF to: {}", dest.display());
    Ok(dest)
}
