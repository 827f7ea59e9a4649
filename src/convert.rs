//! Eager (full-document) conversion entry points.
//!
//! ## Why eager vs. streaming?
//!
//! The roster is a few dozen pages, so the simplest API reads every page,
//! assembles every row, and returns once. Use [`crate::stream::convert_stream`]
//! instead to receive each page's records as soon as that page is read.
//!
//! Both paths share the same shape: resolve the input, read metadata for
//! the page count, then consume the extractor's page channel through a
//! [`RosterPipeline`].

use crate::config::RosterConfig;
use crate::error::RosterError;
use crate::output::{DocumentMetadata, PageResult, PharmacyRecord, RosterOutput, RosterStats};
use crate::pipeline::driver::{tally, RosterPipeline};
use crate::pipeline::extract::{self, PageTokens};
use crate::pipeline::input::{self, ResolvedInput};
use crate::progress::ProgressCallback;
use crate::sink;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a roster PDF file or URL to records.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Conversion configuration
///
/// # Errors
/// Returns `Err(RosterError)` only when the document cannot be read at
/// all. Rows with odd addresses or dates are kept and counted in
/// `output.stats`.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &RosterConfig,
) -> Result<RosterOutput, RosterError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_resolved(resolved, config).await
}

/// Convert an input that has already been resolved to a local file.
///
/// Useful when the caller needs the PDF itself as well, e.g. to archive a
/// downloaded copy with [`input::archive_pdf`] before extraction.
pub async fn convert_resolved(
    resolved: ResolvedInput,
    config: &RosterConfig,
) -> Result<RosterOutput, RosterError> {
    let total_start = Instant::now();

    let (metadata, page_indices) = prepare(&resolved, config).await?;
    let total_pages = metadata.page_count;
    let selected = page_indices.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(selected);
    }

    // ── Read and assemble pages ──────────────────────────────────────────
    let extract_start = Instant::now();
    let pipeline = RosterPipeline::from_config(config);
    let mut rx = extract::spawn_token_reader(
        resolved,
        config.password.clone(),
        page_indices,
        config.layout.clone(),
    );

    let mut pages: Vec<PageResult> = Vec::with_capacity(selected);
    while let Some(next) = rx.recv().await {
        let tokens = next?;
        pages.push(run_page(&pipeline, &tokens, selected, config.progress_callback.as_ref()));
    }
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    pages.sort_by_key(|p| p.page_num);
    let records: Vec<PharmacyRecord> = pages.iter().flat_map(|p| p.records.clone()).collect();

    let stats = RosterStats {
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms,
        ..tally(&pages, total_pages)
    };

    info!(
        "Conversion complete: {} records from {}/{} pages, {}ms total",
        stats.total_records, stats.processed_pages, total_pages, stats.total_duration_ms
    );
    if stats.unanchored_addresses > 0 || stats.unnormalized_dates > 0 {
        info!(
            "{} addresses without state/ZIP, {} records with unparsed dates",
            stats.unanchored_addresses, stats.unnormalized_dates
        );
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(selected, records.len());
    }

    Ok(RosterOutput {
        records,
        pages,
        metadata,
        stats,
    })
}

/// Convert a roster and write the records to a CSV file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_csv(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &RosterConfig,
) -> Result<RosterStats, RosterError> {
    let output = convert(input_str, config).await?;
    let path = output_path.as_ref();
    sink::write_csv(path, &output.records).await?;
    info!("Wrote {} records to {}", output.records.len(), path.display());
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &RosterConfig,
) -> Result<RosterOutput, RosterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RosterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without reading any page text, using default
/// settings.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, RosterError> {
    inspect_with(input_str, &RosterConfig::default()).await
}

/// [`inspect`] honouring the download timeout and password in `config`.
pub async fn inspect_with(
    input_str: impl AsRef<str>,
    config: &RosterConfig,
) -> Result<DocumentMetadata, RosterError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract::extract_metadata(resolved.path(), config.password.as_deref()).await
}

/// Convert roster PDF bytes held in memory.
///
/// The bytes are staged in a temporary directory that is removed once
/// extraction finishes.
///
/// # Example
/// ```rust,no_run
/// use pharmacy_roster::{convert_from_bytes, RosterConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("CommunityPharmacyRoster.pdf")?;
/// let output = convert_from_bytes(&bytes, &RosterConfig::default()).await?;
/// println!("{} pharmacies", output.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &RosterConfig,
) -> Result<RosterOutput, RosterError> {
    let resolved = input::resolve_bytes(bytes)?;
    convert_resolved(resolved, config).await
}

/// Run pre-extracted token pages through the pipeline.
///
/// No PDF, pdfium or I/O involved: this is the entry point for callers
/// with their own token source.
pub fn records_from_pages(
    pages: Vec<PageTokens>,
    config: &RosterConfig,
) -> Vec<PharmacyRecord> {
    RosterPipeline::from_config(config).process_document(pages)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Read metadata and turn the page selection into indices.
pub(crate) async fn prepare(
    resolved: &ResolvedInput,
    config: &RosterConfig,
) -> Result<(DocumentMetadata, Vec<usize>), RosterError> {
    let metadata = extract::extract_metadata(resolved.path(), config.password.as_deref()).await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(RosterError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    debug!("Selected {} pages for extraction", page_indices.len());
    Ok((metadata, page_indices))
}

/// Process one page, firing progress events around it.
pub(crate) fn run_page(
    pipeline: &RosterPipeline,
    tokens: &PageTokens,
    total_pages: usize,
    callback: Option<&ProgressCallback>,
) -> PageResult {
    if let Some(cb) = callback {
        cb.on_page_start(tokens.page_number, total_pages);
    }
    let result = pipeline.process_page(tokens);
    debug!(
        "Page {}: {} records in {}ms",
        result.page_num,
        result.records.len(),
        result.duration_ms
    );
    if let Some(cb) = callback {
        cb.on_page_complete(result.page_num, total_pages, result.records.len());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::Token;
    use crate::progress::RosterProgressCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn records_from_pages_uses_config_layout() {
        let config = RosterConfig::builder().build().unwrap();
        let pages = vec![PageTokens {
            page_number: 1,
            tokens: vec![
                // Inside the first-page header band.
                Token::new("42", 20.0, 120.0, 1),
                Token::new("1001", 20.0, 140.0, 1),
            ],
        }];
        let records = records_from_pages(pages, &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].license_no, "1001");
    }

    #[derive(Default)]
    struct Counter {
        starts: AtomicUsize,
        records: AtomicUsize,
    }

    impl RosterProgressCallback for Counter {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, record_count: usize) {
            self.records.fetch_add(record_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn run_page_reports_progress() {
        let counter = Arc::new(Counter::default());
        let cb: ProgressCallback = counter.clone();
        let tokens = PageTokens {
            page_number: 2,
            tokens: vec![Token::new("1", 20.0, 100.0, 2), Token::new("2", 20.0, 120.0, 2)],
        };
        let result = run_page(&RosterPipeline::default(), &tokens, 3, Some(&cb));
        assert_eq!(result.records.len(), 2);
        assert_eq!(counter.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counter.records.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn convert_missing_file_is_fatal() {
        let err = convert("/no/such/roster.pdf", &RosterConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn convert_from_bytes_rejects_non_pdf() {
        let err = convert_from_bytes(b"<html>", &RosterConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn inspect_with_rejects_non_pdf_before_pdfium() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, b"PK\x03\x04").unwrap();
        let config = RosterConfig::builder()
            .password("s3cret")
            .download_timeout_secs(5)
            .build()
            .unwrap();
        let err = inspect_with(f.path().to_str().unwrap(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::NotAPdf { .. }));
    }
}
