//! Streaming conversion API: emit each page's records as it is read.
//!
//! ## Why stream?
//!
//! Pages arrive from pdfium one at a time. Streaming them lets a caller
//! show rows immediately, write them to a sink incrementally, or stop
//! early by dropping the stream (the blocking reader notices and quits).
//!
//! Pages are emitted in extraction order, which is ascending page order
//! for every [`crate::config::PageSelection`].

use crate::config::RosterConfig;
use crate::convert::{prepare, run_page};
use crate::error::RosterError;
use crate::output::PageResult;
use crate::pipeline::driver::RosterPipeline;
use crate::pipeline::extract::{self, PageTokens};
use crate::pipeline::input::{self, ResolvedInput};
use crate::progress::ProgressCallback;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, RosterError>> + Send>>;

/// Convert a roster PDF, streaming one [`PageResult`] per page.
///
/// # Returns
/// - `Ok(PageStream)` — yields pages in order; an `Err` item ends the stream
/// - `Err(RosterError)` — the document could not be opened at all
pub async fn convert_stream(
    input_str: impl AsRef<str>,
    config: &RosterConfig,
) -> Result<PageStream, RosterError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    stream_resolved(resolved, config).await
}

/// Streaming equivalent of [`crate::convert::convert_from_bytes`].
///
/// The staged temporary file lives until the stream is finished or dropped.
///
/// # Example
/// ```rust,no_run
/// use pharmacy_roster::{convert_stream_from_bytes, RosterConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("CommunityPharmacyRoster.pdf")?;
/// let mut stream = convert_stream_from_bytes(&bytes, &RosterConfig::default()).await?;
/// while let Some(page) = stream.next().await {
///     let page = page?;
///     for record in &page.records {
///         println!("{}", record.summary());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream_from_bytes(
    bytes: &[u8],
    config: &RosterConfig,
) -> Result<PageStream, RosterError> {
    let resolved = input::resolve_bytes(bytes)?;
    stream_resolved(resolved, config).await
}

async fn stream_resolved(
    resolved: ResolvedInput,
    config: &RosterConfig,
) -> Result<PageStream, RosterError> {
    let (_metadata, page_indices) = prepare(&resolved, config).await?;
    let selected = page_indices.len();

    let callback = config.progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_extraction_start(selected);
    }

    let pipeline = RosterPipeline::from_config(config);
    let mut token_rx = extract::spawn_token_reader(
        resolved,
        config.password.clone(),
        page_indices,
        config.layout.clone(),
    );

    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(forward_pages(token_rx, tx, pipeline, selected, callback));

    Ok(Box::pin(ReceiverStream::new(rx)))
}

/// Run each token page through `pipeline` and forward the result to `tx`.
///
/// Stops after the first `Err` item or when the consumer drops the stream.
/// `on_extraction_complete` fires only when every page was forwarded.
async fn forward_pages(
    mut token_rx: mpsc::Receiver<Result<PageTokens, RosterError>>,
    tx: mpsc::Sender<Result<PageResult, RosterError>>,
    pipeline: RosterPipeline,
    selected: usize,
    callback: Option<ProgressCallback>,
) {
    let mut total_records = 0;
    while let Some(next) = token_rx.recv().await {
        let item = next.map(|tokens| run_page(&pipeline, &tokens, selected, callback.as_ref()));
        let failed = item.is_err();
        if let Ok(ref page) = item {
            total_records += page.records.len();
        }
        if tx.send(item).await.is_err() {
            debug!("Page stream dropped by consumer");
            return;
        }
        if failed {
            return;
        }
    }
    info!("Streaming conversion complete: {} records", total_records);
    if let Some(cb) = callback {
        cb.on_extraction_complete(selected, total_records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::Token;
    use crate::progress::RosterProgressCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_stream::StreamExt;

    #[derive(Default)]
    struct CompletionCounter {
        pages: AtomicUsize,
        completions: AtomicUsize,
        records: AtomicUsize,
    }

    impl RosterProgressCallback for CompletionCounter {
        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _record_count: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, _total_pages: usize, total_records: usize) {
            self.completions.fetch_add(1, Ordering::SeqCst);
            self.records.store(total_records, Ordering::SeqCst);
        }
    }

    fn one_row_page(page_number: usize, license: &str) -> PageTokens {
        PageTokens {
            page_number,
            tokens: vec![Token::new(license, 20.0, 200.0, page_number)],
        }
    }

    /// Feed `items` through `forward_pages` and collect what the stream yields.
    async fn run(
        items: Vec<Result<PageTokens, RosterError>>,
        counter: &Arc<CompletionCounter>,
    ) -> Vec<Result<PageResult, RosterError>> {
        let (token_tx, token_rx) = mpsc::channel(items.len().max(1));
        for item in items {
            token_tx.send(item).await.unwrap();
        }
        drop(token_tx);

        let (tx, rx) = mpsc::channel(4);
        let callback: ProgressCallback = counter.clone();
        tokio::spawn(forward_pages(
            token_rx,
            tx,
            RosterPipeline::default(),
            3,
            Some(callback),
        ));
        ReceiverStream::new(rx).collect().await
    }

    #[tokio::test]
    async fn every_page_is_forwarded_then_completion_fires() {
        let counter = Arc::new(CompletionCounter::default());
        let items = run(
            vec![Ok(one_row_page(1, "1001")), Ok(one_row_page(2, "1002"))],
            &counter,
        )
        .await;

        let pages: Vec<usize> = items.iter().map(|r| r.as_ref().unwrap().page_num).collect();
        assert_eq!(pages, [1, 2]);
        assert_eq!(counter.pages.load(Ordering::SeqCst), 2);
        assert_eq!(counter.completions.load(Ordering::SeqCst), 1);
        assert_eq!(counter.records.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn error_item_ends_the_stream_without_completion() {
        let counter = Arc::new(CompletionCounter::default());
        let items = run(
            vec![
                Ok(one_row_page(1, "1001")),
                Err(RosterError::TextExtractionFailed {
                    page: 2,
                    detail: "bad text layer".into(),
                }),
                Ok(one_row_page(3, "1003")),
            ],
            &counter,
        )
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(RosterError::TextExtractionFailed { page: 2, .. })
        ));
        assert_eq!(counter.pages.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropped_consumer_stops_forwarding() {
        let counter = Arc::new(CompletionCounter::default());
        let (token_tx, token_rx) = mpsc::channel(2);
        token_tx.send(Ok(one_row_page(1, "1001"))).await.unwrap();
        drop(token_tx);

        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let callback: ProgressCallback = counter.clone();
        forward_pages(token_rx, tx, RosterPipeline::default(), 1, Some(callback)).await;

        assert_eq!(counter.completions.load(Ordering::SeqCst), 0);
    }
}
