//! End-to-end tests against a real roster PDF.
//!
//! These need a pdfium library and `test_cases/CommunityPharmacyRoster.pdf`.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! The network test additionally needs `E2E_NETWORK=1`.

use futures::StreamExt;
use pharmacy_roster::{
    convert, convert_from_bytes, convert_stream, convert_to_csv, inspect, PageSelection,
    RosterConfig, DEFAULT_ROSTER_URL,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn roster_pdf() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/CommunityPharmacyRoster.pdf")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            println!("       Run: curl -o test_cases/CommunityPharmacyRoster.pdf {DEFAULT_ROSTER_URL}");
            return;
        }
        p
    }};
}

fn input(p: &PathBuf) -> String {
    p.to_string_lossy().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect() {
    let pdf = e2e_skip_unless_ready!(roster_pdf());
    let meta = inspect(input(&pdf)).await.expect("inspect failed");
    assert!(meta.page_count > 0);
    println!("pages={} version={}", meta.page_count, meta.pdf_version);
}

#[tokio::test]
async fn test_full_roster() {
    let pdf = e2e_skip_unless_ready!(roster_pdf());
    let output = convert(input(&pdf), &RosterConfig::default())
        .await
        .expect("conversion failed");

    assert!(!output.records.is_empty(), "no records extracted");
    assert_eq!(output.stats.total_records, output.records.len());
    assert_eq!(output.stats.processed_pages, output.metadata.page_count);

    for r in &output.records {
        assert!(!r.license_no.is_empty());
        assert!(!r.address.contains("Total Licenses:"));
    }

    // Nearly every Nebraska address should end in a state/ZIP.
    let anchored = output.records.iter().filter(|r| !r.state.is_empty()).count();
    assert!(
        anchored * 10 >= output.records.len() * 9,
        "only {anchored}/{} addresses anchored",
        output.records.len()
    );

    for r in output.records.iter().take(5) {
        println!("{}", r.summary());
    }
}

#[tokio::test]
async fn test_first_page_only() {
    let pdf = e2e_skip_unless_ready!(roster_pdf());
    let config = RosterConfig::builder()
        .pages(PageSelection::Single(1))
        .build()
        .unwrap();
    let output = convert(input(&pdf), &config).await.expect("conversion failed");
    assert_eq!(output.pages.len(), 1);
    assert_eq!(output.pages[0].page_num, 1);
}

#[tokio::test]
async fn test_stream_matches_eager() {
    let pdf = e2e_skip_unless_ready!(roster_pdf());
    let config = RosterConfig::default();

    let eager = convert(input(&pdf), &config).await.expect("conversion failed");

    let mut stream = convert_stream(input(&pdf), &config).await.expect("stream failed");
    let mut streamed = Vec::new();
    let mut last_page = 0;
    while let Some(page) = stream.next().await {
        let page = page.expect("page failed");
        assert!(page.page_num > last_page, "pages out of order");
        last_page = page.page_num;
        streamed.extend(page.records);
    }
    assert_eq!(streamed, eager.records);
}

#[tokio::test]
async fn test_bytes_and_csv() {
    let pdf = e2e_skip_unless_ready!(roster_pdf());
    let bytes = std::fs::read(&pdf).unwrap();
    let config = RosterConfig::default();

    let from_bytes = convert_from_bytes(&bytes, &config).await.expect("bytes failed");

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("data/community_pharmacies.csv");
    let stats = convert_to_csv(input(&pdf), &csv_path, &config)
        .await
        .expect("csv failed");
    assert_eq!(stats.total_records, from_bytes.records.len());

    let text = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.lines().count(), from_bytes.records.len() + 1);
}

#[tokio::test]
async fn test_download_published_roster() {
    if std::env::var("E2E_ENABLED").is_err() || std::env::var("E2E_NETWORK").is_err() {
        println!("SKIP — set E2E_ENABLED=1 E2E_NETWORK=1 to download the roster");
        return;
    }
    let output = convert(DEFAULT_ROSTER_URL, &RosterConfig::default())
        .await
        .expect("download conversion failed");
    assert!(!output.records.is_empty());
}
