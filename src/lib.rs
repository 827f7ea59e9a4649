//! # pharmacy-roster
//!
//! Turn the Nebraska DHHS Community Pharmacy Roster PDF into structured
//! records and CSV.
//!
//! ## Why this crate?
//!
//! The roster is published only as a PDF laid out as a table with no
//! ruling lines. Generic PDF-to-text tools flatten it into a stream of
//! words where one pharmacy's address wraps into the next row. This crate
//! reads the text layer with its coordinates, rebuilds rows from the
//! license-number column, stitches continuation lines back onto their row,
//! and splits each address into street / city / state / ZIP.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   pdfium text layer → positioned word tokens (spawn_blocking)
//!  ├─ 3. Assemble  tokens → rows, continuation lines merged
//!  ├─ 4. Finalise  address decomposition + ISO dates
//!  └─ 5. Output    ordered records, CSV, per-page stats
//! ```
//!
//! Steps 3 and 4 are pure: [`records_from_pages`] runs them on tokens from
//! any source.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pharmacy_roster::{convert, RosterConfig, DEFAULT_ROSTER_URL};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RosterConfig::default();
//!     let output = convert(DEFAULT_ROSTER_URL, &config).await?;
//!     for record in output.records.iter().take(5) {
//!         println!("{}", record.summary());
//!     }
//!     eprintln!("{} records, {} without state/ZIP",
//!         output.stats.total_records,
//!         output.stats.unanchored_addresses);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `roster2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pharmacy-roster = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Text extraction binds to a pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH` to point at one, place it in the working directory,
//! or install it system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sink;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AddressRules, PageLayout, PageSelection, RosterConfig, RosterConfigBuilder, DEFAULT_ROSTER_URL,
};
pub use convert::{
    convert, convert_from_bytes, convert_resolved, convert_sync, convert_to_csv, inspect,
    inspect_with, records_from_pages,
};
pub use error::RosterError;
pub use output::{DocumentMetadata, PageResult, PharmacyRecord, RosterOutput, RosterStats};
pub use pipeline::address::{AddressDecomposer, ParsedAddress, SplitStrategy};
pub use pipeline::assemble::{RawRecord, RecordAssembler};
pub use pipeline::columns::{Column, ColumnLayout, ColumnRange};
pub use pipeline::dates::normalize_date;
pub use pipeline::driver::RosterPipeline;
pub use pipeline::extract::{PageTokens, Token};
pub use progress::{NoopProgressCallback, ProgressCallback, RosterProgressCallback};
pub use sink::{CsvSink, RecordSink};
pub use stream::{convert_stream, convert_stream_from_bytes, PageStream};
