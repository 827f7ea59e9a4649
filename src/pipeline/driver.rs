//! Pipeline driver: pages of tokens in, ordered roster records out.
//!
//! Pure and synchronous. The async entry points in [`crate::convert`] and
//! [`crate::stream`] feed it pages as the extractor produces them; tests
//! and callers with their own token source can use it directly.

use crate::config::RosterConfig;
use crate::output::{PageResult, PharmacyRecord, RosterStats};
use crate::pipeline::address::AddressDecomposer;
use crate::pipeline::assemble::RecordAssembler;
use crate::pipeline::dates::is_output_date;
use crate::pipeline::extract::PageTokens;
use std::time::Instant;
use tracing::warn;

/// Assembler plus decomposer, configured once per run.
#[derive(Debug, Clone, Default)]
pub struct RosterPipeline {
    assembler: RecordAssembler,
    decomposer: AddressDecomposer,
}

impl RosterPipeline {
    pub fn new(assembler: RecordAssembler, decomposer: AddressDecomposer) -> Self {
        Self {
            assembler,
            decomposer,
        }
    }

    pub fn from_config(config: &RosterConfig) -> Self {
        Self::new(
            RecordAssembler::new(config.layout.clone()),
            AddressDecomposer::new(config.address_rules.clone()),
        )
    }

    /// Assemble and finalise every row on one page.
    pub fn process_page(&self, page: &PageTokens) -> PageResult {
        let start = Instant::now();
        let records: Vec<PharmacyRecord> = self
            .assembler
            .assemble_page(page)
            .into_iter()
            .map(|raw| raw.finalize(&self.decomposer))
            .collect();

        for r in &records {
            if !r.address.is_empty() && !r.parsed_address().is_anchored() {
                warn!(
                    "Page {}: license {} address has no state/ZIP: {:?}",
                    page.page_number, r.license_no, r.address
                );
            }
            for date in [&r.issue_date, &r.exp_date] {
                if has_raw_date(date) {
                    warn!(
                        "Page {}: license {} has unparseable date {:?}",
                        page.page_number, r.license_no, date
                    );
                }
            }
        }

        PageResult {
            page_num: page.page_number,
            token_count: page.tokens.len(),
            records,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Process every page in page-number order and concatenate the rows.
    pub fn process_document(&self, mut pages: Vec<PageTokens>) -> Vec<PharmacyRecord> {
        pages.sort_by_key(|p| p.page_number);
        pages
            .iter()
            .flat_map(|p| self.process_page(p).records)
            .collect()
    }
}

/// Build run counters from per-page results. Duration fields are left at
/// zero for the caller to fill in.
pub fn tally(pages: &[PageResult], total_pages: usize) -> RosterStats {
    let records = || pages.iter().flat_map(|p| p.records.iter());
    RosterStats {
        total_pages,
        processed_pages: pages.len(),
        empty_pages: pages.iter().filter(|p| p.records.is_empty()).count(),
        total_records: records().count(),
        unanchored_addresses: records()
            .filter(|r| !r.parsed_address().is_anchored())
            .count(),
        unnormalized_dates: records()
            .filter(|r| has_raw_date(&r.issue_date) || has_raw_date(&r.exp_date))
            .count(),
        ..Default::default()
    }
}

/// A non-empty date that was left in its source form.
fn has_raw_date(value: &str) -> bool {
    !value.is_empty() && !is_output_date(value)
}
