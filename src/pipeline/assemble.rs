//! Record assembly: turn one page of positioned tokens into roster rows.
//!
//! ## How rows are found
//!
//! Every roster row begins with a purely numeric license number in the
//! leftmost column. Those tokens are the only reliable row anchors, so:
//!
//! 1. tokens above the page header cutoff are dropped;
//! 2. the `top` of every numeric license-number token becomes a row start;
//! 3. row `i` owns every token with `start_i - tolerance <= top < start_{i+1}`
//!    (the next *distinct* start, so rows anchored at the same height
//!    never end up empty);
//! 4. tokens within `first_line_band` of the start form the row's first
//!    line and fill every column, later tokens are continuation lines that
//!    only extend the address, dba and expiration date.
//!
//! The tolerance means a token sitting just above the next row's anchor
//! belongs to both rows, exactly as the roster has always been read.

use crate::config::PageLayout;
use crate::output::PharmacyRecord;
use crate::pipeline::address::AddressDecomposer;
use crate::pipeline::columns::Column;
use crate::pipeline::dates::{find_date, normalize_date};
use crate::pipeline::extract::{PageTokens, Token};
use std::cmp::Ordering;
use tracing::debug;

/// A roster row as read off the page, before address decomposition and
/// date formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub license_no: String,
    pub license_type: String,
    pub licensee_name: String,
    pub dba: String,
    pub address: String,
    pub ssn_fein: String,
    pub issue_date: String,
    pub exp_date: String,
}

impl RawRecord {
    /// Decompose the address and normalise both dates.
    pub fn finalize(self, decomposer: &AddressDecomposer) -> PharmacyRecord {
        let parsed = decomposer.decompose(&self.address);
        PharmacyRecord {
            license_no: self.license_no,
            license_type: self.license_type,
            licensee_name: self.licensee_name,
            dba: self.dba,
            address: self.address,
            street: parsed.street,
            city: parsed.city,
            state: parsed.state,
            zip: parsed.zip,
            ssn_fein: self.ssn_fein,
            issue_date: normalize_date(&self.issue_date),
            exp_date: normalize_date(&self.exp_date),
        }
    }

    fn field_mut(&mut self, column: Column) -> Option<&mut String> {
        match column {
            Column::LicenseNo => Some(&mut self.license_no),
            Column::LicenseType => Some(&mut self.license_type),
            Column::LicenseeName => Some(&mut self.licensee_name),
            Column::Dba => Some(&mut self.dba),
            Column::Address => Some(&mut self.address),
            Column::SsnFein => Some(&mut self.ssn_fein),
            Column::Dates => None,
        }
    }
}

/// Groups a page's tokens into [`RawRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    layout: PageLayout,
}

impl RecordAssembler {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    /// Assemble every row on `page`, in ascending row-start order.
    ///
    /// A page with no numeric license-number tokens yields no rows.
    pub fn assemble_page(&self, page: &PageTokens) -> Vec<RawRecord> {
        let cutoff = self.layout.header_cutoff_for(page.page_number);
        let content: Vec<&Token> = page.tokens.iter().filter(|t| t.top >= cutoff).collect();

        let starts = self.row_starts(&content);
        debug!(
            "Page {}: {} content tokens, {} row starts",
            page.page_number,
            content.len(),
            starts.len()
        );

        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                // Equal starts share the extent up to the next distinct start.
                let end = starts[i + 1..]
                    .iter()
                    .copied()
                    .find(|&next| next > start)
                    .unwrap_or(f64::INFINITY);
                self.assemble_row(&content, start, end)
            })
            .collect()
    }

    /// Sorted `top` of every numeric token in the license-number column.
    fn row_starts(&self, content: &[&Token]) -> Vec<f64> {
        let Some(range) = self.layout.columns.range(Column::LicenseNo) else {
            return Vec::new();
        };
        let mut starts: Vec<f64> = content
            .iter()
            .filter(|t| range.contains(t.x0) && is_license_number(&t.text))
            .map(|t| t.top)
            .collect();
        starts.sort_by(f64::total_cmp);
        starts
    }

    fn assemble_row(&self, content: &[&Token], start: f64, end: f64) -> RawRecord {
        let lower = start - self.layout.row_start_tolerance;
        let band = start + self.layout.first_line_band;

        let (mut first_line, mut continuation): (Vec<&Token>, Vec<&Token>) = content
            .iter()
            .copied()
            .filter(|t| lower <= t.top && t.top < end)
            .partition(|t| t.top < band);

        first_line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
        continuation.sort_by(|a, b| reading_order(a, b));

        let mut record = RawRecord::default();
        let mut dates_text = String::new();

        for token in &first_line {
            match self.layout.columns.classify(token.x0) {
                Some(Column::Dates) => push_word(&mut dates_text, &token.text),
                Some(column) => {
                    if let Some(field) = record.field_mut(column) {
                        push_word(field, &token.text);
                    }
                }
                None => {}
            }
        }

        if let Some(date) = find_date(&dates_text) {
            record.issue_date = date.to_string();
        }

        for token in &continuation {
            match self.layout.columns.classify(token.x0) {
                Some(Column::Address) => push_word(&mut record.address, &token.text),
                Some(Column::Dba) if record.dba.is_empty() => {
                    record.dba = token.text.clone();
                }
                Some(Column::Dates) if record.exp_date.is_empty() => {
                    if let Some(date) = find_date(&token.text) {
                        record.exp_date = date.to_string();
                    }
                }
                _ => {}
            }
        }

        record.address = clean_address(&record.address, &self.layout.footer_marker);
        record
    }
}

/// Non-empty and made only of ASCII digits.
pub fn is_license_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Collapse whitespace runs and cut everything from the footer marker on.
pub fn clean_address(raw: &str, footer_marker: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if footer_marker.is_empty() {
        return collapsed;
    }
    match collapsed.find(footer_marker) {
        Some(idx) => collapsed[..idx].trim().to_string(),
        None => collapsed,
    }
}

fn reading_order(a: &Token, b: &Token) -> Ordering {
    a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0))
}

fn push_word(field: &mut String, word: &str) {
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(word);
}
