//! Output types returned by the conversion entry points.

use crate::pipeline::address::ParsedAddress;
use serde::{Deserialize, Serialize};

/// One finalised roster row.
///
/// Field order is the CSV column order. Every field is a string and an
/// empty string means "not present in the source". `license_no` is never
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PharmacyRecord {
    pub license_no: String,
    pub license_type: String,
    pub licensee_name: String,
    pub dba: String,
    pub address: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub ssn_fein: String,
    pub issue_date: String,
    pub exp_date: String,
}

impl PharmacyRecord {
    /// CSV header, in field order.
    pub const CSV_HEADER: [&'static str; 12] = [
        "license_no",
        "license_type",
        "licensee_name",
        "dba",
        "address",
        "street",
        "city",
        "state",
        "zip",
        "ssn_fein",
        "issue_date",
        "exp_date",
    ];

    /// The decomposed address as a standalone value.
    pub fn parsed_address(&self) -> ParsedAddress {
        ParsedAddress {
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
        }
    }

    /// One-line summary: `license_no: licensee_name - address`.
    pub fn summary(&self) -> String {
        format!("{}: {} - {}", self.license_no, self.licensee_name, self.address)
    }
}

/// Records produced from a single page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Tokens the extractor produced for the page, header included.
    pub token_count: usize,
    /// Rows in ascending vertical order.
    pub records: Vec<PharmacyRecord>,
    /// Page processing time.
    pub duration_ms: u64,
}

/// Complete result of converting one roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterOutput {
    /// Every record, in page order then row order.
    pub records: Vec<PharmacyRecord>,
    /// Per-page breakdown, sorted by page number.
    pub pages: Vec<PageResult>,
    /// Document-level metadata.
    pub metadata: DocumentMetadata,
    /// Run statistics.
    pub stats: RosterStats,
}

/// Counters describing how cleanly the roster was read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages whose tokens were assembled.
    pub processed_pages: usize,
    /// Selected pages that yielded no rows.
    pub empty_pages: usize,
    /// Records produced.
    pub total_records: usize,
    /// Records whose address had no trailing state/ZIP, empty addresses
    /// included.
    pub unanchored_addresses: usize,
    /// Records with a non-empty date that could not be normalised.
    pub unnormalized_dates: usize,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
    /// Time spent reading the PDF text layer and assembling rows.
    pub extract_duration_ms: u64,
}

/// Metadata read from the PDF's document information dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PharmacyRecord {
        PharmacyRecord {
            license_no: "1001".into(),
            licensee_name: "Acme Drug".into(),
            address: "1 Main St Omaha NE 68102".into(),
            street: "1 Main St".into(),
            city: "Omaha".into(),
            state: "NE".into(),
            zip: "68102".into(),
            ..Default::default()
        }
    }

    #[test]
    fn summary_line() {
        assert_eq!(sample().summary(), "1001: Acme Drug - 1 Main St Omaha NE 68102");
    }

    #[test]
    fn serialized_fields_match_header() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), PharmacyRecord::CSV_HEADER.len());
        for name in PharmacyRecord::CSV_HEADER {
            assert!(obj.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn parsed_address_view() {
        let p = sample().parsed_address();
        assert!(p.is_anchored());
        assert_eq!(p.city, "Omaha");
    }
}
