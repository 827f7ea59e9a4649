//! Configuration types for roster extraction.
//!
//! Everything the extraction engine needs to know about the document is
//! held in [`RosterConfig`], built via its [`RosterConfigBuilder`]:
//!
//! - [`PageLayout`] — column ranges, header cutoffs, row tolerances and the
//!   footer marker. These are layout calibration for one specific PDF and
//!   are fixed for the whole run.
//! - [`AddressRules`] — the street-suffix and unit-suffix vocabulary used
//!   by the address decomposer.
//! - I/O knobs — page selection, password, download timeout, progress.
//!
//! The defaults reproduce the Nebraska DHHS community pharmacy roster.
//! Tests and alternate rosters swap in their own layouts through the
//! builder instead of patching globals.

use crate::error::RosterError;
use crate::pipeline::columns::ColumnLayout;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Published location of the community pharmacy roster.
pub const DEFAULT_ROSTER_URL: &str =
    "https://dhhs.ne.gov/licensure/Documents/CommunityPharmacyRoster.pdf";

/// Configuration for a roster extraction.
///
/// Built via [`RosterConfig::builder()`] or using [`RosterConfig::default()`].
///
/// # Example
/// ```rust
/// use pharmacy_roster::{PageSelection, RosterConfig};
///
/// let config = RosterConfig::builder()
///     .pages(PageSelection::Range(1, 3))
///     .download_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.first_page_header_cutoff, 130.0);
/// ```
#[derive(Clone)]
pub struct RosterConfig {
    /// Geometry of the roster table.
    pub layout: PageLayout,

    /// Vocabulary for splitting street from city.
    pub address_rules: AddressRules,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for RosterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterConfig")
            .field("layout", &self.layout)
            .field("address_rules", &self.address_rules)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            layout: PageLayout::default(),
            address_rules: AddressRules::default(),
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl RosterConfig {
    /// Create a new builder for `RosterConfig`.
    pub fn builder() -> RosterConfigBuilder {
        RosterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RosterConfig`].
#[derive(Debug)]
pub struct RosterConfigBuilder {
    config: RosterConfig,
}

impl RosterConfigBuilder {
    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn columns(mut self, columns: ColumnLayout) -> Self {
        self.config.layout.columns = columns;
        self
    }

    pub fn address_rules(mut self, rules: AddressRules) -> Self {
        self.config.address_rules = rules;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RosterConfig, RosterError> {
        self.config.layout.validate()?;
        if self.config.address_rules.street_suffixes.is_empty() {
            return Err(RosterError::InvalidConfig(
                "street suffix vocabulary must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Geometry of the roster table, in PDF points from the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Horizontal column ranges.
    pub columns: ColumnLayout,

    /// Tokens above this `top` on page 1 are the title block. Default: 130.
    pub first_page_header_cutoff: f64,

    /// Tokens above this `top` on later pages are the repeated column
    /// header. Default: 50.
    pub header_cutoff: f64,

    /// How far above a row-start a token may sit and still belong to the
    /// row (font ascent differences). Default: 2.
    pub row_start_tolerance: f64,

    /// Tokens less than this far below the row-start are on the row's
    /// first physical line. Default: 5.
    pub first_line_band: f64,

    /// Page-footer label that sometimes bleeds into the last address.
    /// Default: `"Total Licenses:"`.
    pub footer_marker: String,

    /// Max horizontal gap between two glyphs of one word. Default: 3.
    pub word_gap: f64,

    /// Max vertical drift between two glyphs of one word. Default: 3.
    pub line_gap: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            columns: ColumnLayout::default(),
            first_page_header_cutoff: 130.0,
            header_cutoff: 50.0,
            row_start_tolerance: 2.0,
            first_line_band: 5.0,
            footer_marker: "Total Licenses:".to_string(),
            word_gap: 3.0,
            line_gap: 3.0,
        }
    }
}

impl PageLayout {
    /// Header cutoff for a 1-based page number.
    pub fn header_cutoff_for(&self, page_number: usize) -> f64 {
        if page_number == 1 {
            self.first_page_header_cutoff
        } else {
            self.header_cutoff
        }
    }

    pub(crate) fn validate(&self) -> Result<(), RosterError> {
        self.columns.validate()?;
        let non_negative = [
            ("first_page_header_cutoff", self.first_page_header_cutoff),
            ("header_cutoff", self.header_cutoff),
            ("row_start_tolerance", self.row_start_tolerance),
            ("first_line_band", self.first_line_band),
            ("word_gap", self.word_gap),
            ("line_gap", self.line_gap),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(RosterError::InvalidConfig(format!(
                    "{name} must be a finite value ≥ 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ── Address vocabulary ───────────────────────────────────────────────────

/// Street-suffix vocabulary for the address decomposer.
///
/// Entries are matched against a token lowercased with trailing `,` / `.`
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRules {
    /// Words that end a street (`st`, `ave`, `suite`, …).
    pub street_suffixes: BTreeSet<String>,

    /// Words whose following unit designator (`200`, `#4`, `2A`, `B`)
    /// also belongs to the street.
    pub unit_suffixes: BTreeSet<String>,
}

const DEFAULT_STREET_SUFFIXES: &[&str] = &[
    "st", "st.", "street", "ave", "ave.", "avenue", "rd", "rd.", "road", "dr", "dr.", "drive",
    "ln", "ln.", "lane", "ct", "ct.", "court", "blvd", "blvd.", "boulevard", "way", "pl", "pl.",
    "place", "cir", "cir.", "circle", "hwy", "hwy.", "highway", "pkwy", "pkwy.", "parkway", "ter",
    "ter.", "terrace", "trl", "trl.", "trail", "ste", "suite", "unit", "apt", "apt.", "floor",
    "fl", "fl.", "room", "rm", "rm.", "#",
];

const DEFAULT_UNIT_SUFFIXES: &[&str] = &[
    "ste", "suite", "unit", "apt", "room", "rm", "floor", "fl", "hwy", "highway", "route", "rt",
];

impl Default for AddressRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_STREET_SUFFIXES.iter().copied(),
            DEFAULT_UNIT_SUFFIXES.iter().copied(),
        )
    }
}

impl AddressRules {
    /// Build a vocabulary; entries are lowercased.
    pub fn new<S, U>(street_suffixes: S, unit_suffixes: U) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        Self {
            street_suffixes: street_suffixes
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            unit_suffixes: unit_suffixes
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_street_suffix(&self, folded: &str) -> bool {
        self.street_suffixes.contains(folded)
    }

    pub fn is_unit_suffix(&self, folded: &str) -> bool {
        self.unit_suffixes.contains(folded)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Extract all pages (default).
    #[default]
    All,
    /// Extract a single page (1-indexed).
    Single(usize),
    /// Extract a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Extract specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
