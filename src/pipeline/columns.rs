//! Column classification: map a token's horizontal position to a named
//! roster column.
//!
//! The roster has no ruling lines, so the only reliable column signal is
//! where a word starts on the page. Each column owns a half-open interval
//! `[x_min, x_max)` in PDF points; the intervals are calibrated once for a
//! given document layout and then treated as a fixed lookup table.

use crate::error::RosterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven columns of the community pharmacy roster, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    LicenseNo,
    LicenseType,
    LicenseeName,
    Dba,
    Address,
    SsnFein,
    Dates,
}

impl Column {
    /// Every column in left-to-right order.
    pub const ALL: [Column; 7] = [
        Column::LicenseNo,
        Column::LicenseType,
        Column::LicenseeName,
        Column::Dba,
        Column::Address,
        Column::SsnFein,
        Column::Dates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::LicenseNo => "license_no",
            Column::LicenseType => "license_type",
            Column::LicenseeName => "licensee_name",
            Column::Dba => "dba",
            Column::Address => "address",
            Column::SsnFein => "ssn_fein",
            Column::Dates => "dates",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named half-open interval on the horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub column: Column,
    pub x_min: f64,
    pub x_max: f64,
}

impl ColumnRange {
    pub const fn new(column: Column, x_min: f64, x_max: f64) -> Self {
        Self {
            column,
            x_min,
            x_max,
        }
    }

    /// `x_min <= x0 < x_max`.
    pub fn contains(&self, x0: f64) -> bool {
        self.x_min <= x0 && x0 < self.x_max
    }
}

/// Ordered, non-overlapping column ranges for one document layout.
///
/// Built once (usually via [`ColumnLayout::default`]) and shared read-only
/// by the record assembler for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    ranges: Vec<ColumnRange>,
}

impl Default for ColumnLayout {
    /// Calibration for the Nebraska DHHS community pharmacy roster.
    fn default() -> Self {
        Self {
            ranges: vec![
                ColumnRange::new(Column::LicenseNo, 0.0, 90.0),
                ColumnRange::new(Column::LicenseType, 90.0, 250.0),
                ColumnRange::new(Column::LicenseeName, 250.0, 375.0),
                ColumnRange::new(Column::Dba, 375.0, 495.0),
                ColumnRange::new(Column::Address, 495.0, 640.0),
                ColumnRange::new(Column::SsnFein, 640.0, 715.0),
                ColumnRange::new(Column::Dates, 715.0, 800.0),
            ],
        }
    }
}

impl ColumnLayout {
    /// Build a layout from explicit ranges, rejecting tables that could
    /// classify one position into two columns.
    ///
    /// Ranges must be non-empty, sorted left to right, non-overlapping,
    /// name each column at most once, and include [`Column::LicenseNo`]
    /// (row detection depends on it).
    pub fn new(ranges: Vec<ColumnRange>) -> Result<Self, RosterError> {
        let layout = Self { ranges };
        layout.validate()?;
        Ok(layout)
    }

    pub(crate) fn validate(&self) -> Result<(), RosterError> {
        for r in &self.ranges {
            if !(r.x_min < r.x_max) {
                return Err(RosterError::InvalidConfig(format!(
                    "column '{}' has an empty range [{}, {})",
                    r.column, r.x_min, r.x_max
                )));
            }
        }
        for pair in self.ranges.windows(2) {
            if pair[1].x_min < pair[0].x_max {
                return Err(RosterError::InvalidConfig(format!(
                    "column '{}' overlaps or precedes column '{}'",
                    pair[1].column, pair[0].column
                )));
            }
        }
        for (i, r) in self.ranges.iter().enumerate() {
            if self.ranges[..i].iter().any(|p| p.column == r.column) {
                return Err(RosterError::InvalidConfig(format!(
                    "column '{}' is defined twice",
                    r.column
                )));
            }
        }
        if self.range(Column::LicenseNo).is_none() {
            return Err(RosterError::InvalidConfig(
                "layout must define the license_no column".into(),
            ));
        }
        Ok(())
    }

    /// Return the first column whose interval contains `x0`.
    pub fn classify(&self, x0: f64) -> Option<Column> {
        self.ranges
            .iter()
            .find(|r| r.contains(x0))
            .map(|r| r.column)
    }

    pub fn range(&self, column: Column) -> Option<&ColumnRange> {
        self.ranges.iter().find(|r| r.column == column)
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }
}
