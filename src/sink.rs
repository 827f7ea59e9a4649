//! Record sinks: where finalised rows go.
//!
//! The core pipeline only produces ordered [`PharmacyRecord`]s. A
//! [`RecordSink`] consumes them one at a time; [`CsvSink`] writes the fixed
//! roster CSV layout, header first, and `Vec<PharmacyRecord>` simply
//! collects.
//!
//! File output goes through [`write_atomic`] so a crash mid-write never
//! leaves a truncated CSV where a previous good one stood.

use crate::error::RosterError;
use crate::output::PharmacyRecord;
use std::io::Write;
use std::path::Path;

/// Consumer of records in pipeline order.
pub trait RecordSink {
    fn accept(&mut self, record: &PharmacyRecord) -> Result<(), RosterError>;

    /// Flush buffered output. Called once after the last record.
    fn finish(&mut self) -> Result<(), RosterError> {
        Ok(())
    }
}

impl RecordSink for Vec<PharmacyRecord> {
    fn accept(&mut self, record: &PharmacyRecord) -> Result<(), RosterError> {
        self.push(record.clone());
        Ok(())
    }
}

/// CSV writer with the roster header row.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    /// Wrap `inner` and write the header immediately, so an empty roster
    /// still produces a valid CSV.
    pub fn new(inner: W) -> Result<Self, RosterError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(PharmacyRecord::CSV_HEADER)?;
        Ok(Self { writer })
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, RosterError> {
        self.writer
            .into_inner()
            .map_err(|e| RosterError::Internal(format!("CSV flush failed: {}", e)))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn accept(&mut self, record: &PharmacyRecord) -> Result<(), RosterError> {
        self.writer.serialize(record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RosterError> {
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Feed every record to `sink`, then finish it.
pub fn drain_into<S: RecordSink + ?Sized>(
    records: &[PharmacyRecord],
    sink: &mut S,
) -> Result<(), RosterError> {
    for record in records {
        sink.accept(record)?;
    }
    sink.finish()
}

/// Render records as CSV bytes, header included.
pub fn render_csv(records: &[PharmacyRecord]) -> Result<Vec<u8>, RosterError> {
    let mut sink = CsvSink::new(Vec::new())?;
    drain_into(records, &mut sink)?;
    sink.into_inner()
}

/// Write `records` to `path` as CSV.
pub async fn write_csv(path: &Path, records: &[PharmacyRecord]) -> Result<(), RosterError> {
    let bytes = render_csv(records)?;
    write_atomic(path, &bytes).await
}

/// Write `bytes` to `path` via a sibling temp file and a rename, creating
/// the parent directory first.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RosterError> {
    let write_err = |e| RosterError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
