//! CSV report export
//!
//! Reports are written as UTF-8 with a byte-order mark so they open cleanly
//! in Excel.

use crate::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `<prefix>_Report_<YYYYMMDD_HHMMSS>.csv`
pub fn timestamped_filename(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}_Report_{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Write `rows` under a header line, BOM first
pub fn write_csv_with_bom<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    wtr.write_record(headers)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a timestamped report into `dir`, creating it if needed
pub fn export_csv<T: Serialize>(
    dir: &Path,
    prefix: &str,
    headers: &[&str],
    rows: &[T],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(timestamped_filename(prefix, Local::now()));
    write_csv_with_bom(&path, headers, rows)?;

    tracing::info!(path = %path.display(), rows = rows.len(), "Report exported");
    Ok(path)
}
