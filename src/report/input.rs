//! Device name input from CSV

use crate::error::{Dx365Error, Result};
use std::path::Path;

/// Column holding the device names
pub const ASSET_TAG_COLUMN: &str = "Asset Tag";

const BOM: char = '\u{feff}';

/// Read the `Asset Tag` column of a CSV file.
///
/// Blank cells are kept so they show up as skipped rows in the report.
/// Fully empty lines are ignored by the CSV reader.
pub fn read_asset_tags(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Dx365Error::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
    })?;
    parse_asset_tags(&content)
}

pub fn parse_asset_tags(content: &str) -> Result<Vec<String>> {
    let content = content.strip_prefix(BOM).unwrap_or(content);

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let column = rdr
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(ASSET_TAG_COLUMN))
        .ok_or_else(|| {
            Dx365Error::InvalidConfig(format!(
                "Input file has no '{}' column",
                ASSET_TAG_COLUMN
            ))
        })?;

    let mut names = Vec::new();
    for record in rdr.records() {
        let record = record?;
        names.push(record.get(column).unwrap_or_default().to_string());
    }

    tracing::debug!(count = names.len(), "Read asset tags");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_column_and_keeps_blanks() {
        let csv = "Asset Tag,Owner\nP12345,alice\n,bob\nGHOST-DEVICE,\n";
        let names = parse_asset_tags(csv).unwrap();
        assert_eq!(names, vec!["P12345", "", "GHOST-DEVICE"]);
    }

    #[test]
    fn test_bom_and_header_case_are_tolerated() {
        let names = parse_asset_tags("\u{feff}Location, asset tag \nHQ,P1\n").unwrap();
        assert_eq!(names, vec!["P1"]);
    }

    #[test]
    fn test_short_rows_read_as_blank() {
        let names = parse_asset_tags("Owner,Asset Tag\nalice\nbob,P2\n").unwrap();
        assert_eq!(names, vec!["", "P2"]);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let err = parse_asset_tags("Name\nP1\n").unwrap_err();
        assert!(matches!(err, Dx365Error::InvalidConfig(_)));
        assert!(err.to_string().contains("Asset Tag"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBFAsset Tag\nP12345\n").unwrap();

        let names = read_asset_tags(file.path()).unwrap();
        assert_eq!(names, vec!["P12345"]);
    }

    #[test]
    fn test_unreadable_file_is_fatal() {
        let err = read_asset_tags(Path::new("/nonexistent/devices.csv")).unwrap_err();
        assert!(matches!(err, Dx365Error::InvalidConfig(_)));
    }
}
