//! Presence records and report rows

use serde::{Serialize, Serializer};
use std::fmt;

/// Outcome for one backend, rendered as a report cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Found,
    NotFound,
    Multiple(usize),
    Error,
    NoSerialNumber,
    NotAttempted,
    Skipped,
    Deleted,
    WouldDelete,
    DeleteFailed,
}

impl BackendStatus {
    pub fn is_found(&self) -> bool {
        matches!(
            self,
            BackendStatus::Found
                | BackendStatus::Deleted
                | BackendStatus::WouldDelete
                | BackendStatus::DeleteFailed
        )
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Found => write!(f, "Found"),
            BackendStatus::NotFound => write!(f, "Not Found"),
            BackendStatus::Multiple(n) => write!(f, "Multiple ({})", n),
            BackendStatus::Error => write!(f, "Error"),
            BackendStatus::NoSerialNumber => write!(f, "No Serial Number"),
            BackendStatus::NotAttempted => write!(f, "Not Attempted"),
            BackendStatus::Skipped => write!(f, "Skipped - Empty"),
            BackendStatus::Deleted => write!(f, "Deleted"),
            BackendStatus::WouldDelete => write!(f, "Would Delete"),
            BackendStatus::DeleteFailed => write!(f, "Delete Failed"),
        }
    }
}

impl Serialize for BackendStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where one device name was found across the three directories.
///
/// Built field by field during a single correlation and handed out by
/// value once complete; there is no way to modify it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePresenceRecord {
    input_name: String,
    legacy_directory_status: BackendStatus,
    legacy_directory_name: Option<String>,
    management_status: BackendStatus,
    management_device_name: Option<String>,
    management_serial_number: Option<String>,
    provisioning_status: BackendStatus,
    provisioning_serial_number: Option<String>,
    warnings: Vec<String>,
}

impl DevicePresenceRecord {
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn legacy_directory_found(&self) -> bool {
        self.legacy_directory_status == BackendStatus::Found
    }

    pub fn legacy_directory_name(&self) -> Option<&str> {
        self.legacy_directory_name.as_deref()
    }

    pub fn management_found(&self) -> bool {
        self.management_status == BackendStatus::Found
    }

    pub fn management_device_name(&self) -> Option<&str> {
        self.management_device_name.as_deref()
    }

    pub fn management_serial_number(&self) -> Option<&str> {
        self.management_serial_number.as_deref()
    }

    pub fn provisioning_found(&self) -> bool {
        self.provisioning_status == BackendStatus::Found
    }

    pub fn provisioning_serial_number(&self) -> Option<&str> {
        self.provisioning_serial_number.as_deref()
    }

    pub fn legacy_directory_status(&self) -> BackendStatus {
        self.legacy_directory_status
    }

    pub fn management_status(&self) -> BackendStatus {
        self.management_status
    }

    pub fn provisioning_status(&self) -> BackendStatus {
        self.provisioning_status
    }

    /// Ambiguity and failure notes collected during the search
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}: AD {} | Intune {} | Autopilot {}",
            self.input_name,
            self.legacy_directory_status,
            self.management_status,
            self.provisioning_status
        )
    }

    pub fn to_row(&self) -> ReportRow {
        ReportRow {
            computer_name: self.input_name.clone(),
            active_directory: self.legacy_directory_status,
            intune: self.management_status,
            autopilot: self.provisioning_status,
            notes: self.warnings.clone(),
        }
    }
}

/// In-progress record for one correlation
#[derive(Debug)]
pub(crate) struct PresenceDraft {
    record: DevicePresenceRecord,
}

impl PresenceDraft {
    pub(crate) fn new(input_name: &str) -> Self {
        Self {
            record: DevicePresenceRecord {
                input_name: input_name.to_string(),
                legacy_directory_status: BackendStatus::NotAttempted,
                legacy_directory_name: None,
                management_status: BackendStatus::NotAttempted,
                management_device_name: None,
                management_serial_number: None,
                provisioning_status: BackendStatus::NotAttempted,
                provisioning_serial_number: None,
                warnings: Vec::new(),
            },
        }
    }

    pub(crate) fn legacy_found(&mut self, name: String) {
        self.record.legacy_directory_status = BackendStatus::Found;
        self.record.legacy_directory_name = Some(name);
    }

    pub(crate) fn legacy_status(&mut self, status: BackendStatus) {
        self.record.legacy_directory_status = status;
    }

    pub(crate) fn management_found(&mut self, device_name: String, serial: Option<String>) {
        self.record.management_status = BackendStatus::Found;
        self.record.management_device_name = Some(device_name);
        self.record.management_serial_number = serial;
    }

    pub(crate) fn management_status(&mut self, status: BackendStatus) {
        self.record.management_status = status;
    }

    pub(crate) fn provisioning_found(&mut self, serial: String) {
        self.record.provisioning_status = BackendStatus::Found;
        self.record.provisioning_serial_number = Some(serial);
    }

    pub(crate) fn provisioning_status(&mut self, status: BackendStatus) {
        self.record.provisioning_status = status;
    }

    pub(crate) fn warn(&mut self, message: String) {
        self.record.warnings.push(message);
    }

    pub(crate) fn finish(self) -> DevicePresenceRecord {
        debug_assert!(
            !self.record.provisioning_found() || self.record.management_serial_number.is_some(),
            "provisioning match without a management serial number"
        );
        self.record
    }
}

/// One line of the final report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "ComputerName")]
    pub computer_name: String,
    #[serde(rename = "ActiveDirectory")]
    pub active_directory: BackendStatus,
    #[serde(rename = "Intune")]
    pub intune: BackendStatus,
    #[serde(rename = "Autopilot")]
    pub autopilot: BackendStatus,
    #[serde(skip)]
    pub notes: Vec<String>,
}

impl ReportRow {
    /// Row for a blank input entry
    pub fn skipped(raw_name: &str) -> Self {
        Self {
            computer_name: raw_name.to_string(),
            active_directory: BackendStatus::Skipped,
            intune: BackendStatus::Skipped,
            autopilot: BackendStatus::Skipped,
            notes: Vec::new(),
        }
    }
}

/// Ordered, append-only list of report rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    rows: Vec<ReportRow>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows where the device was found in at least one directory
    pub fn found_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| {
                r.active_directory.is_found() || r.intune.is_found() || r.autopilot.is_found()
            })
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.active_directory == BackendStatus::Skipped)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(BackendStatus::NotFound.to_string(), "Not Found");
        assert_eq!(BackendStatus::Skipped.to_string(), "Skipped - Empty");
        assert_eq!(BackendStatus::Multiple(3).to_string(), "Multiple (3)");
        assert_eq!(BackendStatus::NoSerialNumber.to_string(), "No Serial Number");
    }

    #[test]
    fn test_draft_to_row() {
        let mut draft = PresenceDraft::new("P12345");
        draft.legacy_found("P12345".into());
        draft.management_found("P12345".into(), Some("SN-1".into()));
        draft.provisioning_found("SN-1".into());
        let record = draft.finish();

        assert!(record.legacy_directory_found());
        assert!(record.management_found());
        assert!(record.provisioning_found());
        assert_eq!(record.management_serial_number(), Some("SN-1"));

        let row = record.to_row();
        assert_eq!(row.computer_name, "P12345");
        assert_eq!(row.autopilot, BackendStatus::Found);
        assert_eq!(
            record.summary_line(),
            "P12345: AD Found | Intune Found | Autopilot Found"
        );
    }

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::new();
        report.push(ReportRow::skipped(""));
        report.push(ReportRow {
            computer_name: "P1".into(),
            active_directory: BackendStatus::NotFound,
            intune: BackendStatus::Deleted,
            autopilot: BackendStatus::NotAttempted,
            notes: Vec::new(),
        });

        assert_eq!(report.len(), 2);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.found_count(), 1);
    }
}
