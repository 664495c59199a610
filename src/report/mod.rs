//! Console tables and CSV rows for device reports

pub mod export;
pub mod input;

use crate::devices::{BackendStatus, BatchReport};
use crate::graph::intune::{DetectedApp, ManagedDevice};
use colored::{ColoredString, Colorize};
use serde::Serialize;

pub const REPORT_HEADERS: &[&str] = &["ComputerName", "ActiveDirectory", "Intune", "Autopilot"];
pub const DEVICE_HEADERS: &[&str] = &["DeviceName", "OS", "Compliance", "LastSync", "Serial"];
pub const APP_HEADERS: &[&str] = &["Name", "Version", "Publisher"];

const NAME_WIDTH: usize = 24;
const STATUS_WIDTH: usize = 18;

/// Managed device as shown by the listing commands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRow {
    pub device_name: String,
    pub os: String,
    pub compliance: String,
    pub last_sync: String,
    pub serial: String,
}

impl From<&ManagedDevice> for DeviceRow {
    fn from(device: &ManagedDevice) -> Self {
        let os = match (&device.operating_system, &device.os_version) {
            (Some(os), Some(version)) => format!("{} {}", os, version),
            (Some(os), None) => os.clone(),
            _ => "-".to_string(),
        };

        Self {
            device_name: device.display_name().to_string(),
            os,
            compliance: device
                .compliance_state
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            last_sync: device
                .last_sync_date_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "Never".to_string()),
            serial: device.serial().unwrap_or("-").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppRow {
    pub name: String,
    pub version: String,
    pub publisher: String,
}

impl From<&DetectedApp> for AppRow {
    fn from(app: &DetectedApp) -> Self {
        Self {
            name: app.display_name.clone().unwrap_or_else(|| app.id.clone()),
            version: app.version.clone().unwrap_or_else(|| "-".to_string()),
            publisher: app.publisher.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn paint(status: BackendStatus) -> ColoredString {
    let cell = format!("{:<width$}", status.to_string(), width = STATUS_WIDTH);
    match status {
        BackendStatus::Found | BackendStatus::Deleted => cell.green(),
        BackendStatus::WouldDelete => cell.cyan(),
        BackendStatus::NotFound | BackendStatus::NotAttempted => cell.normal(),
        BackendStatus::Multiple(_) | BackendStatus::NoSerialNumber => cell.yellow(),
        BackendStatus::Error | BackendStatus::DeleteFailed => cell.red(),
        BackendStatus::Skipped => cell.dimmed(),
    }
}

/// Print the batch report as a table, followed by any warnings
pub fn print_batch_report(title: &str, report: &BatchReport) {
    println!("\n{} ({} devices)", title.cyan().bold(), report.len());
    println!(
        "{:<nw$} {:<sw$} {:<sw$} {}",
        "ComputerName".bold(),
        "ActiveDirectory".bold(),
        "Intune".bold(),
        "Autopilot".bold(),
        nw = NAME_WIDTH,
        sw = STATUS_WIDTH
    );
    println!("{}", "-".repeat(NAME_WIDTH + STATUS_WIDTH * 3 + 3));

    for row in report.rows() {
        println!(
            "{:<nw$} {} {} {}",
            row.computer_name,
            paint(row.active_directory),
            paint(row.intune),
            paint(row.autopilot),
            nw = NAME_WIDTH
        );
    }

    let notes: Vec<(&str, &String)> = report
        .rows()
        .iter()
        .flat_map(|r| r.notes.iter().map(move |n| (r.computer_name.as_str(), n)))
        .collect();

    if !notes.is_empty() {
        println!();
        for (name, note) in notes {
            println!("{} {}: {}", "!".yellow(), name, note);
        }
    }

    println!(
        "\n{} {} found in at least one directory, {} skipped",
        "→".cyan(),
        report.found_count(),
        report.skipped_count()
    );
}

pub fn print_devices(title: &str, rows: &[DeviceRow]) {
    if rows.is_empty() {
        println!("{} No devices found", "→".cyan());
        return;
    }

    println!("\n{} ({} found)", title.cyan().bold(), rows.len());
    println!(
        "{:<24} {:<24} {:<14} {:<18} {}",
        "DeviceName".bold(),
        "OS".bold(),
        "Compliance".bold(),
        "LastSync".bold(),
        "Serial".bold()
    );
    println!("{}", "-".repeat(100));

    for row in rows {
        let compliance = match row.compliance.as_str() {
            "compliant" => format!("{:<14}", row.compliance).green(),
            "noncompliant" => format!("{:<14}", row.compliance).red(),
            _ => format!("{:<14}", row.compliance).normal(),
        };
        println!(
            "{:<24} {:<24} {} {:<18} {}",
            row.device_name, row.os, compliance, row.last_sync, row.serial
        );
    }
}

pub fn print_apps(device_name: &str, rows: &[AppRow]) {
    if rows.is_empty() {
        println!("{} No applications reported for {}", "→".cyan(), device_name);
        return;
    }

    println!(
        "\n{} {} ({} apps)",
        "Applications on".cyan().bold(),
        device_name.bold(),
        rows.len()
    );
    println!(
        "{:<50} {:<20} {}",
        "Name".bold(),
        "Version".bold(),
        "Publisher".bold()
    );
    println!("{}", "-".repeat(100));

    for row in rows {
        println!("{:<50} {:<20} {}", row.name, row.version, row.publisher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_device_row_from_managed_device() {
        let device = ManagedDevice {
            id: "0f1c".into(),
            device_name: Some("P12345".into()),
            serial_number: Some("SN-1".into()),
            user_principal_name: Some("alice@example.com".into()),
            compliance_state: Some("noncompliant".into()),
            last_sync_date_time: Some(Utc.with_ymd_and_hms(2026, 9, 1, 7, 15, 0).unwrap()),
            operating_system: Some("Windows".into()),
            os_version: Some("10.0.22631".into()),
            model: None,
            manufacturer: None,
        };

        let row = DeviceRow::from(&device);
        assert_eq!(row.device_name, "P12345");
        assert_eq!(row.os, "Windows 10.0.22631");
        assert_eq!(row.compliance, "noncompliant");
        assert_eq!(row.last_sync, "2026-09-01 07:15");
        assert_eq!(row.serial, "SN-1");
    }

    #[test]
    fn test_device_row_placeholders() {
        let device = ManagedDevice {
            id: "0f1c".into(),
            device_name: None,
            serial_number: Some("".into()),
            user_principal_name: None,
            compliance_state: None,
            last_sync_date_time: None,
            operating_system: None,
            os_version: None,
            model: None,
            manufacturer: None,
        };

        let row = DeviceRow::from(&device);
        assert_eq!(row.device_name, "0f1c");
        assert_eq!(row.os, "-");
        assert_eq!(row.last_sync, "Never");
        assert_eq!(row.serial, "-");
    }

    #[test]
    fn test_app_row_defaults() {
        let app = DetectedApp {
            id: "app-1".into(),
            display_name: Some("7-Zip".into()),
            version: None,
            publisher: Some("Igor Pavlov".into()),
            size_in_byte: None,
        };
        let row = AppRow::from(&app);
        assert_eq!(row.name, "7-Zip");
        assert_eq!(row.version, "-");
        assert_eq!(row.publisher, "Igor Pavlov");
    }
}
