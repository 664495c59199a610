//! Intune managed device operations
//!
//! Typed wrappers over `deviceManagement/managedDevices` used by the
//! correlator and the listing commands.

use crate::error::Result;
use crate::graph::{GraphClient, PaginatedResponse, filter_endpoint, odata_string};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const MANAGED_DEVICES: &str = "deviceManagement/managedDevices";

const DEVICE_SELECT: &str = "id,deviceName,serialNumber,userPrincipalName,complianceState,\
lastSyncDateTime,operatingSystem,osVersion,model,manufacturer";

/// Intune managed device record
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDevice {
    pub id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub compliance_state: Option<String>,
    #[serde(default)]
    pub last_sync_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

impl ManagedDevice {
    /// Serial number, treating blanks as absent
    pub fn serial(&self) -> Option<&str> {
        self.serial_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(&self.id)
    }
}

/// Application inventory entry reported by a device
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedApp {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub size_in_byte: Option<i64>,
}

fn select(endpoint: String) -> String {
    format!("{}&$select={}", endpoint, DEVICE_SELECT)
}

/// Devices whose name equals `name` exactly (one request, first page only)
pub async fn find_devices_by_name(client: &GraphClient, name: &str) -> Result<Vec<ManagedDevice>> {
    let endpoint = select(filter_endpoint(
        MANAGED_DEVICES,
        &format!("deviceName eq {}", odata_string(name)),
    ));
    let page: PaginatedResponse<ManagedDevice> = client.get(&endpoint).await?;
    Ok(page.value)
}

/// All devices whose primary user is `upn`
pub async fn list_devices_for_user(client: &GraphClient, upn: &str) -> Result<Vec<ManagedDevice>> {
    let endpoint = select(filter_endpoint(
        MANAGED_DEVICES,
        &format!("userPrincipalName eq {}", odata_string(upn)),
    ));
    client.get_all_pages(&endpoint).await
}

/// All devices Intune currently evaluates as noncompliant
pub async fn list_noncompliant_devices(client: &GraphClient) -> Result<Vec<ManagedDevice>> {
    let endpoint = select(filter_endpoint(
        MANAGED_DEVICES,
        "complianceState eq 'noncompliant'",
    ));
    client.get_all_pages(&endpoint).await
}

/// Every managed device in the tenant
pub async fn list_managed_devices(client: &GraphClient) -> Result<Vec<ManagedDevice>> {
    client
        .get_all_pages(&format!("{}?$select={}", MANAGED_DEVICES, DEVICE_SELECT))
        .await
}

/// Devices that have not synced in `days` days, oldest first.
/// Devices that never reported a sync time are included at the front.
pub fn stale_devices(
    devices: Vec<ManagedDevice>,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<ManagedDevice> {
    let cutoff = now - chrono::Duration::days(i64::from(days));

    let mut stale: Vec<ManagedDevice> = devices
        .into_iter()
        .filter(|d| d.last_sync_date_time.map_or(true, |t| t < cutoff))
        .collect();

    stale.sort_by_key(|d| d.last_sync_date_time);
    stale
}

/// Applications detected on a device (beta only)
pub async fn list_detected_apps(client: &GraphClient, device_id: &str) -> Result<Vec<DetectedApp>> {
    let mut apps: Vec<DetectedApp> = client
        .get_all_pages_beta(&format!("{}/{}/detectedApps", MANAGED_DEVICES, device_id))
        .await?;

    apps.sort_by_key(|a| a.display_name.as_deref().unwrap_or_default().to_lowercase());
    Ok(apps)
}

/// Remove a device record from Intune
pub async fn delete_managed_device(client: &GraphClient, device_id: &str) -> Result<()> {
    client
        .delete(&format!("{}/{}", MANAGED_DEVICES, device_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn device(name: &str, last_sync: Option<DateTime<Utc>>) -> ManagedDevice {
        ManagedDevice {
            id: format!("id-{}", name),
            device_name: Some(name.to_string()),
            serial_number: None,
            user_principal_name: None,
            compliance_state: None,
            last_sync_date_time: last_sync,
            operating_system: None,
            os_version: None,
            model: None,
            manufacturer: None,
        }
    }

    #[test]
    fn test_deserialize_managed_device() {
        let json = serde_json::json!({
            "id": "0f1c",
            "deviceName": "P12345",
            "serialNumber": "SN-1",
            "complianceState": "compliant",
            "lastSyncDateTime": "2026-10-01T08:30:00Z",
            "operatingSystem": "Windows"
        });
        let device: ManagedDevice = serde_json::from_value(json).unwrap();
        assert_eq!(device.display_name(), "P12345");
        assert_eq!(device.serial(), Some("SN-1"));
        assert_eq!(
            device.last_sync_date_time,
            Some(Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_blank_serial_is_absent() {
        let mut d = device("P1", None);
        d.serial_number = Some("   ".into());
        assert_eq!(d.serial(), None);
    }

    #[test]
    fn test_stale_devices_cutoff_and_order() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let devices = vec![
            device("fresh", Some(now - chrono::Duration::days(2))),
            device("old", Some(now - chrono::Duration::days(90))),
            device("never", None),
            device("older", Some(now - chrono::Duration::days(200))),
            device("edge", Some(now - chrono::Duration::days(30))),
        ];

        let stale = stale_devices(devices, 30, now);
        let names: Vec<&str> = stale.iter().map(|d| d.display_name()).collect();
        assert_eq!(names, vec!["never", "older", "old"]);
    }
}
