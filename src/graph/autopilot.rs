//! Windows Autopilot device identity operations

use crate::error::Result;
use crate::graph::{GraphClient, filter_endpoint, odata_string};
use serde::Deserialize;

const AUTOPILOT_DEVICES: &str = "deviceManagement/windowsAutopilotDeviceIdentities";

/// Autopilot registration of a device's hardware
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotDevice {
    pub id: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub group_tag: Option<String>,
    #[serde(default)]
    pub enrollment_state: Option<String>,
    #[serde(default)]
    pub managed_device_id: Option<String>,
}

/// Keep only identities whose serial equals `serial` (case-insensitive)
pub fn exact_serial_matches(devices: Vec<AutopilotDevice>, serial: &str) -> Vec<AutopilotDevice> {
    let wanted = serial.trim();
    devices
        .into_iter()
        .filter(|d| {
            d.serial_number
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(wanted))
        })
        .collect()
}

/// Autopilot identities registered under `serial`.
///
/// The service only supports `contains` on serial numbers, so every page of
/// partial matches is fetched and then narrowed to exact matches here.
pub async fn find_devices_by_serial(
    client: &GraphClient,
    serial: &str,
) -> Result<Vec<AutopilotDevice>> {
    let endpoint = filter_endpoint(
        AUTOPILOT_DEVICES,
        &format!("contains(serialNumber,{})", odata_string(serial)),
    );
    let candidates: Vec<AutopilotDevice> = client.get_all_pages(&endpoint).await?;
    Ok(exact_serial_matches(candidates, serial))
}

/// Remove an Autopilot registration
pub async fn delete_autopilot_device(client: &GraphClient, device_id: &str) -> Result<()> {
    client
        .delete(&format!("{}/{}", AUTOPILOT_DEVICES, device_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, serial: Option<&str>) -> AutopilotDevice {
        AutopilotDevice {
            id: id.to_string(),
            serial_number: serial.map(str::to_string),
            model: None,
            manufacturer: None,
            group_tag: None,
            enrollment_state: None,
            managed_device_id: None,
        }
    }

    #[test]
    fn test_exact_serial_matches_drops_partial_hits() {
        let devices = vec![
            identity("a", Some("SN-1")),
            identity("b", Some("SN-10")),
            identity("c", Some("sn-1 ")),
            identity("d", None),
        ];

        let ids: Vec<String> = exact_serial_matches(devices, "SN-1")
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_deserialize_identity() {
        let json = serde_json::json!({
            "id": "ap-1",
            "serialNumber": "SN-1",
            "groupTag": "Kiosk",
            "enrollmentState": "enrolled"
        });
        let device: AutopilotDevice = serde_json::from_value(json).unwrap();
        assert_eq!(device.group_tag.as_deref(), Some("Kiosk"));
        assert_eq!(device.model, None);
    }
}
