//! Cross-directory correlation for a single device name

use super::backend::{Backends, Lookup};
use super::record::{BackendStatus, DevicePresenceRecord, PresenceDraft};
use crate::directory::DirectoryComputer;
use crate::graph::autopilot::AutopilotDevice;
use crate::graph::intune::ManagedDevice;

/// Resolves one device name against AD, Intune and Autopilot, in that order.
///
/// Each backend is queried at most once. Autopilot is only queried with the
/// serial number of a single Intune match.
pub struct Correlator<'a> {
    backends: Backends<'a>,
}

impl<'a> Correlator<'a> {
    pub fn new(backends: Backends<'a>) -> Self {
        Self { backends }
    }

    pub async fn correlate(&self, name: &str) -> DevicePresenceRecord {
        let mut draft = PresenceDraft::new(name);

        match self.backends.legacy.find_computers(name).await {
            Ok(Lookup::One(computer)) => draft.legacy_found(computer.name),
            Ok(Lookup::None) => draft.legacy_status(BackendStatus::NotFound),
            Ok(Lookup::Many(computers)) => {
                draft.warn(ambiguity_warning(
                    "Active Directory",
                    name,
                    &computer_labels(&computers),
                ));
                draft.legacy_status(BackendStatus::Multiple(computers.len()));
            }
            Err(e) => {
                tracing::warn!(device = name, error = %e, "Active Directory lookup failed");
                draft.warn(format!("Active Directory lookup failed: {}", e));
                draft.legacy_status(BackendStatus::Error);
            }
        }

        let serial = match self.backends.management.find_managed_devices(name).await {
            Ok(Lookup::One(device)) => {
                let serial = device.serial().map(str::to_string);
                draft.management_found(device.display_name().to_string(), serial.clone());
                match serial {
                    Some(serial) => Some(serial),
                    None => {
                        draft.provisioning_status(BackendStatus::NoSerialNumber);
                        None
                    }
                }
            }
            Ok(Lookup::None) => {
                draft.management_status(BackendStatus::NotFound);
                draft.provisioning_status(BackendStatus::NotFound);
                None
            }
            Ok(Lookup::Many(devices)) => {
                draft.warn(ambiguity_warning("Intune", name, &managed_labels(&devices)));
                draft.management_status(BackendStatus::Multiple(devices.len()));
                None
            }
            Err(e) => {
                tracing::warn!(device = name, error = %e, "Intune lookup failed");
                draft.warn(format!("Intune lookup failed: {}", e));
                draft.management_status(BackendStatus::Error);
                None
            }
        };

        if let Some(serial) = serial {
            match self.backends.provisioning.find_autopilot_devices(&serial).await {
                Ok(Lookup::One(_)) => draft.provisioning_found(serial),
                Ok(Lookup::None) => draft.provisioning_status(BackendStatus::NotFound),
                Ok(Lookup::Many(devices)) => {
                    draft.warn(ambiguity_warning(
                        "Autopilot",
                        &serial,
                        &autopilot_labels(&devices),
                    ));
                    draft.provisioning_status(BackendStatus::Multiple(devices.len()));
                }
                Err(e) => {
                    tracing::warn!(
                        device = name,
                        serial = %serial,
                        error = %e,
                        "Autopilot lookup failed"
                    );
                    draft.warn(format!("Autopilot lookup failed: {}", e));
                    draft.provisioning_status(BackendStatus::Error);
                }
            }
        }

        let record = draft.finish();
        tracing::info!("{}", record.summary_line());
        record
    }
}

pub(crate) fn ambiguity_warning(backend: &str, key: &str, matches: &[String]) -> String {
    let message = format!(
        "{} returned {} records for '{}': {}",
        backend,
        matches.len(),
        key,
        matches.join(", ")
    );
    tracing::warn!("{}", message);
    message
}

pub(crate) fn computer_labels(computers: &[DirectoryComputer]) -> Vec<String> {
    computers
        .iter()
        .map(|c| c.distinguished_name.clone())
        .collect()
}

pub(crate) fn managed_labels(devices: &[ManagedDevice]) -> Vec<String> {
    devices
        .iter()
        .map(|d| match d.serial() {
            Some(serial) => format!("{} ({})", d.display_name(), serial),
            None => d.display_name().to_string(),
        })
        .collect()
}

pub(crate) fn autopilot_labels(devices: &[AutopilotDevice]) -> Vec<String> {
    devices.iter().map(|d| d.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::fakes::{FakeAutopilot, FakeDirectory, FakeIntune};

    async fn correlate_with(
        ad: &FakeDirectory,
        intune: &FakeIntune,
        autopilot: &FakeAutopilot,
        name: &str,
    ) -> DevicePresenceRecord {
        let backends = Backends {
            legacy: ad,
            management: intune,
            provisioning: autopilot,
        };
        Correlator::new(backends).correlate(name).await
    }

    #[tokio::test]
    async fn test_found_everywhere() {
        let ad = FakeDirectory::with(&["P12345"]);
        let intune = FakeIntune::with(&[("P12345", Some("SN-1"))]);
        let autopilot = FakeAutopilot::with(&["SN-1"]);

        let record = correlate_with(&ad, &intune, &autopilot, "P12345").await;

        assert!(record.legacy_directory_found());
        assert_eq!(record.legacy_directory_name(), Some("P12345"));
        assert!(record.management_found());
        assert_eq!(record.management_serial_number(), Some("SN-1"));
        assert!(record.provisioning_found());
        assert_eq!(record.provisioning_serial_number(), Some("SN-1"));
        assert!(record.warnings().is_empty());
        assert_eq!(autopilot.lookups(), 1);
    }

    #[tokio::test]
    async fn test_serial_without_autopilot_record_is_not_found() {
        let ad = FakeDirectory::with(&[]);
        let intune = FakeIntune::with(&[("P12345", Some("SN-1"))]);
        let autopilot = FakeAutopilot::with(&[]);

        let record = correlate_with(&ad, &intune, &autopilot, "P12345").await;

        assert!(record.management_found());
        assert!(!record.provisioning_found());
        assert_eq!(record.provisioning_status(), BackendStatus::NotFound);
    }

    #[tokio::test]
    async fn test_missing_serial_skips_autopilot() {
        let ad = FakeDirectory::with(&["P12345"]);
        let intune = FakeIntune::with(&[("P12345", None)]);
        let autopilot = FakeAutopilot::with(&["SN-1"]);

        let record = correlate_with(&ad, &intune, &autopilot, "P12345").await;

        assert!(record.management_found());
        assert_eq!(record.provisioning_status(), BackendStatus::NoSerialNumber);
        assert_eq!(autopilot.lookups(), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_directory_match_is_not_resolved() {
        let ad = FakeDirectory::with(&["P123", "P1234"]);
        let intune = FakeIntune::with(&[("P123", Some("SN-9"))]);
        let autopilot = FakeAutopilot::with(&["SN-9"]);

        let record = correlate_with(&ad, &intune, &autopilot, "P123").await;

        assert!(!record.legacy_directory_found());
        assert_eq!(record.legacy_directory_name(), None);
        assert_eq!(record.legacy_directory_status(), BackendStatus::Multiple(2));
        assert_eq!(record.warnings().len(), 1);
        assert!(record.warnings()[0].contains("CN=P1234"));
        // other backends unaffected
        assert!(record.management_found());
        assert!(record.provisioning_found());
    }

    #[tokio::test]
    async fn test_ambiguous_intune_match_blocks_autopilot() {
        let ad = FakeDirectory::with(&[]);
        let intune = FakeIntune::with(&[("P1", Some("SN-1")), ("P1", Some("SN-2"))]);
        let autopilot = FakeAutopilot::with(&["SN-1", "SN-2"]);

        let record = correlate_with(&ad, &intune, &autopilot, "P1").await;

        assert!(!record.management_found());
        assert_eq!(record.management_serial_number(), None);
        assert_eq!(record.management_status(), BackendStatus::Multiple(2));
        assert_eq!(record.provisioning_status(), BackendStatus::NotAttempted);
        assert_eq!(autopilot.lookups(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_isolated() {
        let ad = FakeDirectory::with(&["P12345"]).failing_lookups();
        let intune = FakeIntune::with(&[("P12345", Some("SN-1"))]);
        let autopilot = FakeAutopilot::with(&["SN-1"]);

        let record = correlate_with(&ad, &intune, &autopilot, "P12345").await;

        assert_eq!(record.legacy_directory_status(), BackendStatus::Error);
        assert!(!record.legacy_directory_found());
        assert!(record.management_found());
        assert!(record.provisioning_found());
    }

    #[tokio::test]
    async fn test_intune_failure_leaves_autopilot_unattempted() {
        let ad = FakeDirectory::with(&["P12345"]);
        let intune = FakeIntune::with(&[("P12345", Some("SN-1"))]).failing_lookups();
        let autopilot = FakeAutopilot::with(&["SN-1"]);

        let record = correlate_with(&ad, &intune, &autopilot, "P12345").await;

        assert!(record.legacy_directory_found());
        assert_eq!(record.management_status(), BackendStatus::Error);
        assert_eq!(record.provisioning_status(), BackendStatus::NotAttempted);
        assert!(!record.provisioning_found());
    }

    #[tokio::test]
    async fn test_correlation_is_repeatable() {
        let ad = FakeDirectory::with(&["P12345", "P123456"]);
        let intune = FakeIntune::with(&[("P12345", Some("SN-1"))]);
        let autopilot = FakeAutopilot::with(&["SN-1"]);

        let first = correlate_with(&ad, &intune, &autopilot, "P12345").await;
        let second = correlate_with(&ad, &intune, &autopilot, "P12345").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_each_backend_queried_once() {
        let ad = FakeDirectory::with(&["P12345"]);
        let intune = FakeIntune::with(&[("P12345", Some("SN-1"))]);
        let autopilot = FakeAutopilot::with(&["SN-1"]);

        correlate_with(&ad, &intune, &autopilot, "P12345").await;

        assert_eq!(ad.lookups(), 1);
        assert_eq!(intune.lookups(), 1);
        assert_eq!(autopilot.lookups(), 1);
        assert!(ad.deleted().is_empty());
    }
}
