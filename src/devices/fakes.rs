//! In-memory backends for unit tests

use super::backend::{LegacyDirectory, Lookup, ManagementService, ProvisioningService};
use crate::directory::DirectoryComputer;
use crate::error::{Dx365Error, Result};
use crate::graph::autopilot::AutopilotDevice;
use crate::graph::intune::ManagedDevice;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Calls {
    lookups: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl Calls {
    fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn record_delete(&self, key: &str) {
        self.deleted.lock().unwrap().push(key.to_string());
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

/// Active Directory stand-in; names match as substrings like `cn=*NAME*`
#[derive(Default)]
pub(crate) struct FakeDirectory {
    computers: Vec<DirectoryComputer>,
    fail_lookups: bool,
    fail_deletes: bool,
    calls: Calls,
}

impl FakeDirectory {
    pub(crate) fn with(names: &[&str]) -> Self {
        Self {
            computers: names
                .iter()
                .map(|name| DirectoryComputer {
                    name: name.to_string(),
                    distinguished_name: format!(
                        "CN={},OU=Workstations,DC=corp,DC=example,DC=com",
                        name
                    ),
                    dns_host_name: None,
                    operating_system: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub(crate) fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub(crate) fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.calls.lookups()
    }

    /// Distinguished names passed to `delete_computer`
    pub(crate) fn deleted(&self) -> Vec<String> {
        self.calls.deleted()
    }
}

#[async_trait]
impl LegacyDirectory for FakeDirectory {
    async fn find_computers(&self, name: &str) -> Result<Lookup<DirectoryComputer>> {
        self.calls.lookup();
        if self.fail_lookups {
            return Err(Dx365Error::DirectoryError("server unavailable".into()));
        }
        let needle = name.trim().to_lowercase();
        Ok(self
            .computers
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect::<Vec<_>>()
            .into())
    }

    async fn delete_computer(&self, computer: &DirectoryComputer) -> Result<()> {
        self.calls.record_delete(&computer.distinguished_name);
        if self.fail_deletes {
            return Err(Dx365Error::DirectoryError(
                "insufficient access rights".into(),
            ));
        }
        Ok(())
    }
}

/// Intune stand-in; names match exactly, ignoring case
#[derive(Default)]
pub(crate) struct FakeIntune {
    devices: Vec<ManagedDevice>,
    fail_lookups: bool,
    fail_deletes: bool,
    calls: Calls,
}

impl FakeIntune {
    pub(crate) fn with(devices: &[(&str, Option<&str>)]) -> Self {
        Self {
            devices: devices
                .iter()
                .enumerate()
                .map(|(i, (name, serial))| ManagedDevice {
                    id: format!("id-{}-{}", name, i),
                    device_name: Some(name.to_string()),
                    serial_number: serial.map(str::to_string),
                    user_principal_name: None,
                    compliance_state: None,
                    last_sync_date_time: None,
                    operating_system: Some("Windows".into()),
                    os_version: None,
                    model: None,
                    manufacturer: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub(crate) fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub(crate) fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.calls.lookups()
    }

    /// Device ids passed to `delete_managed_device`
    pub(crate) fn deleted(&self) -> Vec<String> {
        self.calls.deleted()
    }
}

#[async_trait]
impl ManagementService for FakeIntune {
    async fn find_managed_devices(&self, name: &str) -> Result<Lookup<ManagedDevice>> {
        self.calls.lookup();
        if self.fail_lookups {
            return Err(Dx365Error::GraphApiError("503 Service Unavailable".into()));
        }
        Ok(self
            .devices
            .iter()
            .filter(|d| d.display_name().eq_ignore_ascii_case(name.trim()))
            .cloned()
            .collect::<Vec<_>>()
            .into())
    }

    async fn delete_managed_device(&self, device: &ManagedDevice) -> Result<()> {
        self.calls.record_delete(&device.id);
        if self.fail_deletes {
            return Err(Dx365Error::GraphApiError("403 Forbidden".into()));
        }
        Ok(())
    }
}

/// Autopilot stand-in keyed by serial number
#[derive(Default)]
pub(crate) struct FakeAutopilot {
    devices: Vec<AutopilotDevice>,
    fail_lookups: bool,
    fail_deletes: bool,
    calls: Calls,
}

impl FakeAutopilot {
    pub(crate) fn with(serials: &[&str]) -> Self {
        Self {
            devices: serials
                .iter()
                .map(|serial| AutopilotDevice {
                    id: format!("ap-{}", serial),
                    serial_number: Some(serial.to_string()),
                    model: None,
                    manufacturer: None,
                    group_tag: None,
                    enrollment_state: None,
                    managed_device_id: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub(crate) fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub(crate) fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.calls.lookups()
    }

    /// Identity ids passed to `delete_autopilot_device`
    pub(crate) fn deleted(&self) -> Vec<String> {
        self.calls.deleted()
    }
}

#[async_trait]
impl ProvisioningService for FakeAutopilot {
    async fn find_autopilot_devices(&self, serial: &str) -> Result<Lookup<AutopilotDevice>> {
        self.calls.lookup();
        if self.fail_lookups {
            return Err(Dx365Error::GraphApiError("503 Service Unavailable".into()));
        }
        Ok(self
            .devices
            .iter()
            .filter(|d| d.serial_number.as_deref() == Some(serial))
            .cloned()
            .collect::<Vec<_>>()
            .into())
    }

    async fn delete_autopilot_device(&self, device: &AutopilotDevice) -> Result<()> {
        self.calls.record_delete(&device.id);
        if self.fail_deletes {
            return Err(Dx365Error::GraphApiError("403 Forbidden".into()));
        }
        Ok(())
    }
}
