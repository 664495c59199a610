//! Per-device deletion across AD, Intune and Autopilot
//!
//! Each backend runs a lookup then, only on a single unambiguous match, a
//! delete. Autopilot is keyed by the serial number Intune reported, so it is
//! only reached through a single Intune match that carries one.

use super::backend::{Backends, Lookup};
use super::correlator::{ambiguity_warning, autopilot_labels, computer_labels, managed_labels};
use super::record::{BackendStatus, ReportRow};
use crate::directory::DirectoryComputer;
use crate::error::{Dx365Error, Result};
use crate::graph::autopilot::AutopilotDevice;
use crate::graph::intune::ManagedDevice;

/// Stages a deletion passes through, as recorded in [`DeletionOutcome::stages`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStage {
    Start,
    AdLookup,
    AdDelete,
    MgmtLookup,
    MgmtDelete,
    ProvisioningLookup,
    ProvisioningDelete,
    Done,
}

/// Machine state; delete stages carry the record the lookup returned
enum Stage {
    Start,
    AdLookup,
    AdDelete(DirectoryComputer),
    MgmtLookup,
    MgmtDelete(ManagedDevice),
    ProvisioningLookup(String),
    ProvisioningDelete(AutopilotDevice),
    Done,
}

impl Stage {
    fn kind(&self) -> DeletionStage {
        match self {
            Stage::Start => DeletionStage::Start,
            Stage::AdLookup => DeletionStage::AdLookup,
            Stage::AdDelete(_) => DeletionStage::AdDelete,
            Stage::MgmtLookup => DeletionStage::MgmtLookup,
            Stage::MgmtDelete(_) => DeletionStage::MgmtDelete,
            Stage::ProvisioningLookup(_) => DeletionStage::ProvisioningLookup,
            Stage::ProvisioningDelete(_) => DeletionStage::ProvisioningDelete,
            Stage::Done => DeletionStage::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletionOutcome {
    pub row: ReportRow,
    pub stages: Vec<DeletionStage>,
}

impl DeletionOutcome {
    pub fn summary_line(&self) -> String {
        format!(
            "{}: AD {} | Intune {} | Autopilot {}",
            self.row.computer_name,
            self.row.active_directory,
            self.row.intune,
            self.row.autopilot
        )
    }
}

pub struct Deleter<'a> {
    backends: Backends<'a>,
    dry_run: bool,
}

impl<'a> Deleter<'a> {
    pub fn new(backends: Backends<'a>, dry_run: bool) -> Self {
        Self { backends, dry_run }
    }

    pub async fn delete(&self, name: &str) -> DeletionOutcome {
        let mut row = ReportRow {
            computer_name: name.to_string(),
            active_directory: BackendStatus::NotAttempted,
            intune: BackendStatus::NotAttempted,
            autopilot: BackendStatus::NotAttempted,
            notes: Vec::new(),
        };
        let mut stages = Vec::new();
        let mut stage = Stage::Start;

        loop {
            stages.push(stage.kind());

            stage = match stage {
                Stage::Start => Stage::AdLookup,

                Stage::AdLookup => match self.backends.legacy.find_computers(name).await {
                    Ok(Lookup::One(computer)) => Stage::AdDelete(computer),
                    Ok(Lookup::None) => {
                        row.active_directory = BackendStatus::NotFound;
                        Stage::MgmtLookup
                    }
                    Ok(Lookup::Many(computers)) => {
                        row.notes.push(ambiguity_warning(
                            "Active Directory",
                            name,
                            &computer_labels(&computers),
                        ));
                        row.active_directory = BackendStatus::Multiple(computers.len());
                        Stage::MgmtLookup
                    }
                    Err(e) => {
                        row.active_directory =
                            lookup_failed(&mut row.notes, "Active Directory", name, e);
                        Stage::MgmtLookup
                    }
                },

                Stage::AdDelete(computer) => {
                    row.active_directory = if self.dry_run {
                        BackendStatus::WouldDelete
                    } else {
                        let result = self.backends.legacy.delete_computer(&computer).await;
                        let dn = &computer.distinguished_name;
                        delete_status(&mut row.notes, "Active Directory", dn, result)
                    };
                    Stage::MgmtLookup
                }

                Stage::MgmtLookup => {
                    match self.backends.management.find_managed_devices(name).await {
                        Ok(Lookup::One(device)) => Stage::MgmtDelete(device),
                        Ok(Lookup::None) => {
                            row.intune = BackendStatus::NotFound;
                            Stage::Done
                        }
                        Ok(Lookup::Many(devices)) => {
                            row.notes.push(ambiguity_warning(
                                "Intune",
                                name,
                                &managed_labels(&devices),
                            ));
                            row.intune = BackendStatus::Multiple(devices.len());
                            Stage::Done
                        }
                        Err(e) => {
                            row.intune = lookup_failed(&mut row.notes, "Intune", name, e);
                            Stage::Done
                        }
                    }
                }

                Stage::MgmtDelete(device) => {
                    row.intune = if self.dry_run {
                        BackendStatus::WouldDelete
                    } else {
                        let result = self
                            .backends
                            .management
                            .delete_managed_device(&device)
                            .await;
                        delete_status(&mut row.notes, "Intune", &device.id, result)
                    };
                    match device.serial() {
                        Some(serial) => Stage::ProvisioningLookup(serial.to_string()),
                        None => {
                            row.autopilot = BackendStatus::NoSerialNumber;
                            Stage::Done
                        }
                    }
                }

                Stage::ProvisioningLookup(serial) => {
                    match self.backends.provisioning.find_autopilot_devices(&serial).await {
                        Ok(Lookup::One(device)) => Stage::ProvisioningDelete(device),
                        Ok(Lookup::None) => {
                            row.autopilot = BackendStatus::NotFound;
                            Stage::Done
                        }
                        Ok(Lookup::Many(devices)) => {
                            row.notes.push(ambiguity_warning(
                                "Autopilot",
                                &serial,
                                &autopilot_labels(&devices),
                            ));
                            row.autopilot = BackendStatus::Multiple(devices.len());
                            Stage::Done
                        }
                        Err(e) => {
                            row.autopilot =
                                lookup_failed(&mut row.notes, "Autopilot", &serial, e);
                            Stage::Done
                        }
                    }
                }

                Stage::ProvisioningDelete(device) => {
                    row.autopilot = if self.dry_run {
                        BackendStatus::WouldDelete
                    } else {
                        let result = self
                            .backends
                            .provisioning
                            .delete_autopilot_device(&device)
                            .await;
                        delete_status(&mut row.notes, "Autopilot", &device.id, result)
                    };
                    Stage::Done
                }

                Stage::Done => break,
            };
        }

        let outcome = DeletionOutcome { row, stages };
        tracing::info!("{}", outcome.summary_line());
        outcome
    }
}

fn lookup_failed(
    notes: &mut Vec<String>,
    backend: &str,
    key: &str,
    error: Dx365Error,
) -> BackendStatus {
    tracing::warn!(backend, key, error = %error, "Lookup failed");
    notes.push(format!("{} lookup failed: {}", backend, error));
    BackendStatus::Error
}

fn delete_status(
    notes: &mut Vec<String>,
    backend: &str,
    target: &str,
    result: Result<()>,
) -> BackendStatus {
    match result {
        Ok(()) => {
            tracing::info!(backend, target, "Deleted");
            BackendStatus::Deleted
        }
        Err(e) => {
            tracing::warn!(backend, target, error = %e, "Delete failed");
            notes.push(format!("{} delete of {} failed: {}", backend, target, e));
            BackendStatus::DeleteFailed
        }
    }
}
