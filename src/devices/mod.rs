//! Device correlation across Active Directory, Intune and Autopilot

pub mod backend;
pub mod batch;
pub mod correlator;
pub mod deletion;
pub mod record;

#[cfg(test)]
pub(crate) mod fakes;

pub use backend::{
    Backends, LegacyDirectory, Lookup, ManagementService, ProvisioningService,
};
pub use batch::{BatchDriver, BatchMode};
pub use correlator::Correlator;
pub use deletion::{Deleter, DeletionOutcome, DeletionStage};
pub use record::{BackendStatus, BatchReport, DevicePresenceRecord, ReportRow};
