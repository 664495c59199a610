//! Backend query adapters
//!
//! One trait per directory, each keyed by that directory's own identifier:
//! computer name (wildcard) for Active Directory, exact device name for
//! Intune, serial number for Autopilot.

use crate::directory::{DirectoryComputer, LdapDirectory};
use crate::error::Result;
use crate::graph::GraphClient;
use crate::graph::autopilot::{self, AutopilotDevice};
use crate::graph::intune::{self, ManagedDevice};
use async_trait::async_trait;

/// Result of one adapter lookup. `Many` is never narrowed down automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> Lookup<T> {
    pub fn len(&self) -> usize {
        match self {
            Lookup::None => 0,
            Lookup::One(_) => 1,
            Lookup::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Lookup::None)
    }
}

impl<T> From<Vec<T>> for Lookup<T> {
    fn from(mut items: Vec<T>) -> Self {
        match items.len() {
            0 => Lookup::None,
            1 => Lookup::One(items.remove(0)),
            _ => Lookup::Many(items),
        }
    }
}

#[async_trait]
pub trait LegacyDirectory: Send + Sync {
    /// Wildcard match on computer name
    async fn find_computers(&self, name: &str) -> Result<Lookup<DirectoryComputer>>;

    async fn delete_computer(&self, computer: &DirectoryComputer) -> Result<()>;
}

#[async_trait]
pub trait ManagementService: Send + Sync {
    /// Exact match on device name
    async fn find_managed_devices(&self, name: &str) -> Result<Lookup<ManagedDevice>>;

    async fn delete_managed_device(&self, device: &ManagedDevice) -> Result<()>;
}

#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Exact match on serial number
    async fn find_autopilot_devices(&self, serial: &str) -> Result<Lookup<AutopilotDevice>>;

    async fn delete_autopilot_device(&self, device: &AutopilotDevice) -> Result<()>;
}

/// The three adapters a correlation runs against
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub legacy: &'a dyn LegacyDirectory,
    pub management: &'a dyn ManagementService,
    pub provisioning: &'a dyn ProvisioningService,
}

#[async_trait]
impl LegacyDirectory for LdapDirectory {
    async fn find_computers(&self, name: &str) -> Result<Lookup<DirectoryComputer>> {
        Ok(LdapDirectory::find_computers(self, name).await?.into())
    }

    async fn delete_computer(&self, computer: &DirectoryComputer) -> Result<()> {
        LdapDirectory::delete_computer(self, computer).await
    }
}

#[async_trait]
impl ManagementService for GraphClient {
    async fn find_managed_devices(&self, name: &str) -> Result<Lookup<ManagedDevice>> {
        Ok(intune::find_devices_by_name(self, name).await?.into())
    }

    async fn delete_managed_device(&self, device: &ManagedDevice) -> Result<()> {
        intune::delete_managed_device(self, &device.id).await
    }
}

#[async_trait]
impl ProvisioningService for GraphClient {
    async fn find_autopilot_devices(&self, serial: &str) -> Result<Lookup<AutopilotDevice>> {
        Ok(autopilot::find_devices_by_serial(self, serial).await?.into())
    }

    async fn delete_autopilot_device(&self, device: &AutopilotDevice) -> Result<()> {
        autopilot::delete_autopilot_device(self, &device.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_from_vec() {
        assert_eq!(Lookup::<u8>::from(vec![]), Lookup::None);
        assert_eq!(Lookup::from(vec![7]), Lookup::One(7));
        assert_eq!(Lookup::from(vec![1, 2, 3]), Lookup::Many(vec![1, 2, 3]));
        assert_eq!(Lookup::from(vec![1, 2, 3]).len(), 3);
        assert!(Lookup::<u8>::None.is_empty());
    }
}
