//! Authenticated connections shared by every device operation

use crate::config::{ConfigManager, TenantConfig};
use crate::devices::Backends;
use crate::directory::LdapDirectory;
use crate::error::{Dx365Error, Result};
use crate::graph::{GraphClient, RetryPolicy};

/// Graph client and LDAP bind for the active tenant, opened once per run.
///
/// The Graph client never retries, so each backend is queried exactly once
/// per device.
pub struct Session {
    tenant: TenantConfig,
    graph: GraphClient,
    directory: LdapDirectory,
}

impl Session {
    pub async fn open(config: &ConfigManager) -> Result<Self> {
        let tenant = config.get_active_tenant()?.ok_or_else(|| {
            Dx365Error::ConfigError(
                "No active tenant. Run 'dx365 tenant switch <name>' first.".into(),
            )
        })?;
        let directory_config = config.directory_config()?;

        let graph = GraphClient::from_config(config, &tenant.name)
            .await?
            .with_retry_policy(RetryPolicy::single_attempt());
        let directory = LdapDirectory::connect(&directory_config).await?;

        tracing::debug!(tenant = %tenant.name, host = %directory.host(), "Session opened");

        Ok(Self {
            tenant,
            graph,
            directory,
        })
    }

    pub fn tenant(&self) -> &TenantConfig {
        &self.tenant
    }

    pub fn directory_host(&self) -> &str {
        self.directory.host()
    }

    pub fn backends(&self) -> Backends<'_> {
        Backends {
            legacy: &self.directory,
            management: &self.graph,
            provisioning: &self.graph,
        }
    }

    pub async fn close(self) -> Result<()> {
        self.directory.unbind().await
    }
}
