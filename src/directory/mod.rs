//! On-premises Active Directory access over LDAP
//!
//! Computer objects are looked up by a wildcard match on `cn` and removed by
//! distinguished name with the tree-delete control, so child objects such as
//! BitLocker recovery information go with the computer account.

use crate::config::DirectoryConfig;
use crate::error::{Dx365Error, Result};
use ldap3::controls::RawControl;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::HashMap;
use std::time::Duration;

/// LDAP_SERVER_TREE_DELETE_OID
const TREE_DELETE_OID: &str = "1.2.840.113556.1.4.805";

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;

const COMPUTER_ATTRIBUTES: &[&str] = &["cn", "dNSHostName", "operatingSystem"];

/// Computer account as stored in the directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryComputer {
    pub name: String,
    pub distinguished_name: String,
    pub dns_host_name: Option<String>,
    pub operating_system: Option<String>,
}

/// Bound connection to the on-premises directory
pub struct LdapDirectory {
    ldap: Ldap,
    base_dn: String,
    host: String,
}

impl LdapDirectory {
    /// Connect and bind once; the handle is reused for every lookup
    pub async fn connect(config: &DirectoryConfig) -> Result<Self> {
        config.validate()?;
        let password = config.require_password()?;
        let url = config.url();

        tracing::debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.connection_timeout_secs))
            .set_starttls(config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                Dx365Error::DirectoryError(format!("Failed to connect to {}: {}", url, e))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "LDAP connection driver error");
            }
        });

        tracing::debug!(bind_dn = %config.bind_dn, "Performing LDAP bind");

        let result = ldap.simple_bind(&config.bind_dn, &password).await?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(Dx365Error::AuthError(format!(
                "LDAP bind rejected for {}",
                config.bind_dn
            )));
        }
        if result.rc != RC_SUCCESS {
            return Err(Dx365Error::DirectoryError(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        tracing::info!(host = %config.host, "LDAP connection established");

        Ok(Self {
            ldap,
            base_dn: config.base_dn.clone(),
            host: config.host.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Computer accounts whose name contains `name`
    pub async fn find_computers(&self, name: &str) -> Result<Vec<DirectoryComputer>> {
        let filter = computer_filter(name);
        let mut ldap = self.ldap.clone();

        tracing::debug!(filter = %filter, base_dn = %self.base_dn, "Searching LDAP");

        let (entries, _) = ldap
            .search(
                &self.base_dn,
                Scope::Subtree,
                &filter,
                COMPUTER_ATTRIBUTES.to_vec(),
            )
            .await?
            .success()?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| computer_from_entry(entry.dn, &entry.attrs))
            .collect())
    }

    /// Delete the computer account and everything beneath it
    pub async fn delete_computer(&self, computer: &DirectoryComputer) -> Result<()> {
        let dn = &computer.distinguished_name;
        let mut ldap = self.ldap.clone();

        tracing::debug!(dn = %dn, "Deleting LDAP entry");

        let tree_delete = RawControl {
            ctype: TREE_DELETE_OID.to_string(),
            crit: true,
            val: None,
        };
        let result = ldap.with_controls(tree_delete).delete(dn).await?;

        match result.rc {
            RC_SUCCESS => {
                tracing::info!(dn = %dn, "Computer account deleted");
                Ok(())
            }
            RC_NO_SUCH_OBJECT => Err(Dx365Error::DeviceNotFound(dn.clone())),
            rc => Err(Dx365Error::DirectoryError(format!(
                "LDAP delete failed with code {}: {}",
                rc, result.text
            ))),
        }
    }

    pub async fn unbind(mut self) -> Result<()> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

/// `(&(objectClass=computer)(cn=*NAME*))` with the name escaped
pub fn computer_filter(name: &str) -> String {
    format!(
        "(&(objectClass=computer)(cn=*{}*))",
        escape_filter_value(name.trim())
    )
}

/// Escape special characters in LDAP filter values (RFC 4515)
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

fn first_value(attrs: &HashMap<String, Vec<String>>, name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first().cloned())
}

/// Build a computer from a search entry; the name falls back to the DN's first RDN
fn computer_from_entry(dn: String, attrs: &HashMap<String, Vec<String>>) -> DirectoryComputer {
    let name = first_value(attrs, "cn").unwrap_or_else(|| {
        dn.split(',')
            .next()
            .and_then(|rdn| rdn.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| dn.clone())
    });

    DirectoryComputer {
        name,
        dns_host_name: first_value(attrs, "dNSHostName"),
        operating_system: first_value(attrs, "operatingSystem"),
        distinguished_name: dn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computer_filter_wraps_in_wildcards() {
        assert_eq!(
            computer_filter(" P12345 "),
            "(&(objectClass=computer)(cn=*P12345*))"
        );
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("a*b"), "a\\2ab");
        assert_eq!(escape_filter_value("(x)"), "\\28x\\29");
        assert_eq!(escape_filter_value("back\\slash"), "back\\5cslash");
        assert_eq!(
            computer_filter("*)(cn=*"),
            "(&(objectClass=computer)(cn=*\\2a\\29\\28cn=\\2a*))"
        );
    }

    #[test]
    fn test_computer_from_entry() {
        let mut attrs = HashMap::new();
        attrs.insert("cn".to_string(), vec!["P12345".to_string()]);
        attrs.insert(
            "dnshostname".to_string(),
            vec!["p12345.corp.example.com".to_string()],
        );

        let computer = computer_from_entry(
            "CN=P12345,OU=Workstations,DC=corp,DC=example,DC=com".into(),
            &attrs,
        );
        assert_eq!(computer.name, "P12345");
        assert_eq!(
            computer.dns_host_name.as_deref(),
            Some("p12345.corp.example.com")
        );
        assert_eq!(computer.operating_system, None);
    }

    #[test]
    fn test_computer_name_falls_back_to_rdn() {
        let computer = computer_from_entry(
            "CN=LAB-07,OU=Labs,DC=corp,DC=example,DC=com".into(),
            &HashMap::new(),
        );
        assert_eq!(computer.name, "LAB-07");
    }
}
