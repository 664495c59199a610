use crate::cmd::prompts;
use crate::config::{AuthType, ConfigManager, TenantConfig};
use crate::error::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct TenantAddArgs {
    /// Short name used with `login` and `tenant switch`
    name: String,

    /// Directory (tenant) ID of the Entra ID tenant
    #[arg(long)]
    tenant_id: String,

    /// Application (client) ID of the app registration
    #[arg(long)]
    client_id: String,

    /// App secret; implies the client credentials flow
    #[arg(long)]
    client_secret: Option<String>,

    /// Use the client credentials flow even without a secret on the command line
    #[arg(long)]
    client_credentials: bool,

    /// Free-text note shown by `tenant list`
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct TenantListArgs {
    /// Show IDs and token status
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
pub struct TenantSwitchArgs {
    /// Tenant that later device commands run against
    name: String,
}

#[derive(Args, Debug)]
pub struct TenantRemoveArgs {
    /// Tenant to forget, together with its cached token
    name: String,
}

impl TenantAddArgs {
    fn into_tenant(self) -> TenantConfig {
        let auth_type = if self.client_credentials || self.client_secret.is_some() {
            AuthType::ClientCredentials
        } else {
            AuthType::DeviceCode
        };

        TenantConfig {
            name: self.name,
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            client_secret: self.client_secret,
            auth_type,
            description: self.description,
        }
    }
}

pub async fn add(args: TenantAddArgs) -> Result<()> {
    let manager = ConfigManager::new()?;
    let tenant = args.into_tenant();
    let name = tenant.name.clone();

    manager.add_tenant(tenant)?;

    prompts::success(&format!("Tenant '{}' saved", name));
    prompts::info(&format!("Next: {}", format!("dx365 login {}", name).bold()));
    Ok(())
}

fn token_status(manager: &ConfigManager, tenant: &str) -> String {
    match manager.load_token(tenant) {
        Ok(token) => format!(
            "{} until {}",
            "valid".green(),
            token.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        Err(_) => "none or expired".yellow().to_string(),
    }
}

pub async fn list(args: TenantListArgs) -> Result<()> {
    let manager = ConfigManager::new()?;
    let tenants = manager.load_tenants()?;

    if tenants.is_empty() {
        prompts::warning("No tenants configured yet");
        prompts::info(&format!("Add one with {}", "dx365 tenant add".bold()));
        return Ok(());
    }

    let active = manager
        .get_active_tenant()
        .ok()
        .flatten()
        .map(|t| t.name);

    prompts::section_header("Tenants");
    for tenant in &tenants {
        let marker = if active.as_deref() == Some(tenant.name.as_str()) {
            "●".green()
        } else {
            "○".dimmed()
        };
        let note = tenant
            .description
            .as_deref()
            .map(|d| format!(" ({})", d))
            .unwrap_or_default();
        println!("{} {}{}", marker, tenant.name.bold(), note);

        if args.verbose {
            let auth = match tenant.auth_type {
                AuthType::DeviceCode => "device code",
                AuthType::ClientCredentials => "client credentials",
            };
            prompts::show_value("Tenant ID", Some(&tenant.tenant_id));
            prompts::show_value("Client ID", Some(&tenant.client_id));
            prompts::show_value("Auth flow", Some(auth));
            prompts::show_value("Token", Some(&token_status(&manager, &tenant.name)));
        }
    }
    println!();
    prompts::info(&format!("{} tenant(s) configured", tenants.len()));

    Ok(())
}

pub async fn switch(args: TenantSwitchArgs) -> Result<()> {
    ConfigManager::new()?.set_active_tenant(&args.name)?;
    prompts::success(&format!("Active tenant is now '{}'", args.name));
    Ok(())
}

pub async fn remove(args: TenantRemoveArgs) -> Result<()> {
    ConfigManager::new()?.remove_tenant(&args.name)?;
    prompts::success(&format!("Tenant '{}' and its cached token removed", args.name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(secret: Option<&str>, client_credentials: bool) -> TenantAddArgs {
        TenantAddArgs {
            name: "CORP".into(),
            tenant_id: "tid".into(),
            client_id: "cid".into(),
            client_secret: secret.map(String::from),
            client_credentials,
            description: None,
        }
    }

    #[test]
    fn test_secret_implies_client_credentials() {
        let tenant = args(Some("s3cret"), false).into_tenant();
        assert!(matches!(tenant.auth_type, AuthType::ClientCredentials));
    }

    #[test]
    fn test_defaults_to_device_code() {
        let tenant = args(None, false).into_tenant();
        assert!(matches!(tenant.auth_type, AuthType::DeviceCode));
        assert_eq!(tenant.name, "CORP");
    }

    #[test]
    fn test_token_status_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf()).unwrap();
        assert!(token_status(&manager, "CORP").contains("none"));
    }
}
